//! Cached topological sub-triangulation of a triangle.
//!
//! The triangulation of a refined triangle depends only on the number of
//! divisions of its three sides, so partitions are memoized process-wide
//! under the sorted division triple and reused across similar triangles.
//! The shape of the final surface comes from the tangents and the
//! barycentric coordinates of the new verts, not from the partition.

use std::collections::HashMap;
use std::sync::{LazyLock, Mutex};

use nalgebra::Vector3;

use super::next3;
use crate::algo::mix;

static PARTITION_CACHE: LazyLock<Mutex<HashMap<[usize; 3], Partition>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// A topological sub-triangulation of a reference triangle, keyed by the
/// sorted per-edge division counts.
///
/// The first three entries of `vert_bary` are the corners `(1,0,0)`,
/// `(0,1,0)`, `(0,0,1)`; the next `Σ (nᵢ − 1)` are edge-interior verts in
/// sorted-edge order; the rest are strictly interior. Cached values carry
/// the identity `idx`; [`get_partition`](Partition::get_partition) fills in
/// the permutation of the caller's divisions into sorted order.
#[derive(Debug, Clone)]
pub struct Partition {
    /// For each sorted slot, the original edge it came from.
    pub idx: [usize; 3],

    /// Division counts sorted descending; always at least one.
    pub sorted_divisions: [usize; 3],

    /// Barycentric coordinates of every local vertex.
    pub vert_bary: Vec<Vector3<f64>>,

    /// Sub-triangles as triples of local vertex indices.
    pub tri_vert: Vec<[usize; 3]>,
}

impl Partition {
    /// Index of the first strictly interior vertex in `vert_bary`.
    pub fn interior_offset(&self) -> usize {
        // 3 corners plus (n - 1) inserted verts per edge
        self.sorted_divisions.iter().sum()
    }

    /// Number of strictly interior vertices.
    pub fn num_interior(&self) -> usize {
        self.vert_bary.len() - self.interior_offset()
    }

    /// Fetch the partition for the given division counts, each at least
    /// one. The returned `idx` maps sorted slots back to input edges.
    pub fn get_partition(divisions: [usize; 3]) -> Partition {
        let mut sorted = divisions;
        let mut idx = [0usize, 1, 2];
        if sorted[2] > sorted[1] {
            sorted.swap(2, 1);
            idx.swap(2, 1);
        }
        if sorted[1] > sorted[0] {
            sorted.swap(1, 0);
            idx.swap(1, 0);
            if sorted[2] > sorted[1] {
                sorted.swap(2, 1);
                idx.swap(2, 1);
            }
        }

        let mut partition = Self::get_cached_partition(sorted);
        partition.idx = idx;
        partition
    }

    /// Translate this partition's local vertex indices into the global
    /// index space of one triangle.
    ///
    /// `tri` holds the triangle's corner verts, `edge_offsets` the global
    /// index of each edge's first inserted vert, `edge_fwd` whether the
    /// triangle's half-edge on each original edge is the forward one, and
    /// `interior_offset` where this triangle's interior verts begin.
    pub fn reindex(
        &self,
        tri: [usize; 3],
        edge_offsets: [usize; 3],
        edge_fwd: [bool; 3],
        interior_offset: usize,
    ) -> Vec<[usize; 3]> {
        let mut new_verts: Vec<usize> = Vec::with_capacity(self.vert_bary.len());
        let mut tri_idx = self.idx;
        let mut fwd = edge_fwd;
        let mut out_tri = [0usize, 1, 2];
        // a non-cyclic permutation mirrors the triangle; swap the output
        // winding and the walk directions to compensate
        if self.idx[1] != next3(self.idx[0]) {
            tri_idx = [self.idx[2], self.idx[0], self.idx[1]];
            fwd = [!edge_fwd[0], !edge_fwd[1], !edge_fwd[2]];
            out_tri.swap(0, 1);
        }
        for i in 0..3 {
            new_verts.push(tri[tri_idx[i]]);
        }
        for i in 0..3 {
            let n = self.sorted_divisions[i] - 1;
            let edge = self.idx[i];
            for j in 0..n {
                new_verts.push(if fwd[edge] {
                    edge_offsets[edge] + j
                } else {
                    edge_offsets[edge] + n - 1 - j
                });
            }
        }
        let boundary = new_verts.len();
        for i in boundary..self.vert_bary.len() {
            new_verts.push(interior_offset + i - boundary);
        }

        self.tri_vert
            .iter()
            .map(|tri_vert| {
                let mut out = [0usize; 3];
                for j in 0..3 {
                    out[out_tri[j]] = new_verts[tri_vert[j]];
                }
                out
            })
            .collect()
    }

    fn get_cached_partition(n: [usize; 3]) -> Partition {
        {
            let cache = PARTITION_CACHE.lock().unwrap();
            if let Some(cached) = cache.get(&n) {
                return cached.clone();
            }
        }
        let partition = Self::build(n);
        let mut cache = PARTITION_CACHE.lock().unwrap();
        cache.entry(n).or_insert(partition).clone()
    }

    /// Build the triangulation for sorted divisions `n[0] >= n[1] >= n[2]
    /// >= 1`.
    fn build(n: [usize; 3]) -> Partition {
        let mut vert_bary = vec![
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
            Vector3::new(0.0, 0.0, 1.0),
        ];
        for i in 0..3 {
            let from = vert_bary[i];
            let to = vert_bary[(i + 1) % 3];
            for j in 1..n[i] {
                vert_bary.push(from.lerp(&to, j as f64 / n[i] as f64));
            }
        }

        let (n0, n1, n2) = (n[0] as i32, n[1] as i32, n[2] as i32);
        let edge_offsets = [3, 3 + n0 - 1, 3 + n0 - 1 + n1 - 1];
        let mut tri_vert: Vec<[i32; 3]> = Vec::new();

        let f = (n2 * n2 + n0 * n0) as f64;
        if n1 == 1 {
            if n0 == 1 {
                tri_vert.push([0, 1, 2]);
            } else {
                partition_fan(&mut tri_vert, [0, 1, 2], n0 - 1, edge_offsets[0]);
            }
        } else if ((n1 * n1) as f64) > f - f64::sqrt(2.0) * (n0 * n2) as f64 {
            // acute-ish
            tri_vert.push([edge_offsets[1] - 1, 1, edge_offsets[1]]);
            partition_quad(
                &mut tri_vert,
                &mut vert_bary,
                [edge_offsets[1] - 1, edge_offsets[1], 2, 0],
                [-1, edge_offsets[1] + 1, edge_offsets[2], edge_offsets[0]],
                [0, n1 - 2, n2 - 1, n0 - 2],
                [true, true, true, true],
            );
        } else {
            // obtuse: split into two acute halves along a dropped vert line
            // from corner 2 to the longest edge
            let ns = i32::min(
                n0 - 2,
                ((f - (n1 * n1) as f64) / (2 * n0) as f64).round() as i32,
            );
            let nh = i32::max(
                1,
                (((n2 * n2 - ns * ns) as f64).sqrt()).round() as i32,
            );

            let h_offset = vert_bary.len() as i32;
            let middle_bary = vert_bary[(edge_offsets[0] + ns - 1) as usize];
            let corner2 = vert_bary[2];
            for j in 1..nh {
                vert_bary.push(corner2.lerp(&middle_bary, j as f64 / nh as f64));
            }

            tri_vert.push([edge_offsets[1] - 1, 1, edge_offsets[1]]);
            partition_quad(
                &mut tri_vert,
                &mut vert_bary,
                [edge_offsets[1] - 1, edge_offsets[1], 2, edge_offsets[0] + ns - 1],
                [-1, edge_offsets[1] + 1, h_offset, edge_offsets[0] + ns],
                [0, n1 - 2, nh - 1, n0 - ns - 2],
                [true, true, true, true],
            );

            if n2 == 1 {
                partition_fan(
                    &mut tri_vert,
                    [0, edge_offsets[0] + ns - 1, 2],
                    ns - 1,
                    edge_offsets[0],
                );
            } else if ns == 1 {
                tri_vert.push([h_offset, 2, edge_offsets[2]]);
                partition_quad(
                    &mut tri_vert,
                    &mut vert_bary,
                    [h_offset, edge_offsets[2], 0, edge_offsets[0]],
                    [-1, edge_offsets[2] + 1, -1, h_offset + nh - 2],
                    [0, n2 - 2, ns - 1, nh - 2],
                    [true, true, true, false],
                );
            } else {
                tri_vert.push([h_offset - 1, 0, edge_offsets[0]]);
                partition_quad(
                    &mut tri_vert,
                    &mut vert_bary,
                    [h_offset - 1, edge_offsets[0], edge_offsets[0] + ns - 1, 2],
                    [-1, edge_offsets[0] + 1, h_offset + nh - 2, edge_offsets[2]],
                    [0, ns - 2, nh - 1, n2 - 2],
                    [true, true, false, true],
                );
            }
        }

        Partition {
            idx: [0, 1, 2],
            sorted_divisions: n,
            vert_bary,
            tri_vert: tri_vert
                .iter()
                .map(|t| [t[0] as usize, t[1] as usize, t[2] as usize])
                .collect(),
        }
    }
}

/// Side 0 carries the added verts while sides 1 and 2 carry none; the fan
/// spreads from corner 2.
fn partition_fan(tri_vert: &mut Vec<[i32; 3]>, corner_verts: [i32; 3], added: i32, edge_offset: i32) {
    let mut last = corner_verts[0];
    for i in 0..added {
        let next = edge_offset + i;
        tri_vert.push([last, next, corner_verts[2]]);
        last = next;
    }
    tri_vert.push([last, corner_verts[1], corner_verts[2]]);
}

/// Recursive quad sub-triangulator. Strips run parallel to edge 0 unless
/// two consecutive edges carry no added verts, in which case the quad
/// terminates into a fan or a bowtie around the one occupied edge.
///
/// Local indices are signed: `-1` slots are placeholders that only ever
/// pair with zero-length edges and are never dereferenced.
fn partition_quad(
    tri_vert: &mut Vec<[i32; 3]>,
    vert_bary: &mut Vec<Vector3<f64>>,
    corner_verts: [i32; 4],
    edge_offsets: [i32; 4],
    edge_added: [i32; 4],
    edge_fwd: [bool; 4],
) {
    let get_edge_vert = |edge: usize, idx: i32| -> i32 {
        edge_offsets[edge] + if edge_fwd[edge] { idx } else { -idx }
    };

    assert!(
        edge_added.iter().all(|&added| added >= 0),
        "negative divisions!"
    );

    let mut corner: i32 = -1;
    let mut last = 3;
    let mut max_edge: i32 = -1;
    for i in 0..4 {
        if corner == -1 && edge_added[i] == 0 && edge_added[last] == 0 {
            corner = i as i32;
        }
        if edge_added[i] > 0 {
            max_edge = if max_edge == -1 { i as i32 } else { -2 };
        }
        last = i;
    }
    if corner >= 0 {
        // terminal triangulation
        let corner = corner as usize;
        if max_edge >= 0 {
            // bowtie anchored at the middle vert of the one occupied edge
            let max_edge = max_edge as usize;
            let edge = [
                max_edge,
                (max_edge + 1) % 4,
                (max_edge + 2) % 4,
                (max_edge + 3) % 4,
            ];
            let middle = edge_added[max_edge] / 2;
            tri_vert.push([
                corner_verts[edge[2]],
                corner_verts[edge[3]],
                get_edge_vert(max_edge, middle),
            ]);
            let mut last = corner_verts[edge[0]];
            for i in 0..=middle {
                let next = get_edge_vert(max_edge, i);
                tri_vert.push([corner_verts[edge[3]], last, next]);
                last = next;
            }
            last = corner_verts[edge[1]];
            let mut i = edge_added[max_edge] - 1;
            while i >= middle {
                let next = get_edge_vert(max_edge, i);
                tri_vert.push([corner_verts[edge[2]], next, last]);
                last = next;
                i -= 1;
            }
        } else {
            // fan from the empty corner
            let mut side_vert = corner_verts[0]; // initial value is unused
            for j in 1..=2usize {
                let side = (corner + j) % 4;
                if j == 2 && edge_added[side] > 0 {
                    tri_vert.push([corner_verts[side], get_edge_vert(side, 0), side_vert]);
                } else {
                    side_vert = corner_verts[side];
                }
                for i in 0..edge_added[side] {
                    let next_vert = get_edge_vert(side, i);
                    tri_vert.push([corner_verts[corner], side_vert, next_vert]);
                    side_vert = next_vert;
                }
                if j == 2 || edge_added[side] == 0 {
                    tri_vert.push([
                        corner_verts[corner],
                        side_vert,
                        corner_verts[(corner + j + 1) % 4],
                    ]);
                }
            }
        }
        return;
    }

    // recursively partition into strips parallel to edge 0
    let partitions = 1 + i32::min(edge_added[1], edge_added[3]);
    let mut new_corner_verts = [corner_verts[1], -1, -1, corner_verts[0]];
    let mut new_edge_offsets = [
        edge_offsets[1],
        -1,
        get_edge_vert(3, edge_added[3] + 1),
        edge_offsets[0],
    ];
    let mut new_edge_added = [0, -1, 0, edge_added[0]];
    let mut new_edge_fwd = [edge_fwd[1], true, edge_fwd[3], edge_fwd[0]];

    for i in 1..partitions {
        let corner_offset1 = (edge_added[1] * i) / partitions;
        let corner_offset3 = edge_added[3] - 1 - (edge_added[3] * i) / partitions;
        let next_offset1 = get_edge_vert(1, corner_offset1 + 1);
        let next_offset3 = get_edge_vert(3, corner_offset3 + 1);
        let added = mix(
            edge_added[0] as f64,
            edge_added[2] as f64,
            i as f64 / partitions as f64,
        )
        .round() as i32;

        new_corner_verts[1] = get_edge_vert(1, corner_offset1);
        new_corner_verts[2] = get_edge_vert(3, corner_offset3);
        new_edge_added[0] = (next_offset1 - new_edge_offsets[0]).abs() - 1;
        new_edge_added[1] = added;
        new_edge_added[2] = (next_offset3 - new_edge_offsets[2]).abs() - 1;
        new_edge_offsets[1] = vert_bary.len() as i32;
        new_edge_offsets[2] = next_offset3;

        let from = vert_bary[new_corner_verts[1] as usize];
        let to = vert_bary[new_corner_verts[2] as usize];
        for j in 0..added {
            vert_bary.push(from.lerp(&to, (j as f64 + 1.0) / (added as f64 + 1.0)));
        }

        partition_quad(
            tri_vert,
            vert_bary,
            new_corner_verts,
            new_edge_offsets,
            new_edge_added,
            new_edge_fwd,
        );

        new_corner_verts[0] = new_corner_verts[1];
        new_corner_verts[3] = new_corner_verts[2];
        new_edge_added[3] = new_edge_added[1];
        new_edge_offsets[0] = next_offset1;
        new_edge_offsets[3] = new_edge_offsets[1] + new_edge_added[1] - 1;
        new_edge_fwd[3] = false;
    }

    // the complementary quad up to edge 2
    new_corner_verts[1] = corner_verts[2];
    new_corner_verts[2] = corner_verts[3];
    new_edge_offsets[1] = edge_offsets[2];
    new_edge_added[0] = edge_added[1] - (new_edge_offsets[0] - edge_offsets[1]).abs();
    new_edge_added[1] = edge_added[2];
    new_edge_added[2] = (new_edge_offsets[2] - edge_offsets[3]).abs() - 1;
    new_edge_offsets[2] = edge_offsets[3];
    new_edge_fwd[1] = edge_fwd[2];

    partition_quad(
        tri_vert,
        vert_bary,
        new_corner_verts,
        new_edge_offsets,
        new_edge_added,
        new_edge_fwd,
    );
}
