//! Structural bonds between neighbouring cells.

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use na::{Point3, Vector3};

use model::Aabb;

use crate::{ids::PieceId, voronoi::VoronoiCell};

/// Neighbour cutoff factor applied to `average extent / sqrt(cell count)`.
const NEIGHBOR_SCALE: f32 = 2.5;

#[derive(Debug, Clone, PartialEq)]
pub struct ConnectivityEdge {
    pub a: PieceId,
    pub b: PieceId,
    pub strength: f32,
    /// Approximate contact area.
    pub area: f32,
    pub contact_point: Point3<f32>,
    /// Points from `a` to `b`.
    pub contact_normal: Vector3<f32>,
    /// Flips once, never back.
    pub broken: bool,
}

impl ConnectivityEdge {
    fn between(a: &VoronoiCell, b: &VoronoiCell) -> Self {
        let r = a.volume.min(b.volume).cbrt() * 0.5;
        let axis = b.center - a.center;
        Self {
            a: a.id.into(),
            b: b.id.into(),
            strength: 1.,
            area: std::f32::consts::PI * r * r,
            contact_point: na::center(&a.center, &b.center),
            contact_normal: if axis.norm_squared() > 0. { axis.normalize() } else { Vector3::zeros() },
            broken: false,
        }
    }

    pub fn other(&self, piece: PieceId) -> Option<PieceId> {
        if self.a == piece {
            Some(self.b)
        } else if self.b == piece {
            Some(self.a)
        } else {
            None
        }
    }

    pub fn sever(&mut self) -> bool {
        let was_intact = !self.broken;
        self.broken = true;
        was_intact
    }
}

/// Distance cutoff used by the proximity graph.
pub fn neighbor_threshold(bounds: &Aabb, cell_count: usize) -> f32 {
    if cell_count == 0 {
        return 0.;
    }
    let e = bounds.extent();
    (e.x + e.y + e.z) / 3. / (cell_count as f32).sqrt() * NEIGHBOR_SCALE
}

/// Connects every pair of sites closer than `neighbor_threshold`.
pub fn proximity_edges(cells: &[VoronoiCell], bounds: &Aabb) -> Vec<(usize, usize)> {
    let threshold = neighbor_threshold(bounds, cells.len());
    let mut pairs = vec![];
    for i in 0..cells.len() {
        for j in i + 1..cells.len() {
            if (cells[i].center - cells[j].center).norm() < threshold {
                pairs.push((i, j));
            }
        }
    }
    pairs
}

/// Gabriel graph of the sites: `i` and `j` are joined when no third site lies strictly inside
/// the sphere with diameter `ij`. Every Gabriel edge is also a Delaunay edge.
pub fn gabriel_edges(cells: &[VoronoiCell]) -> Vec<(usize, usize)> {
    let mut pairs = vec![];
    for i in 0..cells.len() {
        for j in i + 1..cells.len() {
            let mid = na::center(&cells[i].center, &cells[j].center);
            let r_sq = (cells[i].center - mid).norm_squared();
            let blocked = cells
                .iter()
                .enumerate()
                .any(|(k, c)| k != i && k != j && (c.center - mid).norm_squared() < r_sq);
            if !blocked {
                pairs.push((i, j));
            }
        }
    }
    pairs
}

/// Builds the edges and records neighbours on both cells.
pub fn build(cells: &mut [VoronoiCell], bounds: &Aabb, use_delaunay: bool) -> Vec<ConnectivityEdge> {
    let pairs = if use_delaunay { gabriel_edges(cells) } else { proximity_edges(cells, bounds) };
    for c in cells.iter_mut() {
        c.neighbors.clear();
    }
    pairs
        .into_iter()
        .map(|(i, j)| {
            let (bi, bj) = (cells[i].id, cells[j].id);
            cells[i].neighbors.push(bj);
            cells[j].neighbors.push(bi);
            ConnectivityEdge::between(&cells[i], &cells[j])
        })
        .collect()
}
