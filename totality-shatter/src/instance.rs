//! Per-placement mutable state built from a shared template.

use std::sync::Arc;

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use na::{Matrix4, Point3, Translation3, UnitQuaternion, Vector3};

use model::{AffineTransform, Aabb, TriMesh};
use totality_sim::BodyHandle;

use crate::{
    breaking::PendingBreak,
    connectivity::ConnectivityEdge,
    hierarchy::{ClusterHierarchy, ClusterNode},
    ids::{CellId, ClusterId, FractureId, InstanceId, PieceId},
    rng::FractureRng,
    store::FractureData,
};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PieceState {
    Intact,
    /// Over threshold, waiting for the next break pass.
    PendingBreak,
    Released,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FracturePiece {
    pub id: PieceId,
    pub cells: Vec<CellId>,
    /// World position of the piece's centroid.
    pub position: Point3<f32>,
    pub rotation: UnitQuaternion<f32>,
    pub velocity: Vector3<f32>,
    pub angular_velocity: Vector3<f32>,
    pub mass: f32,
    /// Principal moments of inertia.
    pub inertia: Vector3<f32>,
    /// Piece geometry relative to `position`, scaled but not rotated.
    pub local_points: Vec<Point3<f32>>,
    pub state: PieceState,
    /// False once released debris has expired.
    pub is_active: bool,
    pub strain: f32,
    pub strain_threshold: f32,
    pub body: Option<BodyHandle>,
    pub sleeping: bool,
}

impl FracturePiece {
    pub fn is_released(&self) -> bool {
        self.state == PieceState::Released
    }

    pub fn is_intact(&self) -> bool {
        self.state == PieceState::Intact
    }

    pub fn size(&self) -> f32 {
        self.mass.max(0.).cbrt()
    }

    /// Maps local piece geometry into the world.
    pub fn transform(&self) -> AffineTransform {
        AffineTransform::new(self.position.coords, self.rotation, Vector3::repeat(1.))
    }

    fn box_inertia(mass: f32, points: &[Point3<f32>]) -> Vector3<f32> {
        let e = Aabb::from_points(points).map_or(Vector3::zeros(), |b| b.extent());
        let (x, y, z) = (e.x * e.x, e.y * e.y, e.z * e.z);
        Vector3::new(y + z, x + z, x + y) * (mass / 12.)
    }
}

#[derive(Debug, Clone)]
pub struct DestructibleInstance {
    pub id: InstanceId,
    pub fracture: Arc<FractureData>,
    pub transform: AffineTransform,
    pub pieces: Vec<FracturePiece>,
    pub edges: Vec<ConnectivityEdge>,
    pub clusters: Vec<ClusterNode>,
    pub is_destroyed: bool,
    pub total_strain: f32,
    pub bounding_center: Point3<f32>,
    pub bounding_radius: f32,
}

impl DestructibleInstance {
    /// Places a template. Piece thresholds are rolled again so that two placements of one
    /// template break differently.
    pub fn new(id: InstanceId, fracture: Arc<FractureData>, transform: AffineTransform, rng: &mut FractureRng) -> Self {
        let config = &fracture.config;
        let scale = transform.volume_scale();
        let pieces: Vec<FracturePiece> = fracture
            .diagram
            .cells
            .iter()
            .map(|cell| {
                let local_points: Vec<_> = cell
                    .vertices()
                    .iter()
                    .map(|v| Point3::from((v - cell.centroid).component_mul(&transform.scaling)))
                    .collect();
                let mass = cell.mass * scale;
                FracturePiece {
                    id: cell.id.into(),
                    cells: vec![cell.id],
                    position: transform.transform_point(&cell.centroid),
                    rotation: transform.ori,
                    velocity: Vector3::zeros(),
                    angular_velocity: Vector3::zeros(),
                    mass,
                    inertia: FracturePiece::box_inertia(mass, &local_points),
                    local_points,
                    state: PieceState::Intact,
                    is_active: true,
                    strain: 0.,
                    strain_threshold: rng.threshold(config.base_strain_threshold, config.strain_variance),
                    body: None,
                    sleeping: false,
                }
            })
            .collect();

        let edges = fracture
            .diagram
            .edges
            .iter()
            .map(|e| ConnectivityEdge {
                strength: e.strength * config.connection_strength,
                ..e.clone()
            })
            .collect();

        let mut clusters = fracture.hierarchy.nodes.clone();
        for (leaf, piece) in clusters.iter_mut().zip(pieces.iter()) {
            leaf.break_threshold = piece.strain_threshold;
        }

        let bounding_center = transform.transform_point(&fracture.diagram.bounds.center());
        let bounding_radius = fracture
            .diagram
            .bounds
            .corners()
            .iter()
            .map(|c| (transform.transform_point(c) - bounding_center).norm())
            .fold(0., f32::max);

        Self {
            id,
            transform,
            pieces,
            edges,
            clusters,
            is_destroyed: fracture.cell_count() == 0,
            total_strain: 0.,
            bounding_center,
            bounding_radius,
            fracture,
        }
    }

    pub fn fracture_id(&self) -> FractureId {
        self.fracture.id
    }

    pub fn piece(&self, id: PieceId) -> Option<&FracturePiece> {
        self.pieces.get(id.index())
    }

    pub fn piece_mut(&mut self, id: PieceId) -> Option<&mut FracturePiece> {
        self.pieces.get_mut(id.index())
    }

    /// Adds strain to an unreleased piece and everything above it in the hierarchy, queueing
    /// pieces that go over their threshold. Returns whether `piece` itself went over this call.
    pub fn accumulate_strain(&mut self, piece: PieceId, delta: f32, pending: &mut Vec<PendingBreak>) -> bool {
        let idx = piece.index();
        let p = match self.pieces.get_mut(idx) {
            Some(p) if !p.is_released() && delta > 0. => p,
            _ => return false,
        };
        let before = p.strain;
        p.strain += delta;
        self.total_strain += delta;
        trace!("Instance {} piece {}: strain {} -> {}.", self.id, piece, before, p.strain);

        let absorbed = delta.min((p.strain_threshold - before).max(0.));
        let crossed = p.is_intact() && p.strain >= p.strain_threshold;
        if crossed {
            p.state = PieceState::PendingBreak;
            pending.push(PendingBreak {
                instance: self.id,
                piece,
                strain: p.strain,
            });
        }

        let leaf = ClusterId(piece.0);
        if let Some(node) = self.clusters.get_mut(leaf.index()) {
            node.total_strain += delta;
            node.is_broken |= node.total_strain >= node.break_threshold;
        }
        let ancestors: Vec<ClusterId> = ClusterHierarchy::ancestors(&self.clusters, leaf).collect();
        for a in ancestors {
            let node = &mut self.clusters[a.index()];
            node.total_strain += absorbed;
            if !node.is_broken && node.total_strain >= node.break_threshold {
                node.is_broken = true;
                debug!("Instance {}: cluster {} broke at strain {}.", self.id, a, node.total_strain);
                let cells = node.cells.clone();
                self.release_cluster(&cells, pending);
            }
        }
        crossed
    }

    /// Queues every still-intact piece covered by a broken cluster.
    fn release_cluster(&mut self, cells: &[CellId], pending: &mut Vec<PendingBreak>) {
        for cell in cells {
            if let Some(p) = self.pieces.get_mut(cell.index()) {
                if p.is_intact() {
                    p.state = PieceState::PendingBreak;
                    pending.push(PendingBreak {
                        instance: self.id,
                        piece: p.id,
                        strain: p.strain,
                    });
                }
            }
        }
    }

    /// Pieces still part of the object, whether or not they are queued to break.
    pub fn attached_pieces(&self) -> impl Iterator<Item = &FracturePiece> {
        self.pieces.iter().filter(|p| !p.is_released())
    }

    pub fn all_released(&self) -> bool {
        self.pieces.iter().all(|p| p.is_released())
    }

    /// World-space geometry of one piece, following its simulated pose once released.
    pub fn piece_mesh(&self, id: PieceId) -> Option<TriMesh> {
        let piece = self.piece(id)?;
        let cell_mesh = self.fracture.cell_mesh(id.into())?;
        let t = piece.transform();
        Some(TriMesh::new(
            piece.local_points.iter().map(|p| t.transform_point(p)).collect(),
            cell_mesh.indices.clone(),
        ))
    }

    /// Model matrix for each active piece, mapping the template cell mesh into the world.
    pub fn active_transforms(&self) -> Vec<Matrix4<f32>> {
        self.pieces
            .iter()
            .filter(|p| p.is_active)
            .map(|p| {
                let centroid = self.fracture.diagram.cells[p.id.index()].centroid;
                let placed = AffineTransform::new(p.position.coords, p.rotation, self.transform.scaling);
                placed.mat() * Translation3::from(-centroid.coords).to_homogeneous()
            })
            .collect()
    }
}
