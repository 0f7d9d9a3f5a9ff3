//! Precomputed fracture templates, one per source mesh.

use std::{collections::HashMap, sync::Arc};

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use na::Point3;

use model::TriMesh;

use crate::{
    config::DestructibleConfig,
    connectivity,
    error::{FractureError, Result},
    hierarchy::ClusterHierarchy,
    ids::{CellId, FractureId, MeshId},
    rng::FractureRng,
    voronoi::VoronoiDiagram,
};

/// Immutable once built. Instances share it through an `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct FractureData {
    pub id: FractureId,
    pub mesh: MeshId,
    pub diagram: VoronoiDiagram,
    pub hierarchy: ClusterHierarchy,
    /// Triangulated geometry of each cell, in source mesh space.
    pub cell_meshes: Vec<TriMesh>,
    pub config: DestructibleConfig,
}

impl FractureData {
    pub fn build(id: FractureId, mesh: MeshId, vertices: &[Point3<f32>], indices: &[u32], config: DestructibleConfig) -> Self {
        if config.use_gpu_fracture {
            warn!("GPU fracture is not available, fracturing mesh {} on the CPU.", mesh);
        }
        let mut rng = FractureRng::new(config.seed);
        let mut diagram = VoronoiDiagram::generate(vertices, &config, &mut rng);
        diagram.edges = connectivity::build(&mut diagram.cells, &diagram.bounds, config.use_delaunay_connectivity);
        let hierarchy = ClusterHierarchy::build(&diagram.cells, &config, &mut rng);
        let cell_meshes = diagram.cells.iter().map(|c| c.mesh()).collect();
        debug!(
            "Fractured mesh {} ({} triangles) into {} cells ({} degenerate, volume {}), {} edges, {} clusters.",
            mesh,
            indices.len() / 3,
            diagram.cells.len(),
            diagram.degenerate_count(),
            diagram.total_volume(),
            diagram.edges.len(),
            hierarchy.len(),
        );
        Self { id, mesh, diagram, hierarchy, cell_meshes, config }
    }

    pub fn cell_count(&self) -> usize {
        self.diagram.cells.len()
    }

    pub fn cell_mesh(&self, cell: CellId) -> Option<&TriMesh> {
        self.cell_meshes.get(cell.index())
    }
}

/// Owns every template and remembers which mesh each came from.
#[derive(Debug, Default)]
pub struct FractureDataStore {
    data: HashMap<FractureId, Arc<FractureData>>,
    by_mesh: HashMap<MeshId, FractureId>,
    last_id: u64,
}

impl FractureDataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fractures a mesh, or returns the cached template when this mesh was already fractured with
    /// an equal config. A different config rebuilds the template under the same id; instances
    /// made from the old one keep it alive.
    pub fn pre_fracture(&mut self, mesh: MeshId, vertices: &[Point3<f32>], indices: &[u32], config: DestructibleConfig) -> FractureId {
        let existing = self.for_mesh(mesh);
        if let Some(id) = existing {
            if self.data.get(&id).map_or(false, |d| d.config == config) {
                trace!("Reusing fracture {} for mesh {}.", id, mesh);
                return id;
            }
        }
        let id = existing.unwrap_or_else(|| {
            self.last_id += 1;
            FractureId(self.last_id)
        });
        let data = FractureData::build(id, mesh, vertices, indices, config);
        self.data.insert(id, Arc::new(data));
        self.by_mesh.insert(mesh, id);
        id
    }

    pub fn get(&self, id: FractureId) -> Result<&Arc<FractureData>> {
        self.data.get(&id).ok_or(FractureError::UnknownFracture(id))
    }

    pub fn for_mesh(&self, mesh: MeshId) -> Option<FractureId> {
        self.by_mesh.get(&mesh).copied()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
