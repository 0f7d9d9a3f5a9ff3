//! Splits a mesh's bounding box into one convex cell per site.

mod polyhedron;
pub mod sites;

pub use polyhedron::{ClipOutcome, ConvexPolyhedron};

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use na::Point3;

use model::{Aabb, TriMesh};

use crate::{config::DestructibleConfig, connectivity::ConnectivityEdge, ids::CellId, rng::FractureRng};

/// One fracture fragment. Immutable once the diagram is built.
#[derive(Debug, Clone, PartialEq)]
pub struct VoronoiCell {
    pub id: CellId,
    /// The generating site.
    pub center: Point3<f32>,
    pub polyhedron: ConvexPolyhedron,
    pub volume: f32,
    /// Unit density, so equal to `volume`.
    pub mass: f32,
    pub centroid: Point3<f32>,
    pub neighbors: Vec<CellId>,
    /// Clipping collapsed the cell below four vertices.
    pub degenerate: bool,
}

impl VoronoiCell {
    pub fn vertices(&self) -> &[Point3<f32>] {
        &self.polyhedron.vertices
    }

    pub fn mesh(&self) -> TriMesh {
        self.polyhedron.triangulate()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VoronoiDiagram {
    pub cells: Vec<VoronoiCell>,
    /// Filled in by connectivity.
    pub edges: Vec<ConnectivityEdge>,
    pub bounds: Aabb,
}

impl VoronoiDiagram {
    pub fn empty(bounds: Aabb) -> Self {
        Self { cells: vec![], edges: vec![], bounds }
    }

    /// Builds cells for a mesh whose vertices are `vertices`. Sites come from the config's site
    /// strategy; bounds are the vertices' box, slightly padded.
    pub fn generate(vertices: &[Point3<f32>], config: &DestructibleConfig, rng: &mut FractureRng) -> Self {
        let bounds = match Aabb::from_points(vertices) {
            Some(b) => {
                let pad = (b.extent().max() * 1e-3).max(1e-4);
                b.padded(pad)
            }
            None => return Self::empty(Aabb::new(Point3::origin(), Point3::origin())),
        };
        if config.voronoi_cell_count == 0 {
            return Self::empty(bounds);
        }
        let mut sites = if config.use_clustered_sites {
            sites::clustered_sites(&bounds, config.voronoi_cell_count, config.cell_size_variance, rng)
        } else {
            let mut sites = sites::uniform_sites(&bounds, config.voronoi_cell_count, config.min_cell_size, rng);
            sites::lloyd_relax(&mut sites, &bounds, sites::LLOYD_ITERATIONS, sites::LLOYD_RESOLUTION);
            sites
        };
        for s in sites.iter_mut() {
            *s = bounds.clamp(s);
        }
        Self::from_sites(&sites, bounds)
    }

    /// One cell per site, each the bounding box clipped by the bisectors to every other site.
    pub fn from_sites(sites: &[Point3<f32>], bounds: Aabb) -> Self {
        let eps = bounds.extent().max() * 1e-5;
        let cells: Vec<_> = sites
            .iter()
            .enumerate()
            .map(|(i, site)| {
                let mut polyhedron = ConvexPolyhedron::from_aabb(&bounds);
                let mut degenerate = false;
                for (j, other) in sites.iter().enumerate() {
                    if i == j {
                        continue;
                    }
                    let axis = other - site;
                    if axis.norm_squared() <= f32::EPSILON * f32::EPSILON {
                        trace!("Sites {} and {} coincide, skipping their bisector.", i, j);
                        continue;
                    }
                    let mid = na::center(site, other);
                    if polyhedron.clip(&mid, &axis.normalize(), eps) == ClipOutcome::Degenerate {
                        degenerate = true;
                        break;
                    }
                }
                let (volume, centroid) = if degenerate {
                    (0., polyhedron.vertex_mean())
                } else {
                    polyhedron.volume_and_centroid()
                };
                VoronoiCell {
                    id: CellId(i as u32),
                    center: *site,
                    polyhedron,
                    volume,
                    mass: volume,
                    centroid: centroid.unwrap_or(*site),
                    neighbors: vec![],
                    degenerate,
                }
            })
            .collect();
        Self { cells, edges: vec![], bounds }
    }

    pub fn degenerate_count(&self) -> usize {
        self.cells.iter().filter(|c| c.degenerate).count()
    }

    pub fn total_volume(&self) -> f32 {
        self.cells.iter().map(|c| c.volume).sum()
    }
}
