//! Precomputed Voronoi fracture and progressive destruction.
//!
//! A mesh is fractured once into a `FractureData` template (cells, bonds between them and a
//! cluster hierarchy). Templates are placed as `DestructibleInstance`s, which accumulate strain
//! from impacts, explosions and characters crashing through them, and shed pieces as debris
//! once pieces or whole clusters go over their thresholds. `FractureEngine` ties it together.

extern crate nalgebra as na;
extern crate totality_model as model;

pub mod breaking;
pub mod config;
pub mod connectivity;
pub mod damage;
pub mod debris;
pub mod engine;
pub mod error;
pub mod hierarchy;
pub mod ids;
pub mod instance;
pub mod rng;
pub mod spatial;
pub mod store;
pub mod voronoi;

pub use breaking::PendingBreak;
pub use config::{CollisionSettings, DebrisSettings, DestructibleConfig, EngineSettings};
pub use connectivity::ConnectivityEdge;
pub use debris::{Debris, DebrisLod, DebrisManager};
pub use engine::{DestructionFn, FractureEngine, HighSpeedFn};
pub use error::{FractureError, Result};
pub use hierarchy::{ClusterHierarchy, ClusterNode};
pub use ids::{CellId, ClusterId, FractureId, InstanceId, MeshId, PieceId};
pub use instance::{DestructibleInstance, FracturePiece, PieceState};
pub use spatial::SpatialIndex;
pub use store::{FractureData, FractureDataStore};
pub use voronoi::{VoronoiCell, VoronoiDiagram};
