/// How a mesh is fractured and how its pieces respond to damage. One per fracture template.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize), serde(default))]
pub struct DestructibleConfig {
    /// Number of Voronoi sites, and so of pieces.
    pub voronoi_cell_count: usize,
    /// Uniform sites closer than this to an earlier site are re-rolled.
    pub min_cell_size: f32,
    /// Spread of clustered sites around their cluster center.
    pub cell_size_variance: f32,
    pub use_clustered_sites: bool,

    pub base_strain_threshold: f32,
    /// Relative spread of per-piece thresholds around `base_strain_threshold`.
    pub strain_variance: f32,
    /// Scales point damage.
    pub impact_multiplier: f32,
    /// Scales the strength of every connectivity edge.
    pub connection_strength: f32,
    /// Connect sites by their Gabriel graph instead of a distance cutoff.
    pub use_delaunay_connectivity: bool,

    pub hierarchy_levels: usize,
    pub cluster_radius: f32,

    /// Seconds a released piece lives. Non-positive defers to `DebrisSettings::lifetime`.
    pub debris_lifetime: f32,
    /// Pieces whose size (cube root of volume) is below this count as small debris.
    pub debris_min_size: f32,
    pub enable_debris_collision: bool,
    /// Unsupported, fracture always runs on the CPU.
    pub use_gpu_fracture: bool,

    /// Fixed seed for reproducible fracture patterns.
    pub seed: Option<u64>,
}

impl Default for DestructibleConfig {
    fn default() -> Self {
        Self {
            voronoi_cell_count: 50,
            min_cell_size: 0.1,
            cell_size_variance: 0.3,
            use_clustered_sites: false,
            base_strain_threshold: 100.,
            strain_variance: 0.2,
            impact_multiplier: 1.,
            connection_strength: 1.,
            use_delaunay_connectivity: false,
            hierarchy_levels: 3,
            cluster_radius: 2.,
            debris_lifetime: 10.,
            debris_min_size: 0.05,
            enable_debris_collision: true,
            use_gpu_fracture: false,
            seed: None,
        }
    }
}

/// Engine-wide debris policy.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize), serde(default))]
pub struct DebrisSettings {
    pub lifetime: f32,
    /// Debris further than this from the viewer is removed.
    pub despawn_distance: f32,
    pub near_lod_distance: f32,
    pub mid_lod_distance: f32,
    /// Beyond this many live debris, the ones closest to expiring go first.
    pub max_active: usize,
    pub small_debris_lifetime_multiplier: f32,
    /// Below this speed a released piece counts as asleep.
    pub sleep_speed: f32,
}

impl Default for DebrisSettings {
    fn default() -> Self {
        Self {
            lifetime: 10.,
            despawn_distance: 100.,
            near_lod_distance: 20.,
            mid_lod_distance: 50.,
            max_active: 256,
            small_debris_lifetime_multiplier: 0.5,
            sleep_speed: 0.05,
        }
    }
}

/// When a moving character counts as crashing through a destructible.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize), serde(default))]
pub struct CollisionSettings {
    pub min_speed: f32,
    pub character_mass: f32,
}

impl Default for CollisionSettings {
    fn default() -> Self {
        Self {
            min_speed: 15.,
            character_mass: 80.,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize), serde(default))]
pub struct EngineSettings {
    /// Edge length of a spatial index bucket.
    pub spatial_cell_size: f32,
    pub debris: DebrisSettings,
    pub collision: CollisionSettings,
    /// Seed for per-instance threshold rolls.
    pub seed: Option<u64>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            spatial_cell_size: 10.,
            debris: DebrisSettings::default(),
            collision: CollisionSettings::default(),
            seed: None,
        }
    }
}
