//! Lifetime and culling of released pieces.

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use na::Point3;

use crate::{
    config::{DebrisSettings, DestructibleConfig},
    ids::{InstanceId, PieceId},
};

/// Detail band of a piece, by distance to the viewer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DebrisLod {
    Near,
    Mid,
    Far,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Debris {
    pub instance: InstanceId,
    pub piece: PieceId,
    /// Seconds left.
    pub lifetime: f32,
    pub volume: f32,
    pub position: Point3<f32>,
    pub sleeping: bool,
}

/// Why a debris record went away.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Expiry {
    Lifetime,
    Distance,
    Count,
}

#[derive(Debug)]
pub struct DebrisManager {
    settings: DebrisSettings,
    records: Vec<Debris>,
    viewer: Option<Point3<f32>>,
}

impl DebrisManager {
    pub fn new(settings: DebrisSettings) -> Self {
        Self {
            settings,
            records: vec![],
            viewer: None,
        }
    }

    pub fn settings(&self) -> &DebrisSettings {
        &self.settings
    }

    /// How long a piece of `volume` released from a template with `config` lives.
    pub fn lifetime_for(&self, config: &DestructibleConfig, volume: f32) -> f32 {
        let base = if config.debris_lifetime > 0. {
            config.debris_lifetime
        } else {
            self.settings.lifetime
        };
        if volume.max(0.).cbrt() < config.debris_min_size {
            base * self.settings.small_debris_lifetime_multiplier
        } else {
            base
        }
    }

    pub fn register(&mut self, instance: InstanceId, piece: PieceId, config: &DestructibleConfig, volume: f32, position: Point3<f32>) {
        let lifetime = self.lifetime_for(config, volume);
        self.insert(Debris {
            instance,
            piece,
            lifetime,
            volume,
            position,
            sleeping: false,
        });
    }

    /// Tracks a record as given, replacing any existing record for the same piece.
    pub fn insert(&mut self, debris: Debris) {
        self.records.retain(|d| !(d.instance == debris.instance && d.piece == debris.piece));
        self.records.push(debris);
    }

    pub fn get(&self, instance: InstanceId, piece: PieceId) -> Option<&Debris> {
        self.records.iter().find(|d| d.instance == instance && d.piece == piece)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Debris> {
        self.records.iter()
    }

    pub fn set_viewer(&mut self, viewer: Point3<f32>) {
        self.viewer = Some(viewer);
    }

    pub fn lod(&self, position: &Point3<f32>) -> DebrisLod {
        let d = self.viewer.map_or(0., |v| (position - v).norm());
        if d <= self.settings.near_lod_distance {
            DebrisLod::Near
        } else if d <= self.settings.mid_lod_distance {
            DebrisLod::Mid
        } else {
            DebrisLod::Far
        }
    }

    /// Follows the simulated body of a piece.
    pub fn sync(&mut self, instance: InstanceId, piece: PieceId, position: Point3<f32>, sleeping: bool) {
        if let Some(d) = self.records.iter_mut().find(|d| d.instance == instance && d.piece == piece) {
            d.position = position;
            d.sleeping = sleeping;
        }
    }

    /// Forgets every record of an instance without expiring it.
    pub fn remove_instance(&mut self, instance: InstanceId) -> Vec<Debris> {
        let (gone, kept): (Vec<Debris>, Vec<Debris>) = std::mem::take(&mut self.records).into_iter().partition(|d| d.instance == instance);
        self.records = kept;
        gone
    }

    /// Ages every record by `dt` and returns the ones that expired: out of lifetime, out of
    /// range of the viewer, or over the live count cap (least lifetime left first).
    pub fn update(&mut self, dt: f32) -> Vec<(Debris, Expiry)> {
        let mut expired = vec![];
        let despawn = self.settings.despawn_distance;
        let viewer = self.viewer;
        let mut kept = Vec::with_capacity(self.records.len());
        for mut d in std::mem::take(&mut self.records) {
            d.lifetime -= dt;
            if d.lifetime <= 0. {
                expired.push((d, Expiry::Lifetime));
            } else if viewer.map_or(false, |v| (d.position - v).norm() > despawn) {
                expired.push((d, Expiry::Distance));
            } else {
                kept.push(d);
            }
        }
        if kept.len() > self.settings.max_active {
            kept.sort_by(|a, b| b.lifetime.total_cmp(&a.lifetime));
            let over = kept.split_off(self.settings.max_active);
            expired.extend(over.into_iter().map(|d| (d, Expiry::Count)));
        }
        self.records = kept;
        for (d, why) in expired.iter() {
            debug!("Debris {}/{} expired ({:?}).", d.instance, d.piece, why);
        }
        expired
    }
}
