//! Coarse grid over the ground plane for radius queries.

use std::collections::HashMap;

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use na::Point3;

use crate::ids::InstanceId;

type CellKey = (i32, i32);

#[derive(Debug)]
pub struct SpatialIndex {
    cell_size: f32,
    buckets: HashMap<CellKey, Vec<InstanceId>>,
    /// Bounding sphere of everything indexed.
    spheres: HashMap<InstanceId, (Point3<f32>, f32)>,
}

impl SpatialIndex {
    pub fn new(cell_size: f32) -> Self {
        let cell_size = if cell_size > 0. && cell_size.is_finite() {
            cell_size
        } else {
            warn!("Spatial cell size {} is unusable, using 10.", cell_size);
            10.
        };
        Self {
            cell_size,
            buckets: HashMap::new(),
            spheres: HashMap::new(),
        }
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    fn key(&self, x: f32, z: f32) -> CellKey {
        ((x / self.cell_size).floor() as i32, (z / self.cell_size).floor() as i32)
    }

    /// Inclusive key range covered by a circle on the xz plane.
    fn key_range(&self, center: &Point3<f32>, radius: f32) -> (CellKey, CellKey) {
        (
            self.key(center.x - radius, center.z - radius),
            self.key(center.x + radius, center.z + radius),
        )
    }

    fn keys(lo: CellKey, hi: CellKey) -> impl Iterator<Item = CellKey> {
        (lo.0..=hi.0).flat_map(move |x| (lo.1..=hi.1).map(move |z| (x, z)))
    }

    pub fn insert(&mut self, id: InstanceId, center: Point3<f32>, radius: f32) {
        self.remove(id);
        let (lo, hi) = self.key_range(&center, radius);
        for key in Self::keys(lo, hi) {
            self.buckets.entry(key).or_default().push(id);
        }
        self.spheres.insert(id, (center, radius));
    }

    pub fn remove(&mut self, id: InstanceId) -> bool {
        let (center, radius) = match self.spheres.remove(&id) {
            Some(s) => s,
            None => return false,
        };
        let (lo, hi) = self.key_range(&center, radius);
        for key in Self::keys(lo, hi) {
            if let Some(bucket) = self.buckets.get_mut(&key) {
                bucket.retain(|i| *i != id);
                if bucket.is_empty() {
                    self.buckets.remove(&key);
                }
            }
        }
        true
    }

    pub fn contains(&self, id: InstanceId) -> bool {
        self.spheres.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.spheres.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spheres.is_empty()
    }

    /// Instances whose bounding sphere reaches within `radius` of `center`, sorted by id.
    pub fn query(&self, center: &Point3<f32>, radius: f32) -> Vec<InstanceId> {
        if radius < 0. || !radius.is_finite() {
            return vec![];
        }
        let (lo, hi) = self.key_range(center, radius);
        let span = (hi.0 as i64 - lo.0 as i64 + 1) * (hi.1 as i64 - lo.1 as i64 + 1);
        let mut found: Vec<InstanceId> = if span as usize > self.buckets.len() {
            self.spheres.keys().copied().collect()
        } else {
            Self::keys(lo, hi)
                .filter_map(|k| self.buckets.get(&k))
                .flatten()
                .copied()
                .collect()
        };
        found.sort_unstable();
        found.dedup();
        found.retain(|id| {
            self.spheres
                .get(id)
                .map_or(false, |(c, r)| (c - center).norm() <= radius + r)
        });
        found
    }
}
