//! The public face of fracture: templates in, destructibles out, damage in, debris out.
//!
//! Everything here runs on one thread. The only thing that leaves it is body creation and
//! destruction, which goes through the `PhysicsAdapter` handed to `FractureEngine::new`.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use na::{Matrix4, Point3, UnitQuaternion, Vector3};

use model::{AffineTransform, TriMesh};
use totality_sim::{BodyHandle, BodyState, PhysicsAdapter};

use crate::{
    breaking::{self, PendingBreak},
    config::{DestructibleConfig, EngineSettings},
    damage,
    debris::{DebrisLod, DebrisManager},
    error::{FractureError, Result},
    ids::{FractureId, InstanceId, MeshId, PieceId},
    instance::DestructibleInstance,
    rng::FractureRng,
    spatial::SpatialIndex,
    store::{FractureData, FractureDataStore},
};

/// Called with the pieces a break pass released, whenever it released any.
pub trait DestructionFn: FnMut(InstanceId, &[PieceId]) + Send + 'static {}
impl<F: FnMut(InstanceId, &[PieceId]) + Send + 'static> DestructionFn for F {}

/// Called with the impact point and force of a character crashing into a destructible.
pub trait HighSpeedFn: FnMut(InstanceId, Point3<f32>, f32) + Send + 'static {}
impl<F: FnMut(InstanceId, Point3<f32>, f32) + Send + 'static> HighSpeedFn for F {}

pub struct FractureEngine {
    settings: EngineSettings,
    store: FractureDataStore,
    instances: BTreeMap<InstanceId, DestructibleInstance>,
    last_instance: u64,
    pending: HashMap<InstanceId, Vec<PendingBreak>>,
    debris: DebrisManager,
    spatial: SpatialIndex,
    physics: Box<dyn PhysicsAdapter>,
    rng: FractureRng,
    on_destruction: Option<Box<dyn DestructionFn>>,
    on_high_speed: Option<Box<dyn HighSpeedFn>>,
}

impl FractureEngine {
    pub fn new(settings: EngineSettings, physics: Box<dyn PhysicsAdapter>) -> Self {
        let spatial = SpatialIndex::new(settings.spatial_cell_size);
        debug!("Spatial index buckets are {} units wide.", spatial.cell_size());
        Self {
            store: FractureDataStore::new(),
            instances: BTreeMap::new(),
            last_instance: 0,
            pending: HashMap::new(),
            debris: DebrisManager::new(settings.debris.clone()),
            spatial,
            physics,
            rng: FractureRng::new(settings.seed),
            on_destruction: None,
            on_high_speed: None,
            settings,
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn pre_fracture(&mut self, mesh: MeshId, vertices: &[Point3<f32>], indices: &[u32], config: DestructibleConfig) -> FractureId {
        self.store.pre_fracture(mesh, vertices, indices, config)
    }

    pub fn fracture_data(&self, id: FractureId) -> Option<&Arc<FractureData>> {
        self.store.get(id).ok()
    }

    /// Places a template, returning `InstanceId::NONE` when there is no such template.
    pub fn create_instance(&mut self, fracture: FractureId, position: Point3<f32>, rotation: UnitQuaternion<f32>, scale: Vector3<f32>) -> InstanceId {
        match self.try_create_instance(fracture, position, rotation, scale) {
            Ok(id) => id,
            Err(e) => {
                debug!("Not creating instance: {}", e);
                InstanceId::NONE
            }
        }
    }

    pub fn try_create_instance(&mut self, fracture: FractureId, position: Point3<f32>, rotation: UnitQuaternion<f32>, scale: Vector3<f32>) -> Result<InstanceId> {
        let data = Arc::clone(self.store.get(fracture)?);
        self.last_instance += 1;
        let id = InstanceId(self.last_instance);
        let transform = AffineTransform::new(position.coords, rotation, scale);
        let instance = DestructibleInstance::new(id, data, transform, &mut self.rng);
        if !instance.is_destroyed {
            self.spatial.insert(id, instance.bounding_center, instance.bounding_radius);
        }
        trace!("Created instance {} of fracture {} with {} pieces.", id, fracture, instance.pieces.len());
        self.instances.insert(id, instance);
        Ok(id)
    }

    pub fn instance(&self, id: InstanceId) -> Option<&DestructibleInstance> {
        self.instances.get(&id)
    }

    pub fn try_instance(&self, id: InstanceId) -> Result<&DestructibleInstance> {
        self.instances.get(&id).ok_or(FractureError::UnknownInstance(id))
    }

    pub fn instance_ids(&self) -> impl Iterator<Item = InstanceId> + '_ {
        self.instances.keys().copied()
    }

    /// Breaks queued against an instance and not yet processed.
    pub fn pending_breaks(&self, id: InstanceId) -> &[PendingBreak] {
        self.pending.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn debris(&self) -> &DebrisManager {
        &self.debris
    }

    pub fn set_destruction_callback<F: DestructionFn>(&mut self, f: F) {
        self.on_destruction = Some(Box::new(f));
    }

    pub fn set_high_speed_collision_callback<F: HighSpeedFn>(&mut self, f: F) {
        self.on_high_speed = Some(Box::new(f));
    }

    /// Point damage followed by a break pass. Returns whether any piece was released.
    pub fn apply_damage(&mut self, id: InstanceId, point: Point3<f32>, direction: Vector3<f32>, magnitude: f32) -> bool {
        let instance = match self.instances.get_mut(&id) {
            Some(i) => i,
            None => {
                debug!("Damage to unknown instance {}.", id);
                return false;
            }
        };
        let pending = self.pending.entry(id).or_default();
        damage::apply_point(instance, &point, &direction, magnitude, pending);
        !self.process_breaking(id).is_empty()
    }

    /// Explosion against every live instance in range, followed by a break pass on each one hit.
    pub fn apply_explosion(&mut self, center: Point3<f32>, radius: f32, force: f32) -> bool {
        if radius <= 0. {
            return false;
        }
        let hit = self.spatial.query(&center, radius);
        for id in hit.iter() {
            if let Some(instance) = self.instances.get_mut(id).filter(|i| !i.is_destroyed) {
                let pending = self.pending.entry(*id).or_default();
                damage::apply_explosion(instance, &center, radius, force, pending);
            }
        }
        let mut any_broke = false;
        for id in hit {
            any_broke |= !self.process_breaking(id).is_empty();
        }
        any_broke
    }

    /// A character at `position` moving at `velocity` runs into an instance. Below the configured
    /// minimum speed nothing happens; otherwise the kinetic energy lands as point damage on the
    /// nearest piece still attached.
    pub fn apply_high_speed_collision(&mut self, id: InstanceId, position: Point3<f32>, velocity: Vector3<f32>) -> bool {
        let impact = match self.instances.get(&id) {
            Some(instance) => damage::high_speed_impact(instance, &position, &velocity, &self.settings.collision),
            None => {
                debug!("Collision with unknown instance {}.", id);
                return false;
            }
        };
        let (point, force) = match impact {
            Some(i) => i,
            None => return false,
        };
        trace!("High speed collision with {} at {:?}, force {}.", id, point, force);
        if let Some(cb) = self.on_high_speed.as_mut() {
            cb(id, point, force);
        }
        self.apply_damage(id, point, velocity, force)
    }

    /// Releases every piece queued against `id`, highest strain first, and reports them to the
    /// destruction callback.
    pub fn process_breaking(&mut self, id: InstanceId) -> Vec<PieceId> {
        let pending = self.pending.remove(&id).unwrap_or_default();
        let instance = match self.instances.get_mut(&id) {
            Some(i) => i,
            None => return vec![],
        };
        if pending.is_empty() {
            return vec![];
        }
        let broken = breaking::process(instance, pending, self.physics.as_mut(), &mut self.debris);
        if instance.is_destroyed {
            self.spatial.remove(id);
        }
        if !broken.is_empty() {
            if let Some(cb) = self.on_destruction.as_mut() {
                cb(id, &broken);
            }
        }
        broken
    }

    /// Ages debris. Expired pieces go inactive and lose their bodies.
    pub fn update(&mut self, dt: f32) {
        for (debris, _) in self.debris.update(dt) {
            let piece = self
                .instances
                .get_mut(&debris.instance)
                .and_then(|i| i.piece_mut(debris.piece));
            if let Some(piece) = piece {
                piece.is_active = false;
                if let Some(body) = piece.body.take() {
                    self.physics.destroy_body(body);
                }
            }
        }
    }

    pub fn set_viewer_position(&mut self, viewer: Point3<f32>) {
        self.debris.set_viewer(viewer);
    }

    pub fn debris_lod(&self, id: InstanceId, piece: PieceId) -> Option<DebrisLod> {
        let piece = self.instances.get(&id)?.piece(piece)?;
        Some(self.debris.lod(&piece.position))
    }

    /// Copies a simulated body's state onto its released piece.
    pub fn sync_piece_state(&mut self, id: InstanceId, piece: PieceId, state: &BodyState) -> bool {
        let sleep_speed = self.debris.settings().sleep_speed;
        let p = match self.instances.get_mut(&id).and_then(|i| i.piece_mut(piece)) {
            Some(p) if p.is_released() && p.is_active => p,
            _ => return false,
        };
        p.position = state.position;
        p.rotation = state.rotation;
        p.velocity = state.velocity;
        p.angular_velocity = state.angular_velocity;
        p.sleeping = state.sleeping || state.velocity.norm() < sleep_speed;
        self.debris.sync(id, piece, p.position, p.sleeping);
        true
    }

    /// Every live body owned by a released piece.
    pub fn released_bodies(&self) -> Vec<(InstanceId, PieceId, BodyHandle)> {
        self.instances
            .values()
            .flat_map(|i| i.pieces.iter().filter_map(move |p| p.body.map(|b| (i.id, p.id, b))))
            .collect()
    }

    /// World-space geometry of a piece; empty when either id is unknown.
    pub fn get_piece_mesh(&self, id: InstanceId, piece: PieceId) -> TriMesh {
        self.piece_mesh(id, piece).unwrap_or_else(|e| {
            debug!("No mesh: {}", e);
            TriMesh::default()
        })
    }

    pub fn piece_mesh(&self, id: InstanceId, piece: PieceId) -> Result<TriMesh> {
        self.try_instance(id)?
            .piece_mesh(piece)
            .ok_or(FractureError::UnknownPiece(id, piece))
    }

    pub fn get_active_transforms(&self, id: InstanceId) -> Vec<Matrix4<f32>> {
        self.instances.get(&id).map_or_else(Vec::new, |i| i.active_transforms())
    }

    pub fn get_objects_in_radius(&self, center: Point3<f32>, radius: f32) -> Vec<InstanceId> {
        self.spatial.query(&center, radius)
    }

    /// Drops an instance and everything that hangs off it, bodies included.
    pub fn remove_instance(&mut self, id: InstanceId) -> bool {
        let instance = match self.instances.remove(&id) {
            Some(i) => i,
            None => return false,
        };
        for body in instance.pieces.iter().filter_map(|p| p.body) {
            self.physics.destroy_body(body);
        }
        self.debris.remove_instance(id);
        self.pending.remove(&id);
        self.spatial.remove(id);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use totality_sim::{LocalPhysics, World};

    fn engine() -> (FractureEngine, Arc<Mutex<World>>) {
        let world = Arc::new(Mutex::new(World::new()));
        let settings = EngineSettings {
            seed: Some(1),
            ..Default::default()
        };
        (FractureEngine::new(settings, Box::new(LocalPhysics::new(Arc::clone(&world)))), world)
    }

    fn cube_template(engine: &mut FractureEngine, size: f32, count: usize) -> FractureId {
        let cube = model::unit_cube(size);
        let config = DestructibleConfig {
            voronoi_cell_count: count,
            seed: Some(17),
            ..Default::default()
        };
        engine.pre_fracture(MeshId(1), &cube.vertices, &cube.indices, config)
    }

    fn place(engine: &mut FractureEngine, fracture: FractureId, x: f32) -> InstanceId {
        engine.create_instance(fracture, Point3::new(x, 0., 0.), UnitQuaternion::identity(), Vector3::repeat(1.))
    }

    #[test]
    fn unknown_ids_are_noops() {
        let (mut engine, _) = engine();
        assert_eq!(place(&mut engine, FractureId(5), 0.), InstanceId::NONE);
        assert!(!engine.apply_damage(InstanceId(3), Point3::origin(), Vector3::x(), 1e6));
        assert!(!engine.apply_high_speed_collision(InstanceId(3), Point3::origin(), Vector3::x() * 100.));
        assert!(engine.get_piece_mesh(InstanceId(3), PieceId(0)).is_empty());
        assert!(engine.get_active_transforms(InstanceId(3)).is_empty());
        assert!(engine.process_breaking(InstanceId(3)).is_empty());
        assert!(!engine.remove_instance(InstanceId(3)));
        assert_eq!(engine.try_instance(InstanceId(3)).unwrap_err(), FractureError::UnknownInstance(InstanceId(3)));
    }

    #[test]
    fn instance_ids_count_up_from_one() {
        let (mut engine, _) = engine();
        let f = cube_template(&mut engine, 2., 4);
        assert_eq!(place(&mut engine, f, 0.), InstanceId(1));
        assert_eq!(place(&mut engine, f, 5.), InstanceId(2));
        assert_eq!(engine.instance_ids().count(), 2);
    }

    #[test]
    fn piece_mesh_for_unknown_piece_is_an_error() {
        let (mut engine, _) = engine();
        let f = cube_template(&mut engine, 2., 4);
        let id = place(&mut engine, f, 0.);
        assert!(!engine.get_piece_mesh(id, PieceId(0)).is_empty());
        assert_eq!(engine.piece_mesh(id, PieceId(40)).unwrap_err(), FractureError::UnknownPiece(id, PieceId(40)));
    }

    #[test]
    fn high_speed_collision_reports_and_breaks() {
        let (mut engine, world) = engine();
        let f = cube_template(&mut engine, 4., 8);
        let id = place(&mut engine, f, 0.);
        let seen = Arc::new(Mutex::new(vec![]));
        let sink = Arc::clone(&seen);
        engine.set_high_speed_collision_callback(move |i: InstanceId, _p: Point3<f32>, force: f32| {
            sink.lock().unwrap().push((i, force))
        });
        assert!(!engine.apply_high_speed_collision(id, Point3::new(5., 0., 0.), Vector3::new(-5., 0., 0.)));
        assert!(seen.lock().unwrap().is_empty());
        assert!(engine.apply_high_speed_collision(id, Point3::new(5., 0., 0.), Vector3::new(-30., 0., 0.)));
        assert_eq!(seen.lock().unwrap().as_slice(), &[(id, 0.5 * 80. * 900.)]);
        assert!(!world.lock().unwrap().is_empty());
    }

    #[test]
    fn removing_an_instance_frees_its_bodies() {
        let (mut engine, world) = engine();
        let f = cube_template(&mut engine, 4., 8);
        let id = place(&mut engine, f, 0.);
        engine.apply_explosion(Point3::origin(), 50., 1e6);
        assert_eq!(engine.released_bodies().len(), 8);
        assert_eq!(world.lock().unwrap().len(), 8);
        assert!(engine.remove_instance(id));
        assert!(world.lock().unwrap().is_empty());
        assert!(engine.debris().is_empty());
        assert!(engine.instance(id).is_none());
    }

    #[test]
    fn destroyed_instances_leave_the_index() {
        let (mut engine, _) = engine();
        let f = cube_template(&mut engine, 4., 8);
        let a = place(&mut engine, f, 0.);
        let b = place(&mut engine, f, 30.);
        assert_eq!(engine.get_objects_in_radius(Point3::origin(), 5.), vec![a]);
        assert!(engine.apply_explosion(Point3::origin(), 10., 1e6));
        assert!(engine.instance(a).unwrap().is_destroyed);
        assert!(!engine.instance(b).unwrap().is_destroyed);
        assert!(engine.get_objects_in_radius(Point3::origin(), 5.).is_empty());
        assert_eq!(engine.get_objects_in_radius(Point3::new(30., 0., 0.), 1.), vec![b]);
    }

    #[test]
    fn sync_follows_the_body_and_feeds_culling() {
        let (mut engine, world) = engine();
        let f = cube_template(&mut engine, 4., 8);
        let id = place(&mut engine, f, 0.);
        engine.apply_explosion(Point3::origin(), 50., 1e6);
        let (_, piece, body) = engine.released_bodies()[0];
        let mut state = world.lock().unwrap().body_state(body).unwrap();
        state.position = Point3::new(500., 0., 0.);
        assert!(engine.sync_piece_state(id, piece, &state));
        assert_eq!(engine.instance(id).unwrap().piece(piece).unwrap().position, state.position);
        engine.set_viewer_position(Point3::origin());
        assert_eq!(engine.debris_lod(id, piece), Some(DebrisLod::Far));
        engine.update(0.01);
        let p = engine.instance(id).unwrap().piece(piece).unwrap();
        assert!(!p.is_active);
        assert!(p.body.is_none());
        assert!(!world.lock().unwrap().contains(body));
        assert!(!engine.sync_piece_state(id, piece, &state));
    }
}
