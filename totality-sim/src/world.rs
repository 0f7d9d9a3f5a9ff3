//! The rigid-body world behind the `PhysicsAdapter` seam: a rapier pipeline keyed by our own
//! `BodyHandle`s, so handles can be handed out before the body exists.

use std::{collections::HashMap, sync::Arc};

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use na::{Isometry3, Point3, Translation3, Vector3};
use rapier3d::prelude::{
    BroadPhase, CCDSolver, ColliderBuilder, ColliderHandle, ColliderSet, ImpulseJointSet, IntegrationParameters,
    InteractionGroups, IslandManager, MassProperties, MultibodyJointSet, NarrowPhase, PhysicsPipeline,
    RigidBodyBuilder, RigidBodyHandle, RigidBodySet,
};

use crate::body::{BodyDesc, BodyHandle, BodyShape, BodyState, HandleAllocator};

const RESTITUTION: f32 = 0.2;
const FRICTION: f32 = 0.7;
/// Smallest ball a shape collapses to when its hull cannot be built.
const MIN_RADIUS: f32 = 1e-3;

pub struct World {
    gravity: Vector3<f32>,
    integration_parameters: IntegrationParameters,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: BroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    handles: HashMap<BodyHandle, RigidBodyHandle>,
    ground: Option<ColliderHandle>,
    allocator: Arc<HandleAllocator>,
}
impl World {
    /// An empty world with gravity along -y and a ground plane at `y = 0`.
    pub fn new() -> Self {
        let world = Self {
            gravity: Vector3::new(0., -9.81, 0.),
            integration_parameters: IntegrationParameters::default(),
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: BroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            handles: HashMap::new(),
            ground: None,
            allocator: Arc::new(HandleAllocator::new()),
        };
        world.with_ground(Some(0.))
    }
    /// Moves the ground plane to the given height, or removes it.
    pub fn with_ground(mut self, ground: Option<f32>) -> Self {
        if let Some(old) = self.ground.take() {
            self.colliders
                .remove(old, &mut self.islands, &mut self.bodies, false);
        }
        self.ground = ground.map(|height| {
            let plane = ColliderBuilder::halfspace(Vector3::y_axis())
                .translation(Vector3::new(0., height, 0.))
                .restitution(RESTITUTION)
                .friction(FRICTION)
                .build();
            self.colliders.insert(plane)
        });
        self
    }
    /// Allocator to hand to adapters that create bodies from another thread.
    pub fn allocator(&self) -> Arc<HandleAllocator> {
        Arc::clone(&self.allocator)
    }
    pub fn create_body(&mut self, desc: BodyDesc) -> BodyHandle {
        let handle = self.allocator.next();
        self.insert(handle, desc);
        handle
    }
    /// Creates a body under a handle allocated ahead of time.
    pub fn insert(&mut self, handle: BodyHandle, desc: BodyDesc) {
        if self.destroy_body(handle) {
            warn!("Body {:?} was replaced.", handle);
        }
        let pose = Isometry3::from_parts(Translation3::from(desc.position.coords), desc.rotation);
        let builder = if desc.is_dynamic {
            RigidBodyBuilder::dynamic()
        } else {
            RigidBodyBuilder::fixed()
        };
        let mut builder = builder
            .position(pose)
            .linvel(desc.velocity)
            .angvel(desc.angular_velocity);
        // Mass comes from the piece, not from the collider's density.
        let explicit_mass = desc.mass > 0.;
        if explicit_mass {
            builder = builder.additional_mass_properties(MassProperties::new(Point3::origin(), desc.mass, desc.inertia));
        }
        let body = self.bodies.insert(builder.build());

        let mut collider = collider_for(&desc.shape)
            .restitution(RESTITUTION)
            .friction(FRICTION);
        if explicit_mass {
            collider = collider.density(0.);
        }
        if !desc.collides {
            collider = collider.collision_groups(InteractionGroups::none());
        }
        self.colliders
            .insert_with_parent(collider.build(), body, &mut self.bodies);
        self.handles.insert(handle, body);
    }
    pub fn destroy_body(&mut self, handle: BodyHandle) -> bool {
        match self.handles.remove(&handle) {
            Some(body) => self
                .bodies
                .remove(
                    body,
                    &mut self.islands,
                    &mut self.colliders,
                    &mut self.impulse_joints,
                    &mut self.multibody_joints,
                    true,
                )
                .is_some(),
            None => false,
        }
    }
    pub fn contains(&self, handle: BodyHandle) -> bool {
        self.handles.contains_key(&handle)
    }
    pub fn body_state(&self, handle: BodyHandle) -> Option<BodyState> {
        let body = self.bodies.get(*self.handles.get(&handle)?)?;
        let pose = body.position();
        Some(BodyState {
            position: Point3::from(pose.translation.vector),
            rotation: pose.rotation,
            velocity: *body.linvel(),
            angular_velocity: *body.angvel(),
            sleeping: body.is_sleeping(),
        })
    }
    pub fn len(&self) -> usize {
        self.handles.len()
    }
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
    pub fn step(&mut self, dt: f32) {
        if dt <= 0. {
            return;
        }
        self.integration_parameters.dt = dt;
        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            None,
            &(),
            &(),
        );
    }
}
impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

fn collider_for(shape: &BodyShape) -> ColliderBuilder {
    let hull = match shape {
        BodyShape::ConvexHull(points) if spans_volume(points) => ColliderBuilder::convex_hull(points),
        BodyShape::ConvexHull(_) => None,
        BodyShape::Sphere(r) => return ColliderBuilder::ball(r.max(MIN_RADIUS)),
    };
    hull.unwrap_or_else(|| {
        debug!("Flat hull, using a ball.");
        ColliderBuilder::ball(shape.bounding_radius().max(MIN_RADIUS))
    })
}

/// Whether the points are spread in all three dimensions, i.e. have a hull with volume.
fn spans_volume(points: &[Point3<f32>]) -> bool {
    let first = match points.first() {
        Some(p) => *p,
        None => return false,
    };
    let scale = points.iter().map(|p| (p - first).norm()).fold(0., f32::max);
    let eps = scale * 1e-4;
    let far = |score: &dyn Fn(&Point3<f32>) -> f32| points.iter().copied().max_by(|a, b| score(a).total_cmp(&score(b)));
    let (a, b) = match far(&|p| (p - first).norm()) {
        Some(b) if (b - first).norm() > eps => (first, b),
        _ => return false,
    };
    let axis = (b - a).normalize();
    let off_line = |p: &Point3<f32>| (p - a).cross(&axis).norm();
    let c = match far(&off_line) {
        Some(c) if off_line(&c) > eps => c,
        _ => return false,
    };
    let normal = (b - a).cross(&(c - a)).normalize();
    points.iter().any(|p| (p - a).dot(&normal).abs() > eps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use na::UnitQuaternion;

    fn sphere_at(y: f32) -> BodyDesc {
        BodyDesc::new(BodyShape::Sphere(0.5), Point3::new(0., y, 0.), UnitQuaternion::identity(), Vector3::zeros(), true)
    }

    fn cube_hull(half: f32) -> BodyShape {
        let mut points = vec![];
        for x in [-half, half] {
            for y in [-half, half] {
                for z in [-half, half] {
                    points.push(Point3::new(x, y, z));
                }
            }
        }
        BodyShape::ConvexHull(points)
    }

    #[test]
    fn free_fall() {
        let mut world = World::new().with_ground(None);
        let h = world.create_body(sphere_at(10.));
        for _ in 0..60 {
            world.step(1. / 60.);
        }
        let s = world.body_state(h).expect("body exists");
        assert_relative_eq!(s.velocity.y, -9.81, epsilon = 0.05);
        assert_relative_eq!(s.position.y, 10. - 0.5 * 9.81, epsilon = 0.2);
        assert!(!s.sleeping);
    }

    #[test]
    fn ground_stops_fall_and_bodies_sleep() {
        let mut world = World::new();
        let h = world.create_body(sphere_at(2.));
        for _ in 0..900 {
            world.step(1. / 60.);
        }
        let s = world.body_state(h).expect("body exists");
        assert_relative_eq!(s.position.y, 0.5, epsilon = 0.05);
        assert!(s.sleeping);
    }

    #[test]
    fn hulls_rest_on_the_ground_unless_they_do_not_collide() {
        let mut world = World::new();
        let mut desc = BodyDesc::new(cube_hull(0.5), Point3::new(0., 1., 0.), UnitQuaternion::identity(), Vector3::zeros(), true);
        desc.mass = 2.;
        desc.inertia = Vector3::repeat(2. / 6.);
        let resting = world.create_body(desc.clone());
        desc.position.x = 5.;
        desc.collides = false;
        let ghost = world.create_body(desc);
        for _ in 0..240 {
            world.step(1. / 60.);
        }
        let r = world.body_state(resting).expect("body exists");
        assert_relative_eq!(r.position.y, 0.5, epsilon = 0.05);
        let g = world.body_state(ghost).expect("body exists");
        assert!(g.position.y < -5.);
    }

    #[test]
    fn flat_hulls_fall_back_to_a_ball() {
        let mut world = World::new();
        let flat = BodyShape::ConvexHull(vec![Point3::origin(), Point3::new(1., 0., 0.), Point3::new(0., 1., 0.)]);
        let h = world.create_body(BodyDesc::new(flat, Point3::new(0., 3., 0.), UnitQuaternion::identity(), Vector3::zeros(), true));
        world.step(1. / 60.);
        assert!(world.body_state(h).is_some());
    }

    #[test]
    fn volume_needs_all_three_dimensions() {
        let BodyShape::ConvexHull(cube) = cube_hull(1.) else { unreachable!() };
        assert!(spans_volume(&cube));
        let flat: Vec<_> = cube.iter().map(|p| Point3::new(p.x, p.y, 0.)).collect();
        assert!(!spans_volume(&flat));
        let line: Vec<_> = cube.iter().map(|p| Point3::new(p.x, 0., 0.)).collect();
        assert!(!spans_volume(&line));
        assert!(!spans_volume(&[]));
    }

    #[test]
    fn static_bodies_do_not_move() {
        let mut world = World::new();
        let mut desc = sphere_at(3.);
        desc.is_dynamic = false;
        let h = world.create_body(desc);
        world.step(1.);
        assert_eq!(world.body_state(h).map(|s| s.position.y), Some(3.));
    }

    #[test]
    fn destroy() {
        let mut world = World::new();
        let h = world.create_body(sphere_at(1.));
        assert!(world.destroy_body(h));
        assert!(!world.destroy_body(h));
        assert!(world.is_empty());
    }
}
