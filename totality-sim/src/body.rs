use std::sync::atomic::{AtomicU64, Ordering};

use na::{Point3, UnitQuaternion, Vector3};

/// Opaque id of a rigid body owned by the physics side. Never zero.
#[derive(Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Copy, Clone)]
pub struct BodyHandle(u64);
impl From<BodyHandle> for u64 {
    fn from(h: BodyHandle) -> Self {
        h.0
    }
}

/// Hands out body handles. Shared between the thread that requests bodies and the thread that
/// owns them so that a handle exists before the body does.
#[derive(Debug)]
pub struct HandleAllocator {
    next: AtomicU64,
}
impl HandleAllocator {
    pub fn new() -> Self {
        Self { next: AtomicU64::new(1) }
    }
    pub fn next(&self) -> BodyHandle {
        BodyHandle(self.next.fetch_add(1, Ordering::Relaxed))
    }
}
impl Default for HandleAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BodyShape {
    /// Points in body-local space.
    ConvexHull(Vec<Point3<f32>>),
    Sphere(f32),
}
impl BodyShape {
    /// Radius of the smallest origin-centered sphere enclosing the shape.
    pub fn bounding_radius(&self) -> f32 {
        match self {
            BodyShape::ConvexHull(points) => points
                .iter()
                .map(|p| p.coords.norm())
                .fold(0., f32::max),
            BodyShape::Sphere(r) => *r,
        }
    }
}

/// Everything needed to create a body.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyDesc {
    pub shape: BodyShape,
    pub position: Point3<f32>,
    pub rotation: UnitQuaternion<f32>,
    pub velocity: Vector3<f32>,
    pub angular_velocity: Vector3<f32>,
    pub mass: f32,
    /// Principal moments of inertia.
    pub inertia: Vector3<f32>,
    pub is_dynamic: bool,
    pub collides: bool,
}
impl BodyDesc {
    pub fn new(shape: BodyShape, position: Point3<f32>, rotation: UnitQuaternion<f32>, velocity: Vector3<f32>, is_dynamic: bool) -> Self {
        Self {
            shape,
            position,
            rotation,
            velocity,
            angular_velocity: Vector3::zeros(),
            mass: 1.,
            inertia: Vector3::repeat(1.),
            is_dynamic,
            collides: true,
        }
    }
}

/// Snapshot of a simulated body.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BodyState {
    pub position: Point3<f32>,
    pub rotation: UnitQuaternion<f32>,
    pub velocity: Vector3<f32>,
    pub angular_velocity: Vector3<f32>,
    pub sleeping: bool,
}
