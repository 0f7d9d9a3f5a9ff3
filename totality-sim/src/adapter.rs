use std::sync::{Arc, Mutex, MutexGuard};

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use crate::{
    body::{BodyDesc, BodyHandle, HandleAllocator},
    queue::CommandQueue,
    world::World,
};

/// The narrow slice of a physics engine that fracture needs: make a body for a released piece,
/// and get rid of it again.
pub trait PhysicsAdapter: Send {
    fn create_body(&mut self, desc: BodyDesc) -> BodyHandle;
    fn destroy_body(&mut self, handle: BodyHandle);
}

fn lock_world(world: &Mutex<World>) -> MutexGuard<'_, World> {
    match world.lock() {
        Ok(w) => w,
        Err(poisoned) => {
            error!("World is poisoned.");
            poisoned.into_inner()
        }
    }
}

/// Mutates the world directly. Only for when the caller already runs on the physics thread
/// (or there is no physics thread).
pub struct LocalPhysics {
    world: Arc<Mutex<World>>,
}
impl LocalPhysics {
    pub fn new(world: Arc<Mutex<World>>) -> Self {
        Self { world }
    }
}
impl PhysicsAdapter for LocalPhysics {
    fn create_body(&mut self, desc: BodyDesc) -> BodyHandle {
        lock_world(&self.world).create_body(desc)
    }
    fn destroy_body(&mut self, handle: BodyHandle) {
        if !lock_world(&self.world).destroy_body(handle) {
            debug!("Destroying unknown body {:?}.", handle);
        }
    }
}

/// Marshals every request through a `CommandQueue`. Handles come from a shared allocator, so
/// they are valid immediately even though the body only appears on the next physics step.
pub struct QueuedPhysics {
    queue: CommandQueue,
    allocator: Arc<HandleAllocator>,
}
impl QueuedPhysics {
    pub fn new(queue: CommandQueue, allocator: Arc<HandleAllocator>) -> Self {
        Self { queue, allocator }
    }
}
impl PhysicsAdapter for QueuedPhysics {
    fn create_body(&mut self, desc: BodyDesc) -> BodyHandle {
        let handle = self.allocator.next();
        if let Err(e) = self.queue.queue_command(move |w: &mut World| w.insert(handle, desc)) {
            warn!("Could not queue creation of {:?}: {}", handle, e);
        }
        handle
    }
    fn destroy_body(&mut self, handle: BodyHandle) {
        if let Err(e) = self.queue.queue_command(move |w: &mut World| {
            if !w.destroy_body(handle) {
                debug!("Destroying unknown body {:?}.", handle);
            }
        }) {
            warn!("Could not queue destruction of {:?}: {}", handle, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{body::BodyShape, queue::command_queue};
    use na::{Point3, UnitQuaternion, Vector3};

    fn desc() -> BodyDesc {
        BodyDesc::new(BodyShape::Sphere(1.), Point3::new(0., 5., 0.), UnitQuaternion::identity(), Vector3::zeros(), true)
    }

    #[test]
    fn local_round_trip() {
        let world = Arc::new(Mutex::new(World::new()));
        let mut physics = LocalPhysics::new(Arc::clone(&world));
        let h = physics.create_body(desc());
        assert!(lock_world(&world).contains(h));
        physics.destroy_body(h);
        assert!(lock_world(&world).is_empty());
    }

    #[test]
    fn queued_handle_round_trips_after_drain() {
        let mut world = World::new();
        let (queue, rx) = command_queue();
        let mut physics = QueuedPhysics::new(queue, world.allocator());
        let h = physics.create_body(desc());
        assert!(!world.contains(h));
        rx.drain(&mut world);
        assert!(world.contains(h));
        physics.destroy_body(h);
        rx.drain(&mut world);
        assert!(!world.contains(h));
    }
}
