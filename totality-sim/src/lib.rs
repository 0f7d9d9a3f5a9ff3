//! Physics side of the engine, reduced to what destructibles need: bodies identified by opaque
//! handles, a command queue for talking to the physics thread, and a rapier-backed world to step.

pub mod adapter;
pub mod body;
pub mod queue;
pub mod thread;
pub mod world;

pub use adapter::{LocalPhysics, PhysicsAdapter, QueuedPhysics};
pub use body::{BodyDesc, BodyHandle, BodyShape, BodyState, HandleAllocator};
pub use queue::{command_queue, CommandQueue, CommandReceiver, PhysicsFn};
pub use thread::PhysicsThread;
pub use world::World;

#[derive(Debug, thiserror::Error)]
pub enum PhysicsError {
    #[error("the physics command queue is disconnected")]
    QueueDisconnected,
}
