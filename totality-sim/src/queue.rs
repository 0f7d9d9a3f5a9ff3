use cb::channel::{unbounded, Receiver, Sender, TryRecvError};
#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use crate::{world::World, PhysicsError};

pub trait PhysicsFn: FnOnce(&mut World) + Send + 'static {}
impl<F: FnOnce(&mut World) + Send + 'static> PhysicsFn for F {}

type PhysicsCommand = Box<dyn FnOnce(&mut World) + Send + 'static>;

/// Sending half of the physics command queue. Cheap to clone, safe to use from any thread.
#[derive(Clone)]
pub struct CommandQueue {
    tx: Sender<PhysicsCommand>,
}
impl CommandQueue {
    /// Hands `f` to whichever thread owns the `World`. It runs before that thread's next step.
    pub fn queue_command<F: PhysicsFn>(&self, f: F) -> Result<(), PhysicsError> {
        self.tx.send(Box::new(f)).map_err(|_| PhysicsError::QueueDisconnected)
    }
}

/// Receiving half, owned by the thread that owns the `World`.
pub struct CommandReceiver {
    rx: Receiver<PhysicsCommand>,
}
impl CommandReceiver {
    /// Runs every queued command against `world`, returning how many ran.
    pub fn drain(&self, world: &mut World) -> usize {
        let mut ran = 0;
        loop {
            match self.rx.try_recv() {
                Ok(cmd) => {
                    cmd(world);
                    ran += 1;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    trace!("Every command queue was dropped.");
                    break;
                }
            }
        }
        ran
    }
}

pub fn command_queue() -> (CommandQueue, CommandReceiver) {
    let (tx, rx) = unbounded();
    (CommandQueue { tx }, CommandReceiver { rx })
}
