use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use th::killable_thread::{FinishResult, KillableThread};

use crate::{queue::CommandReceiver, world::World};

/// Runs the world on its own fixed-timestep loop. Each step first applies every queued command.
pub struct PhysicsThread {
    world: Arc<Mutex<World>>,
    thread: Option<KillableThread<()>>,
}
impl PhysicsThread {
    pub fn spawn(world: Arc<Mutex<World>>, commands: CommandReceiver, time_step: Duration) -> Result<Self, std::io::Error> {
        let sim_world = Arc::clone(&world);
        let step = time_step.as_secs_f32();
        let thread = th::create_duration_kt!((), time_step, "Physics", _dt, {
            info!("Physics thread running at {:?} per step.", time_step);
        }, {
            match sim_world.lock() {
                Ok(mut w) => {
                    let ran = commands.drain(&mut w);
                    if ran != 0 {
                        trace!("Applied {} physics commands.", ran);
                    }
                    w.step(step);
                }
                Err(_) => {
                    error!("World is poisoned.");
                    break;
                }
            }
        }, {
            // Whatever is still queued (usually destroy requests) must not be lost.
            if let Ok(mut w) = sim_world.lock() {
                commands.drain(&mut w);
            }
        })?;
        Ok(Self {
            world,
            thread: Some(thread),
        })
    }
    pub fn world(&self) -> &Arc<Mutex<World>> {
        &self.world
    }
    /// False once the loop has exited, whether it was asked to or not.
    pub fn is_running(&self) -> bool {
        self.thread.as_ref().map_or(false, |t| !t.is_finished())
    }
    /// Stops and joins the thread. A panic on the physics thread is logged and handed back.
    pub fn finish(&mut self) -> FinishResult<()> {
        let mut thread = self.thread.take()?;
        let res = thread.finish();
        match res {
            Some(Err(_)) => error!("{} thread panicked.", thread.name()),
            _ => info!("{} thread stopped.", thread.name()),
        }
        res
    }
}
impl Drop for PhysicsThread {
    fn drop(&mut self) {
        if self.thread.is_some() {
            self.finish();
        }
    }
}
