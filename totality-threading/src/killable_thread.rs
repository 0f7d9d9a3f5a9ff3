//! # KillableThread
//!
//! A KillableThread is a thread with a built-in interruption mechanism/flag.

use std::{
    sync::mpsc::{channel, Receiver, Sender, TryRecvError},
    thread::JoinHandle,
};

/// Handed to the body of a `KillableThread`. Reports whether the owner asked the thread to stop.
pub struct StopSignal {
    rx: Receiver<()>,
}
impl StopSignal {
    /// True once `finish` was called on the owning `KillableThread` or it was dropped.
    pub fn should_stop(&self) -> bool {
        match self.rx.try_recv() {
            Ok(()) => true,
            Err(TryRecvError::Empty) => false,
            Err(TryRecvError::Disconnected) => true,
        }
    }
}

/// A `KillableThread`. Effectively a `JoinHandle` to the thread started by when creating
/// `KillableThread`.
pub struct KillableThread<T: Send + 'static> {
    kill_mechanism: Option<Sender<()>>,
    handle: Option<JoinHandle<T>>,
    name: String,
}
impl<T: Send + 'static> KillableThread<T> {
    /// Creates a `KillableThread`.
    ///
    /// # Arguments
    ///
    /// * `name` Name of the KillableThread. Used during debugging only.
    /// * `f` The function being run by the thread. It must poll the `StopSignal` it is given.
    ///
    /// # Remarks
    ///
    /// For a fixed timestep loop that polls the signal for you, check out `create_duration_kt!`.
    pub fn spawn<S, F>(name: S, f: F) -> Result<KillableThread<T>, std::io::Error>
    where
        S: Into<String>,
        F: FnOnce(StopSignal) -> T + Send + 'static,
    {
        let name = name.into();
        let (tx, rx) = channel();
        let handle = std::thread::Builder::new()
            .name(name.clone())
            .spawn(move || f(StopSignal { rx }))?;
        Ok(KillableThread {
            kill_mechanism: Some(tx),
            handle: Some(handle),
            name,
        })
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    /// Whether the thread body has already returned.
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }
    /// Signals the thread to stop, then joins it.
    ///
    /// # Remarks
    ///
    /// If called more than once, will return None on subsequent calls.
    pub fn finish(&mut self) -> FinishResult<T> {
        drop(self.kill_mechanism.take());
        self.handle.take().map(|h| h.join())
    }
}
/// Alias for the return of `finish` in `KillableThread`.
pub type FinishResult<T> = Option<std::thread::Result<T>>;
impl<T: Send + 'static> Drop for KillableThread<T> {
    fn drop(&mut self) {
        if self.handle.is_some() {
            log::warn!("KillableThread {:?} dropped without calling finish, joining now.", self.name);
            if let Some(Err(_)) = self.finish() {
                log::error!("KillableThread {:?} panicked.", self.name);
            }
        }
    }
}
