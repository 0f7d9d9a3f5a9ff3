pub mod killable_thread;

pub use killable_thread::{FinishResult, KillableThread, StopSignal};

#[doc(hidden)]
pub use log as __log;

/// Spawns a `KillableThread` running `body` once per `step` until the thread is finished.
///
/// `head` runs once before the loop, `tail` once after it and produces the thread's result.
/// Inside `body`, `$dt` holds the seconds elapsed since the previous iteration began.
#[macro_export]
macro_rules! create_duration_kt {
    ( $type:ty, $step:expr, $name:expr, $dt:ident, {$($head:tt)*}, {$($body:tt)*}, {$($tail:tt)*} ) => {
        {
            let step: ::std::time::Duration = $step;
            $crate::killable_thread::KillableThread::spawn($name, move |stop: $crate::killable_thread::StopSignal| -> $type {
                $($head)*
                let mut last_frame = ::std::time::Instant::now();
                while !stop.should_stop() {
                    let curr_frame = ::std::time::Instant::now();
                    #[allow(unused_variables)]
                    let $dt = (curr_frame - last_frame).as_secs_f32();
                    last_frame = curr_frame;
                    $($body)*
                    let spent = curr_frame.elapsed();
                    if step > spent {
                        ::std::thread::sleep(step - spent);
                    }
                }
                $crate::__log::info!("Completed");
                $($tail)*
            })
        }
    };
}
