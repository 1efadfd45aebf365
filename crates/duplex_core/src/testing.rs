//! # Test Harness
//!
//! Store and manager tests run on the test thread as the simulation thread
//! and need a second, long-lived thread registered as the render thread.
//! [`RenderWorker`] is that thread: jobs go in over a channel, results and
//! panics come back.
//!
//! ```rust,ignore
//! let registry = Arc::new(ThreadRegistry::new());
//! let mut sim = registry.register_sim();
//! let render = RenderWorker::spawn(Arc::clone(&registry));
//!
//! let seen = render.run(move |rend| *store.read_dynamic_rend(rend, handle));
//! ```

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, unbounded, Sender};

use crate::sync::{RenderThread, ThreadRegistry};

type Job = Box<dyn FnOnce(&mut RenderThread) + Send>;

/// A thread registered as the render thread, running closures on demand.
pub struct RenderWorker {
    jobs: Option<Sender<Job>>,
    thread: Option<JoinHandle<()>>,
}

impl RenderWorker {
    /// Spawns the worker and registers it as `registry`'s render thread.
    ///
    /// # Panics
    ///
    /// Re-raises the registration failure if the registry already has a
    /// render thread.
    #[must_use]
    pub fn spawn(registry: Arc<ThreadRegistry>) -> Self {
        let (jobs, inbox) = unbounded::<Job>();
        let (ready_tx, ready_rx) = bounded::<()>(1);

        let thread = thread::Builder::new()
            .name("duplex-render-worker".into())
            .spawn(move || {
                let mut rend = registry.register_rend();
                let _ = ready_tx.send(());
                for job in inbox {
                    job(&mut rend);
                }
            })
            .expect("failed to spawn render worker");

        if ready_rx.recv().is_err() {
            match thread.join() {
                Err(payload) => panic::resume_unwind(payload),
                Ok(()) => panic!("render worker exited before registering"),
            }
        }

        Self {
            jobs: Some(jobs),
            thread: Some(thread),
        }
    }

    /// Runs `f` on the render thread and waits for its result.
    ///
    /// A panic inside `f` is re-raised on the caller, with its original
    /// payload. The worker survives it.
    pub fn run<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut RenderThread) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (reply_tx, reply_rx) = bounded(1);
        let job: Job = Box::new(move |rend| {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| f(rend)));
            let _ = reply_tx.send(outcome);
        });

        self.jobs
            .as_ref()
            .expect("render worker already shut down")
            .send(job)
            .expect("render worker is gone");

        match reply_rx.recv().expect("render worker is gone") {
            Ok(value) => value,
            Err(payload) => panic::resume_unwind(payload),
        }
    }
}

impl Drop for RenderWorker {
    fn drop(&mut self) {
        drop(self.jobs.take());
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
