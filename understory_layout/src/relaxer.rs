// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Background driver for iterative layouts.
//!
//! A [`Relaxer`] owns one [`IterativeProcess`] and, while running, one thread
//! that repeatedly calls [`IterativeProcess::step`] and then sleeps. The
//! thread is the only writer of layout positions during a run; everything
//! else reads.
//!
//! ```text
//!            relax()              pause()
//!   Idle ───────────────► Running ◄──────► Paused
//!    │                      │     resume()    │
//!    │ resume()             │ stop() / done() │ stop()
//!    │ (prerelax + relax)   ▼                 │
//!    └──────────────────► Stopped ◄───────────┘
//!                           │ relax() / resume()
//!                           └──► Running
//! ```
//!
//! Pausing takes effect before the next step. Stopping wakes both a sleeping
//! and a paused thread; it waits up to the stop timeout for the thread to
//! leave and then detaches it. A step error ends the run and is kept for
//! [`Relaxer::take_error`].

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, trace, warn};

use crate::algorithm::IterativeProcess;
use crate::error::LayoutError;

/// Default pause between steps.
pub const DEFAULT_SLEEP: Duration = Duration::from_millis(100);
/// Default wall-clock budget of [`Relaxer::prerelax`].
pub const DEFAULT_PRERELAX_BUDGET: Duration = Duration::from_millis(500);
/// Default bound on how long [`Relaxer::stop`] waits for the thread.
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(2);

/// Lifecycle of a [`Relaxer`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RelaxerState {
    /// Never started.
    Idle,
    /// Thread is stepping.
    Running,
    /// Thread is blocked before its next step.
    Paused,
    /// Thread has exited, on request, on convergence or on error.
    Stopped,
}

struct Control {
    state: RelaxerState,
    stop: bool,
    paused: bool,
    generation: u64,
    sleep: Duration,
}

struct Shared {
    control: Mutex<Control>,
    wake: Condvar,
    error: Mutex<Option<LayoutError>>,
}

impl Shared {
    /// Whether the run identified by `generation` should keep going.
    fn cancelled(c: &Control, generation: u64) -> bool {
        c.stop || c.generation != generation
    }
}

/// Marks a run as stopped however its thread exits, including by panic.
struct ExitGuard {
    shared: Arc<Shared>,
    generation: u64,
}

impl Drop for ExitGuard {
    fn drop(&mut self) {
        let mut c = self.shared.control.lock();
        if c.generation == self.generation {
            c.state = RelaxerState::Stopped;
            c.paused = false;
        }
        self.shared.wake.notify_all();
        if thread::panicking() {
            warn!(generation = self.generation, "relaxer thread panicked");
        }
    }
}

/// Drives an [`IterativeProcess`] on a background thread.
pub struct Relaxer<T: IterativeProcess + 'static> {
    process: Arc<Mutex<T>>,
    shared: Arc<Shared>,
    handle: Mutex<Option<JoinHandle<()>>>,
    prerelax_budget: Duration,
    stop_timeout: Duration,
}

impl<T: IterativeProcess + 'static> core::fmt::Debug for Relaxer<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Relaxer")
            .field("state", &self.state())
            .field("sleep", &self.sleep_time())
            .field("prerelax_budget", &self.prerelax_budget)
            .field("stop_timeout", &self.stop_timeout)
            .finish_non_exhaustive()
    }
}

impl<T: IterativeProcess + 'static> Relaxer<T> {
    /// Idle relaxer around `process`.
    pub fn new(process: T) -> Self {
        Self {
            process: Arc::new(Mutex::new(process)),
            shared: Arc::new(Shared {
                control: Mutex::new(Control {
                    state: RelaxerState::Idle,
                    stop: false,
                    paused: false,
                    generation: 0,
                    sleep: DEFAULT_SLEEP,
                }),
                wake: Condvar::new(),
                error: Mutex::new(None),
            }),
            handle: Mutex::new(None),
            prerelax_budget: DEFAULT_PRERELAX_BUDGET,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
        }
    }

    /// Set the wall-clock budget of [`Relaxer::prerelax`].
    #[must_use]
    pub fn with_prerelax_budget(mut self, budget: Duration) -> Self {
        self.prerelax_budget = budget;
        self
    }

    /// Set how long [`Relaxer::stop`] waits before detaching the thread.
    #[must_use]
    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    /// Set the pause between steps. Takes effect from the next sleep.
    pub fn set_sleep_time(&self, sleep: Duration) -> Result<(), LayoutError> {
        if sleep.is_zero() {
            return Err(LayoutError::invalid("relaxer sleep must be positive"));
        }
        self.shared.control.lock().sleep = sleep;
        Ok(())
    }

    /// Pause between steps.
    pub fn sleep_time(&self) -> Duration {
        self.shared.control.lock().sleep
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RelaxerState {
        self.shared.control.lock().state
    }

    /// Whether a thread is alive for the current run (running or paused).
    pub fn is_running(&self) -> bool {
        matches!(
            self.state(),
            RelaxerState::Running | RelaxerState::Paused
        )
    }

    /// The driven process. Locking it while a run is active blocks the run.
    pub fn process(&self) -> &Arc<Mutex<T>> {
        &self.process
    }

    /// The error that ended the last run, if any.
    pub fn take_error(&self) -> Option<LayoutError> {
        self.shared.error.lock().take()
    }

    /// Stop any current run and start a new background loop.
    pub fn relax(&self) -> Result<(), LayoutError> {
        self.stop();
        let generation = {
            let mut c = self.shared.control.lock();
            c.generation += 1;
            c.stop = false;
            c.paused = false;
            c.state = RelaxerState::Running;
            c.generation
        };
        *self.shared.error.lock() = None;

        let shared = Arc::clone(&self.shared);
        let process = Arc::clone(&self.process);
        let spawned = thread::Builder::new()
            .name("understory-relaxer".into())
            .spawn(move || run(&shared, &process, generation));
        match spawned {
            Ok(handle) => {
                *self.handle.lock() = Some(handle);
                debug!(generation, "relaxer started");
                Ok(())
            }
            Err(e) => {
                self.shared.control.lock().state = RelaxerState::Stopped;
                Err(LayoutError::Spawn(e.to_string()))
            }
        }
    }

    /// Step in the calling thread until done or the prerelax budget runs out,
    /// with change notifications muted.
    pub fn prerelax(&self) -> Result<(), LayoutError> {
        let started = Instant::now();
        let mut process = self.process.lock();
        process.set_notifications(false);
        let mut steps = 0_usize;
        let result = loop {
            if process.done() || started.elapsed() >= self.prerelax_budget {
                break Ok(());
            }
            if let Err(e) = process.step() {
                break Err(e);
            }
            steps += 1;
        };
        process.set_notifications(true);
        debug!(steps, elapsed = ?started.elapsed(), "prerelax finished");
        result
    }

    /// Block the loop before its next step. No effect unless running.
    pub fn pause(&self) {
        let mut c = self.shared.control.lock();
        if c.state == RelaxerState::Running {
            c.paused = true;
            c.state = RelaxerState::Paused;
            debug!(generation = c.generation, "relaxer paused");
        }
    }

    /// Release a paused loop. An idle or stopped relaxer bootstraps instead:
    /// it prerelaxes, then starts a new run.
    pub fn resume(&self) -> Result<(), LayoutError> {
        {
            let mut c = self.shared.control.lock();
            match c.state {
                RelaxerState::Running => return Ok(()),
                RelaxerState::Paused => {
                    c.paused = false;
                    c.state = RelaxerState::Running;
                    self.shared.wake.notify_all();
                    debug!(generation = c.generation, "relaxer resumed");
                    return Ok(());
                }
                RelaxerState::Idle | RelaxerState::Stopped => {}
            }
        }
        self.prerelax()?;
        self.relax()
    }

    /// Ask the loop to exit and wait, up to the stop timeout, for it to do so.
    ///
    /// Safe from any thread and idempotent. Called from the relaxer's own
    /// thread (for instance by a change listener) it only signals.
    pub fn stop(&self) {
        let generation = {
            let mut c = self.shared.control.lock();
            c.stop = true;
            c.paused = false;
            self.shared.wake.notify_all();
            c.generation
        };
        let Some(handle) = self.handle.lock().take() else {
            return;
        };
        if handle.thread().id() == thread::current().id() {
            debug!(generation, "stop requested from the relaxer thread");
            return;
        }
        if self.wait_until_stopped(self.stop_timeout) {
            if handle.join().is_err() {
                warn!(generation, "relaxer thread ended by panic");
            }
            debug!(generation, "relaxer stopped");
        } else {
            warn!(
                generation,
                timeout = ?self.stop_timeout,
                "relaxer thread did not stop in time; detaching it"
            );
            let mut c = self.shared.control.lock();
            if c.generation == generation {
                c.state = RelaxerState::Stopped;
            }
        }
    }

    /// Wait until the current run has ended. Returns `false` on timeout.
    pub fn wait_until_stopped(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut c = self.shared.control.lock();
        while matches!(c.state, RelaxerState::Running | RelaxerState::Paused) {
            if self.shared.wake.wait_until(&mut c, deadline).timed_out() {
                return !matches!(c.state, RelaxerState::Running | RelaxerState::Paused);
            }
        }
        true
    }
}

impl<T: IterativeProcess + 'static> Drop for Relaxer<T> {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run<T: IterativeProcess>(shared: &Arc<Shared>, process: &Mutex<T>, generation: u64) {
    let _guard = ExitGuard {
        shared: Arc::clone(shared),
        generation,
    };
    let mut steps = 0_u64;
    loop {
        {
            let mut c = shared.control.lock();
            while c.paused && !Shared::cancelled(&c, generation) {
                shared.wake.wait(&mut c);
            }
            if Shared::cancelled(&c, generation) {
                debug!(generation, steps, "relaxer loop cancelled");
                return;
            }
        }

        let outcome = {
            let mut p = process.lock();
            if p.done() { None } else { Some(p.step()) }
        };
        match outcome {
            None => {
                debug!(generation, steps, "layout converged; relaxer exiting");
                return;
            }
            Some(Err(e)) => {
                warn!(generation, steps, error = %e, "layout step failed; relaxer exiting");
                *shared.error.lock() = Some(e);
                return;
            }
            Some(Ok(())) => {
                steps += 1;
                trace!(generation, steps, "relaxer step");
            }
        }

        let mut c = shared.control.lock();
        let deadline = Instant::now() + c.sleep;
        while !Shared::cancelled(&c, generation) {
            if shared.wake.wait_until(&mut c, deadline).timed_out() {
                break;
            }
        }
    }
}
