//! Cross-context hand-off onto the rendering loop.
//!
//! The rendering context is the single loop that owns the window, the
//! surface and all pointer state. Other threads cannot touch that state
//! directly; they queue a job through a [`RenderDispatcher`] and the
//! loop runs it the next time it calls [`RenderQueue::pump`].
//!
//! [`RenderDispatcher::invoke`] waits for the job's result, but only up
//! to a deadline. During shutdown the loop stops pumping (or drops its
//! queue) while producers may still be sending; the deadline is what
//! lets those producers return instead of hanging forever.
//!
//! Each queued entry only holds its job through a slot. A producer whose
//! deadline passes takes the job back out and drops it, so whatever the
//! job captured is released before `invoke` returns, even while the loop
//! is stalled.

use std::sync::mpsc::{self, RecvTimeoutError, TryRecvError};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::trace;

/// Upper bound on jobs run by a single [`RenderQueue::pump`] call, so a
/// fast producer cannot starve input handling.
pub const MAX_JOBS_PER_PUMP: usize = 64;

type RenderJob<S> = Box<dyn FnOnce(&mut S) + Send>;

/// Queue entry. The queue owns the only strong reference; the producer
/// keeps a `Weak` so dropping the queue also drops unrun jobs.
struct Queued<S> {
    slot: Arc<Mutex<Option<RenderJob<S>>>>,
}

fn take_job<S>(slot: &Mutex<Option<RenderJob<S>>>) -> Option<RenderJob<S>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner).take()
}

/// Why a job did not produce a result.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum DispatchError {
    /// The rendering loop did not run the job before the deadline.
    /// A job that had not started yet has been dropped.
    #[error("rendering context did not respond within {0:?}")]
    Timeout(Duration),

    /// The rendering loop has gone away.
    #[error("rendering context closed")]
    Closed,
}

/// Create a connected dispatcher/queue pair for state type `S`.
pub fn render_channel<S>() -> (RenderDispatcher<S>, RenderQueue<S>) {
    let (tx, rx) = mpsc::channel();
    (RenderDispatcher { tx }, RenderQueue { rx })
}

// ── RenderDispatcher ─────────────────────────────────────────────

/// Producer-side handle. Cheap to clone, usable from any thread.
pub struct RenderDispatcher<S> {
    tx: mpsc::Sender<Queued<S>>,
}

impl<S> Clone for RenderDispatcher<S> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<S: 'static> RenderDispatcher<S> {
    /// Run `job` on the rendering context and wait up to `timeout` for
    /// its result.
    ///
    /// On timeout a job that has not started is dropped on the calling
    /// thread before this returns. A job that has already started still
    /// runs to completion; its result is discarded.
    pub fn invoke<R, F>(&self, timeout: Duration, job: F) -> Result<R, DispatchError>
    where
        F: FnOnce(&mut S) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (done_tx, done_rx) = mpsc::sync_channel(1);
        let boxed: RenderJob<S> = Box::new(move |state: &mut S| {
            let _ = done_tx.send(job(state));
        });

        let slot = Arc::new(Mutex::new(Some(boxed)));
        let pending: Weak<_> = Arc::downgrade(&slot);
        self.tx
            .send(Queued { slot })
            .map_err(|_| DispatchError::Closed)?;

        match done_rx.recv_timeout(timeout) {
            Ok(result) => Ok(result),
            Err(RecvTimeoutError::Timeout) => {
                let reclaimed = pending.upgrade().and_then(|slot| take_job(&slot));
                if reclaimed.is_none() {
                    trace!("render job already started; result will be discarded");
                }
                drop(reclaimed);
                Err(DispatchError::Timeout(timeout))
            }
            Err(RecvTimeoutError::Disconnected) => Err(DispatchError::Closed),
        }
    }
}

// ── RenderQueue ──────────────────────────────────────────────────

/// Loop-side end. Owned by the rendering context; dropping it closes
/// the channel and releases every waiting producer.
pub struct RenderQueue<S> {
    rx: mpsc::Receiver<Queued<S>>,
}

impl<S> RenderQueue<S> {
    /// Run queued jobs against `state` without blocking. Returns how
    /// many jobs ran. Entries whose producer already gave up are
    /// discarded without counting against [`MAX_JOBS_PER_PUMP`].
    pub fn pump(&self, state: &mut S) -> usize {
        self.drain(state, MAX_JOBS_PER_PUMP)
    }

    /// Wait up to `wait` for a job that is still wanted, run it, then
    /// behave like [`pump`] for the rest of the budget.
    ///
    /// [`pump`]: Self::pump
    pub fn pump_timeout(&self, state: &mut S, wait: Duration) -> usize {
        let deadline = Instant::now() + wait;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok(queued) => {
                    if Self::run(queued, state) {
                        return 1 + self.drain(state, MAX_JOBS_PER_PUMP - 1);
                    }
                }
                Err(_) => return 0,
            }
        }
    }

    fn drain(&self, state: &mut S, budget: usize) -> usize {
        let mut ran = 0;
        while ran < budget {
            match self.rx.try_recv() {
                Ok(queued) => {
                    if Self::run(queued, state) {
                        ran += 1;
                    }
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        ran
    }

    fn run(queued: Queued<S>, state: &mut S) -> bool {
        // Take the job out before running it so the slot lock is not held
        // across user code.
        let Some(job) = take_job(&queued.slot) else {
            trace!("skipping render job abandoned by its producer");
            return false;
        };
        job(state);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn invoke_runs_on_pumping_thread() {
        let (dispatcher, queue) = render_channel::<Vec<u32>>();
        let producer = std::thread::spawn(move || {
            dispatcher.invoke(Duration::from_secs(5), |state: &mut Vec<u32>| {
                state.push(7);
                state.len()
            })
        });

        let mut state = Vec::new();
        let deadline = Instant::now() + Duration::from_secs(5);
        while state.is_empty() && Instant::now() < deadline {
            queue.pump_timeout(&mut state, Duration::from_millis(10));
        }

        assert_eq!(producer.join().unwrap(), Ok(1));
        assert_eq!(state, vec![7]);
    }

    #[test]
    fn invoke_times_out_when_loop_is_blocked() {
        let (dispatcher, queue) = render_channel::<u32>();
        let timeout = Duration::from_millis(50);

        let started = Instant::now();
        let result = dispatcher.invoke(timeout, |n: &mut u32| *n += 1);
        let elapsed = started.elapsed();

        assert_eq!(result, Err(DispatchError::Timeout(timeout)));
        assert!(elapsed >= timeout);
        assert!(elapsed < Duration::from_secs(2));

        // The late job must not run once the loop resumes.
        let mut n = 0;
        assert_eq!(queue.pump(&mut n), 0);
        assert_eq!(n, 0);
    }

    #[test]
    fn timed_out_job_is_dropped_before_invoke_returns() {
        let (dispatcher, queue) = render_channel::<usize>();
        let payload = Arc::new(vec![0u8; 1 << 20]);

        for _ in 0..20 {
            let held = Arc::clone(&payload);
            let result = dispatcher.invoke(Duration::from_millis(1), move |n: &mut usize| {
                *n += held.len();
            });
            assert_eq!(result, Err(DispatchError::Timeout(Duration::from_millis(1))));
            assert_eq!(Arc::strong_count(&payload), 1);
        }

        let mut n = 0;
        assert_eq!(queue.pump(&mut n), 0);
        assert_eq!(n, 0);
    }

    #[test]
    fn abandoned_jobs_do_not_spend_pump_budget() {
        let (dispatcher, queue) = render_channel::<u32>();
        for _ in 0..100 {
            let result = dispatcher.invoke(Duration::from_millis(1), |n: &mut u32| *n += 100);
            assert!(result.is_err());
        }

        let live = dispatcher.clone();
        let producer =
            std::thread::spawn(move || live.invoke(Duration::from_secs(5), |n: &mut u32| *n += 1));

        let mut n = 0;
        assert_eq!(queue.pump_timeout(&mut n, Duration::from_secs(5)), 1);
        assert_eq!(n, 1);
        assert_eq!(producer.join().unwrap(), Ok(()));

        // Same through the non-blocking path: 100 dead entries, then one live.
        for _ in 0..100 {
            let _ = dispatcher.invoke(Duration::from_millis(1), |n: &mut u32| *n += 100);
        }
        let live = dispatcher.clone();
        let producer =
            std::thread::spawn(move || live.invoke(Duration::from_secs(5), |n: &mut u32| *n += 1));
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut ran = 0;
        while ran == 0 && Instant::now() < deadline {
            ran = queue.pump(&mut n);
            std::thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(ran, 1);
        assert_eq!(n, 2);
        assert_eq!(producer.join().unwrap(), Ok(()));
    }

    #[test]
    fn invoke_after_close_fails_fast() {
        let (dispatcher, queue) = render_channel::<u32>();
        drop(queue);
        let result = dispatcher.invoke(Duration::from_secs(5), |_n: &mut u32| ());
        assert_eq!(result, Err(DispatchError::Closed));
    }

    #[test]
    fn queue_dropped_while_waiting_releases_producer() {
        let (dispatcher, queue) = render_channel::<u32>();
        let producer = std::thread::spawn(move || {
            let started = Instant::now();
            let result = dispatcher.invoke(Duration::from_secs(10), |_n: &mut u32| ());
            (result, started.elapsed())
        });

        std::thread::sleep(Duration::from_millis(50));
        drop(queue);

        let (result, elapsed) = producer.join().unwrap();
        assert_eq!(result, Err(DispatchError::Closed));
        assert!(elapsed < Duration::from_secs(5));
    }

    #[test]
    fn pump_is_bounded() {
        let (dispatcher, queue) = render_channel::<u32>();
        let mut handles = Vec::new();
        for _ in 0..(MAX_JOBS_PER_PUMP + 6) {
            let d = dispatcher.clone();
            handles.push(std::thread::spawn(move || {
                d.invoke(Duration::from_secs(5), |n: &mut u32| *n += 1)
            }));
        }

        let mut n = 0;
        let deadline = Instant::now() + Duration::from_secs(5);
        while (n as usize) < MAX_JOBS_PER_PUMP + 6 && Instant::now() < deadline {
            assert!(queue.pump_timeout(&mut n, Duration::from_millis(10)) <= MAX_JOBS_PER_PUMP);
        }
        for h in handles {
            assert!(h.join().unwrap().is_ok());
        }
        assert_eq!(n as usize, MAX_JOBS_PER_PUMP + 6);
    }
}
