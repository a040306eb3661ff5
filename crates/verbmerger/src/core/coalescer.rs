use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, error, info, trace, warn};

use super::generation::{FollowUp, Generation, GenerationId, Insertion, PendingBatch};
use super::processor::BatchProcessor;
use super::request::Request;
use super::signal::Waiter;
use super::stats::{CoalescerCounters, CoalescerStats, DispatchReason};
use super::ticket::Ticket;
use super::worker::BatchWorkers;
use crate::config::CoalescerConfig;
use crate::error::CoalescerError;

type PendingOf<P> = PendingBatch<<P as BatchProcessor>::Input, <P as BatchProcessor>::Output>;
type GenerationOf<P> = Generation<<P as BatchProcessor>::Input, <P as BatchProcessor>::Output>;

/// Accumulates concurrently submitted requests into bounded batches.
///
/// Exactly one generation is current at any time. A generation is detached
/// and dispatched to the [`BatchProcessor`] as soon as either
///
/// - it holds `max_batch_size` requests (the insertion that fills it detaches
///   it inside the same critical section), or
/// - `batch_interval` has elapsed since its first request (its timeout
///   monitor detaches it, unless fullness got there first).
///
/// Each caller receives the output at its own position in the batch, or the
/// error the whole batch failed with.
///
/// # Cancellation
///
/// [`cancel`](Self::cancel), [`shutdown`](Self::shutdown) and dropping the
/// coalescer release the generation that is still accumulating with
/// [`CoalescerError::Cancelled`]. A batch already handed to the processor is
/// left to complete. Submissions after cancellation fail immediately.
///
/// # Runtime
///
/// [`submit`](Self::submit) spawns monitor and dispatch tasks and therefore
/// has to be called from within a tokio runtime.
pub struct BatchCoalescer<P>
where
    P: BatchProcessor,
{
    shared: Arc<Shared<P>>,
}

struct Shared<P>
where
    P: BatchProcessor,
{
    /// The single mutual-exclusion boundary around the current generation
    pending: Mutex<PendingOf<P>>,

    processor: P,

    config: CoalescerConfig,

    workers: BatchWorkers,

    counters: CoalescerCounters,
}

impl<P> BatchCoalescer<P>
where
    P: BatchProcessor,
{
    pub fn new(processor: P, config: CoalescerConfig) -> Self {
        let shared = Shared {
            pending: Mutex::new(PendingBatch::new(config.max_batch_size())),
            processor,
            config,
            workers: BatchWorkers::new(),
            counters: CoalescerCounters::default(),
        };
        Self {
            shared: Arc::new(shared),
        }
    }

    /// Submits one input for batched processing.
    ///
    /// The input is appended to the current generation before this method
    /// returns. Any follow-up work (starting the generation's timeout monitor,
    /// or dispatching it when this input filled it) runs on a spawned task
    /// after the lock is released.
    ///
    /// # Returns
    ///
    /// A [`Ticket`] resolving to this input's output
    pub fn submit(&self, input: P::Input) -> Ticket<P::Output> {
        let (request, slot) = Request::new(input);

        let Insertion { waiter, follow_up } = {
            let mut pending = self.shared.lock_pending();
            if self.shared.workers.is_cancelled() {
                return Ticket::failed(CoalescerError::Cancelled);
            }
            pending.insert(request)
        };
        self.shared.counters.record_submitted();

        match follow_up {
            FollowUp::Monitor(id) => self.shared.spawn_monitor(id, waiter.clone()),
            FollowUp::Dispatch(generation) => {
                self.shared.spawn_dispatch(generation, DispatchReason::Full)
            }
            FollowUp::Wait => {}
        }

        Ticket::new(waiter, slot)
    }

    pub fn config(&self) -> &CoalescerConfig {
        &self.shared.config
    }

    pub fn stats(&self) -> CoalescerStats {
        self.shared.counters.snapshot()
    }

    /// Number of requests in the generation that is currently accumulating.
    pub fn pending_len(&self) -> usize {
        self.shared.lock_pending().current_len()
    }

    /// Number of monitor and dispatch tasks still running.
    pub fn active_tasks(&self) -> usize {
        self.shared.workers.active()
    }

    /// Releases the accumulating generation and rejects further submissions.
    pub fn cancel(&self) {
        self.shared.workers.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.workers.is_cancelled()
    }

    /// Cancels, then waits for every in-flight dispatch to complete.
    pub async fn shutdown(&self) {
        self.shared.workers.shutdown().await;
        debug!("coalescer shut down");
    }
}

impl<P> Drop for BatchCoalescer<P>
where
    P: BatchProcessor,
{
    fn drop(&mut self) {
        self.shared.workers.cancel();
    }
}

impl<P> Shared<P>
where
    P: BatchProcessor,
{
    fn lock_pending(&self) -> MutexGuard<'_, PendingOf<P>> {
        // Nothing inside the critical section can panic.
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Detaches generation `id` if it is still the current one.
    fn detach(&self, id: GenerationId) -> Option<GenerationOf<P>> {
        self.lock_pending().take_if(id)
    }

    fn spawn_monitor(self: &Arc<Self>, id: GenerationId, waiter: Waiter) {
        let shared = Arc::clone(self);
        self.workers
            .spawn(async move { shared.monitor(id, waiter).await });
    }

    fn spawn_dispatch(self: &Arc<Self>, generation: GenerationOf<P>, reason: DispatchReason) {
        let shared = Arc::clone(self);
        self.workers
            .spawn(async move { shared.dispatch(generation, reason).await });
    }

    /// Waits out the batch interval of one generation.
    ///
    /// Races the interval against the generation resolving (it was filled and
    /// dispatched elsewhere) and against coalescer cancellation.
    async fn monitor(&self, id: GenerationId, mut waiter: Waiter) {
        tokio::select! {
            _ = tokio::time::sleep(self.config.batch_interval()) => {
                match self.detach(id) {
                    Some(generation) => self.dispatch(generation, DispatchReason::Timeout).await,
                    None => trace!(generation = %id, "generation already detached"),
                }
            }
            _ = waiter.resolved() => {
                trace!(generation = %id, "generation resolved within its interval");
            }
            _ = self.workers.cancelled() => {
                if let Some(generation) = self.detach(id) {
                    self.release_cancelled(generation);
                }
            }
        }
    }

    /// Runs the batch processor over a detached generation and publishes the outcome.
    async fn dispatch(&self, generation: GenerationOf<P>, reason: DispatchReason) {
        let id = generation.id();
        let size = generation.len();
        self.counters.record_dispatched(reason);
        debug!(generation = %id, size, reason = reason.as_str(), "dispatching batch");

        let (requests, signal) = generation.into_parts();
        let (inputs, slots): (Vec<_>, Vec<_>) =
            requests.into_iter().map(Request::into_parts).unzip();

        let outcome = match self.processor.process(inputs).await {
            Ok(outputs) if outputs.len() == slots.len() => {
                for (slot, output) in slots.iter().zip(outputs) {
                    slot.fill(output);
                }
                info!(generation = %id, size, "batch completed");
                Ok(())
            }
            Ok(outputs) => {
                error!(
                    generation = %id,
                    expected = size,
                    actual = outputs.len(),
                    "batch processor returned the wrong number of results"
                );
                Err(CoalescerError::ResultCountMismatch {
                    expected: size,
                    actual: outputs.len(),
                })
            }
            Err(err) => {
                warn!(generation = %id, size, error = %err, "batch processor failed");
                Err(CoalescerError::processor(err))
            }
        };

        if outcome.is_err() {
            self.counters.record_failed();
        }
        signal.resolve(outcome);
    }

    fn release_cancelled(&self, generation: GenerationOf<P>) {
        warn!(
            generation = %generation.id(),
            size = generation.len(),
            "releasing undispatched batch on cancellation"
        );
        self.counters.record_cancelled();
        let (_requests, signal) = generation.into_parts();
        signal.resolve(Err(CoalescerError::Cancelled));
    }
}
