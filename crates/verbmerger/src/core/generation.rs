use std::fmt;
use std::mem;

use uuid::Uuid;

use super::request::Request;
use super::signal::{CompletionSignal, Waiter};

/// Upper bound on the request slots reserved up front for a new generation.
const PREALLOCATED_REQUESTS: usize = 64;

/// Identifies one generation for its whole lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct GenerationId(Uuid);

impl GenerationId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for GenerationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One cohort of requests accumulated together and dispatched as a single batch.
///
/// While current, a generation is only reachable through [`PendingBatch`].
/// Once detached it is owned by exactly one task and never receives another
/// request.
pub(crate) struct Generation<I, O> {
    id: GenerationId,
    requests: Vec<Request<I, O>>,
    signal: CompletionSignal,
}

impl<I, O> Generation<I, O> {
    fn with_capacity(max_batch_size: usize) -> Self {
        Self {
            id: GenerationId::new(),
            requests: Vec::with_capacity(max_batch_size.min(PREALLOCATED_REQUESTS)),
            signal: CompletionSignal::new(),
        }
    }

    pub(crate) fn id(&self) -> GenerationId {
        self.id
    }

    pub(crate) fn len(&self) -> usize {
        self.requests.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub(crate) fn into_parts(self) -> (Vec<Request<I, O>>, CompletionSignal) {
        (self.requests, self.signal)
    }
}

/// What the inserting caller has to do once it has left the critical section.
pub(crate) enum FollowUp<I, O> {
    /// The insertion started a new generation; start its timeout monitor.
    Monitor(GenerationId),

    /// The insertion filled the generation, which has already been detached.
    Dispatch(Generation<I, O>),

    /// Nothing beyond waiting on the shared signal.
    Wait,
}

/// Result of inserting one request into the current generation.
pub(crate) struct Insertion<I, O> {
    pub(crate) waiter: Waiter,
    pub(crate) follow_up: FollowUp<I, O>,
}

/// Holder of the current generation.
///
/// `PendingBatch` exposes only two mutations, insert and detach. The caller
/// wraps it in a single mutex; whichever trigger performs the detach owns the
/// generation, and any later trigger for the same generation finds a
/// different id and does nothing.
pub(crate) struct PendingBatch<I, O> {
    max_batch_size: usize,
    current: Generation<I, O>,
}

impl<I, O> PendingBatch<I, O> {
    pub(crate) fn new(max_batch_size: usize) -> Self {
        Self {
            max_batch_size,
            current: Generation::with_capacity(max_batch_size),
        }
    }

    /// Appends a request to the current generation.
    ///
    /// When the request brings the generation to `max_batch_size` the
    /// generation is detached in the same call, so no other insertion can
    /// land in it afterwards. With a maximum of one, every insertion is both
    /// first and full; full wins and no monitor is started.
    pub(crate) fn insert(&mut self, request: Request<I, O>) -> Insertion<I, O> {
        let waiter = self.current.signal.subscribe();
        self.current.requests.push(request);

        let follow_up = if self.current.len() >= self.max_batch_size {
            FollowUp::Dispatch(self.take())
        } else if self.current.len() == 1 {
            FollowUp::Monitor(self.current.id)
        } else {
            FollowUp::Wait
        };

        Insertion { waiter, follow_up }
    }

    /// Detaches the current generation if it is still `id` and holds requests.
    pub(crate) fn take_if(&mut self, id: GenerationId) -> Option<Generation<I, O>> {
        if self.current.id != id || self.current.is_empty() {
            return None;
        }
        Some(self.take())
    }

    #[cfg(test)]
    pub(crate) fn current_id(&self) -> GenerationId {
        self.current.id
    }

    pub(crate) fn current_len(&self) -> usize {
        self.current.len()
    }

    fn take(&mut self) -> Generation<I, O> {
        mem::replace(
            &mut self.current,
            Generation::with_capacity(self.max_batch_size),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(input: u32) -> Request<u32, u32> {
        Request::new(input).0
    }

    #[test]
    fn test_first_insert_starts_monitor() {
        let mut pending = PendingBatch::new(3);
        let id = pending.current_id();

        let insertion = pending.insert(request(1));
        assert!(matches!(insertion.follow_up, FollowUp::Monitor(monitored) if monitored == id));

        let insertion = pending.insert(request(2));
        assert!(matches!(insertion.follow_up, FollowUp::Wait));
        assert_eq!(pending.current_len(), 2);
    }

    #[test]
    fn test_full_insert_detaches_generation() {
        let mut pending = PendingBatch::new(3);
        let id = pending.current_id();
        pending.insert(request(1));
        pending.insert(request(2));

        let insertion = pending.insert(request(3));
        let FollowUp::Dispatch(generation) = insertion.follow_up else {
            panic!("expected the full generation to be detached");
        };
        assert_eq!(generation.id(), id);
        assert_eq!(generation.len(), 3);

        assert_ne!(pending.current_id(), id);
        assert_eq!(pending.current_len(), 0);
    }

    #[test]
    fn test_single_slot_batches_dispatch_immediately() {
        let mut pending = PendingBatch::new(1);
        let insertion = pending.insert(request(1));
        assert!(matches!(insertion.follow_up, FollowUp::Dispatch(ref g) if g.len() == 1));
    }

    #[test]
    fn test_stale_take_is_noop() {
        let mut pending = PendingBatch::new(2);
        let first = pending.current_id();
        pending.insert(request(1));
        pending.insert(request(2));

        // The full insertion already detached `first`; a late timer must not
        // steal the replacement generation.
        pending.insert(request(3));
        assert!(pending.take_if(first).is_none());
        assert_eq!(pending.current_len(), 1);
    }

    #[test]
    fn test_take_preserves_insertion_order() {
        let mut pending = PendingBatch::new(10);
        let id = pending.current_id();
        for input in [4, 8, 15] {
            pending.insert(request(input));
        }

        let generation = pending.take_if(id).unwrap();
        let (requests, _signal) = generation.into_parts();
        let inputs: Vec<_> = requests.into_iter().map(|r| r.into_parts().0).collect();
        assert_eq!(inputs, vec![4, 8, 15]);
    }

    #[test]
    fn test_huge_batch_size_reserves_bounded_capacity() {
        let mut pending = PendingBatch::<u32, u32>::new(usize::MAX / 2);
        assert!(pending.current.requests.capacity() <= PREALLOCATED_REQUESTS);

        let insertion = pending.insert(request(1));
        assert!(matches!(insertion.follow_up, FollowUp::Monitor(_)));
        assert_eq!(pending.current_len(), 1);
    }

    #[test]
    fn test_empty_generation_is_not_taken() {
        let mut pending = PendingBatch::<u32, u32>::new(4);
        let id = pending.current_id();
        assert!(pending.take_if(id).is_none());
    }
}
