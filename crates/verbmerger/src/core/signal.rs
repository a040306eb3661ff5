//! Single-resolution, multi-waiter completion signal.
//!
//! Every request in a generation waits on the same signal. Resolving it
//! consumes the [`CompletionSignal`], so a generation can be resolved at most
//! once; a signal dropped without resolution wakes its waiters with
//! [`CoalescerError::Abandoned`].

use tokio::sync::watch;

use crate::error::CoalescerError;

pub(crate) type Outcome = Result<(), CoalescerError>;

/// Resolving side of a generation's completion signal.
#[derive(Debug)]
pub(crate) struct CompletionSignal {
    sender: watch::Sender<Option<Outcome>>,
}

impl CompletionSignal {
    pub(crate) fn new() -> Self {
        let (sender, _) = watch::channel(None);
        Self { sender }
    }

    /// Creates a new waiter on this signal.
    pub(crate) fn subscribe(&self) -> Waiter {
        Waiter {
            receiver: self.sender.subscribe(),
        }
    }

    /// Resolves the signal and releases every current waiter at once.
    pub(crate) fn resolve(self, outcome: Outcome) {
        // Stored even when no waiter is left, so late subscribers still see it.
        self.sender.send_replace(Some(outcome));
    }
}

/// Waiting side of a [`CompletionSignal`].
#[derive(Debug, Clone)]
pub(crate) struct Waiter {
    receiver: watch::Receiver<Option<Outcome>>,
}

impl Waiter {
    /// Waits until the generation resolves.
    ///
    /// # Returns
    ///
    /// The generation's outcome, or [`CoalescerError::Abandoned`] if the
    /// signal was dropped unresolved
    pub(crate) async fn resolved(&mut self) -> Outcome {
        match self.receiver.wait_for(Option::is_some).await {
            Ok(outcome) => outcome.clone().unwrap_or(Err(CoalescerError::Abandoned)),
            Err(_) => Err(CoalescerError::Abandoned),
        }
    }
}
