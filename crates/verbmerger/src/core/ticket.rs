use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::FutureExt;
use futures::future::{self, BoxFuture};

use super::request::OutputSlot;
use super::signal::Waiter;
use crate::error::CoalescerError;

/// # Ticket
///
/// The caller's claim on the output of one submitted request.
///
/// A `Ticket` resolves when the generation holding its request resolves,
/// yielding the output written at the request's position or the error the
/// whole generation failed with. The request is already enqueued by the time
/// the ticket exists; dropping the ticket only stops waiting for it.
#[must_use = "a ticket does nothing unless awaited"]
pub struct Ticket<T> {
    inner: BoxFuture<'static, Result<T, CoalescerError>>,
}

impl<T> Ticket<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(mut waiter: Waiter, slot: OutputSlot<T>) -> Self {
        let inner = async move {
            waiter.resolved().await?;
            slot.get().cloned().ok_or(CoalescerError::MissingOutput)
        };
        Self {
            inner: inner.boxed(),
        }
    }

    /// A ticket that fails immediately, for requests that were never enqueued.
    pub(crate) fn failed(error: CoalescerError) -> Self {
        Self {
            inner: future::ready(Err(error)).boxed(),
        }
    }
}

impl<T> fmt::Debug for Ticket<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ticket").finish_non_exhaustive()
    }
}

impl<T> Future for Ticket<T> {
    type Output = Result<T, CoalescerError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.get_mut().inner.as_mut().poll(cx)
    }
}
