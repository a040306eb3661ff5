use std::sync::{Arc, OnceLock};

/// # OutputSlot
///
/// A write-once cell shared between a caller and the generation its request
/// was accumulated into.
///
/// The dispatching task fills the slot before resolving the generation's
/// completion signal; the caller reads it after the signal resolves.
#[derive(Debug)]
pub(crate) struct OutputSlot<T> {
    cell: Arc<OnceLock<T>>,
}

impl<T> OutputSlot<T> {
    pub(crate) fn new() -> Self {
        Self {
            cell: Arc::new(OnceLock::new()),
        }
    }

    /// Writes the output.
    ///
    /// # Returns
    ///
    /// `false` if the slot had already been filled, in which case `value` is dropped
    pub(crate) fn fill(&self, value: T) -> bool {
        self.cell.set(value).is_ok()
    }

    pub(crate) fn get(&self) -> Option<&T> {
        self.cell.get()
    }
}

impl<T> Clone for OutputSlot<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
        }
    }
}

/// # Request
///
/// Pairs one caller's input with the slot its output will be written to.
///
/// The generation owns the request (and therefore the input) until dispatch,
/// when [`Request::into_parts`] hands the input to the batch processor. The
/// caller only keeps a clone of the [`OutputSlot`].
///
/// ## Type Parameters
///
/// * `I` - The input handed to the batch processor
/// * `O` - The per-request output produced by the batch processor
#[derive(Debug)]
pub(crate) struct Request<I, O> {
    input: I,
    output: OutputSlot<O>,
}

impl<I, O> Request<I, O> {
    /// Creates a request and returns the caller's handle to its output slot.
    pub(crate) fn new(input: I) -> (Self, OutputSlot<O>) {
        let output = OutputSlot::new();
        let handle = output.clone();
        (Self { input, output }, handle)
    }

    pub(crate) fn into_parts(self) -> (I, OutputSlot<O>) {
        (self.input, self.output)
    }
}
