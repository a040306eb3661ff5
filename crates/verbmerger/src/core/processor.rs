use std::sync::Arc;

use async_trait::async_trait;

/// The downstream collaborator that turns a batch of inputs into a batch of outputs.
///
/// A processor is typically an expensive external call (model inference,
/// a remote API) whose cost is dominated by fixed overhead, so serving many
/// inputs in one call is far cheaper than serving them one at a time.
///
/// # Contract
///
/// Implementations must:
/// * Return exactly one output per input
/// * Return outputs in the same order as the inputs
/// * Fail the whole batch with an error rather than return partial results
///
/// A result count that differs from the input count is treated as a failure
/// of the whole batch; outputs are never truncated or padded.
///
/// # Example
///
/// ```ignore
/// use verbmerger::core::BatchProcessor;
/// use async_trait::async_trait;
///
/// struct Uppercase;
///
/// #[async_trait]
/// impl BatchProcessor for Uppercase {
///     type Input = String;
///     type Output = String;
///     type Error = std::convert::Infallible;
///
///     async fn process(&self, inputs: Vec<String>) -> Result<Vec<String>, Self::Error> {
///         Ok(inputs.into_iter().map(|s| s.to_uppercase()).collect())
///     }
/// }
/// ```
#[async_trait]
pub trait BatchProcessor: Send + Sync + 'static {
    type Input: Send + 'static;
    type Output: Clone + Send + Sync + 'static;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Processes one batch.
    ///
    /// # Parameters
    ///
    /// * `inputs` - The batch, in submission order
    ///
    /// # Returns
    ///
    /// One output per input, in the same order
    async fn process(&self, inputs: Vec<Self::Input>) -> Result<Vec<Self::Output>, Self::Error>;
}

#[async_trait]
impl<P> BatchProcessor for Arc<P>
where
    P: BatchProcessor,
{
    type Input = P::Input;
    type Output = P::Output;
    type Error = P::Error;

    async fn process(&self, inputs: Vec<Self::Input>) -> Result<Vec<Self::Output>, Self::Error> {
        (**self).process(inputs).await
    }
}
