//! Inference engine boundary contract.

use onnx_transformers_domain::{ExecutionProvider, NamedTensors, Tensor, TensorSpec};
use onnx_transformers_shared::Result;

/// A loaded inference session.
///
/// Implementations must be shareable across threads; engines that need
/// exclusive access while running serialise calls internally.
pub trait InferenceSessionPort: Send + Sync {
    /// Declared inputs, in graph order.
    fn inputs(&self) -> &[TensorSpec];

    /// Declared outputs, in graph order.
    fn outputs(&self) -> &[TensorSpec];

    /// Execution provider that is actually active for this session.
    fn execution_provider(&self) -> ExecutionProvider;

    /// Run with host inputs and return every declared output in declared order.
    fn run(&self, feeds: &NamedTensors) -> Result<Vec<Tensor>>;

    /// Run through device-bound inputs/outputs and copy outputs back to host.
    ///
    /// Must return the same ordering and values as [`InferenceSessionPort::run`].
    fn run_bound(&self, feeds: &NamedTensors) -> Result<Vec<Tensor>>;
}
