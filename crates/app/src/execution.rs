//! Inference execution over a session port.

use onnx_transformers_domain::{NamedTensors, Tensor};
use onnx_transformers_ports::InferenceSessionPort;
use onnx_transformers_shared::{ErrorEnvelope, Result};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// How feeds reach the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionPath {
    /// Host tensors passed straight to `run`.
    Direct,
    /// Inputs and outputs bound to device memory first.
    Bound,
}

impl fmt::Display for ExecutionPath {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::Direct => "direct",
            Self::Bound => "bound",
        })
    }
}

/// Runs encoded feeds through a session on a fixed path.
#[derive(Clone)]
pub struct InferenceExecutor {
    session: Arc<dyn InferenceSessionPort>,
    path: ExecutionPath,
}

impl fmt::Debug for InferenceExecutor {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("InferenceExecutor")
            .field("path", &self.path)
            .field("provider", &self.session.execution_provider())
            .finish_non_exhaustive()
    }
}

impl InferenceExecutor {
    /// Pick the bound path for accelerator sessions, direct otherwise.
    #[must_use]
    pub fn new(session: Arc<dyn InferenceSessionPort>) -> Self {
        let path = if session.execution_provider().is_accelerator() {
            ExecutionPath::Bound
        } else {
            ExecutionPath::Direct
        };
        Self { session, path }
    }

    /// Force a path.
    #[must_use]
    pub fn with_path(mut self, path: ExecutionPath) -> Self {
        self.path = path;
        self
    }

    /// Active path.
    #[must_use]
    pub const fn path(&self) -> ExecutionPath {
        self.path
    }

    /// Underlying session.
    #[must_use]
    pub fn session(&self) -> &Arc<dyn InferenceSessionPort> {
        &self.session
    }

    /// Run the session and return outputs in declared order.
    pub fn execute(&self, feeds: &NamedTensors) -> Result<Vec<Tensor>> {
        let started_at = Instant::now();
        let outputs = match self.path {
            ExecutionPath::Direct => self.session.run(feeds)?,
            ExecutionPath::Bound => self.session.run_bound(feeds)?,
        };

        let declared = self.session.outputs().len();
        if outputs.len() != declared {
            return Err(ErrorEnvelope::inference(
                "output_count_mismatch",
                format!(
                    "session returned {} outputs but declares {declared}",
                    outputs.len()
                ),
            ));
        }

        tracing::debug!(
            path = %self.path,
            rows = feeds
                .iter()
                .next()
                .and_then(|(_, tensor)| tensor.shape().first().copied())
                .unwrap_or(0),
            elapsed_ms = duration_ms(started_at),
            "inference executed"
        );
        Ok(outputs)
    }
}

fn duration_ms(started_at: Instant) -> u64 {
    u64::try_from(started_at.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use onnx_transformers_domain::{Dimension, ElementType, ExecutionProvider, TensorSpec};
    use onnx_transformers_testkit::{InMemorySession, RunKind};

    fn session(provider: ExecutionProvider) -> InMemorySession {
        let batch = || Dimension::Symbolic("batch".to_owned());
        InMemorySession::new(
            vec![TensorSpec::new(
                "input_ids",
                ElementType::Int64,
                vec![batch(), Dimension::Symbolic("sequence".to_owned())],
            )],
            vec![
                TensorSpec::new(
                    "embedding",
                    ElementType::Float32,
                    vec![batch(), Dimension::Fixed(4)],
                ),
                TensorSpec::new(
                    "logits",
                    ElementType::Float32,
                    vec![batch(), Dimension::Fixed(1)],
                ),
            ],
        )
        .with_provider(provider)
    }

    fn feeds() -> Result<NamedTensors> {
        let mut feeds = NamedTensors::new();
        feeds.insert(
            "input_ids",
            Tensor::from_i64(vec![2, 3], vec![2, 7, 3, 2, 9, 3])?,
        );
        Ok(feeds)
    }

    #[test]
    fn accelerator_sessions_use_the_bound_path() -> Result<()> {
        let session = Arc::new(session(ExecutionProvider::Accelerator));
        let executor = InferenceExecutor::new(session.clone());
        assert_eq!(executor.path(), ExecutionPath::Bound);

        executor.execute(&feeds()?)?;
        let kinds: Vec<RunKind> = session.runs().iter().map(|run| run.kind).collect();
        assert_eq!(kinds, [RunKind::Bound]);
        Ok(())
    }

    #[test]
    fn cpu_sessions_use_the_direct_path() {
        let executor = InferenceExecutor::new(Arc::new(session(ExecutionProvider::Cpu)));
        assert_eq!(executor.path(), ExecutionPath::Direct);
        assert_eq!(executor.path().to_string(), "direct");
    }

    fn bits(tensor: &Tensor) -> Vec<u32> {
        tensor
            .as_f32()
            .unwrap_or_default()
            .iter()
            .map(|value| value.to_bits())
            .collect()
    }

    #[test]
    fn bound_and_direct_outputs_are_identical() -> Result<()> {
        let session: Arc<dyn InferenceSessionPort> = Arc::new(session(ExecutionProvider::Cpu));
        let feeds = feeds()?;

        let direct = InferenceExecutor::new(session.clone())
            .with_path(ExecutionPath::Direct)
            .execute(&feeds)?;
        let bound = InferenceExecutor::new(session)
            .with_path(ExecutionPath::Bound)
            .execute(&feeds)?;

        assert_eq!(direct.len(), 2);
        for (left, right) in direct.iter().zip(&bound) {
            assert_eq!(left.shape(), right.shape());
            assert_eq!(bits(left), bits(right));
        }
        Ok(())
    }

    #[test]
    fn output_count_mismatch_is_an_inference_error() -> Result<()> {
        let session = session(ExecutionProvider::Cpu).with_responder(|_| Ok(Vec::new()));
        let error = InferenceExecutor::new(Arc::new(session))
            .execute(&feeds()?)
            .err();

        assert!(error.is_some_and(|error| {
            error.is_inference_error() && error.code.code() == "output_count_mismatch"
        }));
        Ok(())
    }

    #[test]
    fn engine_errors_propagate_untouched() -> Result<()> {
        let session = session(ExecutionProvider::Cpu).with_responder(|_| {
            Err(ErrorEnvelope::inference("run_failed", "engine exploded"))
        });
        let error = InferenceExecutor::new(Arc::new(session))
            .execute(&feeds()?)
            .err();

        assert!(error.is_some_and(|error| error.message == "engine exploded"));
        Ok(())
    }
}
