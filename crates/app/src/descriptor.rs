//! Model I/O signature read from a live session.

use crate::tokenization::InputKind;
use onnx_transformers_domain::{Dimension, ModelConfig, ModelIo, NetworkInfo};
use onnx_transformers_ports::InferenceSessionPort;
use onnx_transformers_shared::{ErrorEnvelope, Result};

/// Declared inputs of the session.
#[must_use]
pub fn input_signature(session: &dyn InferenceSessionPort) -> ModelIo {
    ModelIo::from_specs(session.inputs())
}

/// Declared outputs of the session.
#[must_use]
pub fn output_signature(session: &dyn InferenceSessionPort) -> ModelIo {
    ModelIo::from_specs(session.outputs())
}

/// Inputs and outputs of the session.
#[must_use]
pub fn network_info(session: &dyn InferenceSessionPort) -> NetworkInfo {
    NetworkInfo::from_specs(session.inputs(), session.outputs())
}

/// Size of the second axis of the first declared output.
///
/// Symbolic or missing extents fall back to `dim` from `config.json`.
pub fn output_dim(session: &dyn InferenceSessionPort, model_config: &ModelConfig) -> Result<i64> {
    let first = session.outputs().first();
    let declared = first.and_then(|spec| spec.shape.get(1));

    if let Some(Dimension::Fixed(dim)) = declared {
        return Ok(*dim);
    }

    tracing::warn!(
        output = first.map_or("<none>", |spec| spec.name.as_str()),
        declared = ?declared,
        fallback = ?model_config.dim,
        "output dimension is not static, falling back to config.json `dim`"
    );

    model_config.dim.ok_or_else(|| {
        ErrorEnvelope::configuration(
            "output_dim_unresolved",
            "output dimension is symbolic and config.json has no `dim`",
        )
        .with_metadata(
            "config_path",
            model_config.config_path.to_string_lossy().to_string(),
        )
    })
}

/// Sequence length the model itself imposes, if any.
///
/// A static, positive sequence axis on the ids input wins over
/// `max_position_embeddings`.
#[must_use]
pub fn model_sequence_cap(network: &NetworkInfo, model_config: &ModelConfig) -> Option<usize> {
    let declared = network
        .input_names()
        .iter()
        .find(|name| InputKind::classify(name) == Some(InputKind::InputIds))
        .and_then(|name| network.input_shape(name))
        .and_then(|shape| shape.get(1))
        .and_then(Dimension::as_fixed)
        .filter(|extent| *extent > 0)
        .and_then(|extent| usize::try_from(extent).ok());

    declared.or(model_config.max_position_embeddings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use onnx_transformers_domain::{ElementType, TensorSpec};
    use onnx_transformers_testkit::InMemorySession;

    fn symbolic(name: &str) -> Dimension {
        Dimension::Symbolic(name.to_owned())
    }

    fn session_with_output(shape: Vec<Dimension>) -> InMemorySession {
        InMemorySession::new(
            vec![TensorSpec::new(
                "input_ids",
                ElementType::Int64,
                vec![symbolic("batch"), Dimension::Fixed(128)],
            )],
            vec![TensorSpec::new("embedding", ElementType::Float32, shape)],
        )
    }

    #[test]
    fn static_output_dim_is_read_from_the_graph() -> Result<()> {
        let session = session_with_output(vec![symbolic("batch"), Dimension::Fixed(384)]);
        assert_eq!(output_dim(&session, &ModelConfig::default())?, 384);
        Ok(())
    }

    #[test]
    fn symbolic_output_dim_falls_back_to_config() -> Result<()> {
        let session = session_with_output(vec![symbolic("batch"), symbolic("hidden")]);
        let config = ModelConfig {
            dim: Some(768),
            ..ModelConfig::default()
        };
        assert_eq!(output_dim(&session, &config)?, 768);
        Ok(())
    }

    #[test]
    fn unresolvable_output_dim_is_a_configuration_error() {
        let session = session_with_output(vec![symbolic("batch"), symbolic("hidden")]);
        let error = output_dim(&session, &ModelConfig::default()).err();

        assert!(error.is_some_and(|error| {
            error.is_configuration_error() && error.code.code() == "output_dim_unresolved"
        }));
    }

    #[test]
    fn sequence_cap_prefers_static_input_axis() {
        let session = session_with_output(vec![symbolic("batch"), Dimension::Fixed(8)]);
        let config = ModelConfig {
            max_position_embeddings: Some(512),
            ..ModelConfig::default()
        };

        assert_eq!(model_sequence_cap(&network_info(&session), &config), Some(128));
        assert_eq!(
            model_sequence_cap(&NetworkInfo::default(), &config),
            Some(512)
        );
    }

    #[test]
    fn signatures_follow_declaration_order() {
        let session = session_with_output(vec![symbolic("batch"), Dimension::Fixed(8)]);
        assert_eq!(input_signature(&session).names(), ["input_ids"]);
        assert_eq!(output_signature(&session).names(), ["embedding"]);
    }
}
