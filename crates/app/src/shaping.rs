//! Raw engine outputs to caller-facing results.

use onnx_transformers_domain::{DEFAULT_OUTPUT_NAME, NamedTensors, Tensor};
use onnx_transformers_shared::{ErrorEnvelope, Result};
use serde::Serialize;

/// Result of one model call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ModelOutput {
    /// The single or selected output.
    Tensor(Tensor),
    /// Every output by name, in declared order.
    Named(NamedTensors),
}

impl ModelOutput {
    /// The tensor, when a single output was returned.
    #[must_use]
    pub const fn as_tensor(&self) -> Option<&Tensor> {
        match self {
            Self::Tensor(tensor) => Some(tensor),
            Self::Named(_) => None,
        }
    }

    /// The output map, when several outputs were returned.
    #[must_use]
    pub const fn as_named(&self) -> Option<&NamedTensors> {
        match self {
            Self::Tensor(_) => None,
            Self::Named(outputs) => Some(outputs),
        }
    }

    /// Take the tensor, or the first declared output of a map.
    #[must_use]
    pub fn into_primary(self) -> Option<Tensor> {
        match self {
            Self::Tensor(tensor) => Some(tensor),
            Self::Named(outputs) => outputs.into_iter().next().map(|(_, tensor)| tensor),
        }
    }
}

/// Pair raw outputs with their declared names and pick the caller's view.
///
/// One output is returned as-is. With several, `output_name` selects one
/// when present. The default output name falls back to the whole map; any
/// other name that the model does not declare is an `inference:output_not_found`
/// error.
pub fn shape_outputs(
    raw: Vec<Tensor>,
    output_names: &[String],
    output_name: &str,
    squeeze: bool,
) -> Result<ModelOutput> {
    if raw.is_empty() {
        return Err(ErrorEnvelope::inference(
            "output_count_mismatch",
            "session returned no outputs",
        ));
    }
    if raw.len() != output_names.len() {
        return Err(ErrorEnvelope::inference(
            "output_count_mismatch",
            format!(
                "session returned {} outputs for {} declared names",
                raw.len(),
                output_names.len()
            ),
        ));
    }

    let finish = |tensor: Tensor| if squeeze { tensor.squeeze() } else { tensor };

    let raw = match <[Tensor; 1]>::try_from(raw) {
        Ok([tensor]) => return Ok(ModelOutput::Tensor(finish(tensor))),
        Err(raw) => raw,
    };

    let mut named: NamedTensors = output_names.iter().cloned().zip(raw).collect();
    if let Some(selected) = named.remove(output_name) {
        return Ok(ModelOutput::Tensor(finish(selected)));
    }
    if output_name != DEFAULT_OUTPUT_NAME {
        return Err(ErrorEnvelope::inference(
            "output_not_found",
            format!("model has no output named `{output_name}`"),
        )
        .with_metadata("output_name", output_name)
        .with_metadata("declared", output_names.join(",")));
    }
    Ok(ModelOutput::Named(
        named
            .into_iter()
            .map(|(name, tensor)| (name, finish(tensor)))
            .collect(),
    ))
}

/// Map logits to probabilities.
#[must_use]
pub fn sigmoid(tensor: Tensor) -> Tensor {
    tensor.map_f32(logistic)
}

fn logistic(value: f32) -> f32 {
    1.0 / (1.0 + (-value).exp())
}
