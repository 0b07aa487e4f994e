//! Model call surface.
//!
//! [`ModelRuntime`] owns everything a loaded model needs. [`Encoder`] runs
//! text through it and shapes the outputs; [`CrossEncoder`] reduces the
//! result to one score per pair.

use crate::descriptor;
use crate::execution::InferenceExecutor;
use crate::shaping::{ModelOutput, shape_outputs, sigmoid};
use crate::tokenization::{EncodedInputs, TokenizerAdapter};
use onnx_transformers_config::resolve_call_config;
use onnx_transformers_domain::{
    EncodingConfig, ModelConfig, ModelInfo, NetworkInfo, Tensor, TextInput, TokenizerDescriptor,
};
use onnx_transformers_ports::{FastTokenizerPort, InferenceSessionPort};
use onnx_transformers_shared::{ErrorEnvelope, Result};
use std::sync::Arc;

/// Metadata loaded alongside a model graph.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelMetadata {
    /// `info.json`.
    pub info: ModelInfo,
    /// `config.json`.
    pub config: ModelConfig,
    /// Model-level encoding config.
    pub encoding_config: EncodingConfig,
}

/// A loaded model: session, tokenizer and metadata.
#[derive(Debug, Clone)]
pub struct ModelRuntime {
    executor: InferenceExecutor,
    tokenizer: TokenizerAdapter,
    network: NetworkInfo,
    metadata: ModelMetadata,
}

impl ModelRuntime {
    /// Assemble a runtime. The tokenizer learns the model's sequence cap
    /// from the session signature and `config.json`.
    #[must_use]
    pub fn new(
        session: Arc<dyn InferenceSessionPort>,
        tokenizer: Arc<dyn FastTokenizerPort>,
        descriptor: TokenizerDescriptor,
        metadata: ModelMetadata,
    ) -> Self {
        let network = descriptor::network_info(session.as_ref());
        let cap = descriptor::model_sequence_cap(&network, &metadata.config);
        Self {
            executor: InferenceExecutor::new(session),
            tokenizer: TokenizerAdapter::new(tokenizer, descriptor).with_model_cap(cap),
            network,
            metadata,
        }
    }

    /// Executor bound to the session.
    #[must_use]
    pub const fn executor(&self) -> &InferenceExecutor {
        &self.executor
    }

    /// Tokenizer adapter.
    #[must_use]
    pub const fn tokenizer(&self) -> &TokenizerAdapter {
        &self.tokenizer
    }
}

/// Text in, shaped model outputs out.
#[derive(Debug, Clone)]
pub struct Encoder {
    runtime: ModelRuntime,
}

impl Encoder {
    /// Wrap a runtime.
    #[must_use]
    pub const fn new(runtime: ModelRuntime) -> Self {
        Self { runtime }
    }

    /// Encode, run and shape. Single inputs are squeezed.
    pub fn call(
        &self,
        input: &TextInput,
        override_config: Option<&EncodingConfig>,
    ) -> Result<ModelOutput> {
        let config = resolve_call_config(&self.runtime.metadata.encoding_config, override_config);
        let encoded = self
            .runtime
            .tokenizer
            .encode(input, config, &self.runtime.network)?;
        let raw = self.runtime.executor.execute(&encoded.feeds)?;
        shape_outputs(
            raw,
            self.runtime.network.output_names(),
            &config.output_name,
            input.is_single(),
        )
    }

    /// Only produce the model-input tensors.
    pub fn encode(
        &self,
        input: &TextInput,
        override_config: Option<&EncodingConfig>,
    ) -> Result<EncodedInputs> {
        let config = resolve_call_config(&self.runtime.metadata.encoding_config, override_config);
        self.runtime
            .tokenizer
            .encode(input, config, &self.runtime.network)
    }

    /// Second-axis extent of the first output.
    pub fn output_dim(&self) -> Result<i64> {
        descriptor::output_dim(
            self.runtime.executor.session().as_ref(),
            &self.runtime.metadata.config,
        )
    }

    /// Declared inputs and outputs.
    #[must_use]
    pub const fn network_info(&self) -> &NetworkInfo {
        &self.runtime.network
    }

    /// `info.json`.
    #[must_use]
    pub const fn model_info(&self) -> &ModelInfo {
        &self.runtime.metadata.info
    }

    /// `config.json`.
    #[must_use]
    pub const fn model_config(&self) -> &ModelConfig {
        &self.runtime.metadata.config
    }

    /// Model-level encoding config.
    #[must_use]
    pub const fn encoding_config(&self) -> &EncodingConfig {
        &self.runtime.metadata.encoding_config
    }

    /// Underlying runtime.
    #[must_use]
    pub const fn runtime(&self) -> &ModelRuntime {
        &self.runtime
    }
}

/// Scores sequence pairs.
#[derive(Debug, Clone)]
pub struct CrossEncoder {
    encoder: Encoder,
    use_sigmoid: bool,
}

impl CrossEncoder {
    /// Wrap a runtime. With `use_sigmoid` scores are probabilities.
    #[must_use]
    pub const fn new(runtime: ModelRuntime, use_sigmoid: bool) -> Self {
        Self {
            encoder: Encoder::new(runtime),
            use_sigmoid,
        }
    }

    /// Score the input. Every unit axis is removed.
    pub fn call(
        &self,
        input: &TextInput,
        override_config: Option<&EncodingConfig>,
    ) -> Result<Tensor> {
        let scores = self
            .encoder
            .call(input, override_config)?
            .into_primary()
            .ok_or_else(|| {
                ErrorEnvelope::inference("output_count_mismatch", "model produced no scores")
            })?
            .squeeze();

        Ok(if self.use_sigmoid {
            sigmoid(scores)
        } else {
            scores
        })
    }

    /// Returns true when logits are mapped to probabilities.
    #[must_use]
    pub const fn uses_sigmoid(&self) -> bool {
        self.use_sigmoid
    }

    /// Underlying encoder.
    #[must_use]
    pub const fn encoder(&self) -> &Encoder {
        &self.encoder
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use onnx_transformers_domain::{Dimension, ElementType, NamedTensors, TensorSpec};
    use onnx_transformers_testkit::{InMemorySession, WhitespaceTokenizer};

    const WORDS: [&str; 4] = ["what", "is", "rust", "language"];

    fn symbolic(name: &str) -> Dimension {
        Dimension::Symbolic(name.to_owned())
    }

    fn bert_inputs() -> Vec<TensorSpec> {
        ["input_ids", "attention_mask", "token_type_ids"]
            .into_iter()
            .map(|name| {
                TensorSpec::new(
                    name,
                    ElementType::Int64,
                    vec![symbolic("batch"), symbolic("sequence")],
                )
            })
            .collect()
    }

    fn metadata(encoding_config: EncodingConfig) -> ModelMetadata {
        ModelMetadata {
            info: ModelInfo {
                group: "test".to_owned(),
                name: "tiny".to_owned(),
                version: "1.0.0".to_owned(),
                license: None,
                size: None,
                labels: Vec::new(),
                quantization: None,
                optimization: None,
                opset_version: None,
                exporter_version: None,
                base_model: std::collections::BTreeMap::new(),
                libraries: std::collections::BTreeMap::new(),
                python: None,
            },
            config: ModelConfig {
                dim: Some(4),
                ..ModelConfig::default()
            },
            encoding_config,
        }
    }

    fn runtime(session: InMemorySession, encoding_config: EncodingConfig) -> ModelRuntime {
        ModelRuntime::new(
            Arc::new(session),
            Arc::new(WhitespaceTokenizer::with_vocab(&WORDS)),
            WhitespaceTokenizer::descriptor(),
            metadata(encoding_config),
        )
    }

    fn embedding_session() -> InMemorySession {
        InMemorySession::new(
            bert_inputs(),
            vec![TensorSpec::new(
                "embedding",
                ElementType::Float32,
                vec![symbolic("batch"), Dimension::Fixed(4)],
            )],
        )
    }

    fn rows(feeds: &NamedTensors) -> usize {
        feeds
            .get("input_ids")
            .and_then(|tensor| tensor.shape().first().copied())
            .unwrap_or(0)
    }

    /// Hidden states plus a `[rows, 1]` logit of `0.0` per row.
    fn classifier_session() -> InMemorySession {
        InMemorySession::new(
            bert_inputs(),
            vec![
                TensorSpec::new(
                    "last_hidden_state",
                    ElementType::Float32,
                    vec![symbolic("batch"), symbolic("sequence"), Dimension::Fixed(2)],
                ),
                TensorSpec::new(
                    "logits",
                    ElementType::Float32,
                    vec![symbolic("batch"), Dimension::Fixed(1)],
                ),
            ],
        )
        .with_responder(|feeds| {
            let rows = rows(feeds);
            let seq_len = feeds
                .get("input_ids")
                .and_then(|tensor| tensor.shape().get(1).copied())
                .unwrap_or(0);
            Ok(vec![
                Tensor::from_f32(vec![rows, seq_len, 2], vec![0.25; rows * seq_len * 2])?,
                Tensor::from_f32(vec![rows, 1], vec![0.0; rows])?,
            ])
        })
    }

    fn pairs(count: usize) -> TextInput {
        TextInput::BatchOfPairs(
            (0..count)
                .map(|_| ("what is rust".to_owned(), "rust is a language".to_owned()))
                .collect(),
        )
    }

    #[test]
    fn single_input_matches_one_element_batch() -> Result<()> {
        let encoder = Encoder::new(runtime(embedding_session(), EncodingConfig::default()));

        let single = encoder.call(&TextInput::from("what is rust"), None)?;
        let batch = encoder.call(&TextInput::from(vec!["what is rust"]), None)?;

        let single = single.as_tensor().cloned();
        let batch = batch.as_tensor().cloned();
        assert_eq!(single.as_ref().map(Tensor::shape), Some([4].as_slice()));
        assert_eq!(batch.as_ref().map(Tensor::shape), Some([1, 4].as_slice()));
        assert_eq!(
            single.as_ref().and_then(Tensor::as_f32),
            batch.as_ref().and_then(Tensor::as_f32)
        );
        Ok(())
    }

    #[test]
    fn logits_are_selected_for_paired_batches() -> Result<()> {
        let config = EncodingConfig::default().with_output_name("logits");
        let encoder = Encoder::new(runtime(classifier_session(), config));

        let batch = encoder.call(&pairs(3), None)?;
        assert_eq!(
            batch.as_tensor().map(Tensor::shape),
            Some([3, 1].as_slice())
        );

        let single = encoder.call(
            &TextInput::from(("what is rust", "rust is a language")),
            None,
        )?;
        assert_eq!(single.as_tensor().map(Tensor::shape), Some([].as_slice()));
        Ok(())
    }

    #[test]
    fn unknown_output_name_returns_every_output() -> Result<()> {
        let encoder = Encoder::new(runtime(classifier_session(), EncodingConfig::default()));
        let output = encoder.call(&pairs(2), None)?;

        let names: Option<Vec<&str>> = output.as_named().map(|outputs| outputs.names().collect());
        assert_eq!(names, Some(vec!["last_hidden_state", "logits"]));
        Ok(())
    }

    #[test]
    fn override_config_replaces_the_default() -> Result<()> {
        let encoder = Encoder::new(runtime(
            classifier_session(),
            EncodingConfig::default().with_output_name("logits"),
        ));
        let override_config = EncodingConfig::default().with_output_name("last_hidden_state");

        let output = encoder.call(&pairs(2), Some(&override_config))?;
        assert_eq!(output.as_tensor().map(Tensor::rank), Some(3));

        let encoded = encoder.encode(&pairs(2), Some(&override_config))?;
        assert_eq!(encoded.num_rows, 2);
        Ok(())
    }

    #[test]
    fn cross_encoder_maps_zero_logits_to_one_half() -> Result<()> {
        let config = EncodingConfig::default().with_output_name("logits");
        let cross = CrossEncoder::new(runtime(classifier_session(), config.clone()), true);

        let scores = cross.call(&pairs(3), None)?;
        assert_eq!(scores.shape(), [3]);
        assert_eq!(scores.as_f32(), Some([0.5, 0.5, 0.5].as_slice()));

        let raw = CrossEncoder::new(runtime(classifier_session(), config), false);
        let logits = raw.call(&TextInput::from(("what is rust", "a language")), None)?;
        assert_eq!(logits.shape(), [] as [usize; 0]);
        assert_eq!(logits.as_f32(), Some([0.0].as_slice()));
        Ok(())
    }

    #[test]
    fn cross_encoder_scores_the_first_declared_output() -> Result<()> {
        let session = InMemorySession::new(
            bert_inputs(),
            vec![
                TensorSpec::new(
                    "logits",
                    ElementType::Float32,
                    vec![symbolic("batch"), Dimension::Fixed(1)],
                ),
                TensorSpec::new(
                    "attentions",
                    ElementType::Float32,
                    vec![symbolic("batch"), Dimension::Fixed(3)],
                ),
            ],
        )
        .with_responder(|feeds| {
            let rows = rows(feeds);
            Ok(vec![
                Tensor::from_f32(vec![rows, 1], vec![0.0; rows])?,
                Tensor::from_f32(vec![rows, 3], vec![9.0; rows * 3])?,
            ])
        });
        let cross = CrossEncoder::new(runtime(session, EncodingConfig::default()), true);

        let score = cross.call(&TextInput::from(("what", "what")), None)?;
        assert_eq!(score.shape(), [] as [usize; 0]);
        assert_eq!(score.as_f32(), Some([0.5].as_slice()));
        Ok(())
    }

    #[test]
    fn accessors_expose_model_metadata() -> Result<()> {
        let encoder = Encoder::new(runtime(embedding_session(), EncodingConfig::default()));

        assert_eq!(encoder.output_dim()?, 4);
        assert_eq!(encoder.model_info().name, "tiny");
        assert_eq!(encoder.model_config().dim, Some(4));
        assert_eq!(encoder.encoding_config(), &EncodingConfig::default());
        assert_eq!(
            encoder.network_info().input_names(),
            ["input_ids", "attention_mask", "token_type_ids"]
        );
        Ok(())
    }
}
