//! Contract-style tests for port traits using in-memory adapters.

use onnx_transformers_domain::{Dimension, ElementType, TensorSpec};
use onnx_transformers_ports::{FastTokenizerPort, InferenceSessionPort, NamedTensors, Tensor};
use onnx_transformers_shared::{ErrorEnvelope, Result};
use onnx_transformers_testkit::{InMemorySession, RunKind, WhitespaceTokenizer, CLS_ID, SEP_ID};
use std::sync::Arc;

fn ids_feed(rows: usize, seq_len: usize) -> Result<NamedTensors> {
    let values = (0..rows * seq_len).map(|value| value as i64).collect();
    let mut feeds = NamedTensors::new();
    feeds.insert(
        "input_ids",
        Tensor::from_i64(vec![rows, seq_len], values).map_err(ErrorEnvelope::from)?,
    );
    Ok(feeds)
}

#[test]
fn session_port_contract_smoke() -> Result<()> {
    let session = InMemorySession::new(
        vec![TensorSpec::new(
            "input_ids",
            ElementType::Int64,
            vec![Dimension::Symbolic("batch".into()), Dimension::Symbolic("seq".into())],
        )],
        vec![
            TensorSpec::new(
                "embedding",
                ElementType::Float32,
                vec![Dimension::Symbolic("batch".into()), Dimension::Fixed(8)],
            ),
            TensorSpec::new(
                "logits",
                ElementType::Float32,
                vec![Dimension::Symbolic("batch".into()), Dimension::Fixed(1)],
            ),
        ],
    );
    let port: Arc<dyn InferenceSessionPort> = Arc::new(session);

    let feeds = ids_feed(3, 5)?;
    let direct = port.run(&feeds)?;
    let bound = port.run_bound(&feeds)?;

    assert_eq!(direct.len(), port.outputs().len());
    assert_eq!(direct[0].shape(), [3, 8]);
    assert_eq!(direct[1].shape(), [3, 1]);
    assert_eq!(direct, bound);
    Ok(())
}

#[test]
fn session_records_entry_points() -> Result<()> {
    let session = InMemorySession::new(Vec::new(), Vec::new());
    let feeds = ids_feed(1, 2)?;
    session.run(&feeds)?;
    session.run_bound(&feeds)?;

    let kinds: Vec<RunKind> = session.runs().iter().map(|run| run.kind).collect();
    assert_eq!(kinds, [RunKind::Direct, RunKind::Bound]);
    Ok(())
}

#[test]
fn tokenizer_port_contract_smoke() -> Result<()> {
    let tokenizer = WhitespaceTokenizer::with_vocab(&["hello"]);
    let port: &dyn FastTokenizerPort = &tokenizer;

    let segmented = port.segment("hello there", false)?;
    assert_eq!(segmented.len(), 2);

    let single = port.post_process(segmented.clone(), None, true)?;
    assert_eq!(single.ids.first(), Some(&CLS_ID));
    assert_eq!(single.ids.last(), Some(&SEP_ID));
    assert_eq!(single.len(), 2 + port.num_special_tokens_to_add(false));

    let plain = port.post_process(segmented, None, false)?;
    assert_eq!(plain.len(), 2);
    Ok(())
}
