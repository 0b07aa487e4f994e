//! End-to-end encoding pipeline over an on-disk model directory.

use onnx_transformers_app::{Encoder, ExecutionPath, ModelMetadata, ModelRuntime};
use onnx_transformers_config::{
    ModelDirectory, build_default_encoding_config, load_encoding_config_file,
};
use onnx_transformers_domain::{
    Dimension, ElementType, ExecutionProvider, TensorSpec, TextInput, TruncationStrategy,
};
use onnx_transformers_shared::Result;
use onnx_transformers_testkit::{
    CLS_ID, InMemorySession, ModelDirFixture, RunKind, SEP_ID, WhitespaceTokenizer,
};
use serde_json::json;
use std::sync::Arc;

const WORDS: [&str; 6] = ["what", "is", "rust", "a", "systems", "language"];

fn bert_session() -> InMemorySession {
    let symbolic = |name: &str| Dimension::Symbolic(name.to_owned());
    let inputs = ["input_ids", "attention_mask", "token_type_ids"]
        .into_iter()
        .map(|name| {
            TensorSpec::new(
                name,
                ElementType::Int64,
                vec![symbolic("batch"), symbolic("sequence")],
            )
        })
        .collect();
    InMemorySession::new(
        inputs,
        vec![TensorSpec::new(
            "embedding",
            ElementType::Float32,
            vec![symbolic("batch"), Dimension::Fixed(4)],
        )],
    )
}

fn runtime(fixture: &ModelDirFixture, session: Arc<InMemorySession>) -> Result<ModelRuntime> {
    let directory = ModelDirectory::open(fixture.path())?;
    Ok(ModelRuntime::new(
        session,
        Arc::new(WhitespaceTokenizer::with_vocab(&WORDS)),
        directory.load_tokenizer_descriptor()?,
        ModelMetadata {
            info: directory.load_info()?,
            config: directory.load_config()?,
            encoding_config: build_default_encoding_config(&directory)?,
        },
    ))
}

#[test]
fn tokenizer_init_drives_model_level_truncation() -> Result<()> {
    let fixture = ModelDirFixture::new()?
        .with_tokenizer_init(&json!({"max_len": 5, "do_lower_case": true}))?;
    let encoder = Encoder::new(runtime(&fixture, Arc::new(bert_session()))?);

    assert_eq!(
        encoder.encoding_config().truncation_strategy,
        TruncationStrategy::LongestFirst
    );
    let encoded = encoder.encode(&TextInput::from("What IS Rust a language"), None)?;
    let ids = encoded
        .feeds
        .get("input_ids")
        .and_then(|tensor| tensor.as_i64())
        .map(<[i64]>::to_vec);

    let tokenizer = WhitespaceTokenizer::with_vocab(&WORDS);
    let word = |text: &str| i64::from(tokenizer.id_of(text));
    assert_eq!(
        ids,
        Some(vec![
            i64::from(CLS_ID),
            word("what"),
            word("is"),
            word("rust"),
            i64::from(SEP_ID),
        ])
    );
    Ok(())
}

#[test]
fn override_file_replaces_the_model_config() -> Result<()> {
    let fixture = ModelDirFixture::new()?.with_file(
        "override.toml",
        "truncation_strategy = \"only_second\"\nmax_length = 6\nreturn_length = true\n",
    )?;
    let encoder = Encoder::new(runtime(&fixture, Arc::new(bert_session()))?);
    let override_config = load_encoding_config_file(&fixture.path().join("override.toml"))?;

    let encoded = encoder.encode(
        &TextInput::from(("what is", "rust a systems language")),
        Some(&override_config),
    )?;
    assert_eq!(encoded.sequence_length, 6);
    assert_eq!(
        encoded.extras.get("length").and_then(|tensor| tensor.as_i64()),
        Some([6].as_slice())
    );
    Ok(())
}

#[test]
fn accelerator_runtime_runs_bound_and_matches_cpu() -> Result<()> {
    let fixture = ModelDirFixture::new()?;
    let accelerated = Arc::new(bert_session().with_provider(ExecutionProvider::Accelerator));
    let cpu = Arc::new(bert_session());

    let on_device = Encoder::new(runtime(&fixture, accelerated.clone())?);
    let on_host = Encoder::new(runtime(&fixture, cpu.clone())?);
    assert_eq!(on_device.runtime().executor().path(), ExecutionPath::Bound);
    assert_eq!(on_host.runtime().executor().path(), ExecutionPath::Direct);

    let input = TextInput::from(vec!["what is rust", "a systems language"]);
    assert_eq!(on_device.call(&input, None)?, on_host.call(&input, None)?);

    let kinds = |session: &InMemorySession| -> Vec<RunKind> {
        session.runs().iter().map(|run| run.kind).collect()
    };
    assert_eq!(kinds(&accelerated), [RunKind::Bound]);
    assert_eq!(kinds(&cpu), [RunKind::Direct]);
    Ok(())
}

#[test]
fn batch_rows_are_padded_to_the_longest() -> Result<()> {
    let fixture = ModelDirFixture::new()?;
    let encoder = Encoder::new(runtime(&fixture, Arc::new(bert_session()))?);

    let encoded = encoder.encode(&TextInput::from(vec!["rust", "what is rust"]), None)?;
    assert_eq!(encoded.num_rows, 2);
    assert_eq!(encoded.sequence_length, 5);
    assert_eq!(
        encoded
            .feeds
            .get("attention_mask")
            .and_then(|tensor| tensor.as_i64()),
        Some([1, 1, 1, 0, 0, 1, 1, 1, 1, 1].as_slice())
    );
    Ok(())
}
