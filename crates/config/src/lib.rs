//! # onnx-transformers-config
//!
//! Model-directory loading (`info.json`, `config.json`, `tokenizer.json`,
//! `tokenizer_init.json`) and encoding-configuration resolution.
//! This crate depends on `domain` and `shared` only.

/// Encoding configuration resolution, override files and schema export.
pub mod encoding;
/// Model-directory file loading.
pub mod load;

pub use encoding::{
    MAX_LENGTH_ALIASES, apply_tokenizer_init, build_default_encoding_config,
    encoding_config_schema, load_encoding_config_file, parse_encoding_config_json,
    parse_encoding_config_toml, resolve_call_config,
};
pub use load::{
    CONFIG_FILE, DEFAULT_MODEL_STEM, INFO_FILE, ModelDirectory, TOKENIZER_FILE,
    TOKENIZER_INIT_FILE, load_model_info, read_json_file,
};
