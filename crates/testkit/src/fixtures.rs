//! On-disk model directory fixtures.

use serde_json::{Value, json};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// A temporary model directory with `info.json`, `config.json` and
/// `tokenizer.json`. Removed when dropped.
#[derive(Debug)]
pub struct ModelDirFixture {
    dir: TempDir,
}

impl ModelDirFixture {
    /// Write a minimal BERT-like model directory.
    pub fn new() -> std::io::Result<Self> {
        let fixture = Self {
            dir: tempfile::tempdir()?,
        };
        fixture.write_json(
            "info.json",
            &json!({
                "group": "test",
                "name": "tiny-encoder",
                "version": "1.0.0",
                "dim": 4,
            }),
        )?;
        fixture.write_json(
            "config.json",
            &json!({"dim": 4, "max_position_embeddings": 16, "model_type": "bert"}),
        )?;
        fixture.write_json(
            "tokenizer.json",
            &serde_json::to_value(crate::WhitespaceTokenizer::descriptor())
                .map_err(std::io::Error::other)?,
        )?;
        Ok(fixture)
    }

    /// Replace `info.json`.
    pub fn with_info(self, info: &Value) -> std::io::Result<Self> {
        self.write_json("info.json", info)?;
        Ok(self)
    }

    /// Replace `config.json`.
    pub fn with_config(self, config: &Value) -> std::io::Result<Self> {
        self.write_json("config.json", config)?;
        Ok(self)
    }

    /// Add `tokenizer_init.json`.
    pub fn with_tokenizer_init(self, init: &Value) -> std::io::Result<Self> {
        self.write_json("tokenizer_init.json", init)?;
        Ok(self)
    }

    /// Write an arbitrary file into the directory.
    pub fn with_file(self, name: &str, contents: &str) -> std::io::Result<Self> {
        fs::write(self.dir.path().join(name), contents)?;
        Ok(self)
    }

    /// Directory root.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    fn write_json(&self, name: &str, value: &Value) -> std::io::Result<()> {
        let text = serde_json::to_string_pretty(value).map_err(std::io::Error::other)?;
        fs::write(self.dir.path().join(name), text)
    }
}
