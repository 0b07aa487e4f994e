//! CLI command handlers.

pub mod cross_encode;
pub mod encode;
pub mod info;
pub mod schema;

pub use cross_encode::run_cross_encode;
pub use encode::{EncodeCommandInput, run_encode, run_output_dim};
pub use info::run_info;
pub use schema::run_schema;
