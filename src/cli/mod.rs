//! Library side of the command-line interface.
//!
//! The binary parses arguments and prints; everything here is testable
//! without a terminal.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `analyze` | Classify one or more queries |
//! | `batch` | Classify queries from a file and export the results |
//! | `check` | Probe the inference and search services |
//! | `config` | Show the effective configuration |
//! | `completions` | Generate shell completions |
//!
//! # Example Usage
//!
//! ```bash
//! # Rule-based fusion
//! intent-analyzer analyze "buy iphone 15 pro" "facebook login"
//!
//! # Local model, four workers, CSV report
//! intent-analyzer --mode model batch --input keywords.txt --output report.csv --workers 4
//! ```

mod factory;
mod render;

pub use factory::{
    build_analyzer, build_classifier, build_fusion_pipeline, build_generator,
    build_lmstudio_client, build_model_analyzer, build_ollama_client, build_search_provider,
};
pub use render::{OutputFormat, write_json, write_result, write_summary};
