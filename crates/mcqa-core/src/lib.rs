//! mcqa-core: question pipeline, traits, and scoring.
//!
//! This crate defines the data model, the backend traits, and the pipeline
//! that randomizes options, crafts prompts, parses replies and scores them.

pub mod batch;
pub mod context;
pub mod error;
pub mod evaluator;
pub mod loader;
pub mod model;
pub mod orchestrator;
pub mod output;
pub mod parser;
pub mod prompt;
pub mod randomizer;
pub mod statistics;
pub mod templates;
pub mod traits;
