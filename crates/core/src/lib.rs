//! Core library: pattern index, retrieval-validation, overlap estimation, fallback analysis.

pub mod aggregator;
pub mod basic;
pub mod chunker;
pub mod config;
pub mod document;
pub mod embeddings;
pub mod error;
pub mod index;
pub mod models;
pub mod overlap;
pub mod pipeline;
pub mod prompts;
pub mod response;
pub mod retrieval;
pub mod vectorstore;

pub use error::{AnalyzerError, Result};
