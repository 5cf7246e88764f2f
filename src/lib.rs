#![deny(missing_docs)]

//! Core library for the BloodLens blood-test report analyser.

/// Agent profiles, task templates, and the LLM crew runner.
pub mod agents;
/// Upload handling, branch selection, and persistence of analysis results.
pub mod analysis;
/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// Structured logging and tracing setup.
pub mod logging;
/// Lab marker definitions and value extraction.
pub mod markers;
/// Analysis and search counters.
pub mod metrics;
/// Text extraction from uploaded reports.
pub mod pdf;
/// Qdrant vector store integration.
pub mod qdrant;
/// Report summaries, recommendations, and query-specific results.
pub mod report;
/// Analysis result stores with similarity search.
pub mod store;
