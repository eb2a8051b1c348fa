//! Markov-model password strength meter.
//!
//! This crate trains one character-level Markov model per password length
//! and scores strings against the model of their exact length:
//! - Mixed-radix n-gram indexing over a configurable alphabet
//! - Laplace-smoothed initial, conditional and end tables
//! - Parallel per-length training with atomic on-disk persistence
//! - Exact-length scoring with explicit diagnostics
//!
//! Corpus and candidate files are read line by line; helpers for corpus
//! statistics and sorting results live in `report`.

/// Session configuration (JSON).
pub mod config;

/// Crate-wide error type.
pub mod error;

/// Alphabet, indexing, tables and the single-length trainer.
pub mod model;

/// Per-length training fan-out.
pub mod orchestrator;

pub mod report;

/// Exact-length model selection and scoring.
pub mod scorer;

/// On-disk persistence of probability tables.
pub mod store;

/// I/O utilities (line reading, path helpers).
///
/// Not exposed
pub(crate) mod io;

pub use config::Config;
pub use error::{MeterError, Result, TrainingStage};
pub use model::alphabet::Alphabet;
pub use model::indexer::NGramIndexer;
pub use model::markov_model::MarkovModel;
pub use model::table::{CountTable, ProbabilityTable, TableKind};
pub use model::trainer::{CorpusCounts, ModelTrainer};
pub use orchestrator::TrainingOrchestrator;
pub use scorer::{EvaluationSummary, Scorer};
pub use store::{ModelKey, ModelStore};
