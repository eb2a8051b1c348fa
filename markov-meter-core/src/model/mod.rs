//! Per-length Markov models and everything needed to build them.
//!
//! This module provides:
//! - The alphabet codec (`Alphabet`)
//! - Mixed-radix n-gram indexing (`NGramIndexer`)
//! - Count and probability tables (`CountTable`, `ProbabilityTable`)
//! - The trained model of one length (`MarkovModel`)
//! - The single-length trainer (`ModelTrainer`)

/// Bidirectional symbol ↔ rank mapping.
pub mod alphabet;

/// N-gram ↔ table index bijection for the `n-1` and `n` symbol index spaces.
pub mod indexer;

/// A normalized three-table model scoped to one password length.
///
/// Scores candidates as a product of probabilities, or a sum of logs.
pub mod markov_model;

/// Laplace-smoothed count tables and their normalized counterparts.
pub mod table;

/// Corpus scanning, counting, and normalization for one password length.
pub mod trainer;
