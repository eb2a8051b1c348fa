use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::model::table::TableKind;

/// Step of a per-length training job, used to attribute failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrainingStage {
	Counting,
	Normalizing,
	Saving(TableKind),
}

impl fmt::Display for TrainingStage {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			TrainingStage::Counting => write!(f, "counting the corpus"),
			TrainingStage::Normalizing => write!(f, "normalizing the counts"),
			TrainingStage::Saving(kind) => write!(f, "saving the {} table", kind),
		}
	}
}

/// Every failure the meter can report.
///
/// Per-line and per-candidate variants (`UnknownSymbol`, `OutOfAlphabet`,
/// `NoModelForLength`, `InvalidInput`) are recoverable: callers skip the
/// offending line and continue. The remaining variants abort the unit of work
/// they occur in.
#[derive(Error, Debug)]
pub enum MeterError {
	#[error("configuration error: {0}")]
	Config(String),

	#[error("unknown symbol {0:?}")]
	UnknownSymbol(char),

	#[error("n-gram {ngram:?} contains {symbol:?}, which is not in the alphabet")]
	OutOfAlphabet { ngram: String, symbol: char },

	#[error("an n-gram of {found} symbols cannot be indexed by an order {ngram_size} model")]
	NGramLength { found: usize, ngram_size: usize },

	#[error("index {index} is out of range for {size} slots")]
	IndexOutOfRange { index: usize, size: usize },

	#[error("{kind} probabilities do not sum up to 1.0, got {sum}")]
	Normalization { kind: TableKind, sum: f64 },

	#[error("model file not found: {}", path.display())]
	ModelNotFound { path: PathBuf },

	#[error("corrupt model {}: {reason}", path.display())]
	CorruptModel { path: PathBuf, reason: String },

	#[error("no Markov model for length {length}")]
	NoModelForLength { length: usize },

	#[error("invalid candidate {candidate:?}: {reason}")]
	InvalidInput { candidate: String, reason: String },

	#[error("training length {length} failed while {stage}: {source}")]
	Training {
		length: usize,
		stage: TrainingStage,
		source: Box<MeterError>,
	},

	#[error("{} training job(s) failed: {}", .failures.len(), join_failures(.failures))]
	TrainingFailed { failures: Vec<MeterError> },

	#[error("loading the model for length {length} failed: {source}")]
	Loading { length: usize, source: Box<MeterError> },

	#[error("serialization error: {0}")]
	Encode(#[from] postcard::Error),

	#[error("I/O error: {0}")]
	Io(#[from] io::Error),
}

impl MeterError {
	/// Attributes this error to one stage of the training job for `length`.
	pub fn during(self, length: usize, stage: TrainingStage) -> Self {
		MeterError::Training { length, stage, source: Box::new(self) }
	}

	/// Whether the error only concerns a single corpus line or candidate.
	pub fn is_recoverable(&self) -> bool {
		matches!(
			self,
			MeterError::UnknownSymbol(_)
				| MeterError::OutOfAlphabet { .. }
				| MeterError::NoModelForLength { .. }
				| MeterError::InvalidInput { .. }
		)
	}
}

fn join_failures(failures: &[MeterError]) -> String {
	failures.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, MeterError>;
