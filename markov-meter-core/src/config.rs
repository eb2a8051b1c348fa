use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::{MeterError, Result};
use crate::io;
use crate::model::alphabet::Alphabet;
use crate::model::indexer::NGramIndexer;

/// Session configuration, read from a JSON file.
///
/// Every key is optional. Missing keys take the defaults of
/// `Config::default()`; unknown keys are ignored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
	/// Session name, only used in logs.
	pub name: String,

	/// Ordered symbols of the alphabet. A symbol's rank is its position.
	pub alphabet: String,

	/// Order `n` of the model (2..=5).
	pub ngram_size: usize,

	/// Corpus of passwords, one per line.
	pub training_file: PathBuf,

	/// Candidates to score, one per line.
	pub eval_file: PathBuf,

	/// Password lengths to train one model each for.
	pub lengths: Vec<usize>,

	/// Number of training workers. `0` uses every logical CPU.
	pub no_cpus: usize,

	/// Show a progress bar per length while counting.
	pub progress_bar: bool,

	/// Where trained tables are stored.
	pub trained_dir: PathBuf,

	/// Where evaluation results are written.
	pub results_dir: PathBuf,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			name: "Demo".to_owned(),
			alphabet: "abcdefghijklmnopqrstuvwxyz".to_owned(),
			ngram_size: 3,
			training_file: PathBuf::from("input/training.txt"),
			eval_file: PathBuf::from("input/eval.txt"),
			lengths: vec![6, 8],
			no_cpus: 8,
			progress_bar: false,
			trained_dir: PathBuf::from("trained"),
			results_dir: PathBuf::from("results"),
		}
	}
}

impl Config {
	/// Reads and validates the configuration file at `path`.
	///
	/// # Errors
	/// Returns a configuration error if the file cannot be read, is not valid
	/// JSON, or fails validation.
	pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
		let path = path.as_ref();
		let text = fs::read_to_string(path)
			.map_err(|e| MeterError::Config(format!("cannot read {}: {}", path.display(), e)))?;
		let config = Self::from_json(&text).map_err(|e| match e {
			MeterError::Config(reason) => MeterError::Config(format!("{}: {}", path.display(), reason)),
			other => other,
		})?;
		debug!("configuration '{}' loaded from {}", config.name, path.display());
		Ok(config)
	}

	/// Parses and validates a JSON configuration.
	pub fn from_json(text: &str) -> Result<Self> {
		let config: Self = serde_json::from_str(text).map_err(|e| MeterError::Config(e.to_string()))?;
		config.validate()?;
		Ok(config)
	}

	/// Checks the values that the JSON schema alone cannot.
	pub fn validate(&self) -> Result<()> {
		let indexer = self.indexer()?;

		if self.lengths.is_empty() {
			return Err(MeterError::Config("at least one password length is required".to_owned()));
		}
		if let Some(length) = self.lengths.iter().find(|length| **length < self.ngram_size) {
			return Err(MeterError::Config(format!(
				"length {} is shorter than ngram_size {}",
				length, self.ngram_size
			)));
		}

		let duplicates = indexer.alphabet().duplicates();
		if duplicates > 0 {
			warn!("alphabet contains {} duplicate symbol(s), later occurrences shadow earlier ones", duplicates);
		}
		Ok(())
	}

	/// Builds the alphabet codec and indexer for this configuration.
	pub fn indexer(&self) -> Result<NGramIndexer> {
		NGramIndexer::new(Alphabet::new(&self.alphabet)?, self.ngram_size)
	}

	/// Base name of the training file, used to key model files.
	pub fn corpus_name(&self) -> Result<String> {
		io::get_filename(&self.training_file)
			.map_err(|e| MeterError::Config(format!("training_file {}: {}", self.training_file.display(), e)))
	}

	/// Configured lengths, sorted and without duplicates.
	pub fn lengths(&self) -> Vec<usize> {
		let mut lengths = self.lengths.clone();
		lengths.sort_unstable();
		lengths.dedup();
		lengths
	}

	/// Number of training workers to run.
	pub fn workers(&self) -> usize {
		if self.no_cpus == 0 { num_cpus::get() } else { self.no_cpus }
	}

	/// Output file of an evaluation: `<results_dir>/<eval stem>_result.txt`.
	pub fn result_path(&self) -> Result<PathBuf> {
		io::build_output_path(&self.results_dir, &self.eval_file, "_result", "txt")
			.map_err(|e| MeterError::Config(format!("eval_file {}: {}", self.eval_file.display(), e)))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_missing_keys_use_defaults() {
		let config = Config::from_json(r#"{"name": "test", "lengths": [8, 6, 8]}"#).unwrap();
		assert_eq!(config.name, "test");
		assert_eq!(config.ngram_size, 3);
		assert_eq!(config.alphabet, "abcdefghijklmnopqrstuvwxyz");
		assert_eq!(config.lengths(), vec![6, 8]);
		assert_eq!(config.corpus_name().unwrap(), "training");
		assert_eq!(config.result_path().unwrap(), PathBuf::from("results/eval_result.txt"));
	}

	#[test]
	fn test_unknown_keys_are_ignored() {
		assert!(Config::from_json(r#"{"unused": true}"#).is_ok());
	}

	#[test]
	fn test_malformed_json() {
		assert!(matches!(Config::from_json("{ngram_size: 3"), Err(MeterError::Config(_))));
		assert!(matches!(Config::from_json(r#"{"ngram_size": "three"}"#), Err(MeterError::Config(_))));
	}

	#[test]
	fn test_invalid_values() {
		for json in [
			r#"{"ngram_size": 1}"#,
			r#"{"ngram_size": 6}"#,
			r#"{"alphabet": ""}"#,
			r#"{"lengths": []}"#,
			r#"{"ngram_size": 4, "lengths": [3]}"#,
		] {
			assert!(matches!(Config::from_json(json), Err(MeterError::Config(_))), "{}", json);
		}
	}

	#[test]
	fn test_zero_cpus_means_all() {
		let config = Config { no_cpus: 0, ..Config::default() };
		assert!(config.workers() >= 1);
		assert_eq!(Config::default().workers(), 8);
	}

	#[test]
	fn test_missing_file() {
		assert!(matches!(Config::load("does/not/exist.json"), Err(MeterError::Config(_))));
	}
}
