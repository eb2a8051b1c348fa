use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufRead, BufWriter, Write};
use std::path::Path;
use std::thread;
use std::time::Instant;

use log::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{MeterError, Result};
use crate::io;
use crate::model::indexer::NGramIndexer;
use crate::model::markov_model::MarkovModel;
use crate::store::ModelStore;

/// Counters of one evaluation pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EvaluationSummary {
	pub scored: usize,
	pub no_model: usize,
	pub invalid: usize,
}

impl EvaluationSummary {
	pub fn total(&self) -> usize {
		self.scored + self.no_model + self.invalid
	}
}

/// Scores candidates against the model of their exact length.
///
/// # Invariants
/// - Every model in `models` is stored under its own length
/// - Models are read-only; scoring never mutates them
#[derive(Clone, Debug)]
pub struct Scorer {
	indexer: NGramIndexer,
	models: BTreeMap<usize, MarkovModel>,
}

impl Scorer {
	/// Creates a scorer from already trained models.
	pub fn new(indexer: NGramIndexer, models: BTreeMap<usize, MarkovModel>) -> Self {
		Self { indexer, models }
	}

	/// Loads the models of every configured length from the model store.
	///
	/// Lengths are loaded concurrently, one thread each.
	///
	/// # Errors
	/// Returns `Loading` for the first length (in length order) whose model
	/// is missing or corrupt. Every failure is logged.
	pub fn load(config: &Config) -> Result<Self> {
		config.validate()?;
		let indexer = config.indexer()?;
		let store = ModelStore::new(&config.trained_dir);
		let corpus_name = config.corpus_name()?;
		let start = Instant::now();

		let results: Vec<(usize, Result<MarkovModel>)> = thread::scope(|scope| {
			let handles: Vec<_> = config
				.lengths()
				.into_iter()
				.map(|length| {
					let (store, indexer, corpus_name) = (&store, &indexer, &corpus_name);
					(length, scope.spawn(move || store.load_model(corpus_name, indexer, length)))
				})
				.collect();

			handles
				.into_iter()
				.map(|(length, handle)| {
					(length, handle.join().unwrap_or_else(|payload| std::panic::resume_unwind(payload)))
				})
				.collect()
		});

		let mut models = BTreeMap::new();
		let mut first_failure = None;
		for (length, result) in results {
			match result {
				Ok(model) => {
					debug!("length {}: model loaded", length);
					models.insert(length, model);
				}
				Err(e) => {
					let e = MeterError::Loading { length, source: Box::new(e) };
					error!("{}", e);
					first_failure.get_or_insert(e);
				}
			}
		}
		if let Some(e) = first_failure {
			return Err(e);
		}

		info!("{} Markov model(s) loaded in {:.2?}", models.len(), start.elapsed());
		Ok(Self::new(indexer, models))
	}

	pub fn indexer(&self) -> &NGramIndexer {
		&self.indexer
	}

	/// Lengths with a model, ascending.
	pub fn lengths(&self) -> impl Iterator<Item = usize> + '_ {
		self.models.keys().copied()
	}

	/// Returns the model trained for exactly `candidate_length`.
	///
	/// # Errors
	/// Returns `NoModelForLength` if there is none. Another length's model is
	/// never substituted: its indices and window count would not match.
	pub fn select_model(&self, candidate_length: usize) -> Result<&MarkovModel> {
		self.models.get(&candidate_length).ok_or(MeterError::NoModelForLength { length: candidate_length })
	}

	/// Estimated likelihood of `candidate`.
	pub fn score(&self, candidate: &str) -> Result<f64> {
		self.select_model(candidate.chars().count())?.probability(&self.indexer, candidate)
	}

	/// Natural logarithm of the likelihood, robust to underflow.
	pub fn log_score(&self, candidate: &str) -> Result<f64> {
		self.select_model(candidate.chars().count())?.log_probability(&self.indexer, candidate)
	}

	/// Scores every line of `reader` and writes one result line per
	/// candidate to `writer`, in input order.
	///
	/// Output lines are `<probability>\t<candidate>` or a diagnostic followed
	/// by a tab and the candidate, echoed byte for byte. Unscorable
	/// candidates do not stop the pass; a candidate that is not valid UTF-8
	/// counts as invalid whatever its length.
	pub fn evaluate<R: BufRead, W: Write>(&self, reader: R, mut writer: W) -> Result<EvaluationSummary> {
		let mut summary = EvaluationSummary::default();

		for line in io::raw_lines(reader) {
			let bytes = line?;
			let result = match std::str::from_utf8(&bytes) {
				Ok(candidate) => self.score(candidate),
				Err(e) => Err(MeterError::InvalidInput {
					candidate: String::from_utf8_lossy(&bytes).into_owned(),
					reason: e.to_string(),
				}),
			};

			match result {
				Ok(probability) => {
					write!(writer, "{:e}\t", probability)?;
					summary.scored += 1;
				}
				Err(MeterError::NoModelForLength { length }) => {
					warn!("No Markov model for this length: {} {}", length, String::from_utf8_lossy(&bytes));
					write!(writer, "Info: No Markov model for this length: {}\t", length)?;
					summary.no_model += 1;
				}
				Err(e) if e.is_recoverable() => {
					warn!("Password contains invalid characters: {}", e);
					write!(writer, "Info: Password contains invalid characters:\t")?;
					summary.invalid += 1;
				}
				Err(e) => return Err(e),
			}
			writer.write_all(&bytes)?;
			writer.write_all(b"\n")?;
		}

		writer.flush()?;
		Ok(summary)
	}

	/// File wrapper around `evaluate`. Creates the output directory if needed.
	pub fn evaluate_file<I: AsRef<Path>, O: AsRef<Path>>(&self, input: I, output: O) -> Result<EvaluationSummary> {
		let output = output.as_ref();
		if let Some(parent) = output.parent() {
			fs::create_dir_all(parent)?;
		}

		let summary = self.evaluate(io::open(input)?, BufWriter::new(File::create(output)?))?;
		info!(
			"{} candidate(s): {} scored, {} without model, {} invalid; results in {}",
			summary.total(),
			summary.scored,
			summary.no_model,
			summary.invalid,
			output.display()
		);
		Ok(summary)
	}
}
