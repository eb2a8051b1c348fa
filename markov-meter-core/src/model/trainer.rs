use std::io::BufRead;
use std::path::Path;

use indicatif::ProgressBar;
use log::debug;

use crate::error::Result;
use crate::io;

use super::indexer::NGramIndexer;
use super::markov_model::MarkovModel;
use super::table::{CountTable, TableKind};

/// Smoothed counts gathered by one pass over a corpus, plus pass statistics.
#[derive(Clone, Debug)]
pub struct CorpusCounts {
	pub initial: CountTable,
	pub conditional: CountTable,
	pub end: CountTable,
	/// Lines that contributed to the tables.
	pub accepted: usize,
	/// Lines skipped because their length differs from the model length.
	pub skipped_length: usize,
	/// Lines of the right length skipped because of out-of-alphabet symbols.
	pub skipped_alphabet: usize,
}

impl CorpusCounts {
	pub fn table(&self, kind: TableKind) -> &CountTable {
		match kind {
			TableKind::Initial => &self.initial,
			TableKind::Conditional => &self.conditional,
			TableKind::End => &self.end,
		}
	}
}

/// Trains the model of one password length.
///
/// The three tables are filled in a single pass over the corpus:
///
/// ```text
/// password  PW
/// pa        IP
/// pas       CP1
///  ass      CP2
///   ssw     CP3
///    swo    CP4
///     wor   CP5
///      ord  CP6
///       rd  EP
/// ```
///
/// # Notes
/// - Only lines of exactly `length` symbols are used. Shorter or longer lines
///   would teach the model truncated passwords ("passwor", "iloveyo").
/// - Lines with a symbol outside the alphabet are skipped, not errored.
pub struct ModelTrainer<'a> {
	indexer: &'a NGramIndexer,
	length: usize,
	progress: ProgressBar,
}

impl<'a> ModelTrainer<'a> {
	pub fn new(indexer: &'a NGramIndexer, length: usize) -> Self {
		Self { indexer, length, progress: ProgressBar::hidden() }
	}

	/// Reports `count_file` on `progress`, in corpus bytes.
	pub fn with_progress(mut self, progress: ProgressBar) -> Self {
		self.progress = progress;
		self
	}

	pub fn length(&self) -> usize {
		self.length
	}

	/// Fresh all-ones tables.
	pub fn empty_counts(&self) -> CorpusCounts {
		let table = |kind: TableKind| CountTable::new(kind, self.indexer.table_size(kind));
		CorpusCounts {
			initial: table(TableKind::Initial),
			conditional: table(TableKind::Conditional),
			end: table(TableKind::End),
			accepted: 0,
			skipped_length: 0,
			skipped_alphabet: 0,
		}
	}

	/// Adds one corpus line to `counts`.
	///
	/// Returns whether the line was used.
	pub fn count_line(&self, counts: &mut CorpusCounts, line: &str) -> Result<bool> {
		let symbols: Vec<char> = line.chars().collect();
		if symbols.len() != self.length {
			counts.skipped_length += 1;
			return Ok(false);
		}
		if !symbols.iter().all(|symbol| self.indexer.alphabet().contains(*symbol)) {
			counts.skipped_alphabet += 1;
			return Ok(false);
		}

		counts.initial.increment(self.indexer.initial_index(&symbols)?)?;
		for index in self.indexer.conditional_indices(&symbols) {
			counts.conditional.increment(index?)?;
		}
		counts.end.increment(self.indexer.end_index(&symbols)?)?;

		counts.accepted += 1;
		Ok(true)
	}

	/// Counts every line of `reader`.
	///
	/// Lines that are not valid UTF-8 are skipped like out-of-alphabet lines.
	pub fn count<R: BufRead>(&self, reader: R) -> Result<CorpusCounts> {
		let mut counts = self.empty_counts();
		for line in io::raw_lines(reader) {
			match String::from_utf8(line?) {
				Ok(line) => {
					self.count_line(&mut counts, &line)?;
				}
				Err(_) => counts.skipped_alphabet += 1,
			}
		}

		debug!(
			"length {}: {} lines accepted, {} skipped (length), {} skipped (alphabet)",
			self.length, counts.accepted, counts.skipped_length, counts.skipped_alphabet
		);
		Ok(counts)
	}

	/// Counts every line of the corpus file at `path`.
	pub fn count_file<P: AsRef<Path>>(&self, path: P) -> Result<CorpusCounts> {
		let reader = io::open(&path)?;
		if let Ok(metadata) = reader.get_ref().metadata() {
			self.progress.set_length(metadata.len());
		}

		let counts = self.count(self.progress.wrap_read(reader))?;
		self.progress.finish();
		Ok(counts)
	}

	/// Normalizes the counts into a model.
	///
	/// # Errors
	/// Returns `Normalization` if a table fails its sum-to-1.0 check.
	pub fn normalize(&self, counts: CorpusCounts) -> Result<MarkovModel> {
		let alphabet_size = self.indexer.alphabet().len();

		debug!("length {}: normalizing the initial table", self.length);
		let initial = counts.initial.normalize(alphabet_size)?;
		debug!("length {}: normalizing the conditional table", self.length);
		let conditional = counts.conditional.normalize(alphabet_size)?;
		debug!("length {}: normalizing the end table", self.length);
		let end = counts.end.normalize(alphabet_size)?;

		MarkovModel::new(self.length, initial, conditional, end)
	}

	/// Counts and normalizes in one go.
	pub fn train_file<P: AsRef<Path>>(&self, path: P) -> Result<MarkovModel> {
		let counts = self.count_file(path)?;
		self.normalize(counts)
	}
}
