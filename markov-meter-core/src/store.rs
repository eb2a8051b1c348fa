use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::{MeterError, Result, TrainingStage};
use crate::model::indexer::NGramIndexer;
use crate::model::markov_model::MarkovModel;
use crate::model::table::{ProbabilityTable, TableKind};

/// Identifies one persisted table.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ModelKey {
	/// Base name of the training corpus.
	pub corpus_name: String,
	pub kind: TableKind,
	pub ngram_size: usize,
	pub length: usize,
}

impl ModelKey {
	pub fn new(corpus_name: &str, kind: TableKind, ngram_size: usize, length: usize) -> Self {
		Self { corpus_name: corpus_name.to_owned(), kind, ngram_size, length }
	}

	/// `<corpus>_<ip|cp|ep>_<n>_<length>.bin`
	pub fn file_name(&self) -> String {
		format!("{}_{}_{}_{}.bin", self.corpus_name, self.kind.tag(), self.ngram_size, self.length)
	}
}

#[derive(Serialize)]
struct TableFileRef<'a> {
	ngram_size: usize,
	length: usize,
	table: &'a ProbabilityTable,
}

#[derive(Deserialize)]
struct TableFile {
	ngram_size: usize,
	length: usize,
	table: ProbabilityTable,
}

/// Reads and writes probability tables, one file per `ModelKey`.
///
/// Tables are encoded with `postcard`: a small header followed by the slot
/// values as raw little-endian doubles, in slot order. Round trips are exact.
///
/// # Notes
/// Writes go to a temporary file in the same directory which is then renamed
/// over the target, so an interrupted save never leaves a truncated table
/// under a valid name.
#[derive(Clone, Debug)]
pub struct ModelStore {
	dir: PathBuf,
}

impl ModelStore {
	pub fn new<P: AsRef<Path>>(dir: P) -> Self {
		Self { dir: dir.as_ref().to_path_buf() }
	}

	pub fn dir(&self) -> &Path {
		&self.dir
	}

	pub fn path_for(&self, key: &ModelKey) -> PathBuf {
		self.dir.join(key.file_name())
	}

	/// Persists `table` under `key` and returns the written path.
	pub fn save(&self, key: &ModelKey, table: &ProbabilityTable) -> Result<PathBuf> {
		let path = self.path_for(key);
		debug!("writing {} ({} slots)", path.display(), table.len());

		let bytes = postcard::to_stdvec(&TableFileRef { ngram_size: key.ngram_size, length: key.length, table })?;

		fs::create_dir_all(&self.dir)?;
		let mut file = NamedTempFile::new_in(&self.dir)?;
		file.write_all(&bytes)?;
		file.as_file().sync_all()?;
		file.persist(&path).map_err(|e| MeterError::Io(e.error))?;

		Ok(path)
	}

	/// Loads the table stored under `key`.
	///
	/// # Errors
	/// - `ModelNotFound` if no file exists for the key
	/// - `CorruptModel` if the file cannot be decoded, has trailing bytes,
	///   describes another key, or does not hold `A^k` slots
	pub fn load(&self, key: &ModelKey, alphabet_size: usize) -> Result<ProbabilityTable> {
		let path = self.path_for(key);
		let bytes = match fs::read(&path) {
			Ok(bytes) => bytes,
			Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(MeterError::ModelNotFound { path }),
			Err(e) => return Err(e.into()),
		};

		let corrupt = |reason: String| MeterError::CorruptModel { path: path.clone(), reason };

		let (file, rest): (TableFile, _) = postcard::take_from_bytes(&bytes).map_err(|e| corrupt(e.to_string()))?;
		if !rest.is_empty() {
			return Err(corrupt(format!("{} trailing bytes", rest.len())));
		}
		if file.table.kind() != key.kind || file.ngram_size != key.ngram_size || file.length != key.length {
			return Err(corrupt(format!(
				"holds a {} table for n = {} and length {}",
				file.table.kind(),
				file.ngram_size,
				file.length
			)));
		}

		let expected = key
			.kind
			.table_size(alphabet_size, key.ngram_size)
			.ok_or_else(|| corrupt(format!("no table size for an alphabet of {} symbols", alphabet_size)))?;
		if file.table.len() != expected {
			return Err(corrupt(format!("expected {} slots, found {}", expected, file.table.len())));
		}

		debug!("loaded {} ({} slots)", path.display(), expected);
		Ok(file.table)
	}

	/// Persists the three tables of `model`, in `TableKind::ALL` order.
	///
	/// # Errors
	/// Returns a `Training` error naming the model length and the table
	/// that could not be saved. Tables saved before it are kept.
	pub fn save_model(&self, corpus_name: &str, ngram_size: usize, model: &MarkovModel) -> Result<()> {
		for kind in TableKind::ALL {
			let key = ModelKey::new(corpus_name, kind, ngram_size, model.length());
			self.save(&key, model.table(kind))
				.map_err(|e| e.during(model.length(), TrainingStage::Saving(kind)))?;
			debug!("length {}: {} table saved", model.length(), kind);
		}
		Ok(())
	}

	/// Loads the three tables of the model for `length`.
	pub fn load_model(&self, corpus_name: &str, indexer: &NGramIndexer, length: usize) -> Result<MarkovModel> {
		let load = |kind: TableKind| {
			self.load(&ModelKey::new(corpus_name, kind, indexer.ngram_size(), length), indexer.alphabet().len())
		};
		MarkovModel::new(length, load(TableKind::Initial)?, load(TableKind::Conditional)?, load(TableKind::End)?)
	}
}
