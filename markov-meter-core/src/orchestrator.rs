use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;
use std::time::Instant;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{error, info};

use crate::config::Config;
use crate::error::{MeterError, Result, TrainingStage};
use crate::model::indexer::NGramIndexer;
use crate::model::markov_model::MarkovModel;
use crate::model::trainer::ModelTrainer;
use crate::store::ModelStore;

/// Trains and persists one model per configured password length.
///
/// # Responsibilities
/// - Fan the lengths out over a fixed number of worker threads
/// - Wait for every job, successful or not
/// - Report each failure with its length and stage
///
/// Jobs share nothing mutable: each one reads the corpus on its own and
/// writes only the files keyed by its own length.
pub struct TrainingOrchestrator {
	indexer: NGramIndexer,
	store: ModelStore,
	corpus: PathBuf,
	corpus_name: String,
	lengths: Vec<usize>,
	workers: usize,
	progress_bar: bool,
}

impl TrainingOrchestrator {
	pub fn new(config: &Config) -> Result<Self> {
		config.validate()?;
		Ok(Self {
			indexer: config.indexer()?,
			store: ModelStore::new(&config.trained_dir),
			corpus: config.training_file.clone(),
			corpus_name: config.corpus_name()?,
			lengths: config.lengths(),
			workers: config.workers(),
			progress_bar: config.progress_bar,
		})
	}

	pub fn lengths(&self) -> &[usize] {
		&self.lengths
	}

	pub fn store(&self) -> &ModelStore {
		&self.store
	}

	/// Runs every job and returns the trained models keyed by length.
	///
	/// # Errors
	/// Returns `TrainingFailed` listing every job that failed. The other jobs
	/// still run to completion and keep their saved files.
	pub fn run(&self) -> Result<BTreeMap<usize, MarkovModel>> {
		let workers = self.workers.clamp(1, self.lengths.len().max(1));
		info!(
			"training {} length(s) {:?} from {} with {} worker(s)",
			self.lengths.len(),
			self.lengths,
			self.corpus.display(),
			workers
		);

		let multi = MultiProgress::new();
		let (tx, rx) = mpsc::channel();
		thread::scope(|scope| {
			for worker in 0..workers {
				let tx = tx.clone();
				let lengths: Vec<usize> = self.lengths.iter().copied().skip(worker).step_by(workers).collect();
				let multi = multi.clone();

				scope.spawn(move || {
					for length in lengths {
						let progress = self.progress_for(&multi, length);
						if tx.send((length, self.train_length(length, progress))).is_err() {
							break;
						}
					}
				});
			}
		});
		drop(tx);

		let mut models = BTreeMap::new();
		let mut failures = Vec::new();
		for (length, result) in rx {
			match result {
				Ok(model) => {
					models.insert(length, model);
				}
				Err(e) => {
					error!("{}", e);
					failures.push(e);
				}
			}
		}

		if !failures.is_empty() {
			return Err(MeterError::TrainingFailed { failures });
		}
		Ok(models)
	}

	/// One job: count, normalize, save the three tables.
	fn train_length(&self, length: usize, progress: ProgressBar) -> Result<MarkovModel> {
		let start = Instant::now();
		let trainer = ModelTrainer::new(&self.indexer, length).with_progress(progress);

		let counts = trainer.count_file(&self.corpus).map_err(|e| e.during(length, TrainingStage::Counting))?;
		let accepted = counts.accepted;
		let model = trainer.normalize(counts).map_err(|e| e.during(length, TrainingStage::Normalizing))?;

		self.store.save_model(&self.corpus_name, self.indexer.ngram_size(), &model)?;

		info!("length {}: trained on {} password(s) in {:.2?}", length, accepted, start.elapsed());
		Ok(model)
	}

	fn progress_for(&self, multi: &MultiProgress, length: usize) -> ProgressBar {
		if !self.progress_bar {
			return ProgressBar::hidden();
		}

		let progress = multi.add(ProgressBar::new(0));
		if let Ok(style) = ProgressStyle::with_template("{prefix:>10} [{bar:40}] {bytes}/{total_bytes} {elapsed}") {
			progress.set_style(style.progress_chars("=> "));
		}
		progress.set_prefix(format!("length {}", length));
		progress
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::model::table::TableKind;
	use crate::store::ModelKey;
	use std::fs;

	fn config(dir: &std::path::Path, corpus: &str, lengths: Vec<usize>) -> Config {
		let training_file = dir.join("corpus.txt");
		fs::write(&training_file, corpus).unwrap();
		Config {
			alphabet: "ab".to_owned(),
			ngram_size: 2,
			training_file,
			lengths,
			no_cpus: 2,
			trained_dir: dir.join("trained"),
			..Config::default()
		}
	}

	#[test]
	fn test_one_model_per_length() {
		let dir = tempfile::tempdir().unwrap();
		let config = config(dir.path(), "ab\naab\nabab\nbbb\n", vec![4, 2, 3]);
		let orchestrator = TrainingOrchestrator::new(&config).unwrap();

		let models = orchestrator.run().unwrap();
		assert_eq!(models.keys().copied().collect::<Vec<_>>(), vec![2, 3, 4]);
		for (length, model) in &models {
			assert_eq!(model.length(), *length);
			for kind in TableKind::ALL {
				let key = ModelKey::new("corpus", kind, 2, *length);
				assert!(orchestrator.store().path_for(&key).is_file());
			}
		}
	}

	#[test]
	fn test_missing_corpus_fails_every_length() {
		let dir = tempfile::tempdir().unwrap();
		let mut config = config(dir.path(), "", vec![2, 3]);
		config.training_file = dir.path().join("missing.txt");
		let orchestrator = TrainingOrchestrator::new(&config).unwrap();

		match orchestrator.run() {
			Err(MeterError::TrainingFailed { failures }) => {
				let mut lengths: Vec<usize> = failures
					.iter()
					.map(|failure| match failure {
						MeterError::Training { length, stage: TrainingStage::Counting, .. } => *length,
						other => panic!("unexpected failure: {}", other),
					})
					.collect();
				lengths.sort();
				assert_eq!(lengths, vec![2, 3]);
			}
			other => panic!("expected a training failure, got {:?}", other.map(|models| models.len())),
		}
	}
}
