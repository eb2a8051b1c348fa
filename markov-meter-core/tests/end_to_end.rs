//! Train on disk, reload, and evaluate a candidate file.

use std::fs;
use std::path::Path;

use markov_meter_core::report::{read_results, sort_results, ResultLine};
use markov_meter_core::{
	Config, EvaluationSummary, MeterError, ModelKey, ModelStore, Scorer, TableKind, TrainingOrchestrator,
	TrainingStage,
};

fn write_config(dir: &Path, corpus: &str, eval: &str) -> Config {
	let input = dir.join("input");
	fs::create_dir_all(&input).unwrap();
	fs::write(input.join("leak.txt"), corpus).unwrap();
	fs::write(input.join("eval.txt"), eval).unwrap();

	let json = format!(
		r#"{{
			"name": "end to end",
			"alphabet": "ab",
			"ngram_size": 2,
			"training_file": "{}",
			"eval_file": "{}",
			"lengths": [3, 4],
			"no_cpus": 2,
			"progress_bar": false,
			"trained_dir": "{}",
			"results_dir": "{}"
		}}"#,
		input.join("leak.txt").display(),
		input.join("eval.txt").display(),
		dir.join("trained").display(),
		dir.join("results").display()
	);
	let path = dir.join("config.json");
	fs::write(&path, json).unwrap();
	Config::load(&path).unwrap()
}

#[test]
fn test_train_then_evaluate() {
	let dir = tempfile::tempdir().unwrap();
	let config = write_config(
		dir.path(),
		"aab\naab\naba\nabab\nbbbb\nab\nabc\n",
		"aab\nab\nbbbb\naxa\naba\n",
	);

	let trained = TrainingOrchestrator::new(&config).unwrap().run().unwrap();
	assert_eq!(trained.keys().copied().collect::<Vec<_>>(), vec![3, 4]);

	// Reloaded tables are identical to the trained ones
	let scorer = Scorer::load(&config).unwrap();
	assert_eq!(scorer.lengths().collect::<Vec<_>>(), vec![3, 4]);
	for (length, model) in &trained {
		assert_eq!(scorer.select_model(*length).unwrap(), model);
	}

	let expected = 0.8 * 0.6 * (3.0 / 7.0) * (4.0 / 7.0);
	assert!((scorer.score("aab").unwrap() - expected).abs() < 1e-15);

	let output = config.result_path().unwrap();
	let summary = scorer.evaluate_file(&config.eval_file, &output).unwrap();
	assert_eq!(summary, EvaluationSummary { scored: 3, no_model: 1, invalid: 1 });

	let mut results = read_results(&output).unwrap();
	let candidates: Vec<&str> = results.iter().map(ResultLine::candidate).collect();
	assert_eq!(candidates, vec!["aab", "ab", "bbbb", "axa", "aba"]);

	sort_results(&mut results);
	assert!(matches!(results[0], ResultLine::Scored { .. }));
	assert!(matches!(results[4], ResultLine::Diagnostic { .. }));
}

#[test]
fn test_missing_length_fails_loading() {
	let dir = tempfile::tempdir().unwrap();
	let config = write_config(dir.path(), "aab\nabab\n", "aab\n");
	TrainingOrchestrator::new(&config).unwrap().run().unwrap();

	let store = ModelStore::new(&config.trained_dir);
	fs::remove_file(store.path_for(&ModelKey::new("leak", TableKind::End, 2, 4))).unwrap();

	match Scorer::load(&config) {
		Err(MeterError::Loading { length, source }) => {
			assert_eq!(length, 4);
			assert!(matches!(*source, MeterError::ModelNotFound { .. }));
		}
		other => panic!("expected a loading failure, got {:?}", other.map(|scorer| scorer.lengths().count())),
	}
}

#[test]
fn test_unwritable_store_is_attributed() {
	let dir = tempfile::tempdir().unwrap();
	let mut config = write_config(dir.path(), "aab\nabab\n", "aab\n");
	// A file where the model directory should be
	let blocker = dir.path().join("blocker");
	fs::write(&blocker, "").unwrap();
	config.trained_dir = blocker.join("trained");

	match TrainingOrchestrator::new(&config).unwrap().run() {
		Err(MeterError::TrainingFailed { failures }) => {
			assert_eq!(failures.len(), 2);
			for failure in failures {
				assert!(matches!(
					failure,
					MeterError::Training { stage: TrainingStage::Saving(TableKind::Initial), .. }
				));
			}
		}
		other => panic!("expected a training failure, got {:?}", other.map(|models| models.len())),
	}
}
