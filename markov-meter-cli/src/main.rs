use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, LevelFilter};
use markov_meter_core::report::{read_results, sort_results, CorpusStats};
use markov_meter_core::{Config, Scorer, TrainingOrchestrator};

#[derive(Parser, Debug)]
#[command(name = "markov-meter")]
#[command(version)]
#[command(about = "Per-length Markov model password strength meter", long_about = None)]
struct Cli {
	/// Session configuration (JSON)
	#[arg(short, long, global = true, value_name = "PATH", default_value = "configs/dev.json")]
	config: PathBuf,

	/// More logs (repeatable)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	verbose: u8,

	/// Fewer logs (repeatable)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	quiet: u8,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Train one model per configured length
	Train,

	/// Score every line of a candidate file
	Eval {
		/// Candidates, one per line (defaults to `eval_file`)
		#[arg(short, long, value_name = "PATH")]
		input: Option<PathBuf>,

		/// Result file (defaults to `<results_dir>/<eval stem>_result.txt`)
		#[arg(short, long, value_name = "PATH")]
		output: Option<PathBuf>,
	},

	/// Print statistics of a password file
	Info {
		file: PathBuf,
	},

	/// Print a result file, most likely candidates first
	Sort {
		file: PathBuf,
	},
}

fn log_level(verbose: u8, quiet: u8) -> LevelFilter {
	const LEVELS: [LevelFilter; 6] = [
		LevelFilter::Off,
		LevelFilter::Error,
		LevelFilter::Warn,
		LevelFilter::Info,
		LevelFilter::Debug,
		LevelFilter::Trace,
	];
	let level = (3 + verbose as i32 - quiet as i32).clamp(0, LEVELS.len() as i32 - 1);
	LEVELS[level as usize]
}

fn load_config(cli: &Cli) -> Result<Config> {
	let config = Config::load(&cli.config)
		.with_context(|| format!("failed to load configuration {}", cli.config.display()))?;
	info!("session '{}'", config.name);
	Ok(config)
}

fn train(cli: &Cli) -> Result<()> {
	let config = load_config(cli)?;
	let orchestrator = TrainingOrchestrator::new(&config).context("invalid training setup")?;
	let models = orchestrator.run().context("training failed")?;
	println!(
		"{} model(s) trained in {}: lengths {:?}",
		models.len(),
		orchestrator.store().dir().display(),
		models.keys().collect::<Vec<_>>()
	);
	Ok(())
}

fn eval(cli: &Cli, input: Option<&PathBuf>, output: Option<&PathBuf>) -> Result<()> {
	let config = load_config(cli)?;
	let input = input.cloned().unwrap_or_else(|| config.eval_file.clone());
	let output = match output {
		Some(output) => output.clone(),
		None => config.result_path()?,
	};

	let scorer = Scorer::load(&config).context("failed to load models")?;
	let summary = scorer
		.evaluate_file(&input, &output)
		.with_context(|| format!("failed to evaluate {}", input.display()))?;
	println!(
		"{} candidate(s): {} scored, {} without model, {} invalid",
		summary.total(),
		summary.scored,
		summary.no_model,
		summary.invalid
	);
	println!("results: {}", output.display());
	Ok(())
}

fn info(file: &PathBuf) -> Result<()> {
	let stats = CorpusStats::from_file(file).with_context(|| format!("failed to read {}", file.display()))?;
	let lengths: Vec<String> = stats.lengths.iter().map(usize::to_string).collect();

	println!("file: {}", file.display());
	println!("lines: {}", stats.lines);
	match (stats.min_length, stats.max_length) {
		(Some(min), Some(max)) => println!("lengths: {}..={} ({})", min, max, lengths.join(", ")),
		_ => println!("lengths: none"),
	}
	println!("symbols: {}", stats.symbol_counts.len());
	println!("printable ascii only: {}", stats.ascii_only);
	println!("alphabet: {}", serde_json::to_string(&stats.alphabet())?);
	Ok(())
}

fn sort(file: &PathBuf) -> Result<()> {
	let mut results = read_results(file).with_context(|| format!("failed to read {}", file.display()))?;
	sort_results(&mut results);

	let mut stdout = BufWriter::new(io::stdout().lock());
	for result in &results {
		writeln!(stdout, "{}", result)?;
	}
	stdout.flush()?;
	Ok(())
}

fn main() -> Result<()> {
	let cli = Cli::parse();

	let mut logger = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
	if cli.verbose > 0 || cli.quiet > 0 {
		logger.filter_level(log_level(cli.verbose, cli.quiet));
	}
	logger.format_timestamp_millis().init();

	match &cli.command {
		Command::Train => train(&cli),
		Command::Eval { input, output } => eval(&cli, input.as_ref(), output.as_ref()),
		Command::Info { file } => info(file),
		Command::Sort { file } => sort(file),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_log_level() {
		assert_eq!(log_level(0, 0), LevelFilter::Info);
		assert_eq!(log_level(1, 0), LevelFilter::Debug);
		assert_eq!(log_level(5, 0), LevelFilter::Trace);
		assert_eq!(log_level(0, 2), LevelFilter::Error);
		assert_eq!(log_level(0, 9), LevelFilter::Off);
	}

	#[test]
	fn test_cli_parses_subcommands() {
		let cli = Cli::try_parse_from(["markov-meter", "-v", "--config", "c.json", "eval", "-i", "in.txt"]).unwrap();
		assert_eq!(cli.verbose, 1);
		assert_eq!(cli.config, PathBuf::from("c.json"));
		assert!(matches!(cli.command, Command::Eval { input: Some(_), output: None }));
	}
}
