//! Corpus statistics and result sorting.
//!
//! Helpers around the core: `CorpusStats` suggests an alphabet and the
//! lengths worth training, `ResultLine` and `sort_results` rank the output of
//! an evaluation by likelihood.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::io::BufRead;
use std::path::Path;

use crate::error::Result;
use crate::io;

/// Statistics of a password file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CorpusStats {
	pub lines: usize,
	pub min_length: Option<usize>,
	pub max_length: Option<usize>,
	/// Every observed length.
	pub lengths: BTreeSet<usize>,
	/// Occurrences of every observed symbol.
	pub symbol_counts: HashMap<char, usize>,
	/// Whether every symbol is printable ASCII (32..=126).
	pub ascii_only: bool,
}

impl CorpusStats {
	pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
		let mut stats = Self { ascii_only: true, ..Self::default() };

		for line in io::lines(reader) {
			let line = line?;
			let mut length = 0;
			for symbol in line.chars() {
				*stats.symbol_counts.entry(symbol).or_insert(0) += 1;
				if !(' '..='~').contains(&symbol) {
					stats.ascii_only = false;
				}
				length += 1;
			}

			stats.lines += 1;
			stats.min_length = Some(stats.min_length.map_or(length, |min| min.min(length)));
			stats.max_length = Some(stats.max_length.map_or(length, |max| max.max(length)));
			stats.lengths.insert(length);
		}

		Ok(stats)
	}

	pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
		Self::from_reader(io::open(path)?)
	}

	/// Observed symbols, most frequent first (ties in symbol order).
	pub fn alphabet(&self) -> String {
		let mut symbols: Vec<(&char, &usize)> = self.symbol_counts.iter().collect();
		symbols.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));
		symbols.into_iter().map(|(symbol, _)| *symbol).collect()
	}
}

/// One line of an evaluation result file.
#[derive(Clone, Debug, PartialEq)]
pub enum ResultLine {
	Scored { probability: f64, candidate: String },
	/// A candidate that could not be scored, with the reason written for it.
	Diagnostic { message: String, candidate: String },
}

impl ResultLine {
	/// Parses `<probability|message>\t<candidate>`.
	///
	/// Returns `None` for a line without a tab.
	pub fn parse(line: &str) -> Option<Self> {
		let (head, candidate) = line.split_once('\t')?;
		let candidate = candidate.to_owned();
		Some(match head.parse::<f64>() {
			Ok(probability) => ResultLine::Scored { probability, candidate },
			Err(_) => ResultLine::Diagnostic { message: head.to_owned(), candidate },
		})
	}

	pub fn candidate(&self) -> &str {
		match self {
			ResultLine::Scored { candidate, .. } | ResultLine::Diagnostic { candidate, .. } => candidate,
		}
	}

	fn rank(&self) -> Option<f64> {
		match self {
			ResultLine::Scored { probability, .. } => Some(*probability),
			ResultLine::Diagnostic { .. } => None,
		}
	}
}

impl fmt::Display for ResultLine {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ResultLine::Scored { probability, candidate } => write!(f, "{:e}\t{}", probability, candidate),
			ResultLine::Diagnostic { message, candidate } => write!(f, "{}\t{}", message, candidate),
		}
	}
}

/// Reads every parsable line of a result file.
pub fn read_results<P: AsRef<Path>>(path: P) -> Result<Vec<ResultLine>> {
	let mut results = Vec::new();
	for line in io::lines(io::open(path)?) {
		if let Some(result) = ResultLine::parse(&line?) {
			results.push(result);
		}
	}
	Ok(results)
}

/// Most likely first, diagnostics last. The sort is stable.
pub fn sort_results(results: &mut [ResultLine]) {
	results.sort_by(|a, b| match (a.rank(), b.rank()) {
		(Some(a), Some(b)) => b.total_cmp(&a),
		(Some(_), None) => Ordering::Less,
		(None, Some(_)) => Ordering::Greater,
		(None, None) => Ordering::Equal,
	});
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_corpus_stats() {
		let stats = CorpusStats::from_reader("abc\naab\nhello\n".as_bytes()).unwrap();
		assert_eq!(stats.lines, 3);
		assert_eq!(stats.min_length, Some(3));
		assert_eq!(stats.max_length, Some(5));
		assert_eq!(stats.lengths.iter().copied().collect::<Vec<_>>(), vec![3, 5]);
		assert!(stats.ascii_only);
		// a:3, b:2, l:2, c:1, e:1, h:1, o:1
		assert_eq!(stats.alphabet(), "ablceho");
	}

	#[test]
	fn test_non_ascii_corpus() {
		let stats = CorpusStats::from_reader("café\n".as_bytes()).unwrap();
		assert!(!stats.ascii_only);
		assert_eq!(stats.max_length, Some(4));
	}

	#[test]
	fn test_empty_corpus() {
		let stats = CorpusStats::from_reader("".as_bytes()).unwrap();
		assert_eq!(stats.lines, 0);
		assert_eq!(stats.min_length, None);
	}

	#[test]
	fn test_parse_result_lines() {
		assert_eq!(
			ResultLine::parse("2.5e-3\tsecret"),
			Some(ResultLine::Scored { probability: 0.0025, candidate: "secret".to_owned() })
		);
		assert_eq!(
			ResultLine::parse("Info: No Markov model for this length: 2\tab"),
			Some(ResultLine::Diagnostic {
				message: "Info: No Markov model for this length: 2".to_owned(),
				candidate: "ab".to_owned()
			})
		);
		assert_eq!(ResultLine::parse("garbage"), None);
	}

	#[test]
	fn test_sort_puts_diagnostics_last() {
		let mut results: Vec<ResultLine> = [
			"1e-5\tlow",
			"Info: Password contains invalid characters:\tbad!",
			"3e-2\thigh",
			"Info: No Markov model for this length: 2\tab",
			"4e-4\tmid",
		]
		.iter()
		.filter_map(|line| ResultLine::parse(line))
		.collect();

		sort_results(&mut results);
		let order: Vec<&str> = results.iter().map(ResultLine::candidate).collect();
		assert_eq!(order, vec!["high", "mid", "low", "bad!", "ab"]);
	}
}
