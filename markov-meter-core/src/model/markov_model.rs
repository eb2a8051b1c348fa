use crate::error::{MeterError, Result};

use super::indexer::NGramIndexer;
use super::table::{ProbabilityTable, TableKind};

/// A trained model for passwords of exactly one length.
///
/// # Responsibilities
/// - Hold the initial, conditional and end tables of one length
/// - Score candidates of that length
///
/// # Invariants
/// - Each table has the kind of the field holding it
/// - Tables are never mutated after construction
#[derive(Clone, Debug, PartialEq)]
pub struct MarkovModel {
	length: usize,
	initial: ProbabilityTable,
	conditional: ProbabilityTable,
	end: ProbabilityTable,
}

impl MarkovModel {
	/// Assembles a model from its three tables.
	///
	/// # Errors
	/// Returns a configuration error if a table has the wrong kind.
	pub fn new(
		length: usize,
		initial: ProbabilityTable,
		conditional: ProbabilityTable,
		end: ProbabilityTable,
	) -> Result<Self> {
		for (expected, table) in TableKind::ALL.iter().zip([&initial, &conditional, &end]) {
			if table.kind() != *expected {
				return Err(MeterError::Config(format!(
					"expected a {} table for length {}, got a {} table",
					expected,
					length,
					table.kind()
				)));
			}
		}
		Ok(Self { length, initial, conditional, end })
	}

	pub fn length(&self) -> usize {
		self.length
	}

	pub fn table(&self, kind: TableKind) -> &ProbabilityTable {
		match kind {
			TableKind::Initial => &self.initial,
			TableKind::Conditional => &self.conditional,
			TableKind::End => &self.end,
		}
	}

	/// Estimated likelihood of `candidate`.
	///
	/// `P = P_ip(prefix) * P_ep(suffix) * Π P_cp(window)`, multiplied in
	/// that order.
	///
	/// # Errors
	/// Returns `InvalidInput` if the candidate has the wrong length or
	/// contains symbols outside the alphabet.
	///
	/// # Notes
	/// The product underflows to 0.0 for long, unlikely candidates. Use
	/// `log_probability` when the magnitude matters.
	pub fn probability(&self, indexer: &NGramIndexer, candidate: &str) -> Result<f64> {
		let symbols = self.check_candidate(indexer, candidate)?;

		let mut probability = self.initial.slot(indexer.initial_index(&symbols)?)?
			* self.end.slot(indexer.end_index(&symbols)?)?;
		for index in indexer.conditional_indices(&symbols) {
			probability *= self.conditional.slot(index?)?;
		}
		Ok(probability)
	}

	/// Natural logarithm of `probability`, computed as a sum of logs.
	pub fn log_probability(&self, indexer: &NGramIndexer, candidate: &str) -> Result<f64> {
		let symbols = self.check_candidate(indexer, candidate)?;

		let mut log_probability = self.initial.slot(indexer.initial_index(&symbols)?)?.ln()
			+ self.end.slot(indexer.end_index(&symbols)?)?.ln();
		for index in indexer.conditional_indices(&symbols) {
			log_probability += self.conditional.slot(index?)?.ln();
		}
		Ok(log_probability)
	}

	fn check_candidate(&self, indexer: &NGramIndexer, candidate: &str) -> Result<Vec<char>> {
		let symbols: Vec<char> = candidate.chars().collect();
		if symbols.len() != self.length {
			return Err(MeterError::InvalidInput {
				candidate: candidate.to_owned(),
				reason: format!("length {} does not match the model length {}", symbols.len(), self.length),
			});
		}
		if let Some(symbol) = symbols.iter().find(|symbol| !indexer.alphabet().contains(**symbol)) {
			return Err(MeterError::InvalidInput {
				candidate: candidate.to_owned(),
				reason: format!("{:?} is not in the alphabet", symbol),
			});
		}
		Ok(symbols)
	}
}
