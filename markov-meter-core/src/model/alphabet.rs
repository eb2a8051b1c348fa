use std::collections::HashMap;

use crate::error::{MeterError, Result};

/// Bidirectional mapping between alphabet symbols and dense integer ranks.
///
/// The rank of a symbol is its position in the configured alphabet string,
/// which makes the mapping stable across runs: a model trained with a given
/// alphabet can be reloaded and indexed identically later.
///
/// # Invariants
/// - `symbols[rank]` is the symbol configured at position `rank`
/// - Every key of `ranks` maps to a rank in `[0, len)`
///
/// # Notes
/// Duplicate symbols are not rejected. A later occurrence shadows the rank of
/// an earlier one, so the earlier rank is still reachable through `decode`
/// but never produced by `encode`.
#[derive(Clone, Debug)]
pub struct Alphabet {
	/// Symbols in rank order.
	symbols: Vec<char>,
	/// Reverse lookup, symbol to rank.
	ranks: HashMap<char, usize>,
}

impl Alphabet {
	/// Builds the codec from the configured alphabet string.
	///
	/// # Errors
	/// Returns a configuration error if the alphabet is empty.
	pub fn new(alphabet: &str) -> Result<Self> {
		let symbols: Vec<char> = alphabet.chars().collect();
		if symbols.is_empty() {
			return Err(MeterError::Config("alphabet must not be empty".to_owned()));
		}

		let ranks = symbols.iter().enumerate().map(|(rank, symbol)| (*symbol, rank)).collect();
		Ok(Self { symbols, ranks })
	}

	/// Number of configured positions (`A`), duplicates included.
	pub fn len(&self) -> usize {
		self.symbols.len()
	}

	pub fn is_empty(&self) -> bool {
		self.symbols.is_empty()
	}

	/// Returns the rank of `symbol`.
	///
	/// # Errors
	/// Returns `UnknownSymbol` if the symbol is not part of the alphabet.
	pub fn encode(&self, symbol: char) -> Result<usize> {
		self.ranks.get(&symbol).copied().ok_or(MeterError::UnknownSymbol(symbol))
	}

	/// Returns the symbol at `rank`, or `None` if `rank >= len()`.
	pub fn decode(&self, rank: usize) -> Option<char> {
		self.symbols.get(rank).copied()
	}

	pub fn contains(&self, symbol: char) -> bool {
		self.ranks.contains_key(&symbol)
	}

	/// Whether every character of `s` is part of the alphabet.
	pub fn contains_all(&self, s: &str) -> bool {
		s.chars().all(|c| self.contains(c))
	}

	/// Number of configured positions shadowed by a later duplicate.
	pub fn duplicates(&self) -> usize {
		self.symbols.len() - self.ranks.len()
	}

	/// Symbols in rank order.
	pub fn symbols(&self) -> &[char] {
		&self.symbols
	}
}
