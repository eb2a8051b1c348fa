use crate::error::{MeterError, Result};

use super::alphabet::Alphabet;
use super::table::TableKind;

/// Smallest supported n-gram order.
pub const MIN_NGRAM_SIZE: usize = 2;
/// Largest supported n-gram order.
pub const MAX_NGRAM_SIZE: usize = 5;

/// Maps n-grams to table indices and back.
///
/// An n-gram of `k` symbols is read as a base-`A` number whose most
/// significant digit is the first symbol:
///
/// `index = Σ rank(symbol[k-1-i]) * A^i` for `i` in `0..k`
///
/// Two index spaces exist for an order `n` model:
/// - `n-1` symbols, used by the initial and end tables
/// - `n` symbols, used by the conditional table. Because the trailing symbol
///   is the least significant digit, all windows sharing a context occupy
///   `A` contiguous slots.
///
/// # Invariants
/// - `MIN_NGRAM_SIZE <= ngram_size <= MAX_NGRAM_SIZE`
/// - `A^ngram_size` fits in a `usize`
#[derive(Clone, Debug)]
pub struct NGramIndexer {
	alphabet: Alphabet,
	ngram_size: usize,
}

impl NGramIndexer {
	/// Creates an indexer for order `ngram_size` over `alphabet`.
	///
	/// # Errors
	/// Returns a configuration error if the order is unsupported or the
	/// conditional table would not be addressable.
	pub fn new(alphabet: Alphabet, ngram_size: usize) -> Result<Self> {
		if !(MIN_NGRAM_SIZE..=MAX_NGRAM_SIZE).contains(&ngram_size) {
			return Err(MeterError::Config(format!(
				"ngram_size must be between {} and {}, got {}",
				MIN_NGRAM_SIZE, MAX_NGRAM_SIZE, ngram_size
			)));
		}
		if TableKind::Conditional.table_size(alphabet.len(), ngram_size).is_none() {
			return Err(MeterError::Config(format!(
				"an alphabet of {} symbols is too large for ngram_size {}",
				alphabet.len(),
				ngram_size
			)));
		}
		Ok(Self { alphabet, ngram_size })
	}

	pub fn alphabet(&self) -> &Alphabet {
		&self.alphabet
	}

	pub fn ngram_size(&self) -> usize {
		self.ngram_size
	}

	/// Length of a context, prefix, or suffix (`n-1`).
	pub fn context_size(&self) -> usize {
		self.ngram_size - 1
	}

	pub fn table_size(&self, kind: TableKind) -> usize {
		// Bounded by the conditional size checked in `new`
		self.alphabet.len().pow(kind.ngram_len(self.ngram_size) as u32)
	}

	/// Encodes an n-gram of `n-1` or `n` symbols into its index.
	///
	/// # Errors
	/// - `NGramLength` if the n-gram has any other length
	/// - `OutOfAlphabet` if one of its symbols is not in the alphabet
	pub fn index_of(&self, ngram: &[char]) -> Result<usize> {
		if ngram.len() != self.ngram_size && ngram.len() != self.context_size() {
			return Err(MeterError::NGramLength { found: ngram.len(), ngram_size: self.ngram_size });
		}

		let radix = self.alphabet.len();
		ngram.iter().try_fold(0, |index, symbol| {
			let rank = self.alphabet.encode(*symbol).map_err(|_| MeterError::OutOfAlphabet {
				ngram: ngram.iter().collect(),
				symbol: *symbol,
			})?;
			Ok(index * radix + rank)
		})
	}

	/// Convenience wrapper around `index_of` for string slices.
	pub fn index_of_str(&self, ngram: &str) -> Result<usize> {
		let symbols: Vec<char> = ngram.chars().collect();
		self.index_of(&symbols)
	}

	/// Decodes `index` back into the n-gram of `k` symbols it encodes.
	///
	/// # Errors
	/// - `NGramLength` if `k` is neither `n-1` nor `n`
	/// - `IndexOutOfRange` if `index >= A^k`
	pub fn ngram_of(&self, index: usize, k: usize) -> Result<String> {
		if k != self.ngram_size && k != self.context_size() {
			return Err(MeterError::NGramLength { found: k, ngram_size: self.ngram_size });
		}

		let radix = self.alphabet.len();
		let size = radix.pow(k as u32);
		if index >= size {
			return Err(MeterError::IndexOutOfRange { index, size });
		}

		// Least significant digit first
		let mut digits = Vec::with_capacity(k);
		let mut rest = index;
		for _ in 0..k {
			digits.push(rest % radix);
			rest /= radix;
		}

		digits
			.iter()
			.rev()
			.map(|rank| self.alphabet.decode(*rank).ok_or(MeterError::IndexOutOfRange { index, size }))
			.collect()
	}

	/// Index of the first `n-1` symbols.
	pub fn initial_index(&self, symbols: &[char]) -> Result<usize> {
		let prefix = symbols.get(..self.context_size()).ok_or(MeterError::NGramLength {
			found: symbols.len(),
			ngram_size: self.ngram_size,
		})?;
		self.index_of(prefix)
	}

	/// Index of the last `n-1` symbols.
	pub fn end_index(&self, symbols: &[char]) -> Result<usize> {
		let start = symbols.len().checked_sub(self.context_size()).ok_or(MeterError::NGramLength {
			found: symbols.len(),
			ngram_size: self.ngram_size,
		})?;
		self.index_of(&symbols[start..])
	}

	/// Indices of every window of `n` symbols, stride 1, in order.
	///
	/// Yields nothing if the string is shorter than `n`.
	pub fn conditional_indices<'a>(
		&'a self,
		symbols: &'a [char],
	) -> impl Iterator<Item = Result<usize>> + 'a {
		symbols.windows(self.ngram_size).map(|window| self.index_of(window))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn indexer(alphabet: &str, n: usize) -> NGramIndexer {
		NGramIndexer::new(Alphabet::new(alphabet).unwrap(), n).unwrap()
	}

	#[test]
	fn test_first_symbol_is_most_significant() {
		let indexer = indexer("abc", 3);
		assert_eq!(indexer.index_of_str("aa").unwrap(), 0);
		assert_eq!(indexer.index_of_str("ab").unwrap(), 1);
		assert_eq!(indexer.index_of_str("ba").unwrap(), 3);
		assert_eq!(indexer.index_of_str("cab").unwrap(), 2 * 9 + 1);
		assert_eq!(indexer.index_of_str("ccc").unwrap(), 26);
	}

	#[test]
	fn test_decode() {
		let indexer = indexer("abc", 3);
		assert_eq!(indexer.ngram_of(19, 3).unwrap(), "cab");
		assert_eq!(indexer.ngram_of(0, 2).unwrap(), "aa");
		assert!(matches!(indexer.ngram_of(27, 3), Err(MeterError::IndexOutOfRange { index: 27, size: 27 })));
	}

	#[test]
	fn test_exhaustive_round_trip_every_order() {
		for n in MIN_NGRAM_SIZE..=MAX_NGRAM_SIZE {
			let indexer = indexer("xyz", n);
			for k in [n - 1, n] {
				let size = 3usize.pow(k as u32);
				for index in 0..size {
					let ngram = indexer.ngram_of(index, k).unwrap();
					assert_eq!(ngram.chars().count(), k);
					assert_eq!(indexer.index_of_str(&ngram).unwrap(), index);
				}
			}
		}
	}

	#[test]
	fn test_out_of_alphabet() {
		let indexer = indexer("abc", 2);
		match indexer.index_of_str("aZ") {
			Err(MeterError::OutOfAlphabet { ngram, symbol }) => {
				assert_eq!(ngram, "aZ");
				assert_eq!(symbol, 'Z');
			}
			other => panic!("unexpected result: {:?}", other),
		}
	}

	#[test]
	fn test_wrong_length_is_rejected() {
		let indexer = indexer("abc", 3);
		assert!(matches!(indexer.index_of_str("abca"), Err(MeterError::NGramLength { found: 4, .. })));
		assert!(matches!(indexer.index_of_str("a"), Err(MeterError::NGramLength { found: 1, .. })));
		assert!(indexer.ngram_of(0, 4).is_err());
	}

	#[test]
	fn test_unsupported_orders() {
		let alphabet = Alphabet::new("ab").unwrap();
		assert!(matches!(NGramIndexer::new(alphabet.clone(), 1), Err(MeterError::Config(_))));
		assert!(matches!(NGramIndexer::new(alphabet, 6), Err(MeterError::Config(_))));
	}

	#[test]
	fn test_windows() {
		// password: pa | pas ass ssw swo wor ord | rd
		let indexer = indexer("adoprsw", 3);
		let symbols: Vec<char> = "password".chars().collect();
		let windows: Vec<String> = indexer
			.conditional_indices(&symbols)
			.map(|index| indexer.ngram_of(index.unwrap(), 3).unwrap())
			.collect();
		assert_eq!(windows, vec!["pas", "ass", "ssw", "swo", "wor", "ord"]);
		assert_eq!(indexer.ngram_of(indexer.initial_index(&symbols).unwrap(), 2).unwrap(), "pa");
		assert_eq!(indexer.ngram_of(indexer.end_index(&symbols).unwrap(), 2).unwrap(), "rd");
	}

	#[test]
	fn test_too_short_for_prefix() {
		let indexer = indexer("ab", 4);
		let symbols: Vec<char> = "ab".chars().collect();
		assert!(indexer.initial_index(&symbols).is_err());
		assert!(indexer.end_index(&symbols).is_err());
		assert_eq!(indexer.conditional_indices(&symbols).count(), 0);
	}
}
