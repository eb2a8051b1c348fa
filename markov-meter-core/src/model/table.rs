use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{MeterError, Result};

/// Absolute tolerance of the sum-to-1.0 check.
const ABS_TOLERANCE: f64 = 1e-12;
/// Relative tolerance of the sum-to-1.0 check.
const REL_TOLERANCE: f64 = 1e-9;

/// The three tables making up one Markov model.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TableKind {
	/// P(password starts with the first `n-1` symbols | length)
	Initial,
	/// P(last symbol of a window | its first `n-1` symbols)
	Conditional,
	/// P(password ends with the last `n-1` symbols | length)
	End,
}

impl TableKind {
	pub const ALL: [TableKind; 3] = [TableKind::Initial, TableKind::Conditional, TableKind::End];

	/// Short tag used in model file names.
	pub fn tag(self) -> &'static str {
		match self {
			TableKind::Initial => "ip",
			TableKind::Conditional => "cp",
			TableKind::End => "ep",
		}
	}

	/// Number of symbols indexing one slot of this table.
	pub fn ngram_len(self, ngram_size: usize) -> usize {
		match self {
			TableKind::Conditional => ngram_size,
			TableKind::Initial | TableKind::End => ngram_size - 1,
		}
	}

	/// Number of slots (`A^k`), or `None` on overflow.
	pub fn table_size(self, alphabet_size: usize, ngram_size: usize) -> Option<usize> {
		let exponent = u32::try_from(self.ngram_len(ngram_size)).ok()?;
		alphabet_size.checked_pow(exponent)
	}
}

impl fmt::Display for TableKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			TableKind::Initial => "initial",
			TableKind::Conditional => "conditional",
			TableKind::End => "end",
		};
		f.write_str(name)
	}
}

/// Laplace-smoothed occurrence counts, mutated only during training.
///
/// # Invariants
/// - Every slot is >= 1 (all slots start at 1)
#[derive(Clone, Debug)]
pub struct CountTable {
	kind: TableKind,
	counts: Vec<u64>,
}

impl CountTable {
	/// Creates a table of `size` slots, each set to 1.
	pub fn new(kind: TableKind, size: usize) -> Self {
		Self { kind, counts: vec![1; size] }
	}

	pub fn kind(&self) -> TableKind {
		self.kind
	}

	pub fn len(&self) -> usize {
		self.counts.len()
	}

	pub fn is_empty(&self) -> bool {
		self.counts.is_empty()
	}

	pub fn counts(&self) -> &[u64] {
		&self.counts
	}

	pub fn get(&self, index: usize) -> Option<u64> {
		self.counts.get(index).copied()
	}

	/// Records one more occurrence at `index`.
	///
	/// # Errors
	/// Returns `IndexOutOfRange` if `index` is not a slot of this table.
	pub fn increment(&mut self, index: usize) -> Result<()> {
		let size = self.counts.len();
		let slot = self.counts.get_mut(index).ok_or(MeterError::IndexOutOfRange { index, size })?;
		*slot += 1;
		Ok(())
	}

	/// Turns the counts into probabilities.
	///
	/// - Initial and end tables are divided by the total of the whole table.
	/// - Conditional tables are divided group by group, a group being the
	///   `alphabet_size` contiguous slots sharing the same context.
	///
	/// # Errors
	/// Returns `Normalization` if a resulting distribution does not sum to 1.0
	/// within tolerance, which means the counting went wrong.
	pub fn normalize(self, alphabet_size: usize) -> Result<ProbabilityTable> {
		let values = match self.kind {
			TableKind::Conditional => normalize_groups(self.kind, &self.counts, alphabet_size)?,
			TableKind::Initial | TableKind::End => normalize_slice(self.kind, &self.counts)?,
		};
		Ok(ProbabilityTable { kind: self.kind, values })
	}
}

fn normalize_slice(kind: TableKind, counts: &[u64]) -> Result<Vec<f64>> {
	let total = counts.iter().sum::<u64>() as f64;
	let values: Vec<f64> = counts.iter().map(|count| *count as f64 / total).collect();

	let sum = compensated_sum(&values);
	if !is_almost_equal(sum, 1.0) {
		return Err(MeterError::Normalization { kind, sum });
	}
	Ok(values)
}

fn normalize_groups(kind: TableKind, counts: &[u64], alphabet_size: usize) -> Result<Vec<f64>> {
	if alphabet_size == 0 || counts.len() % alphabet_size != 0 {
		return Err(MeterError::Normalization { kind, sum: f64::NAN });
	}

	let mut values = Vec::with_capacity(counts.len());
	for group in counts.chunks(alphabet_size) {
		values.extend(normalize_slice(kind, group)?);
	}
	Ok(values)
}

/// Kahan summation, keeps the check meaningful on tables of millions of slots.
fn compensated_sum(values: &[f64]) -> f64 {
	let mut sum = 0.0;
	let mut compensation = 0.0;
	for value in values {
		let y = value - compensation;
		let t = sum + y;
		compensation = (t - sum) - y;
		sum = t;
	}
	sum
}

fn is_almost_equal(a: f64, b: f64) -> bool {
	(a - b).abs() <= f64::max(REL_TOLERANCE * f64::max(a.abs(), b.abs()), ABS_TOLERANCE)
}

/// Normalized, read-only probability table.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ProbabilityTable {
	kind: TableKind,
	values: Vec<f64>,
}

impl ProbabilityTable {
	#[cfg(test)]
	pub(crate) fn from_parts(kind: TableKind, values: Vec<f64>) -> Self {
		Self { kind, values }
	}

	pub fn kind(&self) -> TableKind {
		self.kind
	}

	pub fn len(&self) -> usize {
		self.values.len()
	}

	pub fn is_empty(&self) -> bool {
		self.values.is_empty()
	}

	pub fn values(&self) -> &[f64] {
		&self.values
	}

	pub fn get(&self, index: usize) -> Option<f64> {
		self.values.get(index).copied()
	}

	/// Like `get`, but an out of range index is an error.
	pub fn slot(&self, index: usize) -> Result<f64> {
		self.get(index).ok_or(MeterError::IndexOutOfRange { index, size: self.values.len() })
	}

	pub fn sum(&self) -> f64 {
		compensated_sum(&self.values)
	}

	/// Sum of every context group of `alphabet_size` slots.
	pub fn group_sums(&self, alphabet_size: usize) -> Vec<f64> {
		self.values.chunks(alphabet_size.max(1)).map(compensated_sum).collect()
	}
}
