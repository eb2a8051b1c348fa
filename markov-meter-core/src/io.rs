use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Opens a text file for buffered line reading.
pub(crate) fn open<P: AsRef<Path>>(filename: P) -> io::Result<BufReader<File>> {
	Ok(BufReader::new(File::open(filename)?))
}

/// Splits a reader into raw byte lines, on `\n` / `\r\n`.
pub(crate) fn raw_lines<R: BufRead>(reader: R) -> impl Iterator<Item = io::Result<Vec<u8>>> {
	reader.split(b'\n').map(|line| {
		line.map(|mut bytes| {
			if bytes.last() == Some(&b'\r') {
				bytes.pop();
			}
			bytes
		})
	})
}

/// Splits a reader into lines.
///
/// Lines are arbitrary bytes: invalid UTF-8 is replaced by `U+FFFD`
/// instead of failing the whole read.
pub(crate) fn lines<R: BufRead>(reader: R) -> impl Iterator<Item = io::Result<String>> {
	raw_lines(reader).map(|line| line.map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
}

/// Builds an output path inside `folder` from an input file name.
///
/// Example:
/// `results` + `input/eval.txt` + `"_result"` + `"txt"` → `results/eval_result.txt`
pub(crate) fn build_output_path<F, P>(folder: F, input_path: P, suffix: &str, output_extension: &str) -> io::Result<PathBuf>
where
	F: AsRef<Path>,
	P: AsRef<Path>,
{
	let mut output = folder.as_ref().to_path_buf();
	output.push(format!("{}{}", get_filename(input_path)?, suffix));
	output.set_extension(output_extension);
	Ok(output)
}

/// Extracts the base filename without extension.
///
/// Examples:
/// - `"./input/rockyou.txt"` → `"rockyou"`
/// - `"rockyou.txt"` → `"rockyou"`
pub(crate) fn get_filename<P: AsRef<Path>>(input_path: P) -> io::Result<String> {
	let stem = input_path
		.as_ref()
		.file_stem()
		.ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "Path has no filename"))?;

	Ok(stem.to_string_lossy().to_string())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_lines_strip_carriage_return_and_keep_bad_bytes() {
		let data: &[u8] = b"abc\r\nd\xffe\n\nlast";
		let lines: Vec<String> = lines(data).collect::<io::Result<_>>().unwrap();
		assert_eq!(lines, vec!["abc", "d\u{FFFD}e", "", "last"]);
	}

	#[test]
	fn test_raw_lines_keep_original_bytes() {
		let data: &[u8] = b"ab\xe2\x82a\r\nok";
		let lines: Vec<Vec<u8>> = raw_lines(data).collect::<io::Result<_>>().unwrap();
		assert_eq!(lines, vec![b"ab\xe2\x82a".to_vec(), b"ok".to_vec()]);
	}

	#[test]
	fn test_output_path() {
		let path = build_output_path("results", "input/eval.txt", "_result", "txt").unwrap();
		assert_eq!(path, PathBuf::from("results/eval_result.txt"));
		assert_eq!(get_filename("./input/rockyou.txt").unwrap(), "rockyou");
	}
}
