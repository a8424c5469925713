use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// Reads a text file and returns all its lines as a `Vec<String>`.
///
/// - Reads the entire file into memory
/// - Splits on `\n` / `\r\n`
pub(crate) fn read_file<P: AsRef<Path>>(filename: P) -> io::Result<Vec<String>> {
	let mut contents = String::new();
	File::open(filename)?.read_to_string(&mut contents)?;
	Ok(contents.lines().map(str::to_owned).collect())
}

/// Reads a whole text file.
pub(crate) fn read_to_string<P: AsRef<Path>>(filename: P) -> io::Result<String> {
	fs::read_to_string(filename)
}

/// Builds an output path based on an input path and a new extension.
///
/// Example:
/// `data/domains.dat` + `"bin"` → `data/domains.bin`
pub(crate) fn build_output_path<P: AsRef<Path>>(
	input_path: P,
	output_extension: &str,
) -> io::Result<PathBuf> {
	let input_path = input_path.as_ref();

	let parent = input_path.parent().unwrap_or_else(|| Path::new("."));
	let file_stem = input_path
		.file_stem()
		.ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "Input path has no filename"))?;

	let mut output = PathBuf::from(parent);
	output.push(file_stem);
	output.set_extension(output_extension);

	Ok(output)
}

/// Returns `true` if `path` was modified at the same time as or after `reference`.
///
/// Missing files or platforms without modification times give `false`.
pub(crate) fn is_newer<P: AsRef<Path>, R: AsRef<Path>>(path: P, reference: R) -> bool {
	let modified = |p: &Path| fs::metadata(p).and_then(|m| m.modified()).ok();
	match (modified(path.as_ref()), modified(reference.as_ref())) {
		(Some(path), Some(reference)) => path >= reference,
		_ => false,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn output_path_swaps_extension() {
		let path = build_output_path("data/domains.dat", "bin").unwrap();
		assert_eq!(path, PathBuf::from("data/domains.bin"));
		assert!(build_output_path("", "bin").is_err());
	}

	#[test]
	fn newer_needs_both_files() {
		let dir = tempfile::tempdir().unwrap();
		let a = dir.path().join("a");
		let b = dir.path().join("b");
		fs::write(&a, "a").unwrap();
		assert!(!is_newer(&a, &b));
		fs::write(&b, "b").unwrap();
		assert!(is_newer(&b, &a));
	}
}
