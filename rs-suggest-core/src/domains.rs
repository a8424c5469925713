use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::DomainsError;
use crate::io::{build_output_path, is_newer, read_file};
use crate::model::generated_name::Status;

/// Registry status and relevance score of every listed label.
#[derive(Serialize, Deserialize, Debug, Default, Clone)]
struct Snapshot {
	entries: HashMap<String, (Status, f64)>,
}

/// Availability classifier.
///
/// Maps a rendered name to its registry status and a relevance score.
/// Labels that are not listed are available with a score of `0.0`.
///
/// # Lifecycle
/// - Built explicitly (`init` from disk, `from_entries` in memory) and passed
///   to the scheduler; there is no process-wide instance.
/// - Read-only while requests run. Refreshing means building a new instance
///   between requests.
/// - After `close`, every lookup degrades to `Status::Unknown` and `0.0`.
#[derive(Debug)]
pub struct Domains {
	snapshot: Snapshot,
	path: Option<PathBuf>,
	open: bool,
}

impl Domains {
	/// Loads a classifier from a text file of `label;status[;score]` lines.
	///
	/// # Behavior
	/// - Statuses are `taken`, `on_sale` or `available`.
	/// - Empty lines and lines starting with `#` are ignored.
	/// - A later line for the same label wins.
	/// - If a `.bin` cache newer than the text file exists next to it, it is
	///   decoded with `postcard`. Otherwise the text file is parsed in parallel
	///   chunks and the cache is written for the next load.
	///
	/// # Errors
	/// Returns an error on I/O failure, a corrupted cache, or a malformed line.
	pub fn init<P: AsRef<Path>>(path: P) -> Result<Self, DomainsError> {
		let path = path.as_ref();
		let cache_path = build_output_path(path, "bin")?;

		let snapshot = if cache_path.exists() && is_newer(&cache_path, path) {
			let bytes = std::fs::read(&cache_path)?;
			postcard::from_bytes(&bytes)?
		} else {
			let snapshot = Self::parse_file(path)?;
			let bytes = postcard::to_stdvec(&snapshot)?;
			std::fs::write(&cache_path, bytes)?;
			snapshot
		};

		info!("loaded {} registry entries from {}", snapshot.entries.len(), path.display());
		Ok(Self { snapshot, path: Some(path.to_owned()), open: true })
	}

	/// Builds a classifier from in-memory entries.
	pub fn from_entries<I>(entries: I) -> Self
	where
		I: IntoIterator<Item = (String, Status, f64)>,
	{
		let entries = entries.into_iter().map(|(label, status, score)| (label, (status, score))).collect();
		Self { snapshot: Snapshot { entries }, path: None, open: true }
	}

	/// Reloads the classifier from the file it was loaded from.
	///
	/// In-memory classifiers are left unchanged.
	pub fn reload(&mut self) -> Result<(), DomainsError> {
		if let Some(path) = self.path.clone() {
			*self = Self::init(path)?;
		}
		Ok(())
	}

	/// Ends the lifecycle of the classifier.
	pub fn close(&mut self) {
		if self.open {
			info!("closing registry classifier ({} entries)", self.snapshot.entries.len());
		}
		self.snapshot.entries.clear();
		self.open = false;
	}

	pub fn is_open(&self) -> bool {
		self.open
	}

	pub fn len(&self) -> usize {
		self.snapshot.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.snapshot.entries.is_empty()
	}

	pub fn status_of(&self, label: &str) -> Status {
		if !self.open {
			return Status::Unknown;
		}
		self.snapshot.entries.get(label).map(|(status, _)| *status).unwrap_or(Status::Available)
	}

	pub fn score_of(&self, label: &str) -> f64 {
		if !self.open {
			return 0.0;
		}
		self.snapshot.entries.get(label).map(|(_, score)| *score).unwrap_or(0.0)
	}

	/// Parses a text file in parallel chunks.
	///
	/// # Notes
	/// - Chunks are merged back in file order, so a later line always wins.
	/// - Uses MPSC channels to collect partial maps from threads.
	fn parse_file<P: AsRef<Path>>(path: P) -> Result<Snapshot, DomainsError> {
		let lines = read_file(&path)?;
		if lines.is_empty() {
			return Ok(Snapshot::default());
		}
		let chunks = num_cpus::get() * 8;
		let chunk_size = lines.len().div_ceil(chunks);

		let (tx, rx) = mpsc::channel();
		for (index, chunk) in lines.chunks(chunk_size).enumerate() {
			let tx = tx.clone();
			let chunk: Vec<String> = chunk.to_vec();
			let first_line = index * chunk_size + 1;

			thread::spawn(move || {
				let partial = parse_lines(&chunk, first_line);
				// The receiver outlives every sender.
				let _ = tx.send((index, partial));
			});
		}
		drop(tx);

		let mut partials: Vec<(usize, Result<HashMap<String, (Status, f64)>, DomainsError>)> = rx.iter().collect();
		partials.sort_by_key(|(index, _)| *index);

		let mut snapshot = Snapshot::default();
		for (_, partial) in partials {
			snapshot.entries.extend(partial?);
		}
		Ok(snapshot)
	}
}

/// Parses registry lines, `first_line` being the 1-based number of `lines[0]`.
fn parse_lines(lines: &[String], first_line: usize) -> Result<HashMap<String, (Status, f64)>, DomainsError> {
	let mut entries = HashMap::new();
	for (offset, line) in lines.iter().enumerate() {
		let line_number = first_line + offset;
		let line = line.trim();
		if line.is_empty() || line.starts_with('#') {
			continue;
		}

		let mut fields = line.split(';').map(str::trim);
		let label = fields.next().unwrap_or_default().to_lowercase();
		let status = match fields.next().unwrap_or("taken").to_lowercase().as_str() {
			"taken" => Status::Taken,
			"on_sale" | "onsale" | "on-sale" => Status::OnSale,
			"available" => Status::Available,
			other => return Err(DomainsError::UnknownStatus { line: line_number, status: other.to_owned() }),
		};
		let score = match fields.next() {
			Some(raw) => match raw.parse::<f64>() {
				Ok(score) => score,
				Err(_) => return Err(DomainsError::InvalidScore { line: line_number, score: raw.to_owned() }),
			},
			None => 0.0,
		};

		if label.is_empty() {
			warn!("line {}: empty label ignored", line_number);
			continue;
		}
		entries.insert(label, (status, score));
	}
	Ok(entries)
}
