use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use log::warn;

use crate::error::FilterError;
use crate::model::generated_name::GeneratedName;
use crate::model::request_params::RequestParams;
use crate::pipeline::filter::CandidateFilter;
use crate::pipeline::source::{CandidateSource, SourceArgs, TokenTuples};

/// Position of a stream in its source.
enum Cursor {
	/// The source has not been run yet.
	Pending,
	Running(TokenTuples),
	Exhausted,
}

/// Everything needed to run one pipeline on one argument set.
pub(crate) struct StreamSpec {
	pub pipeline: String,
	pub kind: String,
	pub lang: String,
	pub source: Arc<dyn CandidateSource>,
	pub filters: Arc<Vec<Box<dyn CandidateFilter>>>,
	pub args: SourceArgs,
	pub params: RequestParams,
	/// Normalized input, never emitted by the stream.
	pub echo: String,
}

struct StreamState {
	cursor: Cursor,
	spec: StreamSpec,
	chain: Vec<String>,
	pulled: usize,
}

/// Lazy, memoized sequence of candidates of one pipeline.
///
/// A `CandidateStream` is a shared cursor: cloning it clones the handle, not
/// the position. Each `try_next` call permanently advances the cursor, so a
/// candidate pulled through one handle is never seen through another.
///
/// The handle is `Rc`-based and cannot cross threads, which keeps the
/// single-owner advancement contract a property of the type.
///
/// # Behavior
/// - The source runs on the first pull, not at construction.
/// - Results go through the filters in order and are tagged with the
///   pipeline and interpretation.
/// - Candidates rendering to the normalized input are dropped.
/// - A source or filter error ends the stream (logged as a warning).
#[derive(Clone)]
pub struct CandidateStream {
	state: Rc<RefCell<StreamState>>,
}

impl CandidateStream {
	pub(crate) fn new(spec: StreamSpec) -> Self {
		let mut chain = vec![spec.pipeline.clone()];
		chain.extend(spec.filters.iter().map(|f| f.name().to_owned()));
		Self {
			state: Rc::new(RefCell::new(StreamState { cursor: Cursor::Pending, spec, chain, pulled: 0 })),
		}
	}

	/// Pulls the next candidate, or `None` once the stream is exhausted.
	pub fn try_next(&self) -> Option<GeneratedName> {
		self.state.borrow_mut().advance()
	}

	/// Returns `true` once the stream has reached its end.
	pub fn is_exhausted(&self) -> bool {
		matches!(self.state.borrow().cursor, Cursor::Exhausted)
	}

	/// Number of candidates handed out so far, across all handles.
	pub fn pulled(&self) -> usize {
		self.state.borrow().pulled
	}

	pub fn pipeline(&self) -> String {
		self.state.borrow().spec.pipeline.clone()
	}

	/// Returns `true` if both handles share the same cursor.
	pub fn same_stream(&self, other: &CandidateStream) -> bool {
		Rc::ptr_eq(&self.state, &other.state)
	}
}

impl StreamState {
	fn advance(&mut self) -> Option<GeneratedName> {
		loop {
			let item = match &mut self.cursor {
				Cursor::Exhausted => return None,
				Cursor::Pending => {
					self.start();
					continue;
				}
				Cursor::Running(tuples) => tuples.next(),
			};

			let tokens = match item {
				None => {
					self.cursor = Cursor::Exhausted;
					return None;
				}
				Some(Err(e)) => {
					warn!("pipeline `{}` degraded to exhausted: {}", self.spec.pipeline, e);
					self.cursor = Cursor::Exhausted;
					return None;
				}
				Some(Ok(tokens)) => tokens,
			};

			let name = GeneratedName::new(tokens, self.chain.clone());
			match self.run_filters(name) {
				Ok(Some(name)) if name.rendered() != self.spec.echo => {
					self.pulled += 1;
					return Some(name.tag(&self.spec.pipeline, &self.spec.kind, &self.spec.lang));
				}
				Ok(_) => continue,
				Err(e) => {
					warn!("pipeline `{}` terminated by filter: {}", self.spec.pipeline, e);
					self.cursor = Cursor::Exhausted;
					return None;
				}
			}
		}
	}

	/// Runs the source. A failing source leaves the stream exhausted.
	fn start(&mut self) {
		self.cursor = match self.spec.source.generate(&self.spec.args, &self.spec.params) {
			Ok(tuples) => Cursor::Running(tuples),
			Err(e) => {
				warn!("pipeline `{}` degraded to exhausted: {}", self.spec.pipeline, e);
				Cursor::Exhausted
			}
		};
	}

	fn run_filters(&self, name: GeneratedName) -> Result<Option<GeneratedName>, FilterError> {
		let mut current = name;
		for filter in self.spec.filters.iter() {
			match filter.apply(current)? {
				Some(next) => current = next,
				None => return Ok(None),
			}
		}
		Ok(Some(current))
	}
}
