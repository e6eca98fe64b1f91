use crate::InterpolResult;
use crate::source::MarkableSource;

/// Caps how far ahead a caller can read from a [`MarkableSource`] since the
/// last mark.
///
/// Once `limit` characters have been read since the last [`mark`], every
/// further [`read`] reports end of input even when the underlying source has
/// more data. [`reset`] rewinds both the counter and the source, so a caller
/// can scan speculatively and roll back without ever asking the source for
/// more lookahead than it declared.
///
/// [`mark`]: BoundedReader::mark
/// [`read`]: BoundedReader::read
/// [`reset`]: BoundedReader::reset
#[derive(Debug)]
pub struct BoundedReader<S> {
	source: S,
	position: usize,
	limit: usize,
}

impl<S: MarkableSource> BoundedReader<S> {
	/// Wrap `source` and immediately mark it with `limit`.
	pub fn new(mut source: S, limit: usize) -> Self {
		source.mark(limit);

		Self {
			source,
			position: 0,
			limit,
		}
	}

	/// Read one character, or `None` at real or simulated end of input.
	pub fn read(&mut self) -> InterpolResult<Option<char>> {
		if self.position >= self.limit {
			return Ok(None);
		}

		self.position += 1;
		self.source.read_char()
	}

	/// Fill `buffer` with up to `buffer.len()` characters, stopping early at
	/// real or simulated end of input. Returns the number of characters read.
	///
	/// A count of `0` does not say which end was hit. When [`position`]
	/// equals [`limit`] the window is exhausted and the source may still
	/// have data; otherwise the source itself ran dry.
	///
	/// [`position`]: BoundedReader::position
	/// [`limit`]: BoundedReader::limit
	pub fn read_into(&mut self, buffer: &mut [char]) -> InterpolResult<usize> {
		for (index, slot) in buffer.iter_mut().enumerate() {
			let Some(ch) = self.read()? else {
				return Ok(index);
			};
			*slot = ch;
		}

		Ok(buffer.len())
	}

	/// Start a new lookahead window of `limit` characters at the current
	/// position.
	pub fn mark(&mut self, limit: usize) {
		self.limit = limit;
		self.position = 0;
		self.source.mark(limit);
	}

	/// Rewind to the last mark.
	pub fn reset(&mut self) -> InterpolResult<()> {
		self.position = 0;
		self.source.reset()
	}

	/// Characters read since the last mark.
	pub fn position(&self) -> usize {
		self.position
	}

	/// The current lookahead limit.
	pub fn limit(&self) -> usize {
		self.limit
	}

	pub fn into_inner(self) -> S {
		self.source
	}
}
