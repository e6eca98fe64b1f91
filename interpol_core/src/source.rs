use std::collections::VecDeque;
use std::io::ErrorKind;
use std::io::Read;

use crate::InterpolError;
use crate::InterpolResult;

const READ_CHUNK_SIZE: usize = 8 * 1024;

/// A character source that can be marked and later rewound to the mark.
///
/// `mark(limit)` promises the source that at most `limit` characters will be
/// read before the next `reset`. Reading past the limit invalidates the mark,
/// after which `reset` fails.
pub trait MarkableSource {
	/// Read the next character, or `None` at end of input.
	fn read_char(&mut self) -> InterpolResult<Option<char>>;

	/// Remember the current position. At most `read_ahead_limit` characters
	/// may be read before the mark is invalidated.
	fn mark(&mut self, read_ahead_limit: usize);

	/// Rewind to the most recent mark.
	fn reset(&mut self) -> InterpolResult<()>;
}

#[derive(Debug)]
struct Mark {
	limit: usize,
	consumed: Vec<char>,
}

/// Decodes UTF-8 from any [`Read`] implementation into characters, keeping
/// the characters read since the last mark so they can be replayed.
#[derive(Debug)]
pub struct CharSource<R> {
	inner: R,
	/// Undecoded bytes read from `inner`.
	buffer: Vec<u8>,
	/// Index of the first undecoded byte in `buffer`.
	start: usize,
	/// Byte offset of `buffer[start]` in the whole input.
	offset: usize,
	/// Characters rewound by `reset` and not yet read again.
	replay: VecDeque<char>,
	mark: Option<Mark>,
	exhausted: bool,
}

impl<R: Read> CharSource<R> {
	pub fn new(inner: R) -> Self {
		Self {
			inner,
			buffer: Vec::with_capacity(READ_CHUNK_SIZE),
			start: 0,
			offset: 0,
			replay: VecDeque::new(),
			mark: None,
			exhausted: false,
		}
	}

	/// Returns the wrapped reader, discarding any buffered input.
	pub fn into_inner(self) -> R {
		self.inner
	}

	/// Make sure at least `needed` undecoded bytes are buffered. Returns
	/// `false` when the input ends first.
	fn fill(&mut self, needed: usize) -> InterpolResult<bool> {
		while self.buffer.len() - self.start < needed {
			if self.exhausted {
				return Ok(false);
			}

			if self.start > 0 {
				self.buffer.drain(..self.start);
				self.start = 0;
			}

			let mut chunk = [0u8; READ_CHUNK_SIZE];
			match self.inner.read(&mut chunk) {
				Ok(0) => self.exhausted = true,
				Ok(read) => self.buffer.extend_from_slice(&chunk[..read]),
				Err(error) if error.kind() == ErrorKind::Interrupted => {}
				Err(error) => return Err(error.into()),
			}
		}

		Ok(true)
	}

	fn decode_next(&mut self) -> InterpolResult<Option<char>> {
		if !self.fill(1)? {
			return Ok(None);
		}

		let width = utf8_width(self.buffer[self.start]);
		if width == 0 || !self.fill(width)? {
			return Err(InterpolError::InvalidUtf8 {
				offset: self.offset,
			});
		}

		let bytes = &self.buffer[self.start..self.start + width];
		let ch = std::str::from_utf8(bytes)
			.ok()
			.and_then(|decoded| decoded.chars().next())
			.ok_or(InterpolError::InvalidUtf8 {
				offset: self.offset,
			})?;

		self.start += width;
		self.offset += width;

		Ok(Some(ch))
	}
}

impl<R: Read> MarkableSource for CharSource<R> {
	fn read_char(&mut self) -> InterpolResult<Option<char>> {
		let next = match self.replay.pop_front() {
			Some(ch) => Some(ch),
			None => self.decode_next()?,
		};

		if let Some(ch) = next {
			let overflowed = match &mut self.mark {
				Some(mark) if mark.consumed.len() < mark.limit => {
					mark.consumed.push(ch);
					false
				}
				Some(_) => true,
				None => false,
			};

			if overflowed {
				self.mark = None;
			}
		}

		Ok(next)
	}

	fn mark(&mut self, read_ahead_limit: usize) {
		self.mark = Some(Mark {
			limit: read_ahead_limit,
			consumed: Vec::with_capacity(read_ahead_limit.min(READ_CHUNK_SIZE)),
		});
	}

	fn reset(&mut self) -> InterpolResult<()> {
		let Some(mark) = &mut self.mark else {
			return Err(InterpolError::InvalidMark);
		};

		for ch in mark.consumed.drain(..).rev() {
			self.replay.push_front(ch);
		}

		Ok(())
	}
}

/// Number of bytes in the UTF-8 sequence introduced by `first`, or `0` when
/// `first` cannot start a sequence.
fn utf8_width(first: u8) -> usize {
	match first {
		0x00..=0x7F => 1,
		0xC2..=0xDF => 2,
		0xE0..=0xEF => 3,
		0xF0..=0xF4 => 4,
		_ => 0,
	}
}
