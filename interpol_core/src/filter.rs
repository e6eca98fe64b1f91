use std::io::Read;

use serde::Deserialize;
use tracing::trace;

use crate::BoundedReader;
use crate::CharSource;
use crate::DelimiterSet;
use crate::DelimiterSpecification;
use crate::EscapeConfig;
use crate::InterpolError;
use crate::InterpolResult;
use crate::Interpolator;
use crate::MarkableSource;
use crate::RecursionInterceptor;
use crate::delimiter::DEFAULT_DELIMITER;
use crate::delimiter::DEFAULT_SYMMETRIC_DELIMITER;
use crate::delimiter::ends_with_token;
use crate::delimiter::starts_with_token;

/// Default room, in characters, left for the expression between a begin and
/// an end token. Longer expressions are passed through as literal text.
pub const DEFAULT_MAX_EXPRESSION_LENGTH: usize = 255;

/// Switches controlling an [`InterpolatingReader`].
///
/// ```toml
/// delimiters = ["${*}", "@"]
/// escape_string = "\\"
/// preserve_escape_string = false
/// support_multi_line_filtering = false
/// interpolate_with_prefix_pattern = true
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FilterOptions {
	/// Delimiter specs in `BEGIN*END` or symmetric `TOKEN` form. Order
	/// breaks ties between equally long begin tokens.
	pub delimiters: Vec<String>,
	/// Placed before a begin token, suppresses interpolation of that token.
	pub escape_string: Option<String>,
	/// Keep the escape string in the output instead of dropping it.
	pub preserve_escape_string: bool,
	/// Allow expressions to span lines. When off, a line break before the
	/// end token leaves the text unresolved.
	pub support_multi_line_filtering: bool,
	/// Hand the whole token, delimiters included, to the interpolator
	/// rather than only the expression between them.
	pub interpolate_with_prefix_pattern: bool,
	/// Longest expression, in characters, that is still recognised.
	pub max_expression_length: usize,
}

impl Default for FilterOptions {
	fn default() -> Self {
		Self {
			delimiters: vec![
				DEFAULT_DELIMITER.to_string(),
				DEFAULT_SYMMETRIC_DELIMITER.to_string(),
			],
			escape_string: None,
			preserve_escape_string: false,
			support_multi_line_filtering: false,
			interpolate_with_prefix_pattern: true,
			max_expression_length: DEFAULT_MAX_EXPRESSION_LENGTH,
		}
	}
}

impl FilterOptions {
	pub fn delimiter_set(&self) -> InterpolResult<DelimiterSet> {
		DelimiterSet::parse(&self.delimiters)
	}

	pub fn escape_config(&self) -> InterpolResult<EscapeConfig> {
		EscapeConfig::new(self.escape_string.as_deref(), self.preserve_escape_string)
	}
}

/// Characters already decided on and waiting to be handed out. It is
/// drained completely before any more input is scanned, which keeps the
/// output in input order.
#[derive(Debug, Default)]
struct PendingReplacement {
	text: Vec<char>,
	cursor: usize,
}

impl PendingReplacement {
	fn replace(&mut self, text: impl IntoIterator<Item = char>) {
		debug_assert!(self.is_exhausted());
		self.text.clear();
		self.text.extend(text);
		self.cursor = 0;
	}

	fn next(&mut self) -> Option<char> {
		let ch = self.text.get(self.cursor).copied()?;
		self.cursor += 1;
		Some(ch)
	}

	fn is_exhausted(&self) -> bool {
		self.cursor >= self.text.len()
	}
}

/// The outcome of scanning from the current position.
#[derive(Debug)]
enum Decision {
	/// The input has no more characters.
	Exhausted,
	/// Emit the first `consumed` scanned characters unchanged.
	Literal { consumed: usize },
	/// Emit `text` in place of the first `consumed` scanned characters.
	Replace { text: String, consumed: usize },
}

/// A streaming filter that replaces delimited expressions in a character
/// stream with values from an [`Interpolator`] and passes everything else
/// through unchanged.
///
/// Each scan marks the underlying [`BoundedReader`], looks ahead far enough
/// to decide whether an escape, a begin token and a matching end token are
/// present, then rewinds and consumes exactly what was decided. The
/// lookahead never exceeds `escape + longest begin + max expression +
/// longest end` characters.
///
/// Unknown expressions and unterminated tokens are echoed verbatim. After an
/// error the reader is poisoned and every later read fails.
pub struct InterpolatingReader<S> {
	reader: BoundedReader<S>,
	delimiters: DelimiterSet,
	escape: EscapeConfig,
	interpolator: Interpolator,
	recursion: RecursionInterceptor,
	support_multi_line_filtering: bool,
	interpolate_with_prefix_pattern: bool,
	lookahead_limit: usize,
	pending: PendingReplacement,
	/// UTF-8 bytes of a character only partly copied out by [`Read::read`].
	encoded: Vec<u8>,
	encoded_cursor: usize,
	exhausted: bool,
	poisoned: bool,
	deferred_error: Option<InterpolError>,
}

impl<R: Read> InterpolatingReader<CharSource<R>> {
	/// Filter UTF-8 text read from `reader`.
	pub fn from_read(
		reader: R,
		options: &FilterOptions,
		interpolator: Interpolator,
	) -> InterpolResult<Self> {
		Self::new(CharSource::new(reader), options, interpolator)
	}
}

impl<S: MarkableSource> InterpolatingReader<S> {
	/// Build a filter over `source`. Invalid delimiter or escape
	/// configuration is reported here rather than on the first read.
	///
	/// The interpolator adopts the filter's delimiters and escape string so
	/// that values resolved to further expressions are scanned the same way.
	pub fn new(
		source: S,
		options: &FilterOptions,
		mut interpolator: Interpolator,
	) -> InterpolResult<Self> {
		let delimiters = options.delimiter_set()?;
		let escape = options.escape_config()?;
		interpolator.set_delimiters(delimiters.clone());
		interpolator.set_escape(escape.clone());

		let lookahead_limit = escape.len()
			+ delimiters.max_begin_len()
			+ options.max_expression_length
			+ delimiters.max_end_len();
		let lookahead_limit = lookahead_limit.max(escape.len() + 1);

		Ok(Self {
			reader: BoundedReader::new(source, lookahead_limit),
			delimiters,
			escape,
			interpolator,
			recursion: RecursionInterceptor::new(),
			support_multi_line_filtering: options.support_multi_line_filtering,
			interpolate_with_prefix_pattern: options.interpolate_with_prefix_pattern,
			lookahead_limit,
			pending: PendingReplacement::default(),
			encoded: Vec::with_capacity(4),
			encoded_cursor: 0,
			exhausted: false,
			poisoned: false,
			deferred_error: None,
		})
	}

	/// Replace the recursion interceptor, for example with a prefix-aware one.
	#[must_use]
	pub fn with_recursion_interceptor(mut self, recursion: RecursionInterceptor) -> Self {
		self.recursion = recursion;
		self
	}

	pub fn interpolator(&self) -> &Interpolator {
		&self.interpolator
	}

	pub fn delimiters(&self) -> &DelimiterSet {
		&self.delimiters
	}

	/// The most characters a single scan reads ahead.
	pub fn lookahead_limit(&self) -> usize {
		self.lookahead_limit
	}

	pub fn into_inner(self) -> S {
		self.reader.into_inner()
	}

	/// Read the next output character, or `None` once the input is used up.
	pub fn read_char(&mut self) -> InterpolResult<Option<char>> {
		if self.poisoned {
			return Err(InterpolError::Poisoned);
		}

		loop {
			if let Some(ch) = self.pending.next() {
				return Ok(Some(ch));
			}

			if self.exhausted {
				return Ok(None);
			}

			if let Err(error) = self.scan() {
				self.poisoned = true;
				return Err(error);
			}
		}
	}

	/// Decide what the characters at the current position turn into and
	/// queue the result.
	fn scan(&mut self) -> InterpolResult<()> {
		self.reader.mark(self.lookahead_limit);
		let mut window = Vec::new();

		match self.decide(&mut window)? {
			Decision::Exhausted => {
				self.exhausted = true;
			}
			Decision::Literal { consumed } => {
				self.consume(consumed)?;
				self.pending.replace(window.into_iter().take(consumed));
			}
			Decision::Replace { text, consumed } => {
				self.consume(consumed)?;
				self.pending.replace(text.chars());
			}
		}

		Ok(())
	}

	fn decide(&mut self, window: &mut Vec<char>) -> InterpolResult<Decision> {
		if !self.fill(window, 1)? {
			return Ok(Decision::Exhausted);
		}

		if let Some(decision) = self.decide_escape(window)? {
			return Ok(decision);
		}

		self.fill(window, self.delimiters.max_begin_len())?;
		let Some(spec) = self.delimiters.longest_match(window).cloned() else {
			return Ok(Decision::Literal { consumed: 1 });
		};

		self.decide_token(&spec, window)
	}

	/// Handle an escape string at the current position. Returns `None` when
	/// there is no complete escape string here.
	fn decide_escape(&mut self, window: &mut Vec<char>) -> InterpolResult<Option<Decision>> {
		let Some(escape) = self.escape.escape_string() else {
			return Ok(None);
		};

		if !escape.starts_with(window[0]) {
			return Ok(None);
		}

		let escape = escape.to_string();
		let escape_len = self.escape.len();
		self.fill(window, escape_len)?;
		if !starts_with_token(window, &escape) {
			return Ok(None);
		}

		self.fill(window, escape_len + self.delimiters.max_begin_len())?;
		let Some(spec) = self.delimiters.longest_match(&window[escape_len..]) else {
			// An escape string that escapes nothing is emitted together with
			// the character after it.
			let consumed = (escape_len + 1).min(window.len());
			return Ok(Some(Decision::Literal { consumed }));
		};

		let mut text = String::new();
		if self.escape.preserve_escape_string() {
			text.push_str(&escape);
		}
		text.push_str(spec.begin());
		trace!(begin = spec.begin(), "escaped begin token");

		Ok(Some(Decision::Replace {
			text,
			consumed: escape_len + spec.begin_len(),
		}))
	}

	/// Scan for the end token matching `spec` and resolve the expression.
	fn decide_token(
		&mut self,
		spec: &DelimiterSpecification,
		window: &mut Vec<char>,
	) -> InterpolResult<Decision> {
		let begin_len = spec.begin_len();
		let mut scanned = begin_len;

		loop {
			if scanned == window.len() {
				match self.reader.read()? {
					Some(ch) => window.push(ch),
					// End of input, or the expression outgrew the lookahead.
					None => return Ok(Decision::Literal { consumed: 1 }),
				}
			}

			let ch = window[scanned];
			scanned += 1;

			if ch == '\n' && !self.support_multi_line_filtering {
				return Ok(Decision::Literal { consumed: 1 });
			}

			if ends_with_token(&window[begin_len..scanned], spec.end()) {
				break;
			}
		}

		let token: String = window[..scanned].iter().collect();
		let expression: String = window[begin_len..scanned - spec.end_len()]
			.iter()
			.collect();
		let resolved = self.resolve_token(&token, &expression)?;
		trace!(
			expression = %expression,
			resolved = resolved.is_some(),
			"interpolated token"
		);

		Ok(Decision::Replace {
			text: resolved.unwrap_or(token),
			consumed: scanned,
		})
	}

	fn resolve_token(&mut self, token: &str, expression: &str) -> InterpolResult<Option<String>> {
		if self.interpolate_with_prefix_pattern {
			let interpolated = self
				.interpolator
				.interpolate_str(token, &mut self.recursion)?;
			return Ok((interpolated != token).then_some(interpolated));
		}

		self.interpolator.resolve(expression, &mut self.recursion)
	}

	/// Read until `window` holds `len` characters. Returns `false` if the
	/// input, or the lookahead, ends first.
	fn fill(&mut self, window: &mut Vec<char>, len: usize) -> InterpolResult<bool> {
		while window.len() < len {
			let Some(ch) = self.reader.read()? else {
				return Ok(false);
			};
			window.push(ch);
		}

		Ok(true)
	}

	/// Rewind to the mark and step over `count` characters.
	fn consume(&mut self, count: usize) -> InterpolResult<()> {
		self.reader.reset()?;
		for _ in 0..count {
			self.reader.read()?;
		}

		Ok(())
	}
}

impl<S: MarkableSource> Iterator for InterpolatingReader<S> {
	type Item = InterpolResult<char>;

	fn next(&mut self) -> Option<Self::Item> {
		self.read_char().transpose()
	}
}

impl<S: MarkableSource> Read for InterpolatingReader<S> {
	fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
		if let Some(error) = self.deferred_error.take() {
			return Err(error.into());
		}

		let mut written = 0;
		while written < buf.len() {
			if self.encoded_cursor < self.encoded.len() {
				let available = &self.encoded[self.encoded_cursor..];
				let count = available.len().min(buf.len() - written);
				buf[written..written + count].copy_from_slice(&available[..count]);
				self.encoded_cursor += count;
				written += count;
				continue;
			}

			match self.read_char() {
				Ok(Some(ch)) => {
					let mut bytes = [0u8; 4];
					self.encoded.clear();
					self.encoded
						.extend_from_slice(ch.encode_utf8(&mut bytes).as_bytes());
					self.encoded_cursor = 0;
				}
				Ok(None) => break,
				Err(error) if written > 0 => {
					self.deferred_error = Some(error);
					break;
				}
				Err(error) => return Err(error.into()),
			}
		}

		Ok(written)
	}
}

/// Filter an in-memory string.
pub fn filter_str(
	input: &str,
	options: &FilterOptions,
	interpolator: Interpolator,
) -> InterpolResult<String> {
	InterpolatingReader::from_read(input.as_bytes(), options, interpolator)?.collect()
}
