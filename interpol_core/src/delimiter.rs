use std::fmt::Display;
use std::str::FromStr;

use derive_more::Deref;

use crate::InterpolError;
use crate::InterpolResult;

/// The default asymmetric delimiter, `${expression}`.
pub const DEFAULT_DELIMITER: &str = "${*}";
/// The default symmetric delimiter, `@expression@`.
pub const DEFAULT_SYMMETRIC_DELIMITER: &str = "@";

/// A `(begin, end)` token pair marking an interpolatable expression.
///
/// The textual form is `BEGIN*END` (for example `${*}`). A spec without a
/// `*` is symmetric: the same token opens and closes the expression (for
/// example `@`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DelimiterSpecification {
	begin: String,
	end: String,
}

impl DelimiterSpecification {
	/// Parse the textual `BEGIN*END` or `TOKEN` form.
	pub fn parse(spec: &str) -> InterpolResult<Self> {
		if spec.is_empty() {
			return Err(InterpolError::EmptyDelimiter);
		}

		let Some(split) = spec.find('*') else {
			return Ok(Self {
				begin: spec.to_string(),
				end: spec.to_string(),
			});
		};

		let (begin, end) = (&spec[..split], &spec[split + 1..]);
		if begin.is_empty() {
			return Err(InterpolError::MissingBeginToken(spec.to_string()));
		}
		if end.is_empty() {
			return Err(InterpolError::MissingEndToken(spec.to_string()));
		}

		Ok(Self {
			begin: begin.to_string(),
			end: end.to_string(),
		})
	}

	pub fn begin(&self) -> &str {
		&self.begin
	}

	pub fn end(&self) -> &str {
		&self.end
	}

	pub fn is_symmetric(&self) -> bool {
		self.begin == self.end
	}

	/// Length of the begin token in characters.
	pub fn begin_len(&self) -> usize {
		self.begin.chars().count()
	}

	/// Length of the end token in characters.
	pub fn end_len(&self) -> usize {
		self.end.chars().count()
	}

	/// Wrap `expression` in this delimiter pair.
	pub fn wrap(&self, expression: &str) -> String {
		format!("{}{expression}{}", self.begin, self.end)
	}
}

impl FromStr for DelimiterSpecification {
	type Err = InterpolError;

	fn from_str(spec: &str) -> Result<Self, Self::Err> {
		Self::parse(spec)
	}
}

impl Display for DelimiterSpecification {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		if self.is_symmetric() {
			write!(f, "{}", self.begin)
		} else {
			write!(f, "{}*{}", self.begin, self.end)
		}
	}
}

/// An insertion-ordered set of delimiter specifications.
///
/// Duplicates (same begin and end) are dropped, keeping the first
/// declaration. Declaration order breaks ties during longest-match
/// selection, so it is observable.
#[derive(Debug, Clone, PartialEq, Eq, Deref)]
pub struct DelimiterSet(Vec<DelimiterSpecification>);

impl DelimiterSet {
	/// A set with no delimiters. Nothing is ever interpolated.
	pub fn empty() -> Self {
		Self(Vec::new())
	}

	/// Parse every spec string, failing on the first invalid one.
	pub fn parse<I, S>(specs: I) -> InterpolResult<Self>
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let mut set = Self::empty();
		for spec in specs {
			set.insert(DelimiterSpecification::parse(spec.as_ref())?);
		}

		Ok(set)
	}

	/// Add `spec` unless an equal spec is already present. Returns whether
	/// the spec was added.
	pub fn insert(&mut self, spec: DelimiterSpecification) -> bool {
		if self.0.contains(&spec) {
			return false;
		}

		self.0.push(spec);
		true
	}

	/// Select the spec whose begin token is a prefix of `window`.
	///
	/// When several begin tokens match, the longest wins; among equally long
	/// tokens the first declared wins.
	pub fn longest_match(&self, window: &[char]) -> Option<&DelimiterSpecification> {
		let mut best: Option<&DelimiterSpecification> = None;

		for spec in &self.0 {
			if !starts_with_token(window, &spec.begin) {
				continue;
			}

			let is_longer = best.is_none_or(|current| spec.begin_len() > current.begin_len());
			if is_longer {
				best = Some(spec);
			}
		}

		best
	}

	/// Whether any begin token occurs somewhere in `text`.
	pub fn any_begin_in(&self, text: &str) -> bool {
		self.0.iter().any(|spec| text.contains(spec.begin.as_str()))
	}

	pub fn max_begin_len(&self) -> usize {
		self.0
			.iter()
			.map(DelimiterSpecification::begin_len)
			.max()
			.unwrap_or(0)
	}

	pub fn max_end_len(&self) -> usize {
		self.0
			.iter()
			.map(DelimiterSpecification::end_len)
			.max()
			.unwrap_or(0)
	}
}

impl Default for DelimiterSet {
	fn default() -> Self {
		Self(vec![
			DelimiterSpecification {
				begin: "${".to_string(),
				end: "}".to_string(),
			},
			DelimiterSpecification {
				begin: "@".to_string(),
				end: "@".to_string(),
			},
		])
	}
}

/// Whether `window` starts with every character of `token`.
pub(crate) fn starts_with_token(window: &[char], token: &str) -> bool {
	let mut chars = window.iter();
	token.chars().all(|expected| chars.next() == Some(&expected))
}

/// Whether `text` ends with every character of `token`.
pub(crate) fn ends_with_token(text: &[char], token: &str) -> bool {
	let mut chars = text.iter().rev();
	token.chars().rev().all(|expected| chars.next() == Some(&expected))
}

/// Escape handling shared by the streaming filter and string interpolation.
///
/// When `escape_string` is set, an occurrence of it immediately followed by
/// a begin token turns that begin token into literal text. The escape string
/// itself is dropped unless `preserve_escape_string` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EscapeConfig {
	escape_string: Option<String>,
	preserve_escape_string: bool,
}

impl EscapeConfig {
	pub fn new(escape_string: Option<&str>, preserve_escape_string: bool) -> InterpolResult<Self> {
		if escape_string.is_some_and(str::is_empty) {
			return Err(InterpolError::EmptyEscapeString);
		}

		Ok(Self {
			escape_string: escape_string.map(ToString::to_string),
			preserve_escape_string,
		})
	}

	pub fn escape_string(&self) -> Option<&str> {
		self.escape_string.as_deref()
	}

	pub fn preserve_escape_string(&self) -> bool {
		self.preserve_escape_string
	}

	/// Length of the escape string in characters, `0` when escaping is off.
	pub fn len(&self) -> usize {
		self.escape_string
			.as_deref()
			.map_or(0, |escape| escape.chars().count())
	}

	pub fn is_empty(&self) -> bool {
		self.escape_string.is_none()
	}
}

/// Index of the first occurrence of `token` in `text`.
pub(crate) fn find_token(text: &[char], token: &str) -> Option<usize> {
	(0..text.len()).find(|&index| starts_with_token(&text[index..], token))
}
