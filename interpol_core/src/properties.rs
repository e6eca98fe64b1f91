use std::collections::HashMap;
use std::path::Path;

use tracing::debug;
use tracing::warn;

use crate::InterpolError;
use crate::InterpolResult;

/// Property names mapped to (possibly unresolved) values.
pub type PropertyTable = HashMap<String, String>;

const PLACEHOLDER_OPEN: &str = "${";
const PLACEHOLDER_CLOSE: char = '}';

/// Resolves `${key}` placeholders inside property tables.
///
/// Keys are looked up first in a working table, seeded from a base table
/// and extended with every table passed to [`resolve`](Self::resolve), and
/// then in a fallback table (usually a snapshot of the environment).
///
/// A key that cannot be found stays as the literal `${key}`. A value that
/// leads back to a key already being expanded is left exactly as it was
/// written and a warning names the chain.
#[derive(Debug, Clone, Default)]
pub struct PropertyResolver {
	working: PropertyTable,
	fallback: PropertyTable,
}

/// A chain of keys that leads back to one of its own members.
#[derive(Debug)]
struct Cycle(Vec<String>);

impl PropertyResolver {
	pub fn new(base: &PropertyTable) -> Self {
		Self {
			working: base.clone(),
			fallback: PropertyTable::new(),
		}
	}

	/// Consult `fallback` for keys missing from the working table.
	#[must_use]
	pub fn with_fallback(mut self, fallback: PropertyTable) -> Self {
		self.fallback = fallback;
		self
	}

	/// Resolve every value of `table` in place. Lookups see the working
	/// table overlaid with the unresolved entries of `table`; afterwards the
	/// resolved entries are merged into the working table.
	pub fn resolve(&mut self, table: &mut PropertyTable) {
		let mut combined = self.working.clone();
		combined.extend(table.iter().map(|(key, value)| (key.clone(), value.clone())));

		let mut keys: Vec<String> = table.keys().cloned().collect();
		keys.sort();

		for key in keys {
			let Some(original) = combined.get(&key) else {
				continue;
			};

			if !original.contains(PLACEHOLDER_OPEN) {
				continue;
			}

			let mut chain = vec![key.clone()];
			match self.expand(original, &combined, &mut chain) {
				Ok(resolved) => {
					debug!(key = %key, value = %resolved, "resolved property");
					table.insert(key, resolved);
				}
				Err(Cycle(cycle)) => {
					warn!(
						key = %key,
						"circular reference between properties detected: {}",
						cycle.join(" -> ")
					);
				}
			}
		}

		self.working
			.extend(table.iter().map(|(key, value)| (key.clone(), value.clone())));
	}

	/// The working table: the base plus every resolved table so far.
	pub fn properties(&self) -> &PropertyTable {
		&self.working
	}

	pub fn into_properties(self) -> PropertyTable {
		self.working
	}

	/// Substitute every placeholder in `value`, recursing into values that
	/// contain placeholders of their own.
	fn expand(
		&self,
		value: &str,
		combined: &PropertyTable,
		chain: &mut Vec<String>,
	) -> Result<String, Cycle> {
		let mut output = String::with_capacity(value.len());
		let mut rest = value;

		while let Some(open) = rest.find(PLACEHOLDER_OPEN) {
			output.push_str(&rest[..open]);
			let after_open = &rest[open + PLACEHOLDER_OPEN.len()..];

			let Some(close) = after_open.find(PLACEHOLDER_CLOSE) else {
				// Unterminated: keep the remainder as written.
				output.push_str(&rest[open..]);
				return Ok(output);
			};

			let nested = &after_open[..close];
			rest = &after_open[close + 1..];

			if chain.iter().any(|key| key == nested) {
				let mut cycle = chain.clone();
				cycle.push(nested.to_string());
				return Err(Cycle(cycle));
			}

			let Some(nested_value) = combined.get(nested).or_else(|| self.fallback.get(nested))
			else {
				output.push_str(PLACEHOLDER_OPEN);
				output.push_str(nested);
				output.push(PLACEHOLDER_CLOSE);
				continue;
			};

			if nested_value.contains(PLACEHOLDER_OPEN) {
				chain.push(nested.to_string());
				let expanded = self.expand(nested_value, combined, chain)?;
				chain.pop();
				output.push_str(&expanded);
			} else {
				output.push_str(nested_value);
			}
		}

		output.push_str(rest);
		Ok(output)
	}
}

/// Resolve `table` in place against itself, `base` and `fallback`.
#[allow(clippy::implicit_hasher)]
pub fn resolve_properties(
	table: &mut PropertyTable,
	base: &PropertyTable,
	fallback: &PropertyTable,
) {
	PropertyResolver::new(base)
		.with_fallback(fallback.clone())
		.resolve(table);
}

/// Load and resolve a single properties file against `base`.
#[allow(clippy::implicit_hasher)]
pub fn load_property_file(
	path: &Path,
	base: &PropertyTable,
	fallback: &PropertyTable,
) -> InterpolResult<PropertyTable> {
	let mut table = read_property_file(path)?;
	resolve_properties(&mut table, base, fallback);
	Ok(table)
}

/// Load several properties files in order. Each file is resolved against
/// `base` plus everything loaded before it, and later files override
/// earlier ones. The returned table holds only the files' entries.
#[allow(clippy::implicit_hasher)]
pub fn load_property_files<P: AsRef<Path>>(
	paths: &[P],
	base: &PropertyTable,
	fallback: &PropertyTable,
) -> InterpolResult<PropertyTable> {
	let mut resolver = PropertyResolver::new(base).with_fallback(fallback.clone());
	let mut loaded = PropertyTable::new();

	for path in paths {
		let mut table = read_property_file(path.as_ref())?;
		resolver.resolve(&mut table);
		loaded.extend(table);
	}

	Ok(loaded)
}

fn read_property_file(path: &Path) -> InterpolResult<PropertyTable> {
	let content = std::fs::read_to_string(path).map_err(|e| InterpolError::DataFile {
		path: path.display().to_string(),
		reason: e.to_string(),
	})?;

	parse_properties(&content, &path.display().to_string())
}

/// Parse the `.properties` format: `key=value`, `key: value` or
/// `key value` lines, `#` and `!` comments, trailing-backslash line
/// continuations and `\t \n \r \f \uXXXX` escapes.
pub fn parse_properties(content: &str, path_display: &str) -> InterpolResult<PropertyTable> {
	let mut table = PropertyTable::new();
	let mut lines = content.lines().enumerate();

	while let Some((index, line)) = lines.next() {
		let line_number = index + 1;
		let trimmed = line.trim_start();
		if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
			continue;
		}

		let mut logical = trimmed.to_string();
		while ends_with_continuation(&logical) {
			logical.pop();
			match lines.next() {
				Some((_, next)) => logical.push_str(next.trim_start()),
				None => break,
			}
		}

		let (key, value) = split_entry(&logical);
		let key = unescape(key).map_err(|reason| InterpolError::PropertyFile {
			path: path_display.to_string(),
			line: line_number,
			reason,
		})?;
		let value = unescape(value).map_err(|reason| InterpolError::PropertyFile {
			path: path_display.to_string(),
			line: line_number,
			reason,
		})?;

		table.insert(key, value);
	}

	Ok(table)
}

/// An odd number of trailing backslashes continues the line.
fn ends_with_continuation(line: &str) -> bool {
	line.chars().rev().take_while(|&ch| ch == '\\').count() % 2 == 1
}

/// Split a logical line into its raw key and raw value.
fn split_entry(line: &str) -> (&str, &str) {
	let mut escaped = false;
	let mut key_end = line.len();

	for (index, ch) in line.char_indices() {
		if escaped {
			escaped = false;
			continue;
		}

		match ch {
			'\\' => escaped = true,
			'=' | ':' | ' ' | '\t' | '\u{c}' => {
				key_end = index;
				break;
			}
			_ => {}
		}
	}

	let key = &line[..key_end];
	let mut value = line[key_end..].trim_start_matches([' ', '\t', '\u{c}']);
	if let Some(stripped) = value.strip_prefix(['=', ':']) {
		value = stripped.trim_start_matches([' ', '\t', '\u{c}']);
	}

	(key, value)
}

fn unescape(raw: &str) -> Result<String, String> {
	let mut output = String::with_capacity(raw.len());
	let mut chars = raw.chars();

	while let Some(ch) = chars.next() {
		if ch != '\\' {
			output.push(ch);
			continue;
		}

		match chars.next() {
			Some('t') => output.push('\t'),
			Some('n') => output.push('\n'),
			Some('r') => output.push('\r'),
			Some('f') => output.push('\u{c}'),
			Some('u') => {
				let digits: String = chars.by_ref().take(4).collect();
				let code = u32::from_str_radix(&digits, 16)
					.ok()
					.filter(|_| digits.len() == 4)
					.and_then(char::from_u32)
					.ok_or_else(|| format!("malformed \\u escape `\\u{digits}`"))?;
				output.push(code);
			}
			Some(other) => output.push(other),
			None => {}
		}
	}

	Ok(output)
}
