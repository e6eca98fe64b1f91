use std::collections::HashMap;
use std::sync::Arc;

use crate::InterpolResult;

/// A lookup strategy consulted by the [`Interpolator`](crate::Interpolator).
///
/// Returning `Ok(None)` means "no value here, ask the next source". An `Err`
/// aborts the interpolation and is surfaced to the caller.
pub trait ValueSource: Send + Sync {
	fn value(&self, expression: &str) -> InterpolResult<Option<String>>;
}

impl<T: ValueSource + ?Sized> ValueSource for Arc<T> {
	fn value(&self, expression: &str) -> InterpolResult<Option<String>> {
		(**self).value(expression)
	}
}

impl<T: ValueSource + ?Sized> ValueSource for Box<T> {
	fn value(&self, expression: &str) -> InterpolResult<Option<String>> {
		(**self).value(expression)
	}
}

/// A flat key/value lookup.
#[derive(Debug, Clone, Default)]
pub struct MapValueSource {
	values: HashMap<String, String>,
}

impl MapValueSource {
	pub fn new(values: HashMap<String, String>) -> Self {
		Self { values }
	}

	pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
		self.values.insert(key.into(), value.into());
	}

	pub fn len(&self) -> usize {
		self.values.len()
	}

	pub fn is_empty(&self) -> bool {
		self.values.is_empty()
	}
}

impl From<HashMap<String, String>> for MapValueSource {
	fn from(values: HashMap<String, String>) -> Self {
		Self::new(values)
	}
}

impl<K, V> FromIterator<(K, V)> for MapValueSource
where
	K: Into<String>,
	V: Into<String>,
{
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		Self {
			values: iter
				.into_iter()
				.map(|(key, value)| (key.into(), value.into()))
				.collect(),
		}
	}
}

impl ValueSource for MapValueSource {
	fn value(&self, expression: &str) -> InterpolResult<Option<String>> {
		Ok(self.values.get(expression).cloned())
	}
}

/// The prefix under which [`EnvValueSource`] exposes variables.
pub const ENV_PREFIX: &str = "env.";

/// A read-only snapshot of environment variables, exposed as `env.NAME`.
///
/// The snapshot is taken once. Later changes to the process environment are
/// not visible; capture a new source to see them.
#[derive(Debug, Clone, Default)]
pub struct EnvValueSource {
	variables: HashMap<String, String>,
}

impl EnvValueSource {
	/// Snapshot the current process environment.
	pub fn capture() -> Self {
		Self::from_vars(std::env::vars())
	}

	/// Build a snapshot from explicit `(name, value)` pairs.
	pub fn from_vars<I, K, V>(vars: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		Self {
			variables: vars
				.into_iter()
				.map(|(key, value)| (key.into(), value.into()))
				.collect(),
		}
	}

	/// The captured variables, without the `env.` prefix.
	pub fn variables(&self) -> &HashMap<String, String> {
		&self.variables
	}
}

impl ValueSource for EnvValueSource {
	fn value(&self, expression: &str) -> InterpolResult<Option<String>> {
		let Some(name) = expression.strip_prefix(ENV_PREFIX) else {
			return Ok(None);
		};

		Ok(self.variables.get(name).cloned())
	}
}

/// Answers exactly one expression with a fixed response.
#[derive(Debug, Clone)]
pub struct SingleResponseValueSource {
	expression: String,
	response: String,
}

impl SingleResponseValueSource {
	pub fn new(expression: impl Into<String>, response: impl Into<String>) -> Self {
		Self {
			expression: expression.into(),
			response: response.into(),
		}
	}
}

impl ValueSource for SingleResponseValueSource {
	fn value(&self, expression: &str) -> InterpolResult<Option<String>> {
		Ok((expression == self.expression).then(|| self.response.clone()))
	}
}

/// Something that can answer dotted-path queries such as `build.directory`.
pub trait Resolvable: Send + Sync {
	fn get(&self, path: &str) -> Option<String>;
}

impl Resolvable for serde_json::Value {
	/// Walk `path` through nested objects. Numeric segments index arrays.
	/// Strings, numbers and booleans render as plain text, `null` as no value
	/// and containers as compact JSON.
	fn get(&self, path: &str) -> Option<String> {
		let mut current = self;
		for segment in path.split('.') {
			current = match current {
				serde_json::Value::Object(map) => map.get(segment)?,
				serde_json::Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
				_ => return None,
			};
		}

		match current {
			serde_json::Value::Null => None,
			serde_json::Value::String(value) => Some(value.clone()),
			serde_json::Value::Bool(value) => Some(value.to_string()),
			serde_json::Value::Number(value) => Some(value.to_string()),
			container => Some(container.to_string()),
		}
	}
}

#[allow(clippy::implicit_hasher)]
impl Resolvable for HashMap<String, String> {
	fn get(&self, path: &str) -> Option<String> {
		HashMap::get(self, path).cloned()
	}
}

impl<T: Resolvable + ?Sized> Resolvable for Arc<T> {
	fn get(&self, path: &str) -> Option<String> {
		(**self).get(path)
	}
}

/// Strip the first matching prefix from `expression`.
fn strip_any_prefix<'a>(prefixes: &[String], expression: &'a str) -> Option<&'a str> {
	prefixes
		.iter()
		.find_map(|prefix| expression.strip_prefix(prefix.as_str()))
}

/// Resolves dotted paths against an object, but only for expressions that
/// start with one of the accepted prefixes (for example `project.`).
///
/// The prefix is removed before the path is handed to the object, so
/// `project.version` asks the object for `version`.
#[derive(Debug, Clone)]
pub struct PrefixedObjectValueSource<T> {
	prefixes: Vec<String>,
	root: T,
	allow_unprefixed: bool,
}

impl<T: Resolvable> PrefixedObjectValueSource<T> {
	pub fn new<I, S>(prefixes: I, root: T) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self {
			prefixes: prefixes.into_iter().map(Into::into).collect(),
			root,
			allow_unprefixed: false,
		}
	}

	/// Also answer expressions that carry none of the prefixes.
	#[must_use]
	pub fn allow_unprefixed(mut self, allow: bool) -> Self {
		self.allow_unprefixed = allow;
		self
	}
}

impl<T: Resolvable> ValueSource for PrefixedObjectValueSource<T> {
	fn value(&self, expression: &str) -> InterpolResult<Option<String>> {
		let path = match strip_any_prefix(&self.prefixes, expression) {
			Some(path) => path,
			None if self.allow_unprefixed => expression,
			None => return Ok(None),
		};

		Ok(self.root.get(path))
	}
}

/// Gates another value source behind a set of prefixes, stripping the
/// prefix before delegating.
#[derive(Clone)]
pub struct PrefixedValueSource {
	prefixes: Vec<String>,
	inner: Arc<dyn ValueSource>,
	allow_unprefixed: bool,
}

impl PrefixedValueSource {
	pub fn new<I, S>(prefixes: I, inner: impl ValueSource + 'static) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self::shared(prefixes, Arc::new(inner))
	}

	pub fn shared<I, S>(prefixes: I, inner: Arc<dyn ValueSource>) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self {
			prefixes: prefixes.into_iter().map(Into::into).collect(),
			inner,
			allow_unprefixed: false,
		}
	}

	/// Also delegate expressions that carry none of the prefixes.
	#[must_use]
	pub fn allow_unprefixed(mut self, allow: bool) -> Self {
		self.allow_unprefixed = allow;
		self
	}
}

impl std::fmt::Debug for PrefixedValueSource {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("PrefixedValueSource")
			.field("prefixes", &self.prefixes)
			.field("allow_unprefixed", &self.allow_unprefixed)
			.finish_non_exhaustive()
	}
}

impl ValueSource for PrefixedValueSource {
	fn value(&self, expression: &str) -> InterpolResult<Option<String>> {
		match strip_any_prefix(&self.prefixes, expression) {
			Some(stripped) => self.inner.value(stripped),
			None if self.allow_unprefixed => self.inner.value(expression),
			None => Ok(None),
		}
	}
}
