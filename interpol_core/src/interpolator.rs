use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;
use tracing::trace;

use crate::DelimiterSet;
use crate::EscapeConfig;
use crate::InterpolResult;
use crate::PostProcessor;
use crate::RecursionInterceptor;
use crate::ValueSource;
use crate::delimiter::find_token;
use crate::delimiter::starts_with_token;

/// Resolves expressions against an ordered chain of [`ValueSource`]s.
///
/// Sources are queried in the order they were added and the first value
/// wins. A resolved value that itself contains begin tokens is interpolated
/// again (unless recursion is turned off), always against the same
/// [`RecursionInterceptor`] so that cycles stop instead of looping.
///
/// Value sources and post processors are shared behind [`Arc`]s, so one
/// configured interpolator can be cloned for every file being filtered.
/// The answer cache is never shared: a clone starts with an empty cache.
pub struct Interpolator {
	value_sources: Vec<Arc<dyn ValueSource>>,
	post_processors: Vec<Arc<dyn PostProcessor>>,
	delimiters: DelimiterSet,
	escape: EscapeConfig,
	recursive: bool,
	cache_answers: bool,
	answers: HashMap<String, String>,
}

impl Default for Interpolator {
	fn default() -> Self {
		Self {
			value_sources: Vec::new(),
			post_processors: Vec::new(),
			delimiters: DelimiterSet::default(),
			escape: EscapeConfig::default(),
			recursive: true,
			cache_answers: false,
			answers: HashMap::new(),
		}
	}
}

impl Clone for Interpolator {
	fn clone(&self) -> Self {
		Self {
			value_sources: self.value_sources.clone(),
			post_processors: self.post_processors.clone(),
			delimiters: self.delimiters.clone(),
			escape: self.escape.clone(),
			recursive: self.recursive,
			cache_answers: self.cache_answers,
			answers: HashMap::new(),
		}
	}
}

impl std::fmt::Debug for Interpolator {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Interpolator")
			.field("value_sources", &self.value_sources.len())
			.field("post_processors", &self.post_processors.len())
			.field("delimiters", &self.delimiters)
			.field("escape", &self.escape)
			.field("recursive", &self.recursive)
			.field("cache_answers", &self.cache_answers)
			.finish_non_exhaustive()
	}
}

impl Interpolator {
	pub fn new() -> Self {
		Self::default()
	}

	/// Append a value source. It is consulted after every source added
	/// before it.
	#[must_use]
	pub fn with_value_source(mut self, source: impl ValueSource + 'static) -> Self {
		self.add_value_source(source);
		self
	}

	pub fn add_value_source(&mut self, source: impl ValueSource + 'static) {
		self.value_sources.push(Arc::new(source));
	}

	/// Append a value source that is also used elsewhere, for example by
	/// other readers filtering files in parallel.
	pub fn add_shared_value_source(&mut self, source: Arc<dyn ValueSource>) {
		self.value_sources.push(source);
	}

	#[must_use]
	pub fn with_post_processor(mut self, processor: impl PostProcessor + 'static) -> Self {
		self.post_processors.push(Arc::new(processor));
		self
	}

	/// Delimiters recognised when a resolved value is interpolated again.
	#[must_use]
	pub fn with_delimiters(mut self, delimiters: DelimiterSet) -> Self {
		self.delimiters = delimiters;
		self
	}

	#[must_use]
	pub fn with_escape(mut self, escape: EscapeConfig) -> Self {
		self.escape = escape;
		self
	}

	/// Whether resolved values are scanned for further expressions.
	#[must_use]
	pub fn recursive(mut self, recursive: bool) -> Self {
		self.recursive = recursive;
		self
	}

	/// Remember every top-level answer for the lifetime of this instance.
	#[must_use]
	pub fn cache_answers(mut self, cache: bool) -> Self {
		self.cache_answers = cache;
		self
	}

	pub fn set_delimiters(&mut self, delimiters: DelimiterSet) {
		self.delimiters = delimiters;
	}

	pub fn set_escape(&mut self, escape: EscapeConfig) {
		self.escape = escape;
	}

	pub fn delimiters(&self) -> &DelimiterSet {
		&self.delimiters
	}

	pub fn value_source_count(&self) -> usize {
		self.value_sources.len()
	}

	pub fn clear_answer_cache(&mut self) {
		self.answers.clear();
	}

	/// Resolve a bare expression such as `project.version`.
	///
	/// Returns `None` when no source knows the expression, and also when the
	/// expression is already being expanded further up `recursion`; callers
	/// then keep the original text.
	pub fn resolve(
		&mut self,
		expression: &str,
		recursion: &mut RecursionInterceptor,
	) -> InterpolResult<Option<String>> {
		if recursion.has_recursive_expression(expression) {
			debug!(
				expression,
				chain = %recursion.expression_cycle(expression).join(" -> "),
				"expression references itself; leaving it unresolved"
			);
			return Ok(None);
		}

		let top_level = recursion.is_empty();
		if self.cache_answers && top_level {
			if let Some(answer) = self.answers.get(expression) {
				return Ok(Some(answer.clone()));
			}
		}

		recursion.expression_resolution_started(expression);
		let result = self.resolve_uncached(expression, recursion);
		recursion.expression_resolution_finished(expression);

		let mut resolved = result?;
		if top_level {
			if let Some(value) = &mut resolved {
				self.post_process(expression, value);
			}
		}

		if self.cache_answers && top_level {
			if let Some(value) = &resolved {
				self.answers.insert(expression.to_string(), value.clone());
			}
		}

		Ok(resolved)
	}

	/// Interpolate every expression in `input`. Unknown expressions are kept
	/// verbatim, delimiters included.
	pub fn interpolate_str(
		&mut self,
		input: &str,
		recursion: &mut RecursionInterceptor,
	) -> InterpolResult<String> {
		let chars: Vec<char> = input.chars().collect();
		let escape_len = self.escape.len();
		let mut output = String::with_capacity(input.len());
		let mut index = 0;

		while index < chars.len() {
			let rest = &chars[index..];

			if let Some(escape) = self.escape.escape_string() {
				if starts_with_token(rest, escape) {
					if let Some(spec) = self.delimiters.longest_match(&rest[escape_len..]) {
						if self.escape.preserve_escape_string() {
							output.push_str(escape);
						}
						output.push_str(spec.begin());
						index += escape_len + spec.begin_len();
					} else {
						let consumed = (escape_len + 1).min(rest.len());
						output.extend(&rest[..consumed]);
						index += consumed;
					}
					continue;
				}
			}

			let Some(spec) = self.delimiters.longest_match(rest).cloned() else {
				output.push(rest[0]);
				index += 1;
				continue;
			};

			let body = &rest[spec.begin_len()..];
			let Some(end) = find_token(body, spec.end()) else {
				output.push(rest[0]);
				index += 1;
				continue;
			};

			let expression: String = body[..end].iter().collect();
			match self.resolve(&expression, recursion)? {
				Some(value) => output.push_str(&value),
				None => output.push_str(&spec.wrap(&expression)),
			}
			index += spec.begin_len() + end + spec.end_len();
		}

		Ok(output)
	}

	/// Interpolate `input` with a fresh recursion chain.
	pub fn interpolate(&mut self, input: &str) -> InterpolResult<String> {
		self.interpolate_str(input, &mut RecursionInterceptor::new())
	}

	fn resolve_uncached(
		&mut self,
		expression: &str,
		recursion: &mut RecursionInterceptor,
	) -> InterpolResult<Option<String>> {
		let Some(mut value) = self.lookup(expression)? else {
			return Ok(None);
		};

		if self.recursive && self.delimiters.any_begin_in(&value) {
			value = self.interpolate_str(&value, recursion)?;
		}

		Ok(Some(value))
	}

	/// Post processors see only the final answer of a top-level expression.
	/// Nested values are spliced in raw so each transformation applies once.
	fn post_process(&self, expression: &str, value: &mut String) {
		for processor in &self.post_processors {
			if let Some(processed) = processor.execute(expression, value.as_str()) {
				*value = processed;
			}
		}
	}

	fn lookup(&self, expression: &str) -> InterpolResult<Option<String>> {
		for (index, source) in self.value_sources.iter().enumerate() {
			if let Some(value) = source.value(expression)? {
				trace!(expression, source = index, "resolved expression");
				return Ok(Some(value));
			}
		}

		Ok(None)
	}
}
