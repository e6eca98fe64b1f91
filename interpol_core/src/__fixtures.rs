use std::io::Read;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use crate::FilterOptions;
use crate::InterpolError;
use crate::InterpolResult;
use crate::Interpolator;
use crate::MapValueSource;
use crate::ValueSource;
use crate::filter_str;

pub fn values(pairs: &[(&str, &str)]) -> MapValueSource {
	pairs.iter().copied().collect()
}

pub fn interpolator(pairs: &[(&str, &str)]) -> Interpolator {
	Interpolator::new().with_value_source(values(pairs))
}

pub fn default_values() -> Interpolator {
	interpolator(&[("foo", "bar"), ("name", "world")])
}

pub fn filter(input: &str, options: &FilterOptions, pairs: &[(&str, &str)]) -> InterpolResult<String> {
	filter_str(input, options, interpolator(pairs))
}

pub fn escaping_options(escape: &str) -> FilterOptions {
	FilterOptions {
		escape_string: Some(escape.to_string()),
		..FilterOptions::default()
	}
}

pub fn delimiter_options(delimiters: &[&str]) -> FilterOptions {
	FilterOptions {
		delimiters: delimiters.iter().map(ToString::to_string).collect(),
		..FilterOptions::default()
	}
}

/// Fails every lookup for `expression`.
pub struct FailingValueSource {
	pub expression: &'static str,
}

impl ValueSource for FailingValueSource {
	fn value(&self, expression: &str) -> InterpolResult<Option<String>> {
		if expression == self.expression {
			return Err(InterpolError::ValueSource {
				expression: expression.to_string(),
				reason: "lookup exploded".to_string(),
			});
		}

		Ok(None)
	}
}

/// Answers every expression with `value` and counts the lookups.
#[derive(Clone, Default)]
pub struct CountingValueSource {
	pub value: &'static str,
	pub lookups: Arc<AtomicUsize>,
}

impl CountingValueSource {
	pub fn count(&self) -> usize {
		self.lookups.load(Ordering::SeqCst)
	}
}

impl ValueSource for CountingValueSource {
	fn value(&self, _expression: &str) -> InterpolResult<Option<String>> {
		self.lookups.fetch_add(1, Ordering::SeqCst);
		Ok(Some(self.value.to_string()))
	}
}

/// Hands out one byte per `read` call, splitting multi-byte characters
/// across reads.
pub struct TrickleReader<'a> {
	pub bytes: &'a [u8],
}

impl Read for TrickleReader<'_> {
	fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
		let Some((first, rest)) = self.bytes.split_first() else {
			return Ok(0);
		};

		if buf.is_empty() {
			return Ok(0);
		}

		buf[0] = *first;
		self.bytes = rest;
		Ok(1)
	}
}

pub fn project_model() -> serde_json::Value {
	serde_json::json!({
		"version": "1.2.3",
		"build": { "directory": "target", "final_name": "app-1.2.3" },
		"modules": ["core", "cli"],
		"count": 3,
		"released": true,
		"parent": null
	})
}
