/// Tracks the chain of expressions currently being expanded so that
/// self-referential values are detected instead of expanded forever.
///
/// With prefixes configured, an accepted prefix is stripped before keys are
/// compared, so `project.version` and `version` count as the same frame.
#[derive(Debug, Clone, Default)]
pub struct RecursionInterceptor {
	chain: Vec<String>,
	prefixes: Vec<String>,
}

impl RecursionInterceptor {
	pub fn new() -> Self {
		Self::default()
	}

	/// An interceptor that treats `prefix.key` and `key` as the same frame
	/// for every prefix in `prefixes`.
	pub fn with_prefixes<I, S>(prefixes: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self {
			chain: Vec::new(),
			prefixes: prefixes.into_iter().map(Into::into).collect(),
		}
	}

	/// Whether `expression` is already being expanded further up the chain.
	pub fn has_recursive_expression(&self, expression: &str) -> bool {
		let key = self.normalize(expression);
		self.chain.iter().any(|entry| entry == key)
	}

	/// Push `expression` onto the chain.
	pub fn expression_resolution_started(&mut self, expression: &str) {
		let key = self.normalize(expression).to_string();
		self.chain.push(key);
	}

	/// Pop the most recent frame for `expression` from the chain.
	pub fn expression_resolution_finished(&mut self, expression: &str) {
		let key = self.normalize(expression);
		if let Some(index) = self.chain.iter().rposition(|entry| entry == key) {
			self.chain.remove(index);
		}
	}

	/// The chain that leads back to `expression`: every frame from its first
	/// occurrence to the top, followed by `expression` itself.
	pub fn expression_cycle(&self, expression: &str) -> Vec<String> {
		let key = self.normalize(expression);
		let Some(first) = self.chain.iter().position(|entry| entry == key) else {
			return Vec::new();
		};

		let mut cycle = self.chain[first..].to_vec();
		cycle.push(key.to_string());
		cycle
	}

	/// The frames currently being expanded, outermost first.
	pub fn chain(&self) -> &[String] {
		&self.chain
	}

	pub fn is_empty(&self) -> bool {
		self.chain.is_empty()
	}

	fn normalize<'a>(&self, expression: &'a str) -> &'a str {
		self.prefixes
			.iter()
			.find_map(|prefix| expression.strip_prefix(prefix.as_str()))
			.unwrap_or(expression)
	}
}
