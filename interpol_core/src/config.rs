use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;

use crate::EnvValueSource;
use crate::FilterOptions;
use crate::InterpolError;
use crate::InterpolResult;
use crate::Interpolator;
use crate::MapValueSource;
use crate::PathSeparatorEscaper;
use crate::PrefixedObjectValueSource;
use crate::PropertyTable;
use crate::model::DEFAULT_MODEL_PREFIXES;
use crate::model::load_model;
use crate::properties::load_property_files;

/// Supported config file locations in discovery order (highest precedence
/// first).
pub const CONFIG_FILE_CANDIDATES: [&str; 3] =
	["interpol.toml", ".interpol.toml", ".config/interpol.toml"];

/// Configuration loaded from an `interpol.toml` file.
///
/// ```toml
/// delimiters = ["${*}", "@"]
/// escape_string = "\\"
/// support_multi_line_filtering = false
/// escape_windows_paths = true
/// environment = true
/// filters = ["filter.properties"]
///
/// [properties]
/// greeting = "hello"
///
/// [project]
/// path = "project.json"
/// prefixes = ["project.", "pom."]
/// ```
#[derive(Debug, Deserialize)]
pub struct InterpolConfig {
	/// Delimiter, escape and line handling for the filter.
	#[serde(flatten)]
	pub filter: FilterOptions,
	/// Literal properties, consulted before filter files.
	#[serde(default)]
	pub properties: HashMap<String, String>,
	/// `.properties` files, relative to the config root, loaded in order.
	#[serde(default)]
	pub filters: Vec<PathBuf>,
	/// A project model exposed under prefixed dotted paths.
	#[serde(default)]
	pub project: Option<ProjectConfig>,
	/// Double the backslashes in values that look like Windows paths.
	#[serde(default = "default_true")]
	pub escape_windows_paths: bool,
	/// Expose environment variables as `env.NAME`.
	#[serde(default = "default_true")]
	pub environment: bool,
}

/// Where the project model lives and which prefixes expose it.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectConfig {
	pub path: PathBuf,
	#[serde(default = "default_model_prefixes")]
	pub prefixes: Vec<String>,
}

impl ProjectConfig {
	/// A project model at `path` exposed under the default prefixes.
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self {
			path: path.into(),
			prefixes: default_model_prefixes(),
		}
	}
}

impl Default for InterpolConfig {
	fn default() -> Self {
		Self {
			filter: FilterOptions::default(),
			properties: HashMap::new(),
			filters: Vec::new(),
			project: None,
			escape_windows_paths: true,
			environment: true,
		}
	}
}

fn default_true() -> bool {
	true
}

fn default_model_prefixes() -> Vec<String> {
	DEFAULT_MODEL_PREFIXES.iter().map(ToString::to_string).collect()
}

impl InterpolConfig {
	/// Resolve the config path from known discovery candidates.
	#[must_use]
	pub fn resolve_path(root: &Path) -> Option<PathBuf> {
		CONFIG_FILE_CANDIDATES
			.iter()
			.map(|candidate| root.join(candidate))
			.find(|path| path.is_file())
	}

	/// Load the config from the first discovered config file at `root`.
	/// Returns `None` if the file does not exist.
	pub fn load(root: &Path) -> InterpolResult<Option<InterpolConfig>> {
		let Some(config_path) = Self::resolve_path(root) else {
			return Ok(None);
		};

		let content = std::fs::read_to_string(&config_path)?;
		let config = Self::parse(&content)?;

		Ok(Some(config))
	}

	pub fn parse(content: &str) -> InterpolResult<InterpolConfig> {
		toml::from_str(content).map_err(|e| InterpolError::ConfigParse(e.to_string()))
	}

	/// Build the value-source chain described by this config.
	///
	/// Sources are consulted in this order: `overrides`, `[properties]`,
	/// the resolved filter files, the project model and finally the
	/// environment snapshot. Filter files are resolved against the first two
	/// layers and fall back to the environment.
	#[allow(clippy::implicit_hasher)]
	pub fn interpolator(
		&self,
		root: &Path,
		overrides: &PropertyTable,
		environment: &EnvValueSource,
	) -> InterpolResult<Interpolator> {
		let mut base = self.properties.clone();
		base.extend(overrides.iter().map(|(key, value)| (key.clone(), value.clone())));

		let filter_paths: Vec<PathBuf> = self.filters.iter().map(|path| root.join(path)).collect();
		let fallback = if self.environment {
			environment.variables().clone()
		} else {
			PropertyTable::new()
		};
		let filtered = load_property_files(&filter_paths, &base, &fallback)?;

		let mut interpolator = Interpolator::new()
			.with_value_source(MapValueSource::new(overrides.clone()))
			.with_value_source(MapValueSource::new(self.properties.clone()))
			.with_value_source(MapValueSource::new(filtered));

		if let Some(project) = &self.project {
			let model = load_model(&root.join(&project.path))?;
			interpolator
				.add_value_source(PrefixedObjectValueSource::new(project.prefixes.clone(), model));
		}

		if self.environment {
			interpolator.add_value_source(environment.clone());
		}

		if self.escape_windows_paths {
			interpolator = interpolator.with_post_processor(PathSeparatorEscaper);
		}

		Ok(interpolator)
	}
}
