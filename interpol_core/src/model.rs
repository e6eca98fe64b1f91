use std::path::Path;

use crate::InterpolError;
use crate::InterpolResult;

/// Prefixes under which a project model is exposed by default.
pub const DEFAULT_MODEL_PREFIXES: [&str; 2] = ["project.", "pom."];

/// Read a project model document. The format follows the file extension:
/// `json`, `toml`, `yaml` or `yml`.
pub fn load_model(path: &Path) -> InterpolResult<serde_json::Value> {
	let path_display = path.display().to_string();
	let content = std::fs::read_to_string(path).map_err(|e| InterpolError::DataFile {
		path: path_display.clone(),
		reason: e.to_string(),
	})?;
	let format = path
		.extension()
		.and_then(|e| e.to_str())
		.unwrap_or("")
		.to_ascii_lowercase();

	parse_model(&content, &format, &path_display)
}

/// Parse a project model document of the given format.
pub fn parse_model(
	content: &str,
	format: &str,
	path_display: &str,
) -> InterpolResult<serde_json::Value> {
	match format {
		"json" => serde_json::from_str(content).map_err(|e| InterpolError::DataFile {
			path: path_display.to_string(),
			reason: e.to_string(),
		}),
		"toml" => {
			let toml_value: toml::Value =
				toml::from_str(content).map_err(|e| InterpolError::DataFile {
					path: path_display.to_string(),
					reason: e.to_string(),
				})?;
			toml_to_json(toml_value, path_display)
		}
		"yaml" | "yml" => serde_yaml_ng::from_str(content).map_err(|e| InterpolError::DataFile {
			path: path_display.to_string(),
			reason: e.to_string(),
		}),
		other => Err(InterpolError::UnsupportedDataFormat(other.to_string())),
	}
}

fn toml_to_json(value: toml::Value, path_display: &str) -> InterpolResult<serde_json::Value> {
	let json = match value {
		toml::Value::String(s) => serde_json::Value::String(s),
		toml::Value::Integer(i) => serde_json::Value::from(i),
		toml::Value::Float(f) => {
			serde_json::Value::Number(serde_json::Number::from_f64(f).ok_or_else(|| {
				InterpolError::DataFile {
					path: path_display.to_string(),
					reason: format!("unconvertible float value: {f}"),
				}
			})?)
		}
		toml::Value::Boolean(b) => serde_json::Value::Bool(b),
		toml::Value::Datetime(dt) => serde_json::Value::String(dt.to_string()),
		toml::Value::Array(arr) => {
			let items: InterpolResult<Vec<serde_json::Value>> = arr
				.into_iter()
				.map(|v| toml_to_json(v, path_display))
				.collect();
			serde_json::Value::Array(items?)
		}
		toml::Value::Table(table) => {
			let mut map = serde_json::Map::new();
			for (k, v) in table {
				map.insert(k, toml_to_json(v, path_display)?);
			}
			serde_json::Value::Object(map)
		}
	};

	Ok(json)
}
