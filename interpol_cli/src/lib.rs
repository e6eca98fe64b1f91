use std::path::PathBuf;

use clap::Parser;
use interpol_core::InterpolError;

#[derive(Parser)]
#[command(
	author,
	version,
	about = "Replace ${expressions} in a text stream with values from properties, project models and \
	         the environment.",
	long_about = "interpol reads text from a file or stdin, replaces every delimited expression \
	              such as `${project.version}` or `@name@` with its value and writes the result \
	              to a file or stdout. Everything else passes through unchanged, including \
	              expressions nobody knows a value for.\n\nValues are looked up in this order:\n  \
	              --define KEY=VALUE\n  [properties] in interpol.toml\n  .properties filter \
	              files\n  the project model (project.*, pom.*)\n  environment variables (env.*)"
)]
#[allow(clippy::struct_excessive_bools)]
pub struct InterpolCli {
	/// File to filter. Reads stdin when omitted.
	pub input: Option<PathBuf>,

	/// Write the filtered text here instead of stdout.
	#[arg(long, short)]
	pub output: Option<PathBuf>,

	/// Directory searched for `interpol.toml`. Paths in the config are
	/// relative to it.
	#[arg(long, short)]
	pub path: Option<PathBuf>,

	/// Define a property as `KEY=VALUE`. Takes precedence over every other
	/// value source.
	#[arg(long = "define", short = 'D', value_name = "KEY=VALUE", value_parser = parse_define)]
	pub defines: Vec<(String, String)>,

	/// Load a `.properties` file after those listed in the config.
	#[arg(long = "filter-file", value_name = "FILE")]
	pub filter_files: Vec<PathBuf>,

	/// Project model document (json, toml or yaml) exposed as `project.*`
	/// and `pom.*`.
	#[arg(long, value_name = "FILE")]
	pub project: Option<PathBuf>,

	/// Delimiter in `BEGIN*END` or symmetric `TOKEN` form. Replaces the
	/// configured delimiters when given at least once.
	#[arg(long = "delimiter", value_name = "SPEC")]
	pub delimiters: Vec<String>,

	/// Escape string that turns a following begin token into literal text.
	#[arg(long, value_name = "STRING")]
	pub escape: Option<String>,

	/// Keep the escape string in the output.
	#[arg(long, default_value_t = false)]
	pub preserve_escape: bool,

	/// Allow expressions to span several lines.
	#[arg(long, default_value_t = false)]
	pub multi_line: bool,

	/// Do not expose environment variables as `env.*`.
	#[arg(long, default_value_t = false)]
	pub no_env: bool,

	/// Enable verbose output.
	#[arg(long, short, default_value_t = false)]
	pub verbose: bool,

	/// Disable colored output.
	#[arg(long, default_value_t = false)]
	pub no_color: bool,
}

/// Split a `KEY=VALUE` definition at the first `=`.
pub fn parse_define(definition: &str) -> Result<(String, String), InterpolError> {
	match definition.split_once('=') {
		Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
		_ => Err(InterpolError::InvalidPropertyArgument(definition.to_string())),
	}
}
