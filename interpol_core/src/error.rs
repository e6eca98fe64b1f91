use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum InterpolError {
	#[error(transparent)]
	#[diagnostic(code(interpol::io_error))]
	Io(#[from] std::io::Error),

	#[error("delimiter specification is empty")]
	#[diagnostic(
		code(interpol::empty_delimiter),
		help("use `BEGIN*END` (for example `${{*}}`) or a symmetric token such as `@`")
	)]
	EmptyDelimiter,

	#[error("delimiter specification `{0}` has no begin token")]
	#[diagnostic(
		code(interpol::missing_begin_token),
		help("put the begin token before the `*`, for example `${{*}}`")
	)]
	MissingBeginToken(String),

	#[error("delimiter specification `{0}` has no end token")]
	#[diagnostic(
		code(interpol::missing_end_token),
		help("put the end token after the `*`, for example `${{*}}`")
	)]
	MissingEndToken(String),

	#[error("escape string must not be empty")]
	#[diagnostic(
		code(interpol::empty_escape_string),
		help("omit the escape string to disable escaping")
	)]
	EmptyEscapeString,

	#[error("failed to resolve `{expression}`: {reason}")]
	#[diagnostic(code(interpol::value_source))]
	ValueSource { expression: String, reason: String },

	#[error("input is not valid UTF-8 at byte offset {offset}")]
	#[diagnostic(code(interpol::invalid_utf8))]
	InvalidUtf8 { offset: usize },

	#[error("cannot reset: the source is not marked or the mark was invalidated")]
	#[diagnostic(code(interpol::invalid_mark))]
	InvalidMark,

	#[error("the reader failed earlier and can no longer be used")]
	#[diagnostic(code(interpol::poisoned))]
	Poisoned,

	#[error("failed to parse config file: {0}")]
	#[diagnostic(
		code(interpol::config_parse),
		help("check that interpol.toml is valid TOML")
	)]
	ConfigParse(String),

	#[error("failed to load data file `{path}`: {reason}")]
	#[diagnostic(code(interpol::data_file))]
	DataFile { path: String, reason: String },

	#[error("unsupported data file format: `{0}`")]
	#[diagnostic(
		code(interpol::unsupported_format),
		help("supported formats: json, toml, yaml, yml")
	)]
	UnsupportedDataFormat(String),

	#[error("malformed property file `{path}` at line {line}: {reason}")]
	#[diagnostic(code(interpol::property_file))]
	PropertyFile {
		path: String,
		line: usize,
		reason: String,
	},

	#[error("invalid property definition: `{0}`")]
	#[diagnostic(
		code(interpol::invalid_property_argument),
		help("properties are defined as `KEY=VALUE`")
	)]
	InvalidPropertyArgument(String),
}

impl InterpolError {
	/// Unwrap an error that passed through the filter's [`std::io::Read`]
	/// implementation. Plain I/O errors become [`InterpolError::Io`].
	pub fn from_io(error: std::io::Error) -> Self {
		if error.get_ref().is_none() {
			return Self::Io(error);
		}

		let kind = error.kind();
		match error.into_inner() {
			Some(inner) => {
				match inner.downcast::<InterpolError>() {
					Ok(interpol) => *interpol,
					Err(other) => Self::Io(std::io::Error::new(kind, other)),
				}
			}
			None => Self::Io(kind.into()),
		}
	}
}

impl From<InterpolError> for std::io::Error {
	fn from(error: InterpolError) -> Self {
		match error {
			InterpolError::Io(io) => io,
			other => std::io::Error::other(other),
		}
	}
}

pub type InterpolResult<T> = Result<T, InterpolError>;
pub type AnyError = Box<dyn std::error::Error>;
pub type AnyEmptyResult = Result<(), AnyError>;
pub type AnyResult<T> = Result<T, AnyError>;
