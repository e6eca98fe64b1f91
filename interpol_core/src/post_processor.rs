/// Transforms a resolved value before it is emitted.
///
/// Returning `None` leaves the value unchanged.
pub trait PostProcessor: Send + Sync {
	fn execute(&self, expression: &str, value: &str) -> Option<String>;
}

/// Doubles every backslash in values that look like absolute Windows paths
/// (`C:\dir\file`), so they survive being written into files that treat
/// `\` as an escape character (properties files, Java strings).
#[derive(Debug, Clone, Copy, Default)]
pub struct PathSeparatorEscaper;

impl PathSeparatorEscaper {
	fn is_windows_path(value: &str) -> bool {
		let mut chars = value.chars();
		matches!(
			(chars.next(), chars.next(), chars.next()),
			(Some(drive), Some(':'), Some('\\')) if drive.is_ascii_alphabetic()
		)
	}
}

impl PostProcessor for PathSeparatorEscaper {
	fn execute(&self, _expression: &str, value: &str) -> Option<String> {
		Self::is_windows_path(value).then(|| value.replace('\\', "\\\\"))
	}
}
