use std::fs::File;
use std::io::BufWriter;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use interpol_cli::InterpolCli;
use interpol_core::EnvValueSource;
use interpol_core::InterpolConfig;
use interpol_core::InterpolError;
use interpol_core::InterpolResult;
use interpol_core::InterpolatingReader;
use interpol_core::ProjectConfig;
use interpol_core::PropertyTable;
use owo_colors::OwoColorize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

static USE_COLOR: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(true);

fn color_enabled() -> bool {
	USE_COLOR.load(std::sync::atomic::Ordering::Relaxed)
}

/// Apply ANSI color codes only when color is enabled.
macro_rules! colored {
	($text:expr,green) => {
		if color_enabled() {
			format!("{}", $text.green())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,bold) => {
		if color_enabled() {
			format!("{}", $text.bold())
		} else {
			format!("{}", $text)
		}
	};
}

fn main() {
	let args = InterpolCli::parse();

	// Respect NO_COLOR env var and --no-color flag.
	let use_color = !args.no_color && std::env::var_os("NO_COLOR").is_none();
	if !use_color {
		USE_COLOR.store(false, std::sync::atomic::Ordering::Relaxed);
	}

	miette::set_hook(Box::new(move |_| {
		Box::new(
			miette::MietteHandlerOpts::new()
				.color(use_color)
				.unicode(use_color)
				.build(),
		)
	}))
	.ok();

	init_tracing(args.verbose, use_color);

	if let Err(error) = run(&args) {
		let report: miette::Report = error.into();
		eprintln!("{report:?}");
		process::exit(2);
	}
}

/// Log to stderr. `RUST_LOG` wins unless `--verbose` is given.
fn init_tracing(verbose: bool, use_color: bool) {
	let filter = if verbose {
		EnvFilter::new("debug")
	} else {
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
	};

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_ansi(use_color)
		.with_target(false)
		.try_init()
		.ok();
}

fn resolve_root(args: &InterpolCli) -> PathBuf {
	args.path
		.clone()
		.unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

fn run(args: &InterpolCli) -> InterpolResult<()> {
	let root = resolve_root(args);
	let config_path = InterpolConfig::resolve_path(&root);
	let mut config = InterpolConfig::load(&root)?.unwrap_or_default();
	apply_arguments(&mut config, args)?;

	if args.verbose {
		let resolved = config_path
			.as_deref()
			.map_or_else(|| "none".to_string(), |path| path.display().to_string());
		eprintln!("{} {resolved}", colored!("config:", bold));
	}

	let overrides: PropertyTable = args.defines.iter().cloned().collect();
	let environment = if config.environment {
		EnvValueSource::capture()
	} else {
		EnvValueSource::default()
	};
	let interpolator = config.interpolator(&root, &overrides, &environment)?;
	debug!(
		value_sources = interpolator.value_source_count(),
		"configured interpolator"
	);

	let input: Box<dyn Read> = match &args.input {
		Some(path) => Box::new(open_input(path)?),
		None => Box::new(std::io::stdin().lock()),
	};
	let mut reader = InterpolatingReader::from_read(input, &config.filter, interpolator)?;

	match &args.output {
		Some(path) => {
			let mut writer = BufWriter::new(File::create(path)?);
			std::io::copy(&mut reader, &mut writer).map_err(InterpolError::from_io)?;
			writer.flush()?;
		}
		None => {
			let mut writer = std::io::stdout().lock();
			std::io::copy(&mut reader, &mut writer).map_err(InterpolError::from_io)?;
			writer.flush()?;
		}
	}

	if args.verbose {
		let input = args
			.input
			.as_deref()
			.map_or_else(|| "<stdin>".to_string(), |path| path.display().to_string());
		let output = args
			.output
			.as_deref()
			.map_or_else(|| "<stdout>".to_string(), |path| path.display().to_string());
		eprintln!("{} {input} -> {output}", colored!("filtered", green));
	}

	Ok(())
}

/// Layer command line options over the loaded config. Paths given on the
/// command line are relative to the working directory, not the config root.
fn apply_arguments(config: &mut InterpolConfig, args: &InterpolCli) -> InterpolResult<()> {
	if !args.delimiters.is_empty() {
		config.filter.delimiters.clone_from(&args.delimiters);
	}

	if let Some(escape) = &args.escape {
		config.filter.escape_string = Some(escape.clone());
	}

	if args.preserve_escape {
		config.filter.preserve_escape_string = true;
	}

	if args.multi_line {
		config.filter.support_multi_line_filtering = true;
	}

	if args.no_env {
		config.environment = false;
	}

	for path in &args.filter_files {
		config.filters.push(std::path::absolute(path)?);
	}

	if let Some(path) = &args.project {
		config.project = Some(ProjectConfig::new(std::path::absolute(path)?));
	}

	Ok(())
}

fn open_input(path: &Path) -> InterpolResult<File> {
	File::open(path).map_err(|e| {
		InterpolError::DataFile {
			path: path.display().to_string(),
			reason: e.to_string(),
		}
	})
}
