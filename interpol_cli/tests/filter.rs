mod common;

use clap::Parser;
use interpol_cli::InterpolCli;
use interpol_cli::parse_define;
use interpol_core::AnyEmptyResult;
use interpol_core::InterpolError;
use predicates::prelude::PredicateBooleanExt;
use rstest::rstest;
use similar_asserts::assert_eq;

#[test]
fn filters_stdin_to_stdout() {
	common::interpol_cmd()
		.arg("--no-env")
		.arg("-D")
		.arg("name=world")
		.write_stdin("hello ${name}, @name@! ${unknown}\n")
		.assert()
		.success()
		.stdout("hello world, world! ${unknown}\n");
}

#[test]
fn filters_file_to_file() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let input = tmp.path().join("app.conf.in");
	let output = tmp.path().join("app.conf");
	std::fs::write(&input, "port=${port}\nhost=@host@\n")?;

	common::interpol_cmd()
		.arg(&input)
		.arg("--output")
		.arg(&output)
		.arg("--path")
		.arg(tmp.path())
		.arg("-D")
		.arg("port=8080")
		.arg("--define")
		.arg("host=localhost")
		.assert()
		.success()
		.stdout("");

	assert_eq!(
		std::fs::read_to_string(&output)?,
		"port=8080\nhost=localhost\n"
	);

	Ok(())
}

#[test]
fn reads_values_from_config() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(
		tmp.path().join("interpol.toml"),
		r#"
filters = ["build.properties"]

[properties]
greeting = "hello"

[project]
path = "project.json"
"#,
	)?;
	std::fs::write(
		tmp.path().join("build.properties"),
		"banner=${greeting} from ${name}\n",
	)?;
	std::fs::write(
		tmp.path().join("project.json"),
		r#"{ "name": "demo", "version": "2.0.0" }"#,
	)?;

	common::interpol_cmd()
		.arg("--path")
		.arg(tmp.path())
		.arg("-D")
		.arg("name=cli")
		.write_stdin("${banner} (${project.name} @pom.version@)")
		.assert()
		.success()
		.stdout("hello from cli (demo 2.0.0)");

	Ok(())
}

#[test]
fn defines_override_config_properties() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(
		tmp.path().join(".interpol.toml"),
		"[properties]\nmode = \"config\"\n",
	)?;

	common::interpol_cmd()
		.arg("--path")
		.arg(tmp.path())
		.arg("-D")
		.arg("mode=cli")
		.write_stdin("${mode}")
		.assert()
		.success()
		.stdout("cli");

	Ok(())
}

#[test]
fn verbose_reports_resolved_config() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::create_dir_all(tmp.path().join(".config"))?;
	std::fs::write(tmp.path().join(".config/interpol.toml"), "")?;

	let expected_path = tmp
		.path()
		.join(".config/interpol.toml")
		.display()
		.to_string();

	common::interpol_cmd()
		.arg("--path")
		.arg(tmp.path())
		.arg("--verbose")
		.write_stdin("text")
		.assert()
		.success()
		.stdout("text")
		.stderr(predicates::str::contains("config:").and(predicates::str::contains(expected_path)));

	Ok(())
}

#[test]
fn exposes_environment_variables() {
	common::interpol_cmd()
		.env("INTERPOL_CLI_TEST_VALUE", "from-env")
		.write_stdin("${env.INTERPOL_CLI_TEST_VALUE}")
		.assert()
		.success()
		.stdout("from-env");
}

#[test]
fn no_env_hides_environment_variables() {
	common::interpol_cmd()
		.env("INTERPOL_CLI_TEST_VALUE", "from-env")
		.arg("--no-env")
		.write_stdin("${env.INTERPOL_CLI_TEST_VALUE}")
		.assert()
		.success()
		.stdout("${env.INTERPOL_CLI_TEST_VALUE}");
}

#[test]
fn filter_file_and_project_flags() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let properties = tmp.path().join("extra.properties");
	let project = tmp.path().join("project.toml");
	std::fs::write(&properties, "release=yes\nchannel=${channel}\n")?;
	std::fs::write(&project, "name = \"lib\"\nversion = \"0.3.1\"\n")?;

	common::interpol_cmd()
		.arg("--no-env")
		.arg("--path")
		.arg(tmp.path())
		.arg("--filter-file")
		.arg(&properties)
		.arg("--project")
		.arg(&project)
		.arg("-D")
		.arg("channel=beta")
		.write_stdin("${project.name} ${project.version} ${release} ${channel}")
		.assert()
		.success()
		.stdout("lib 0.3.1 yes beta");

	Ok(())
}

#[rstest]
#[case::custom_delimiter(&["--delimiter", "[[*]]"], "[[name]] ${name}", "world ${name}")]
#[case::several_delimiters(&["--delimiter", "[[*]]", "--delimiter", "%"], "[[name]] %name%", "world world")]
#[case::escape(&["--escape", "\\"], "\\${name} ${name}", "${name} world")]
#[case::preserve_escape(&["--escape", "\\", "--preserve-escape"], "\\${name}", "\\${name}")]
#[case::single_line(&[], "${na\nme}", "${na\nme}")]
#[case::multi_line(&["--multi-line"], "${na\nme}", "multi")]
fn filter_options_from_flags(
	#[case] flags: &[&str],
	#[case] input: &str,
	#[case] expected: &str,
) -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;

	common::interpol_cmd()
		.arg("--no-env")
		.arg("--path")
		.arg(tmp.path())
		.arg("-D")
		.arg("name=world")
		.arg("-D")
		.arg("na\nme=multi")
		.args(flags)
		.write_stdin(input)
		.assert()
		.success()
		.stdout(predicates::str::diff(expected.to_string()));

	Ok(())
}

#[test]
fn invalid_delimiter_exits_with_error() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;

	common::interpol_cmd()
		.arg("--path")
		.arg(tmp.path())
		.arg("--delimiter")
		.arg("${*")
		.write_stdin("text")
		.assert()
		.code(2)
		.stderr(predicates::str::contains("has no end token"));

	Ok(())
}

#[test]
fn invalid_config_exits_with_error() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join("interpol.toml"), "delimiters = 3\n")?;

	common::interpol_cmd()
		.arg("--path")
		.arg(tmp.path())
		.write_stdin("text")
		.assert()
		.code(2)
		.stderr(predicates::str::contains("failed to parse config file"));

	Ok(())
}

#[test]
fn missing_input_exits_with_error() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;

	common::interpol_cmd()
		.arg(tmp.path().join("missing.txt"))
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(2)
		.stderr(predicates::str::contains("missing.txt"));

	Ok(())
}

#[test]
fn malformed_define_is_rejected() {
	common::interpol_cmd()
		.arg("-D")
		.arg("novalue")
		.write_stdin("text")
		.assert()
		.code(2)
		.stderr(predicates::str::contains("novalue"));
}

#[rstest]
#[case::simple("key=value", "key", "value")]
#[case::splits_on_first_equals("url=a=b", "url", "a=b")]
#[case::empty_value("empty=", "empty", "")]
fn parse_define_splits_key_and_value(
	#[case] definition: &str,
	#[case] key: &str,
	#[case] value: &str,
) -> AnyEmptyResult {
	assert_eq!(
		parse_define(definition)?,
		(key.to_string(), value.to_string())
	);

	Ok(())
}

#[rstest]
#[case::no_equals("novalue")]
#[case::empty_key("=value")]
fn parse_define_rejects_invalid(#[case] definition: &str) {
	assert!(matches!(
		parse_define(definition),
		Err(InterpolError::InvalidPropertyArgument(_))
	));
}

#[test]
fn repeated_flags_are_collected() -> AnyEmptyResult {
	let cli = InterpolCli::try_parse_from([
		"interpol",
		"input.txt",
		"-D",
		"a=1",
		"-D",
		"b=2",
		"--delimiter",
		"@",
		"--filter-file",
		"one.properties",
		"--filter-file",
		"two.properties",
	])?;

	assert_eq!(
		cli.defines,
		vec![
			("a".to_string(), "1".to_string()),
			("b".to_string(), "2".to_string())
		]
	);
	assert_eq!(cli.delimiters, vec!["@".to_string()]);
	assert_eq!(cli.filter_files.len(), 2);
	assert!(cli.input.is_some());
	assert!(!cli.no_env);

	Ok(())
}
