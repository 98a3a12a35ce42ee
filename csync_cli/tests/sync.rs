use csync_core::AnyEmptyResult;
use predicates::prelude::*;

mod common;

#[test]
fn dry_run_renders_every_source() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let concept_eight = common::CONCEPT_SEVEN.replace("\"7\"", "\"8\"");
	common::write_project(
		tmp.path(),
		&[("C7.cs", common::CONCEPT_SEVEN), ("C8.cs", concept_eight.as_str())],
	)?;

	common::csync_cmd()
		.arg("sync")
		.arg("--dry-run")
		.arg("--template")
		.arg(tmp.path().join("template.xml"))
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicate::str::contains("rendered Concepto 7"))
		.stdout(predicate::str::contains("rendered Concepto 8"))
		.stdout(predicate::str::contains(
			"Dry run: rendered 2 file(s), 0 failed. No pages were written.",
		));

	Ok(())
}

#[test]
fn dry_run_verbose_prints_markup() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_project(tmp.path(), &[("C7.cs", common::CONCEPT_SEVEN)])?;

	common::csync_cmd()
		.arg("sync")
		.arg("--dry-run")
		.arg("--verbose")
		.arg("--template")
		.arg(tmp.path().join("template.xml"))
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicate::str::contains("concepto_7</ac:parameter>"));

	Ok(())
}

#[test]
fn failing_file_does_not_stop_the_run() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_project(
		tmp.path(),
		&[
			("C5.cs", "#region Constructor\nno public line\n"),
			("C7.cs", common::CONCEPT_SEVEN),
		],
	)?;

	common::csync_cmd()
		.arg("sync")
		.arg("--dry-run")
		.arg("--template")
		.arg(tmp.path().join("template.xml"))
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(1)
		.stdout(predicate::str::contains("failed   conceptos"))
		.stdout(predicate::str::contains("rendered Concepto 7"))
		.stdout(predicate::str::contains("rendered 1 file(s), 1 failed"));

	Ok(())
}

#[test]
fn include_filter_skips_other_files() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_project(
		tmp.path(),
		&[("C7.cs", common::CONCEPT_SEVEN), ("notes.txt", "not a concept")],
	)?;

	common::csync_cmd()
		.arg("sync")
		.arg("--dry-run")
		.arg("--template")
		.arg(tmp.path().join("template.xml"))
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicate::str::contains("notes").not())
		.stdout(predicate::str::contains("rendered 1 file(s)"));

	Ok(())
}

#[test]
fn empty_source_directory() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_project(tmp.path(), &[])?;

	common::csync_cmd()
		.arg("sync")
		.arg("--dry-run")
		.arg("--template")
		.arg(tmp.path().join("template.xml"))
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicate::str::contains("No source files found"));

	Ok(())
}

#[test]
fn missing_template_file_is_fatal() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_project(tmp.path(), &[("C7.cs", common::CONCEPT_SEVEN)])?;

	common::csync_cmd()
		.arg("sync")
		.arg("--dry-run")
		.arg("--template")
		.arg(tmp.path().join("missing.xml"))
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(2)
		.stderr(predicate::str::contains("failed to fetch template"));

	Ok(())
}

#[test]
fn sync_without_remote_settings_fails() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_project(tmp.path(), &[("C7.cs", common::CONCEPT_SEVEN)])?;

	common::csync_cmd()
		.arg("sync")
		.arg("--template")
		.arg(tmp.path().join("template.xml"))
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(2)
		.stderr(predicate::str::contains("missing configuration value"));

	Ok(())
}
