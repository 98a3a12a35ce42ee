use std::path::Path;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use csync_cli::Commands;
use csync_cli::CsyncCli;
use csync_cli::OutputFormat;
use csync_core::ConceptRecord;
use csync_core::CsyncConfig;
use csync_core::page_store::ConfluenceClient;
use csync_core::page_store::FileTemplateSource;
use csync_core::page_store::MemoryPageStore;
use csync_core::page_store::PageStore;
use csync_core::page_store::TemplateSource;
use csync_core::sync::FileReport;
use csync_core::sync::Pipeline;
use csync_core::sync::SyncOptions;
use csync_core::sync::SyncOutcome;
use csync_core::sync::SyncReport;
use owo_colors::OwoColorize;
use tracing_subscriber::EnvFilter;

static USE_COLOR: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(true);

fn color_enabled() -> bool {
	USE_COLOR.load(std::sync::atomic::Ordering::Relaxed)
}

/// Apply ANSI color codes only when color is enabled.
macro_rules! colored {
	($text:expr,red) => {
		if color_enabled() {
			format!("{}", $text.red())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,green) => {
		if color_enabled() {
			format!("{}", $text.green())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,yellow) => {
		if color_enabled() {
			format!("{}", $text.yellow())
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

type CliResult = Result<(), Box<dyn std::error::Error>>;

fn main() {
	let args = CsyncCli::parse();

	// Respect NO_COLOR env var and --no-color flag.
	let use_color = !args.no_color && std::env::var_os("NO_COLOR").is_none();
	if !use_color {
		USE_COLOR.store(false, std::sync::atomic::Ordering::Relaxed);
	}

	// Install miette's fancy handler for rich error diagnostics.
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

	let result = match &args.command {
		Some(Commands::Init) => run_init(&args),
		Some(Commands::Extract { file, format }) => run_extract(&args, file, *format),
		Some(Commands::Render { file, template }) => run_render(&args, file, template.as_deref()),
		Some(Commands::Sync { dry_run, template }) => {
			run_sync(&args, *dry_run, template.as_deref())
		}
		None => {
			eprintln!("No subcommand specified. Run `csync --help` for usage.");
			process::exit(1);
		}
	};

	if let Err(e) = result {
		// Try to render through miette for rich diagnostics with help text
		// and error codes.
		match e.downcast::<csync_core::CsyncError>() {
			Ok(csync_err) => {
				let report: miette::Report = (*csync_err).into();
				eprintln!("{report:?}");
			}
			Err(e) => {
				eprintln!("{} {e}", colored!("error:", red));
			}
		}
		process::exit(2);
	}
}

/// Log to stderr. `RUST_LOG` wins over the `--verbose` default.
fn init_tracing(verbose: bool, use_color: bool) {
	let default_directive = if verbose { "info" } else { "warn" };

	tracing_subscriber::fmt()
		.with_env_filter(
			EnvFilter::try_from_default_env().unwrap_or_else(|_| default_directive.into()),
		)
		.with_writer(std::io::stderr)
		.with_ansi(use_color)
		.with_target(false)
		.init();
}

fn resolve_root(args: &CsyncCli) -> PathBuf {
	args.path
		.clone()
		.unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

fn load_config(root: &Path) -> Result<CsyncConfig, csync_core::CsyncError> {
	match CsyncConfig::load(root)? {
		Some(config) => Ok(config),
		None => {
			tracing::debug!(root = %root.display(), "no config file found, using defaults");
			Ok(CsyncConfig::default())
		}
	}
}

fn print_field(label: &str, value: impl std::fmt::Display) {
	println!("{label:<18} {value}");
}

fn make_relative(path: &Path, root: &Path) -> String {
	path.strip_prefix(root)
		.unwrap_or(path)
		.display()
		.to_string()
}

fn run_init(args: &CsyncCli) -> CliResult {
	let root = resolve_root(args);
	let config_path = root.join("csync.toml");

	if let Some(existing) = CsyncConfig::resolve_path(&root) {
		println!("Config file already exists: {}", existing.display());
		return Ok(());
	}

	let sample_config = "# csync configuration\n\n[source]\n# Directory holding one source file \
	                     per concept, relative to this file.\ndir = \".\"\ninclude = \
	                     [\"*.cs\"]\n# exclude = [\"*Base.cs\"]\n\n# Confluence connection. The \
	                     API token can also come from CSYNC_API_TOKEN.\n# [remote]\n# base_url = \
	                     \"https://example.atlassian.net/wiki/rest/api/\"\n# space = \"CALC\"\n# \
	                     parent_page = \"123456\"\n# template_id = \"98765\"\n# user = \
	                     \"me@example.com\"\n# title_prefix = \"Concepto \"\n\n# [template]\n# \
	                     mode = \"anchors\"       # or \"placeholders\"\n# anchor_policy = \
	                     \"skip\"  # or \"require\"\n";

	std::fs::write(&config_path, sample_config)?;
	println!("Created csync.toml");
	println!();
	println!("Next steps:");
	println!("  1. Point [source] at the directory holding your concept files");
	println!("  2. Fill in the [remote] settings");
	println!("  3. Run `csync sync --dry-run` to preview the pages");

	Ok(())
}

fn run_extract(args: &CsyncCli, file: &Path, format: OutputFormat) -> CliResult {
	let root = resolve_root(args);
	let config = load_config(&root)?;
	let pipeline = Pipeline::from_config(&config)?;
	let record = pipeline.extract(file)?;

	match format {
		OutputFormat::Json => {
			println!("{}", serde_json::to_string_pretty(&record)?);
		}
		OutputFormat::Text => print_record(&record),
	}

	Ok(())
}

fn print_record(record: &ConceptRecord) {
	let none = || "(none)".to_string();

	print_field("Concept:", if record.id.is_empty() { none() } else { record.id.clone() });
	print_field(
		"Dependencies:",
		if record.dependency_tokens.is_empty() {
			none()
		} else {
			record.dependency_tokens.join(", ")
		},
	);
	print_field(
		"Primary field:",
		record.primary_field.clone().unwrap_or_else(none),
	);
	print_field(
		"Secondary field:",
		record.secondary_field.clone().unwrap_or_else(none),
	);
	println!();
	println!(
		"{}",
		colored!(
			format!("Calculation ({} line(s)):", record.calculation_lines.len()),
			bold
		)
	);
	print!("{}", record.calculation_text());
}

fn run_render(args: &CsyncCli, file: &Path, template: Option<&Path>) -> CliResult {
	let root = resolve_root(args);
	let config = load_config(&root)?;
	let pipeline = Pipeline::from_config(&config)?;

	let template = match template {
		Some(path) => FileTemplateSource::new(path).fetch_template()?,
		None => ConfluenceClient::from_config(&config.remote)?.fetch_template()?,
	};

	let (_, markup) = pipeline.render_file(file, &template)?;
	println!("{markup}");

	Ok(())
}

fn run_sync(args: &CsyncCli, dry_run: bool, template: Option<&Path>) -> CliResult {
	let root = resolve_root(args);
	let config = load_config(&root)?;

	// A dry run with a local template never talks to the remote.
	let remote = if dry_run && template.is_some() {
		None
	} else {
		Some(ConfluenceClient::from_config(&config.remote)?)
	};
	let file_source = template.map(FileTemplateSource::new);
	let templates: &dyn TemplateSource = match (&file_source, &remote) {
		(Some(source), _) => source,
		(None, Some(client)) => client,
		(None, None) => return Err("no page template source configured".into()),
	};

	let offline = MemoryPageStore::new(config.remote.title_prefix.clone());
	let store: &dyn PageStore = match &remote {
		Some(client) if !dry_run => client,
		_ => &offline,
	};

	let report = csync_core::sync::run_sync(
		&root,
		&config,
		templates,
		store,
		SyncOptions { dry_run },
	)?;

	print_report(args, &config, &root, &report, dry_run);

	if !report.is_ok() {
		process::exit(1);
	}

	Ok(())
}

fn print_report(args: &CsyncCli, config: &CsyncConfig, root: &Path, report: &SyncReport, dry_run: bool) {
	if report.files.is_empty() {
		println!("No source files found in {}.", config.source_dir(root).display());
		return;
	}

	for file in &report.files {
		print_file_report(args, config, root, file);
	}

	let failed = report.failures().count();
	println!();
	if dry_run {
		println!(
			"Dry run: rendered {} file(s), {failed} failed. No pages were written.",
			report.files.len() - failed
		);
	} else {
		println!(
			"Synced {} file(s): {} created, {} updated, {failed} failed.",
			report.files.len(),
			report.created_count(),
			report.updated_count()
		);
	}
}

fn print_file_report(args: &CsyncCli, config: &CsyncConfig, root: &Path, file: &FileReport) {
	let rel = make_relative(&file.file, root);
	let title = format!("{}{}", config.remote.title_prefix, file.concept_id);

	match &file.outcome {
		SyncOutcome::Created => {
			println!("  {} {title} ({rel})", colored!("created ", green));
		}
		SyncOutcome::Updated { version } => {
			println!(
				"  {} {title} ({rel}) version {version}",
				colored!("updated ", green)
			);
		}
		SyncOutcome::Rendered { markup } => {
			println!("  {} {title} ({rel})", colored!("rendered", yellow));
			if args.verbose {
				println!("{markup}");
			}
		}
		SyncOutcome::Failed { error } => {
			println!("  {} {rel}: {error}", colored!("failed  ", red));
		}
		_ => {}
	}
}
