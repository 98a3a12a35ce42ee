use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;

#[derive(Parser)]
#[command(
	author,
	version,
	about = "Publish the calculation regions of concept source files as Confluence pages.",
	long_about = "csync reads one source file per concept, extracts its calculation region, \
	              dependencies and storage fields, merges them into a page template and \
	              creates or updates the concept's page.\n\nQuick start:\n  csync init     \
	              Create a csync.toml\n  csync extract  Show what a file yields\n  csync render   \
	              Preview the page markup of a file\n  csync sync     Push every concept page"
)]
pub struct CsyncCli {
	#[command(subcommand)]
	pub command: Option<Commands>,

	/// Path to the project root directory.
	#[arg(long, short, global = true)]
	pub path: Option<PathBuf>,

	/// Enable verbose output.
	#[arg(long, short, global = true, default_value_t = false)]
	pub verbose: bool,

	/// Disable colored output.
	#[arg(long, global = true, default_value_t = false)]
	pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
	/// Initialize csync in a project by creating a sample `csync.toml`.
	///
	/// If the file already exists, this command is a no-op and exits
	/// successfully.
	Init,
	/// Print what the extractor reads from a single source file.
	///
	/// Shows the concept id, dependency tokens, storage fields and the
	/// calculation region.
	Extract {
		/// The source file to read.
		file: PathBuf,

		/// Output format. Use `text` for human-readable output or `json` for
		/// programmatic consumption.
		#[arg(long, value_enum, default_value_t = OutputFormat::Text)]
		format: OutputFormat,
	},
	/// Render the page markup for a single source file.
	///
	/// Nothing is written to the page store. The template is read from
	/// `--template` when given, otherwise it is fetched from the configured
	/// remote.
	Render {
		/// The source file to render.
		file: PathBuf,

		/// Read the page template from this file instead of the remote.
		#[arg(long)]
		template: Option<PathBuf>,
	},
	/// Render every source file and create or update its page.
	///
	/// The template is fetched once per run. A file that fails is reported
	/// and the run continues with the next one. Exits with status 1 when any
	/// file failed.
	Sync {
		/// Render every file but skip all page lookups and writes.
		#[arg(long, default_value_t = false)]
		dry_run: bool,

		/// Read the page template from this file instead of the remote.
		#[arg(long)]
		template: Option<PathBuf>,
	},
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
	/// Human-readable text output.
	Text,
	/// JSON output for programmatic consumption.
	Json,
}
