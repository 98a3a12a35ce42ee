use std::path::Path;
use std::path::PathBuf;

use globset::Glob;
use globset::GlobSet;
use globset::GlobSetBuilder;
use ignore::gitignore::Gitignore;
use ignore::gitignore::GitignoreBuilder;

use crate::ConceptRecord;
use crate::CsyncError;
use crate::CsyncResult;
use crate::PatternSet;
use crate::TemplateMerger;
use crate::config::CsyncConfig;
use crate::extractor::extract_file;
use crate::page_store::PageStore;
use crate::page_store::TemplateSource;

/// Characters stripped from the front of a file name to get its concept id.
const FILE_NAME_PREFIX_LEN: usize = 1;
/// Characters stripped from the end of a file name (the `.cs` extension).
const FILE_NAME_SUFFIX_LEN: usize = 3;

/// A source file and the concept it describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
	pub path: PathBuf,
	pub file_name: String,
	pub concept_id: String,
}

impl SourceEntry {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		let path = path.into();
		let file_name = path
			.file_name()
			.map(|name| name.to_string_lossy().into_owned())
			.unwrap_or_default();
		let concept_id = concept_id_from_file_name(&file_name);

		Self {
			path,
			file_name,
			concept_id,
		}
	}
}

/// Strip the one-character prefix and three-character suffix from a file
/// name: `C1234.cs` → `1234`. Names too short to strip give an empty id.
pub fn concept_id_from_file_name(file_name: &str) -> String {
	let count = file_name.chars().count();
	if count <= FILE_NAME_PREFIX_LEN + FILE_NAME_SUFFIX_LEN {
		return String::new();
	}

	file_name
		.chars()
		.skip(FILE_NAME_PREFIX_LEN)
		.take(count - FILE_NAME_PREFIX_LEN - FILE_NAME_SUFFIX_LEN)
		.collect()
}

fn build_glob_set(patterns: &[String]) -> CsyncResult<GlobSet> {
	let mut builder = GlobSetBuilder::new();
	for pattern in patterns {
		let glob = Glob::new(pattern).map_err(|e| {
			CsyncError::InvalidPattern {
				name: "source.include".to_string(),
				pattern: pattern.clone(),
				reason: e.to_string(),
			}
		})?;
		builder.add(glob);
	}

	builder.build().map_err(|e| {
		CsyncError::InvalidPattern {
			name: "source.include".to_string(),
			pattern: patterns.join(", "),
			reason: e.to_string(),
		}
	})
}

/// Build a `Gitignore` matcher from the `source.exclude` patterns.
fn build_exclude_matcher(dir: &Path, patterns: &[String]) -> CsyncResult<Gitignore> {
	let mut builder = GitignoreBuilder::new(dir);
	for pattern in patterns {
		builder.add_line(None, pattern).map_err(|e| {
			CsyncError::InvalidPattern {
				name: "source.exclude".to_string(),
				pattern: pattern.clone(),
				reason: e.to_string(),
			}
		})?;
	}

	builder.build().map_err(|e| {
		CsyncError::InvalidPattern {
			name: "source.exclude".to_string(),
			pattern: patterns.join(", "),
			reason: e.to_string(),
		}
	})
}

/// List the files directly inside `dir`, sorted by name. When `include` is
/// non-empty only file names matching one of its globs are returned; names
/// matching an `exclude` pattern are always skipped.
pub fn list_sources(dir: &Path, include: &[String], exclude: &[String]) -> CsyncResult<Vec<SourceEntry>> {
	let include_set = build_glob_set(include)?;
	let exclude_matcher = build_exclude_matcher(dir, exclude)?;
	let mut entries = Vec::new();

	for entry in std::fs::read_dir(dir)? {
		let entry = entry?;
		if !entry.file_type()?.is_file() {
			continue;
		}

		let source = SourceEntry::new(entry.path());
		if !include.is_empty() && !include_set.is_match(&source.file_name) {
			continue;
		}
		if exclude_matcher.matched(&source.path, false).is_ignore() {
			tracing::debug!(file = %source.file_name, "excluded source file");
			continue;
		}

		entries.push(source);
	}

	// Sort for deterministic ordering.
	entries.sort_by(|a, b| a.file_name.cmp(&b.file_name));
	Ok(entries)
}

/// Extractor and merger configured for one run.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
	pub patterns: PatternSet,
	pub merger: TemplateMerger,
}

impl Pipeline {
	pub fn from_config(config: &CsyncConfig) -> CsyncResult<Self> {
		Ok(Self {
			patterns: PatternSet::new(&config.patterns)?,
			merger: TemplateMerger::from_config(config),
		})
	}

	pub fn extract(&self, path: &Path) -> CsyncResult<ConceptRecord> {
		extract_file(path, &self.patterns)
	}

	/// Extract `path` and render it into `template`.
	pub fn render_file(&self, path: &Path, template: &str) -> CsyncResult<(ConceptRecord, String)> {
		let record = self.extract(path)?;
		let markup = self.merger.render(template, &record)?;
		Ok((record, markup))
	}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
	/// Render every file but skip all page store calls.
	pub dry_run: bool,
}

/// What happened to one source file.
#[derive(Debug)]
#[non_exhaustive]
pub enum SyncOutcome {
	Created,
	/// The page existed and now has `version`.
	Updated { version: u64 },
	/// Dry run: the markup that would have been pushed.
	Rendered { markup: String },
	Failed { error: CsyncError },
}

#[derive(Debug)]
pub struct FileReport {
	pub file: PathBuf,
	pub concept_id: String,
	pub outcome: SyncOutcome,
}

/// Result of processing a directory of source files.
#[derive(Debug, Default)]
pub struct SyncReport {
	pub files: Vec<FileReport>,
}

impl SyncReport {
	/// Returns true if no file failed.
	pub fn is_ok(&self) -> bool {
		self.failures().next().is_none()
	}

	pub fn failures(&self) -> impl Iterator<Item = &FileReport> {
		self.files
			.iter()
			.filter(|report| matches!(report.outcome, SyncOutcome::Failed { .. }))
	}

	pub fn created_count(&self) -> usize {
		self.files
			.iter()
			.filter(|report| matches!(report.outcome, SyncOutcome::Created))
			.count()
	}

	pub fn updated_count(&self) -> usize {
		self.files
			.iter()
			.filter(|report| matches!(report.outcome, SyncOutcome::Updated { .. }))
			.count()
	}
}

/// Render every source and push it to `store`. A failing file is recorded in
/// the report and the run moves on to the next one.
pub fn sync_sources(
	pipeline: &Pipeline,
	sources: &[SourceEntry],
	template: &str,
	store: &dyn PageStore,
	options: SyncOptions,
) -> SyncReport {
	let mut report = SyncReport::default();

	for source in sources {
		let outcome = match sync_source(pipeline, source, template, store, options) {
			Ok(outcome) => outcome,
			Err(error) => {
				tracing::warn!(
					file = %source.file_name,
					concept = %source.concept_id,
					%error,
					"failed to sync source file"
				);
				SyncOutcome::Failed { error }
			}
		};

		report.files.push(FileReport {
			file: source.path.clone(),
			concept_id: source.concept_id.clone(),
			outcome,
		});
	}

	report
}

fn sync_source(
	pipeline: &Pipeline,
	source: &SourceEntry,
	template: &str,
	store: &dyn PageStore,
	options: SyncOptions,
) -> CsyncResult<SyncOutcome> {
	let (_, markup) = pipeline.render_file(&source.path, template)?;

	if options.dry_run {
		return Ok(SyncOutcome::Rendered { markup });
	}

	match store.find_page(&source.concept_id)? {
		Some(page) => {
			store.update_page(&page, &markup)?;
			Ok(SyncOutcome::Updated {
				version: page.version + 1,
			})
		}
		None => {
			store.create_page(&source.concept_id, &markup)?;
			Ok(SyncOutcome::Created)
		}
	}
}

/// Run a whole synchronization: list the configured source directory, fetch
/// the template once, then sync every file. Listing and template errors abort
/// the run; per-file errors end up in the report.
pub fn run_sync(
	root: &Path,
	config: &CsyncConfig,
	templates: &dyn TemplateSource,
	store: &dyn PageStore,
	options: SyncOptions,
) -> CsyncResult<SyncReport> {
	let pipeline = Pipeline::from_config(config)?;
	let sources = list_sources(
		&config.source_dir(root),
		&config.source.include,
		&config.source.exclude,
	)?;
	tracing::info!(count = sources.len(), "found source files");

	let template = templates.fetch_template()?;

	Ok(sync_sources(&pipeline, &sources, &template, store, options))
}
