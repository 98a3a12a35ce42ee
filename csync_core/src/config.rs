use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;

use crate::CsyncError;
use crate::CsyncResult;

/// Supported config file locations in discovery order (highest precedence
/// first).
pub const CONFIG_FILE_CANDIDATES: [&str; 3] = ["csync.toml", ".csync.toml", ".config/csync.toml"];

/// Environment variable that overrides `remote.api_token`.
pub const API_TOKEN_ENV: &str = "CSYNC_API_TOKEN";

/// Default request timeout for the remote page store, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration loaded from a `csync.toml` file.
///
/// ```toml
/// [source]
/// dir = "conceptos"
/// include = ["*.cs"]
/// exclude = ["*Base.cs"]
///
/// [remote]
/// base_url = "https://example.atlassian.net/wiki/rest/api/"
/// space = "CALC"
/// parent_page = "123456"
/// template_id = "98765"
/// user = "me@example.com"
///
/// [template]
/// mode = "anchors"
/// anchor_policy = "skip"
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct CsyncConfig {
	/// Where the source files live.
	#[serde(default)]
	pub source: SourceConfig,
	/// Remote page store settings.
	#[serde(default)]
	pub remote: RemoteConfig,
	/// How extracted records are merged into the template.
	#[serde(default)]
	pub template: TemplateConfig,
	/// Overrides for the extractor's recognition patterns.
	#[serde(default)]
	pub patterns: PatternConfig,
}

/// The directory holding one source file per concept.
#[derive(Debug, Deserialize)]
pub struct SourceConfig {
	/// Directory relative to the project root. Only its direct children are
	/// processed.
	#[serde(default = "default_source_dir")]
	pub dir: PathBuf,
	/// Glob patterns matched against file names. Empty means every file.
	#[serde(default)]
	pub include: Vec<String>,
	/// Gitignore-style patterns for files to skip.
	#[serde(default)]
	pub exclude: Vec<String>,
}

impl Default for SourceConfig {
	fn default() -> Self {
		Self {
			dir: default_source_dir(),
			include: Vec::new(),
			exclude: Vec::new(),
		}
	}
}

fn default_source_dir() -> PathBuf {
	PathBuf::from(".")
}

/// Connection settings for the Confluence page store.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
	/// REST API root, including the trailing slash
	/// (`https://host/wiki/rest/api/`).
	pub base_url: Option<String>,
	/// Space key pages are searched and created in.
	pub space: Option<String>,
	/// Page id new pages are created under.
	pub parent_page: Option<String>,
	/// Id of the template whose storage body is merged for every concept.
	pub template_id: Option<String>,
	pub user: Option<String>,
	pub api_token: Option<String>,
	#[serde(default = "default_user_agent")]
	pub user_agent: String,
	/// Prefix of page view links printed after an update.
	pub view_url: Option<String>,
	/// Prepended to the concept id to form page titles.
	#[serde(default = "default_title_prefix")]
	pub title_prefix: String,
	#[serde(default = "default_timeout_secs")]
	pub timeout_secs: u64,
}

impl Default for RemoteConfig {
	fn default() -> Self {
		Self {
			base_url: None,
			space: None,
			parent_page: None,
			template_id: None,
			user: None,
			api_token: None,
			user_agent: default_user_agent(),
			view_url: None,
			title_prefix: default_title_prefix(),
			timeout_secs: default_timeout_secs(),
		}
	}
}

impl RemoteConfig {
	/// The API token, preferring [`API_TOKEN_ENV`] over the config file.
	pub fn api_token(&self) -> Option<String> {
		std::env::var(API_TOKEN_ENV)
			.ok()
			.filter(|token| !token.is_empty())
			.or_else(|| self.api_token.clone())
	}

	/// Return a required value or a [`CsyncError::MissingConfig`] naming it.
	pub fn require<'a>(value: Option<&'a String>, key: &str) -> CsyncResult<&'a str> {
		value
			.map(String::as_str)
			.filter(|value| !value.is_empty())
			.ok_or_else(|| CsyncError::MissingConfig(format!("remote.{key}")))
	}
}

fn default_user_agent() -> String {
	format!("csync/{}", env!("CARGO_PKG_VERSION"))
}

fn default_title_prefix() -> String {
	"Concepto ".to_string()
}

fn default_timeout_secs() -> u64 {
	DEFAULT_TIMEOUT_SECS
}

/// Selects how the template is filled.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum MergeMode {
	/// Literal anchors followed by fixed-width placeholders.
	#[default]
	Anchors,
	/// Named `{{ ... }}` placeholders rendered by minijinja.
	Placeholders,
}

/// What happens when the storage-fields or labels anchor is absent.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum AnchorPolicy {
	/// Leave the section unrendered and log a warning.
	#[default]
	Skip,
	/// Fail the file with [`CsyncError::TemplateAnchorMissing`].
	Require,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TemplateConfig {
	#[serde(default)]
	pub mode: MergeMode,
	#[serde(default)]
	pub anchor_policy: AnchorPolicy,
	#[serde(default)]
	pub anchors: AnchorConfig,
}

/// Literal anchors searched in the template and the fixed character widths
/// skipped after them.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AnchorConfig {
	/// Closing tag of the code macro that receives the calculation body.
	pub macro_close: String,
	pub dependencies: String,
	/// Width of the placeholder that follows the dependencies anchor.
	pub dependencies_skip: usize,
	pub fields: String,
	/// Width of the placeholder that follows the storage-fields anchor.
	pub fields_skip: usize,
	pub labels: String,
	/// Width of the label prefix kept after the labels anchor (`concepto_`).
	pub label_prefix_width: usize,
	/// Width of the label suffix replaced by the concept id.
	pub label_suffix_width: usize,
}

impl Default for AnchorConfig {
	fn default() -> Self {
		Self {
			macro_close: "</ac:structured-macro>".to_string(),
			dependencies: "Conceptos que usa</strong></p></th><td>".to_string(),
			dependencies_skip: 5,
			fields: "Campos BBDD (G / A)</strong></p></th><td>".to_string(),
			fields_skip: 5,
			labels: "<ac:parameter ac:name=\"labels\">".to_string(),
			label_prefix_width: 9,
			label_suffix_width: 5,
		}
	}
}

/// Regular expressions recognising the regions of a source file. They are
/// compiled case-insensitively by [`PatternSet`](crate::PatternSet).
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PatternConfig {
	pub constructor: String,
	pub dependency: String,
	pub calculation: String,
	pub region_start: String,
	pub region_end: String,
}

impl Default for PatternConfig {
	fn default() -> Self {
		Self {
			constructor: "#region Constructor".to_string(),
			dependency: "typeof".to_string(),
			calculation: "#region C.+lculo".to_string(),
			region_start: "#region".to_string(),
			region_end: "#endregion".to_string(),
		}
	}
}

impl CsyncConfig {
	/// Resolve the config file path by checking supported candidates in
	/// precedence order.
	pub fn resolve_path(root: &Path) -> Option<PathBuf> {
		CONFIG_FILE_CANDIDATES
			.iter()
			.map(|candidate| root.join(candidate))
			.find(|path| path.is_file())
	}

	/// Load configuration from the first supported config file under `root`.
	/// Returns `None` if none of the candidates exist.
	pub fn load(root: &Path) -> CsyncResult<Option<CsyncConfig>> {
		let Some(config_path) = Self::resolve_path(root) else {
			return Ok(None);
		};

		let content = std::fs::read_to_string(&config_path)?;
		let config: CsyncConfig =
			toml::from_str(&content).map_err(|e| CsyncError::ConfigParse(e.to_string()))?;

		Ok(Some(config))
	}

	/// Absolute directory holding the source files.
	pub fn source_dir(&self, root: &Path) -> PathBuf {
		root.join(&self.source.dir)
	}
}
