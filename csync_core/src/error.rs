use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum CsyncError {
	#[error(transparent)]
	#[diagnostic(code(csync::io_error))]
	Io(#[from] std::io::Error),

	#[error("malformed source `{file}`: {reason}")]
	#[diagnostic(
		code(csync::malformed_source),
		help("the constructor region needs a `public` line with at least two comma separated values")
	)]
	MalformedSource { file: String, reason: String },

	#[error("template anchor `{anchor}` not found for the {section} section")]
	#[diagnostic(
		code(csync::template_anchor_missing),
		help("add the anchor to the template or set `anchor_policy = \"skip\"` in csync.toml")
	)]
	TemplateAnchorMissing { section: String, anchor: String },

	#[error("failed to fetch template `{id}`: {reason}")]
	#[diagnostic(
		code(csync::template_fetch),
		help("check `remote.template_id` and the credentials in csync.toml")
	)]
	TemplateFetch { id: String, reason: String },

	#[error("template rendering failed: {0}")]
	#[diagnostic(code(csync::template_render))]
	TemplateRender(String),

	#[error("remote {operation} failed for `{target}`: {reason}")]
	#[diagnostic(code(csync::remote_operation))]
	RemoteOperation {
		operation: String,
		target: String,
		reason: String,
	},

	#[error("failed to parse config file: {0}")]
	#[diagnostic(
		code(csync::config_parse),
		help("check that csync.toml is valid TOML with [source], [remote] and [template] sections")
	)]
	ConfigParse(String),

	#[error("missing configuration value `{0}`")]
	#[diagnostic(
		code(csync::missing_config),
		help("set the value in csync.toml (run `csync init` for a commented sample)")
	)]
	MissingConfig(String),

	#[error("invalid `{name}` pattern `{pattern}`: {reason}")]
	#[diagnostic(code(csync::invalid_pattern))]
	InvalidPattern {
		name: String,
		pattern: String,
		reason: String,
	},
}

impl CsyncError {
	pub(crate) fn remote(
		operation: &str,
		target: impl Into<String>,
		reason: impl ToString,
	) -> Self {
		Self::RemoteOperation {
			operation: operation.to_string(),
			target: target.into(),
			reason: reason.to_string(),
		}
	}
}

pub type CsyncResult<T> = Result<T, CsyncError>;
pub type AnyError = Box<dyn std::error::Error>;
pub type AnyEmptyResult = Result<(), AnyError>;
pub type AnyResult<T> = Result<T, AnyError>;
