use serde::Serialize;

use crate::ConceptRecord;
use crate::CsyncError;
use crate::CsyncResult;
use crate::config::AnchorConfig;
use crate::config::AnchorPolicy;
use crate::config::CsyncConfig;
use crate::config::MergeMode;

const BODY_OPEN: &str = "<ac:plain-text-body><![CDATA[";
const BODY_CLOSE: &str = "]]></ac:plain-text-body>";
const LINK_SEPARATOR: &str = ", ";
const FIELD_SEPARATOR: &str = " / ";

/// Sections of the template filled from a [`ConceptRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
	Body,
	Dependencies,
	Fields,
	Labels,
}

impl Section {
	pub fn name(self) -> &'static str {
		match self {
			Self::Body => "body",
			Self::Dependencies => "dependencies",
			Self::Fields => "storage fields",
			Self::Labels => "labels",
		}
	}

	/// Only the storage-fields and labels sections are subject to
	/// [`AnchorPolicy::Require`].
	fn is_policy_bound(self) -> bool {
		matches!(self, Self::Fields | Self::Labels)
	}
}

/// Renders a [`ConceptRecord`] into page markup.
#[derive(Debug, Clone)]
pub struct TemplateMerger {
	pub mode: MergeMode,
	pub policy: AnchorPolicy,
	pub anchors: AnchorConfig,
	/// Prepended to dependency tokens to form the linked page titles.
	pub title_prefix: String,
}

impl Default for TemplateMerger {
	fn default() -> Self {
		Self::from_config(&CsyncConfig::default())
	}
}

impl TemplateMerger {
	pub fn from_config(config: &CsyncConfig) -> Self {
		Self {
			mode: config.template.mode,
			policy: config.template.anchor_policy,
			anchors: config.template.anchors.clone(),
			title_prefix: config.remote.title_prefix.clone(),
		}
	}

	#[must_use]
	pub fn with_policy(mut self, policy: AnchorPolicy) -> Self {
		self.policy = policy;
		self
	}

	#[must_use]
	pub fn with_mode(mut self, mode: MergeMode) -> Self {
		self.mode = mode;
		self
	}

	/// Render `record` into `template`.
	pub fn render(&self, template: &str, record: &ConceptRecord) -> CsyncResult<String> {
		match self.mode {
			MergeMode::Anchors => self.splice_anchors(template, record),
			MergeMode::Placeholders => self.render_placeholders(template, record),
		}
	}

	/// Apply the four splices in order. Each one searches the output of the
	/// previous one.
	fn splice_anchors(&self, template: &str, record: &ConceptRecord) -> CsyncResult<String> {
		let mut markup = template.to_string();

		for section in [
			Section::Body,
			Section::Dependencies,
			Section::Fields,
			Section::Labels,
		] {
			let spliced = match section {
				Section::Body => insert_body(&markup, &self.anchors, record),
				Section::Dependencies => {
					splice_dependencies(&markup, &self.anchors, &self.title_prefix, record)
				}
				Section::Fields => splice_fields(&markup, &self.anchors, record),
				Section::Labels => splice_label(&markup, &self.anchors, record),
			};

			match spliced {
				Some(next) => {
					tracing::debug!(section = section.name(), "spliced template section");
					markup = next;
				}
				None => self.missing_anchor(section)?,
			}
		}

		Ok(markup)
	}

	fn missing_anchor(&self, section: Section) -> CsyncResult<()> {
		let anchor = match section {
			Section::Body => &self.anchors.macro_close,
			Section::Dependencies => &self.anchors.dependencies,
			Section::Fields => &self.anchors.fields,
			Section::Labels => &self.anchors.labels,
		};

		if !section.is_policy_bound() {
			tracing::debug!(
				section = section.name(),
				anchor = %anchor,
				"template anchor not found, section skipped"
			);
			return Ok(());
		}

		if self.policy == AnchorPolicy::Require {
			return Err(CsyncError::TemplateAnchorMissing {
				section: section.name().to_string(),
				anchor: anchor.clone(),
			});
		}

		tracing::warn!(
			section = section.name(),
			anchor = %anchor,
			"template anchor not found, section left unrendered"
		);

		Ok(())
	}

	fn render_placeholders(&self, template: &str, record: &ConceptRecord) -> CsyncResult<String> {
		let mut env = minijinja::Environment::new();
		env.set_keep_trailing_newline(true);
		env.add_template("__page__", template)
			.map_err(|e| CsyncError::TemplateRender(e.to_string()))?;

		let template = env
			.get_template("__page__")
			.map_err(|e| CsyncError::TemplateRender(e.to_string()))?;

		let context = PlaceholderContext {
			id: &record.id,
			body: record.calculation_text(),
			dependencies: &record.dependency_tokens,
			links: dependency_links(&self.title_prefix, &record.dependency_tokens),
			fields: storage_fields(record),
			primary_field: record.primary_field.as_deref(),
			secondary_field: record.secondary_field.as_deref(),
		};

		template
			.render(minijinja::Value::from_serialize(&context))
			.map_err(|e| CsyncError::TemplateRender(e.to_string()))
	}
}

/// Values available to `placeholders` templates.
#[derive(Serialize)]
struct PlaceholderContext<'a> {
	id: &'a str,
	body: String,
	dependencies: &'a [String],
	links: String,
	fields: String,
	primary_field: Option<&'a str>,
	secondary_field: Option<&'a str>,
}

/// Byte offset reached by advancing `count` characters from `start`, clamped
/// to the end of `text`.
fn advance_chars(text: &str, start: usize, count: usize) -> usize {
	text[start..]
		.char_indices()
		.nth(count)
		.map_or(text.len(), |(offset, _)| start + offset)
}

/// Byte offset just past the first occurrence of `anchor`.
fn anchor_end(text: &str, anchor: &str) -> Option<usize> {
	if anchor.is_empty() {
		return None;
	}

	text.find(anchor).map(|index| index + anchor.len())
}

/// Split every `]]>` in `text` so it can sit inside a single CDATA section.
pub fn cdata(text: &str) -> String {
	text.replace("]]>", "]]]]><![CDATA[>")
}

/// Insert the calculation body in front of the first macro closing tag.
pub fn insert_body(markup: &str, anchors: &AnchorConfig, record: &ConceptRecord) -> Option<String> {
	if anchors.macro_close.is_empty() {
		return None;
	}
	let (before, after) = markup.split_once(anchors.macro_close.as_str())?;

	let body = cdata(&record.calculation_text());
	Some(format!(
		"{before}{BODY_OPEN}{body}{BODY_CLOSE}{}{after}",
		anchors.macro_close
	))
}

/// One link to the page of a dependency.
pub fn dependency_link(title_prefix: &str, token: &str) -> String {
	format!(
		"<ac:link><ri:page ri:content-title=\"{title_prefix}{token}\" \
		 /><ac:plain-text-link-body><![CDATA[{token}]]></ac:plain-text-link-body></ac:link >"
	)
}

/// All dependency links joined with `", "`.
pub fn dependency_links(title_prefix: &str, tokens: &[String]) -> String {
	tokens
		.iter()
		.map(|token| dependency_link(title_prefix, token))
		.collect::<Vec<_>>()
		.join(LINK_SEPARATOR)
}

/// `primary / secondary`, or just `primary` (possibly empty) when there is no
/// secondary field.
pub fn storage_fields(record: &ConceptRecord) -> String {
	let mut fields = record.primary_field.clone().unwrap_or_default();
	if let Some(secondary) = &record.secondary_field {
		fields.push_str(FIELD_SEPARATOR);
		fields.push_str(secondary);
	}
	fields
}

/// Replace the fixed-width placeholder after the dependencies anchor with the
/// dependency links.
pub fn splice_dependencies(
	markup: &str,
	anchors: &AnchorConfig,
	title_prefix: &str,
	record: &ConceptRecord,
) -> Option<String> {
	let links = dependency_links(title_prefix, &record.dependency_tokens);
	replace_after(markup, &anchors.dependencies, 0, anchors.dependencies_skip, &links)
}

/// Replace the fixed-width placeholder after the storage-fields anchor.
pub fn splice_fields(markup: &str, anchors: &AnchorConfig, record: &ConceptRecord) -> Option<String> {
	replace_after(
		markup,
		&anchors.fields,
		0,
		anchors.fields_skip,
		&storage_fields(record),
	)
}

/// Keep the label prefix after the labels anchor and replace the suffix that
/// follows it with the concept id.
pub fn splice_label(markup: &str, anchors: &AnchorConfig, record: &ConceptRecord) -> Option<String> {
	replace_after(
		markup,
		&anchors.labels,
		anchors.label_prefix_width,
		anchors.label_suffix_width,
		&record.id,
	)
}

/// Find `anchor`, keep `keep` more characters, replace the next `width`
/// characters with `value`.
fn replace_after(markup: &str, anchor: &str, keep: usize, width: usize, value: &str) -> Option<String> {
	let end = anchor_end(markup, anchor)?;
	let insert_at = advance_chars(markup, end, keep);
	let resume_at = advance_chars(markup, insert_at, width);

	let mut spliced = String::with_capacity(markup.len() + value.len());
	spliced.push_str(&markup[..insert_at]);
	spliced.push_str(value);
	spliced.push_str(&markup[resume_at..]);
	Some(spliced)
}
