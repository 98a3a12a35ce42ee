use std::sync::LazyLock;

use regex::Regex;
use regex::RegexBuilder;

use crate::CsyncError;
use crate::CsyncResult;
use crate::config::PatternConfig;

/// Tokens harvested from dependency lines: an optional `G` followed by
/// digits.
static DEPENDENCY_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"G?[0-9]+").unwrap_or_else(|e| panic!("invalid dependency token pattern: {e}"))
});

/// The recognition patterns used by the extractor. All of them are searched
/// (not anchored) and case-insensitive.
#[derive(Debug, Clone)]
pub struct PatternSet {
	pub constructor: Regex,
	pub dependency: Regex,
	pub calculation: Regex,
	pub region_start: Regex,
	pub region_end: Regex,
}

impl PatternSet {
	pub fn new(config: &PatternConfig) -> CsyncResult<Self> {
		Ok(Self {
			constructor: build("constructor", &config.constructor)?,
			dependency: build("dependency", &config.dependency)?,
			calculation: build("calculation", &config.calculation)?,
			region_start: build("region_start", &config.region_start)?,
			region_end: build("region_end", &config.region_end)?,
		})
	}

	/// Every `G?[0-9]+` token in `line`, in order of appearance.
	pub fn dependency_tokens<'a>(&self, line: &'a str) -> impl Iterator<Item = &'a str> {
		DEPENDENCY_TOKEN.find_iter(line).map(|m| m.as_str())
	}
}

impl Default for PatternSet {
	fn default() -> Self {
		Self::new(&PatternConfig::default())
			.unwrap_or_else(|e| panic!("built-in patterns failed to compile: {e}"))
	}
}

fn build(name: &str, pattern: &str) -> CsyncResult<Regex> {
	RegexBuilder::new(pattern)
		.case_insensitive(true)
		.build()
		.map_err(|e| {
			CsyncError::InvalidPattern {
				name: name.to_string(),
				pattern: pattern.to_string(),
				reason: e.to_string(),
			}
		})
}
