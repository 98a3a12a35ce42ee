use std::io::BufRead;
use std::io::BufReader;
use std::path::Path;

use serde::Serialize;

use crate::CsyncError;
use crate::CsyncResult;
use crate::PatternSet;

/// Marker of the constructor line that carries the persisted fields.
const PUBLIC_MARKER: &str = "public";

/// Constructor argument value meaning "no field".
const EMPTY_FIELD_SENTINEL: &str = "string.Empty";

/// Everything extracted from one source file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConceptRecord {
	/// Concept identifier from the constructor. Empty when the file has no
	/// constructor region.
	pub id: String,
	/// Lines of the calculation region, verbatim including their line
	/// terminators.
	pub calculation_lines: Vec<String>,
	/// Dependency tokens in source order. Duplicates are kept.
	pub dependency_tokens: Vec<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub primary_field: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub secondary_field: Option<String>,
}

impl ConceptRecord {
	/// The calculation region as a single string.
	pub fn calculation_text(&self) -> String {
		self.calculation_lines.concat()
	}
}

/// State of the line scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
	Scanning,
	/// Seeking the constructor's `public` line.
	InConstructor,
	/// Inside a run of dependency lines.
	InDependencies,
	/// Copying the calculation region. `depth` counts the nested regions
	/// currently open inside it.
	InCalculation { depth: usize },
}

/// Line-at-a-time extraction state machine.
///
/// Feed every line of a file (with its terminator) to [`Scanner::feed`] and
/// call [`Scanner::finish`] at end of input. This is a lexical scan: region
/// markers are recognised by the [`PatternSet`] wherever they appear, and the
/// host language grammar is never checked.
#[derive(Debug)]
pub struct Scanner<'p> {
	patterns: &'p PatternSet,
	source: String,
	state: ScanState,
	record: ConceptRecord,
}

impl<'p> Scanner<'p> {
	pub fn new(patterns: &'p PatternSet, source: impl Into<String>) -> Self {
		Self {
			patterns,
			source: source.into(),
			state: ScanState::Scanning,
			record: ConceptRecord::default(),
		}
	}

	pub fn state(&self) -> ScanState {
		self.state
	}

	/// The record accumulated so far.
	pub fn record(&self) -> &ConceptRecord {
		&self.record
	}

	/// Process one line.
	pub fn feed(&mut self, line: &str) -> CsyncResult<()> {
		match self.state {
			ScanState::InConstructor => {
				let trimmed = line.trim();
				if trimmed.contains(PUBLIC_MARKER) {
					self.read_constructor_fields(trimmed)?;
					self.state = ScanState::Scanning;
				}
				Ok(())
			}
			ScanState::InDependencies => {
				if self.patterns.dependency.is_match(line) {
					self.harvest_dependencies(line.trim());
					return Ok(());
				}

				// The line ending the run goes through the rules again.
				self.state = ScanState::Scanning;
				self.dispatch(line);
				Ok(())
			}
			ScanState::Scanning | ScanState::InCalculation { .. } => {
				self.dispatch(line);
				Ok(())
			}
		}
	}

	/// Finish the scan and return the extracted record.
	pub fn finish(self) -> CsyncResult<ConceptRecord> {
		if self.state == ScanState::InConstructor {
			return Err(CsyncError::MalformedSource {
				file: self.source,
				reason: format!(
					"reached end of file before the constructor's `{PUBLIC_MARKER}` line"
				),
			});
		}

		if let ScanState::InCalculation { depth } = self.state {
			tracing::debug!(
				source = %self.source,
				depth,
				"calculation region left open at end of file"
			);
		}

		Ok(self.record)
	}

	fn dispatch(&mut self, line: &str) {
		if let ScanState::InCalculation { depth } = self.state {
			self.step_calculation(line, depth);
			return;
		}

		if self.patterns.constructor.is_match(line) {
			tracing::debug!(source = %self.source, "entering constructor region");
			self.state = ScanState::InConstructor;
		} else if self.patterns.dependency.is_match(line) {
			self.state = ScanState::InDependencies;
			self.harvest_dependencies(line.trim());
		} else if self.patterns.calculation.is_match(line) {
			tracing::debug!(source = %self.source, "entering calculation region");
			self.state = ScanState::InCalculation { depth: 0 };
		}
	}

	fn step_calculation(&mut self, line: &str, depth: usize) {
		if self.patterns.region_start.is_match(line) {
			self.state = ScanState::InCalculation { depth: depth + 1 };
		} else if self.patterns.region_end.is_match(line) {
			if depth == 0 {
				tracing::debug!(source = %self.source, "leaving calculation region");
				self.state = ScanState::Scanning;
				return;
			}
			self.state = ScanState::InCalculation { depth: depth - 1 };
		}

		self.record.calculation_lines.push(line.to_string());
	}

	fn harvest_dependencies(&mut self, line: &str) {
		let tokens = self.patterns.dependency_tokens(line).map(str::to_string);
		self.record.dependency_tokens.extend(tokens);
	}

	fn read_constructor_fields(&mut self, line: &str) -> CsyncResult<()> {
		let columns: Vec<&str> = line.split(',').collect();
		let Some(id_column) = columns.get(1) else {
			return Err(CsyncError::MalformedSource {
				file: self.source.clone(),
				reason: format!("constructor line has no identifier column: `{line}`"),
			});
		};

		self.record.id = strip_enclosing(id_column.trim()).to_string();
		self.record.primary_field = columns.get(3).copied().and_then(storage_field);
		self.record.secondary_field = columns.get(4).copied().and_then(storage_field);

		tracing::debug!(
			source = %self.source,
			id = %self.record.id,
			"read constructor fields"
		);

		Ok(())
	}
}

/// Drop the first and last character (the quotes around the identifier).
fn strip_enclosing(value: &str) -> &str {
	let mut chars = value.chars();
	chars.next();
	chars.next_back();
	chars.as_str()
}

fn storage_field(column: &str) -> Option<String> {
	if column.contains(EMPTY_FIELD_SENTINEL) {
		return None;
	}

	Some(sanitize_field(column))
}

/// Keep only ASCII letters, digits and underscores.
pub fn sanitize_field(value: &str) -> String {
	value
		.chars()
		.filter(|c| c.is_ascii_alphanumeric() || *c == '_')
		.collect()
}

/// Extract a [`ConceptRecord`] from a line stream. `source` names the input in
/// errors and logs.
pub fn extract<R: BufRead>(
	mut reader: R,
	source: &str,
	patterns: &PatternSet,
) -> CsyncResult<ConceptRecord> {
	let mut scanner = Scanner::new(patterns, source);
	let mut line = String::new();

	loop {
		line.clear();
		if reader.read_line(&mut line)? == 0 {
			break;
		}
		scanner.feed(&line)?;
	}

	scanner.finish()
}

/// Extract a [`ConceptRecord`] from in-memory content.
pub fn extract_str(content: &str, source: &str, patterns: &PatternSet) -> CsyncResult<ConceptRecord> {
	extract(content.as_bytes(), source, patterns)
}

/// Extract a [`ConceptRecord`] from a file on disk.
pub fn extract_file(path: &Path, patterns: &PatternSet) -> CsyncResult<ConceptRecord> {
	let file = std::fs::File::open(path)?;
	extract(BufReader::new(file), &path.display().to_string(), patterns)
}
