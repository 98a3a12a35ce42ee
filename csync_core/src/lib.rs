//! `csync_core` is the core library for csync. It extracts the calculation
//! logic and metadata embedded as `#region` blocks in source files and
//! renders them into Confluence storage markup, one page per concept.
//!
//! ## Processing Pipeline
//!
//! ```text
//! Source directory
//!   → list_sources (one entry per file, concept id from the file name)
//!   → Scanner (line state machine: constructor, dependencies, calculation)
//!   → ConceptRecord
//!   → TemplateMerger (splices the record into the template fetched once per run)
//!   → PageStore (find, then create or update the concept's page)
//! ```
//!
//! ## Modules
//!
//! - [`config`]: Loads `csync.toml`, covering the source directory,
//!   remote settings, template anchors, and pattern overrides.
//! - [`extractor`]: The line-oriented extraction state machine.
//! - [`merger`]: Anchor splicing and placeholder rendering.
//! - [`page_store`]: The page store and template source seams, with the
//!   Confluence REST client and an in-memory store.
//! - [`sync`]: Directory runs that keep going past per-file failures.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use csync_core::CsyncConfig;
//! use csync_core::page_store::ConfluenceClient;
//! use csync_core::sync::SyncOptions;
//! use csync_core::sync::run_sync;
//! use std::path::Path;
//!
//! let root = Path::new(".");
//! let config = CsyncConfig::load(root).unwrap().unwrap_or_default();
//! let client = ConfluenceClient::from_config(&config.remote).unwrap();
//!
//! let report = run_sync(root, &config, &client, &client, SyncOptions::default()).unwrap();
//! println!("{} created, {} updated", report.created_count(), report.updated_count());
//! ```

pub use config::*;
pub use error::*;
pub use extractor::*;
pub use merger::*;
pub use patterns::*;

pub mod config;
#[allow(unused_assignments)]
mod error;
pub mod extractor;
pub mod merger;
pub mod page_store;
mod patterns;
pub mod sync;

#[cfg(test)]
mod __fixtures;
