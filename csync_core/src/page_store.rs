use std::cell::Cell;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::blocking::RequestBuilder;
use serde::Deserialize;
use serde::Serialize;
use serde_json::json;

use crate::CsyncError;
use crate::CsyncResult;
use crate::config::RemoteConfig;

/// An existing page in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageHandle {
	pub id: String,
	pub title: String,
	/// Current version number. Updates write `version + 1`.
	pub version: u64,
}

/// Where the page template comes from. Read once per run.
pub trait TemplateSource {
	fn fetch_template(&self) -> CsyncResult<String>;
}

/// The remote document system holding one page per concept.
pub trait PageStore {
	/// Look up the page of `concept_id`.
	fn find_page(&self, concept_id: &str) -> CsyncResult<Option<PageHandle>>;
	/// Create the page of `concept_id` under the configured parent.
	fn create_page(&self, concept_id: &str, markup: &str) -> CsyncResult<()>;
	/// Overwrite `page` with `markup`, bumping its version by one.
	fn update_page(&self, page: &PageHandle, markup: &str) -> CsyncResult<()>;
}

/// Reads the template from a local file.
#[derive(Debug, Clone)]
pub struct FileTemplateSource {
	path: PathBuf,
}

impl FileTemplateSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}
}

impl TemplateSource for FileTemplateSource {
	fn fetch_template(&self) -> CsyncResult<String> {
		std::fs::read_to_string(&self.path).map_err(|e| {
			CsyncError::TemplateFetch {
				id: self.path.display().to_string(),
				reason: e.to_string(),
			}
		})
	}
}

/// Confluence REST client.
#[derive(Debug)]
pub struct ConfluenceClient {
	client: Client,
	base_url: String,
	space: String,
	parent_page: String,
	template_id: String,
	user: String,
	api_token: String,
	title_prefix: String,
	view_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
	size: usize,
	results: Vec<PageSummary>,
}

#[derive(Debug, Deserialize)]
struct PageSummary {
	id: String,
	title: String,
	#[serde(default)]
	version: Option<VersionInfo>,
}

#[derive(Debug, Deserialize)]
struct VersionInfo {
	number: u64,
}

#[derive(Debug, Deserialize)]
struct TemplateResponse {
	body: TemplateBody,
}

#[derive(Debug, Deserialize)]
struct TemplateBody {
	storage: StorageValue,
}

#[derive(Debug, Deserialize)]
struct StorageValue {
	value: String,
}

impl ConfluenceClient {
	pub fn from_config(config: &RemoteConfig) -> CsyncResult<Self> {
		let api_token = config
			.api_token()
			.ok_or_else(|| CsyncError::MissingConfig("remote.api_token".to_string()))?;

		let client = Client::builder()
			.timeout(Duration::from_secs(config.timeout_secs))
			.user_agent(config.user_agent.clone())
			.build()
			.map_err(|e| CsyncError::remote("client setup", "http client", e))?;

		Ok(Self {
			client,
			base_url: RemoteConfig::require(config.base_url.as_ref(), "base_url")?.to_string(),
			space: RemoteConfig::require(config.space.as_ref(), "space")?.to_string(),
			parent_page: RemoteConfig::require(config.parent_page.as_ref(), "parent_page")?
				.to_string(),
			template_id: RemoteConfig::require(config.template_id.as_ref(), "template_id")?
				.to_string(),
			user: RemoteConfig::require(config.user.as_ref(), "user")?.to_string(),
			api_token,
			title_prefix: config.title_prefix.clone(),
			view_url: config.view_url.clone(),
		})
	}

	/// Title of the page holding `concept_id`.
	pub fn page_title(&self, concept_id: &str) -> String {
		format!("{}{concept_id}", self.title_prefix)
	}

	fn url(&self, path: &str) -> String {
		format!("{}{path}", self.base_url)
	}

	fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
		request.basic_auth(&self.user, Some(&self.api_token))
	}

	/// Current version of a page whose search result carried none.
	fn page_version(&self, page_id: &str) -> CsyncResult<u64> {
		let response = self
			.authorized(self.client.get(self.url(&format!("content/{page_id}"))))
			.query(&[("expand", "version")])
			.send()
			.and_then(reqwest::blocking::Response::error_for_status)
			.map_err(|e| CsyncError::remote("page info", page_id, e))?;

		let summary: PageSummary = response
			.json()
			.map_err(|e| CsyncError::remote("page info", page_id, e))?;

		summary
			.version
			.map(|version| version.number)
			.ok_or_else(|| CsyncError::remote("page info", page_id, "response has no version"))
	}
}

impl TemplateSource for ConfluenceClient {
	fn fetch_template(&self) -> CsyncResult<String> {
		let fetch_error = |reason: String| {
			CsyncError::TemplateFetch {
				id: self.template_id.clone(),
				reason,
			}
		};

		let response = self
			.authorized(
				self.client
					.get(self.url(&format!("template/{}", self.template_id))),
			)
			.send()
			.and_then(reqwest::blocking::Response::error_for_status)
			.map_err(|e| fetch_error(e.to_string()))?;

		let template: TemplateResponse = response.json().map_err(|e| fetch_error(e.to_string()))?;
		tracing::debug!(template_id = %self.template_id, "fetched page template");

		Ok(template.body.storage.value)
	}
}

impl PageStore for ConfluenceClient {
	fn find_page(&self, concept_id: &str) -> CsyncResult<Option<PageHandle>> {
		let title = self.page_title(concept_id);
		let response = self
			.authorized(self.client.get(self.url("content")))
			.query(&[
				("spaceKey", self.space.as_str()),
				("title", title.as_str()),
				("expand", "version"),
			])
			.send()
			.map_err(|e| CsyncError::remote("search", &title, e))?;

		if response.status() == StatusCode::NOT_FOUND {
			return Ok(None);
		}

		let search: SearchResponse = response
			.error_for_status()
			.and_then(|response| response.json::<SearchResponse>())
			.map_err(|e| CsyncError::remote("search", &title, e))?;

		if search.size == 0 {
			return Ok(None);
		}

		let Some(page) = search.results.into_iter().next() else {
			return Ok(None);
		};

		let version = match page.version {
			Some(version) => version.number,
			None => self.page_version(&page.id)?,
		};

		Ok(Some(PageHandle {
			id: page.id,
			title: page.title,
			version,
		}))
	}

	fn create_page(&self, concept_id: &str, markup: &str) -> CsyncResult<()> {
		let title = self.page_title(concept_id);
		let payload = json!({
			"type": "page",
			"title": title,
			"ancestors": [{ "type": "page", "id": self.parent_page }],
			"space": { "key": self.space },
			"body": {
				"storage": {
					"representation": "storage",
					"value": markup,
				}
			}
		});

		self.authorized(self.client.post(self.url("content/")))
			.json(&payload)
			.send()
			.and_then(reqwest::blocking::Response::error_for_status)
			.map_err(|e| CsyncError::remote("create", &title, e))?;

		tracing::info!(%title, "page created");
		Ok(())
	}

	fn update_page(&self, page: &PageHandle, markup: &str) -> CsyncResult<()> {
		let payload = json!({
			"id": page.id,
			"type": "page",
			"title": page.title,
			"version": { "number": page.version + 1 },
			"body": {
				"storage": {
					"representation": "storage",
					"value": markup,
				}
			}
		});

		self.authorized(self.client.put(self.url(&format!("content/{}", page.id))))
			.json(&payload)
			.send()
			.and_then(reqwest::blocking::Response::error_for_status)
			.map_err(|e| CsyncError::remote("update", &page.title, e))?;

		match &self.view_url {
			Some(view_url) => {
				tracing::info!(title = %page.title, url = %format!("{view_url}{}", page.id), "page updated");
			}
			None => tracing::info!(title = %page.title, "page updated"),
		}

		Ok(())
	}
}

/// A page held by [`MemoryPageStore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredPage {
	pub id: String,
	pub version: u64,
	pub markup: String,
}

/// In-process page store. Pages are keyed by title.
#[derive(Debug)]
pub struct MemoryPageStore {
	title_prefix: String,
	template: Option<String>,
	pages: RefCell<BTreeMap<String, StoredPage>>,
	next_id: Cell<u64>,
	failing: BTreeSet<String>,
}

impl Default for MemoryPageStore {
	fn default() -> Self {
		Self::new("Concepto ")
	}
}

impl MemoryPageStore {
	pub fn new(title_prefix: impl Into<String>) -> Self {
		Self {
			title_prefix: title_prefix.into(),
			template: None,
			pages: RefCell::new(BTreeMap::new()),
			next_id: Cell::new(1),
			failing: BTreeSet::new(),
		}
	}

	/// Serve `template` from [`TemplateSource::fetch_template`].
	#[must_use]
	pub fn with_template(mut self, template: impl Into<String>) -> Self {
		self.template = Some(template.into());
		self
	}

	/// Make every operation on `concept_id` fail with
	/// [`CsyncError::RemoteOperation`].
	#[must_use]
	pub fn failing_for(mut self, concept_id: impl Into<String>) -> Self {
		self.failing.insert(concept_id.into());
		self
	}

	pub fn page_title(&self, concept_id: &str) -> String {
		format!("{}{concept_id}", self.title_prefix)
	}

	/// The page stored under `title`.
	pub fn page(&self, title: &str) -> Option<StoredPage> {
		self.pages.borrow().get(title).cloned()
	}

	/// Titles of every stored page, sorted.
	pub fn titles(&self) -> Vec<String> {
		self.pages.borrow().keys().cloned().collect()
	}

	fn check_failing(&self, operation: &str, concept_id: &str) -> CsyncResult<()> {
		if self.failing.contains(concept_id) {
			return Err(CsyncError::remote(
				operation,
				self.page_title(concept_id),
				"rejected by the store",
			));
		}
		Ok(())
	}
}

impl TemplateSource for MemoryPageStore {
	fn fetch_template(&self) -> CsyncResult<String> {
		self.template.clone().ok_or_else(|| {
			CsyncError::TemplateFetch {
				id: "memory".to_string(),
				reason: "no template configured".to_string(),
			}
		})
	}
}

impl PageStore for MemoryPageStore {
	fn find_page(&self, concept_id: &str) -> CsyncResult<Option<PageHandle>> {
		self.check_failing("search", concept_id)?;
		let title = self.page_title(concept_id);
		let pages = self.pages.borrow();

		Ok(pages.get(&title).map(|page| {
			PageHandle {
				id: page.id.clone(),
				title: title.clone(),
				version: page.version,
			}
		}))
	}

	fn create_page(&self, concept_id: &str, markup: &str) -> CsyncResult<()> {
		self.check_failing("create", concept_id)?;
		let id = self.next_id.get();
		self.next_id.set(id + 1);

		self.pages.borrow_mut().insert(
			self.page_title(concept_id),
			StoredPage {
				id: id.to_string(),
				version: 1,
				markup: markup.to_string(),
			},
		);
		Ok(())
	}

	fn update_page(&self, page: &PageHandle, markup: &str) -> CsyncResult<()> {
		let mut pages = self.pages.borrow_mut();
		let Some(stored) = pages.get_mut(&page.title) else {
			return Err(CsyncError::remote("update", &page.title, "page does not exist"));
		};

		stored.version = page.version + 1;
		stored.markup = markup.to_string();
		Ok(())
	}
}
