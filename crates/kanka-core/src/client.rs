//! The campaign facade.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::Result;
use crate::executor::{ApiPath, RequestExecutor};
use crate::manager::{EntityManager, GalleryManager, parse_one, parse_page};
use crate::pagination::{Pagination, PaginationSlot};
use crate::query::Filters;
use crate::record::kinds::{ENTITY, SEARCH_RESULT};
use crate::record::{Record, RecordKind};
use crate::retry::RetryPolicy;
use crate::tokens::ApiToken;
use crate::transport::Transport;
use crate::types::ApiUrl;

/// Client-wide settings, fixed at construction.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use kanka_core::{ClientConfig, RetryPolicy};
///
/// let config = ClientConfig::new("token", 42)
///     .with_retry(RetryPolicy::new().with_max_retries(3).with_max_delay(Duration::from_secs(10)));
/// assert_eq!(config.campaign_id(), 42);
/// assert_eq!(config.version(), "1.0");
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    token: ApiToken,
    campaign_id: u64,
    api: ApiUrl,
    version: String,
    retry: RetryPolicy,
}

impl ClientConfig {
    /// The API version path segment used unless overridden.
    pub const DEFAULT_VERSION: &'static str = "1.0";

    pub fn new(token: impl Into<ApiToken>, campaign_id: u64) -> Self {
        Self {
            token: token.into(),
            campaign_id,
            api: ApiUrl::default(),
            version: Self::DEFAULT_VERSION.to_string(),
            retry: RetryPolicy::default(),
        }
    }

    /// Points the client at another server (a self-hosted instance, a test
    /// server).
    pub fn with_api_url(mut self, api: ApiUrl) -> Self {
        self.api = api;
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn campaign_id(&self) -> u64 {
        self.campaign_id
    }

    pub fn api_url(&self) -> &ApiUrl {
        &self.api
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn retry(&self) -> &RetryPolicy {
        &self.retry
    }
}

/// One campaign: a manager per record type plus the campaign-wide calls.
///
/// All managers share one [`RequestExecutor`], and with it the token,
/// campaign id and retry policy.
#[derive(Debug)]
pub struct KankaClient {
    executor: Arc<RequestExecutor>,
    managers: BTreeMap<RecordKind, EntityManager>,
    gallery: GalleryManager,
    search_pagination: PaginationSlot,
    entities_pagination: PaginationSlot,
}

impl KankaClient {
    pub fn new(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        let executor = Arc::new(RequestExecutor::new(
            transport,
            config.api,
            config.version,
            config.campaign_id,
            config.token,
            config.retry,
        ));
        let managers = RecordKind::ALL
            .iter()
            .map(|kind| (*kind, EntityManager::new(*kind, executor.clone())))
            .collect();
        Self {
            gallery: GalleryManager::new(executor.clone()),
            executor,
            managers,
            search_pagination: PaginationSlot::default(),
            entities_pagination: PaginationSlot::default(),
        }
    }

    pub fn campaign_id(&self) -> u64 {
        self.executor.campaign_id()
    }

    /// The manager of one record type.
    pub fn manager(&self, kind: RecordKind) -> &EntityManager {
        // Every kind is inserted in `new`.
        &self.managers[&kind]
    }

    pub fn calendars(&self) -> &EntityManager {
        self.manager(RecordKind::Calendar)
    }

    pub fn characters(&self) -> &EntityManager {
        self.manager(RecordKind::Character)
    }

    pub fn creatures(&self) -> &EntityManager {
        self.manager(RecordKind::Creature)
    }

    pub fn events(&self) -> &EntityManager {
        self.manager(RecordKind::Event)
    }

    pub fn families(&self) -> &EntityManager {
        self.manager(RecordKind::Family)
    }

    pub fn journals(&self) -> &EntityManager {
        self.manager(RecordKind::Journal)
    }

    pub fn locations(&self) -> &EntityManager {
        self.manager(RecordKind::Location)
    }

    pub fn notes(&self) -> &EntityManager {
        self.manager(RecordKind::Note)
    }

    pub fn organisations(&self) -> &EntityManager {
        self.manager(RecordKind::Organisation)
    }

    pub fn quests(&self) -> &EntityManager {
        self.manager(RecordKind::Quest)
    }

    pub fn races(&self) -> &EntityManager {
        self.manager(RecordKind::Race)
    }

    pub fn tags(&self) -> &EntityManager {
        self.manager(RecordKind::Tag)
    }

    /// The campaign image gallery.
    pub fn gallery(&self) -> &GalleryManager {
        &self.gallery
    }

    /// Searches names across all record types.
    ///
    /// The server ignores a page size on this endpoint, so only the page
    /// number is sent.
    #[instrument(skip(self), fields(campaign = self.campaign_id()))]
    pub async fn search(&self, term: &str, page: u32) -> Result<Vec<Record>> {
        let path = ApiPath::new("search").join(term);
        let query = vec![("page".to_string(), page.to_string())];
        let body = self.executor.get(&path, &query).await?;
        let (results, pagination) = parse_page(&SEARCH_RESULT, body, &path)?;
        debug!(count = results.len(), "search results");
        self.search_pagination.store(pagination);
        Ok(results)
    }

    /// Pagination of the last [`KankaClient::search`] call.
    pub fn search_pagination(&self) -> Pagination {
        self.search_pagination.load()
    }

    /// Lists entities of any type. `types` and `tags` filters are sent
    /// comma-joined, booleans as 0/1; `page` and `limit` go in as filters.
    #[instrument(skip(self), fields(campaign = self.campaign_id()))]
    pub async fn entities(&self, filters: &Filters) -> Result<Vec<Record>> {
        let path = ApiPath::new("entities");
        let body = self.executor.get(&path, &filters.to_query()).await?;
        let (records, pagination) = parse_page(&ENTITY, body, &path)?;
        self.entities_pagination.store(pagination);
        Ok(records)
    }

    /// Pagination of the last generic entities listing.
    pub fn entities_pagination(&self) -> Pagination {
        self.entities_pagination.load()
    }

    /// Fetches one entity by universal id.
    #[instrument(skip(self), fields(campaign = self.campaign_id()))]
    pub async fn entity(&self, universal_id: i64) -> Result<Record> {
        let path = ApiPath::new("entities").join(universal_id);
        let body = self.executor.get(&path, &[]).await?;
        parse_one(&ENTITY, body, &path)
    }
}
