//! The generic per-type manager.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, instrument};

use crate::Result;
use crate::executor::{ApiPath, RequestExecutor};
use crate::pagination::{Pagination, PaginationSlot};
use crate::query::ListOptions;
use crate::record::{Fields, Record, RecordKind, Schema};
use crate::transport::RequestBody;
use crate::types::{EntityRef, RecordRef};

use super::assets::AssetsManager;
use super::embed::{EmbedOptions, EmbedOutcome, EmbeddedImages, embed_for_create, embed_for_update};
use super::images::ImagesManager;
use super::posts::PostsManager;
use super::{parse_one, parse_page};

/// CRUD and listing for one record type, addressed by the type-scoped id.
///
/// Each manager keeps the pagination of its own last `list` call (and of
/// `get` with `related`). Concurrent list calls on one manager overwrite
/// each other's pagination; the records they return are unaffected.
#[derive(Debug)]
pub struct EntityManager {
    kind: RecordKind,
    executor: Arc<RequestExecutor>,
    pagination: PaginationSlot,
    posts: PostsManager,
    assets: Arc<AssetsManager>,
    images: ImagesManager,
}

impl EntityManager {
    pub(crate) fn new(kind: RecordKind, executor: Arc<RequestExecutor>) -> Self {
        let assets = Arc::new(AssetsManager::new(executor.clone()));
        Self {
            kind,
            posts: PostsManager::new(executor.clone(), assets.clone()),
            images: ImagesManager::new(executor.clone()),
            assets,
            executor,
            pagination: PaginationSlot::default(),
        }
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    pub fn schema(&self) -> &'static Schema {
        self.kind.schema()
    }

    fn path(&self) -> ApiPath {
        ApiPath::new(self.kind.endpoint())
    }

    /// Fetches one record. With `related`, posts and attributes are
    /// embedded.
    #[instrument(skip(self), fields(kind = %self.kind))]
    pub async fn get(&self, id: i64, related: bool) -> Result<Record> {
        let path = self.path().join(id);
        let query = if related {
            vec![("related".to_string(), "1".to_string())]
        } else {
            Vec::new()
        };
        let body = self.executor.get(&path, &query).await?;
        if related {
            self.pagination.store(Pagination::from_envelope(&body));
        }
        parse_one(self.schema(), body, &path)
    }

    /// Lists one page of records.
    ///
    /// Afterwards [`EntityManager::pagination`] reflects the response, and
    /// [`EntityManager::sync_cursor`] holds the server's sync cursor for the
    /// next incremental call.
    #[instrument(skip(self), fields(kind = %self.kind))]
    pub async fn list(&self, options: &ListOptions) -> Result<Vec<Record>> {
        let path = self.path();
        let body = self.executor.get(&path, &options.to_query()).await?;
        let (records, pagination) = parse_page(self.schema(), body, &path)?;
        debug!(count = records.len(), page = ?pagination.current_page, "listed records");
        self.pagination.store(pagination);
        Ok(records)
    }

    /// Creates a record. Server-assigned fields are dropped from `fields`.
    #[instrument(skip(self, fields), fields(kind = %self.kind))]
    pub async fn create(&self, mut fields: Fields) -> Result<Record> {
        self.schema().strip_read_only(&mut fields);
        let path = self.path();
        let body = Value::Object(self.schema().encode(&fields));
        let body = self.executor.post(&path, RequestBody::Json(body)).await?;
        parse_one(self.schema(), body, &path)
    }

    /// Creates a record whose `entry` embeds local images.
    ///
    /// The record is created first, the images are uploaded as assets of
    /// it, then the rewritten entry is sent in a second request. A failure of
    /// that last request is returned; the uploaded assets stay in place.
    #[instrument(skip(self, fields, images), fields(kind = %self.kind))]
    pub async fn create_with_images(
        &self,
        fields: Fields,
        images: &EmbeddedImages,
    ) -> Result<(Record, EmbedOutcome)> {
        let record = self.create(fields).await?;
        let entry = record.entry().unwrap_or_default().to_string();
        if images.is_empty() || entry.is_empty() {
            return Ok((record, EmbedOutcome::unchanged(&entry)));
        }

        let entity_id = EntityRef::Record(&record).entity_id()?;
        let outcome = embed_for_create(&self.assets, entity_id, &entry, images).await?;
        if outcome.html == entry {
            return Ok((record, outcome));
        }

        let record = self
            .patch(&record, &Fields::new().set("entry", outcome.html.clone()))
            .await?;
        Ok((record, outcome))
    }

    /// Updates a record.
    ///
    /// Given a [`Record`], only the fields that differ from it are sent, and
    /// an empty diff returns the record without a request. Given a bare id,
    /// every supplied field is sent; with no fields the record is fetched.
    #[instrument(skip(self, target, fields), fields(kind = %self.kind))]
    pub async fn update<'a>(&self, target: impl Into<RecordRef<'a>>, fields: Fields) -> Result<Record> {
        self.update_inner(target.into(), fields).await
    }

    async fn update_inner(&self, target: RecordRef<'_>, fields: Fields) -> Result<Record> {
        let id = target.id()?;
        match target.record() {
            Some(record) => {
                let mut changed = record.diff(&fields);
                self.schema().strip_read_only(&mut changed);
                if changed.is_empty() {
                    debug!(id, "no changes");
                    return Ok(record.clone());
                }
                self.patch_id(id, &changed).await
            }
            None if fields.is_empty() => self.get(id, false).await,
            None => self.patch_id(id, &fields).await,
        }
    }

    async fn patch(&self, record: &Record, fields: &Fields) -> Result<Record> {
        self.patch_id(RecordRef::Record(record).id()?, fields).await
    }

    async fn patch_id(&self, id: i64, fields: &Fields) -> Result<Record> {
        let path = self.path().join(id);
        let body = self
            .executor
            .patch(&path, Value::Object(self.schema().encode(fields)))
            .await?;
        parse_one(self.schema(), body, &path)
    }

    /// Updates a record whose `entry` embeds local images, reconciling its
    /// managed assets.
    ///
    /// The entry comes from `fields`, else from the record, else from a
    /// fetch. A bare id is resolved to the universal id with a `get`.
    #[instrument(skip(self, target, fields, images), fields(kind = %self.kind))]
    pub async fn update_with_images<'a>(
        &self,
        target: impl Into<RecordRef<'a>>,
        mut fields: Fields,
        images: &EmbeddedImages,
        options: EmbedOptions,
    ) -> Result<(Record, EmbedOutcome)> {
        let target = target.into();
        let id = target.id()?;

        let fetched;
        let current = match target.record() {
            Some(record) => record,
            None => {
                fetched = self.get(id, false).await?;
                &fetched
            }
        };
        let entity_id = EntityRef::Record(current).entity_id()?;

        let entry = fields
            .get_str("entry")
            .or_else(|| current.entry())
            .unwrap_or_default()
            .to_string();

        let outcome = embed_for_update(&self.assets, entity_id, &entry, images, options).await?;
        if !entry.is_empty() {
            fields.insert("entry", outcome.html.clone());
        }

        let updated = self.update_inner(target, fields).await?;
        Ok((updated, outcome))
    }

    /// Deletes a record.
    #[instrument(skip(self, target), fields(kind = %self.kind))]
    pub async fn delete<'a>(&self, target: impl Into<RecordRef<'a>>) -> Result<bool> {
        let path = self.path().join(target.into().id()?);
        self.executor.delete(&path, &[]).await?;
        Ok(true)
    }

    /// Pagination of the last list call.
    pub fn pagination(&self) -> Pagination {
        self.pagination.load()
    }

    /// The sync cursor returned by the last list call.
    pub fn sync_cursor(&self) -> Option<String> {
        self.pagination.load().sync
    }

    pub fn has_next_page(&self) -> bool {
        self.pagination.load().has_next_page()
    }

    /// Posts of this type's records.
    pub fn posts(&self) -> &PostsManager {
        &self.posts
    }

    /// Assets of this type's records.
    pub fn assets(&self) -> &AssetsManager {
        &self.assets
    }

    /// Image slots of this type's records.
    pub fn images(&self) -> &ImagesManager {
        &self.images
    }
}
