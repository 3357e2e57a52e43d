//! Posts attached to an entity.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, instrument};

use crate::Result;
use crate::executor::{ApiPath, RequestExecutor};
use crate::pagination::{Pagination, PaginationSlot};
use crate::query::page_query;
use crate::record::kinds::POST;
use crate::record::{Fields, Record};
use crate::transport::RequestBody;
use crate::types::{EntityRef, RecordRef};

use super::assets::AssetsManager;
use super::embed::{EmbedOptions, EmbedOutcome, EmbeddedImages, embed_for_create, embed_for_update};
use super::{parse_one, parse_page};

/// Posts under `entities/{universal_id}/posts`.
///
/// The entity is addressed by its universal id. A bare integer is sent
/// as-is; passing a type-scoped id addresses whichever entity owns that
/// number in the universal id space.
///
/// The API requires `name` on every update, even when it is unchanged.
/// Supply it; a diff keeps it whenever it is present.
#[derive(Debug)]
pub struct PostsManager {
    executor: Arc<RequestExecutor>,
    assets: Arc<AssetsManager>,
    pagination: PaginationSlot,
}

impl PostsManager {
    pub(crate) fn new(executor: Arc<RequestExecutor>, assets: Arc<AssetsManager>) -> Self {
        Self {
            executor,
            assets,
            pagination: PaginationSlot::default(),
        }
    }

    fn path(entity_id: i64) -> ApiPath {
        ApiPath::new("entities").join(entity_id).join("posts")
    }

    #[instrument(skip(self, entity))]
    pub async fn list<'a>(
        &self,
        entity: impl Into<EntityRef<'a>>,
        page: u32,
        limit: u32,
    ) -> Result<Vec<Record>> {
        let path = Self::path(entity.into().entity_id()?);
        let body = self.executor.get(&path, &page_query(page, limit)).await?;
        let (records, pagination) = parse_page(&POST, body, &path)?;
        self.pagination.store(pagination);
        Ok(records)
    }

    #[instrument(skip(self, entity))]
    pub async fn get<'a>(&self, entity: impl Into<EntityRef<'a>>, post_id: i64) -> Result<Record> {
        let path = Self::path(entity.into().entity_id()?).join(post_id);
        let body = self.executor.get(&path, &[]).await?;
        parse_one(&POST, body, &path)
    }

    /// Creates a post. `fields` carries `name`, `entry` and optionally
    /// `visibility_id` (see [`Fields::set_visibility`]).
    #[instrument(skip(self, entity, fields))]
    pub async fn create<'a>(&self, entity: impl Into<EntityRef<'a>>, fields: Fields) -> Result<Record> {
        let entity_id = entity.into().entity_id()?;
        self.create_inner(entity_id, fields).await
    }

    async fn create_inner(&self, entity_id: i64, mut fields: Fields) -> Result<Record> {
        POST.strip_read_only(&mut fields);
        let path = Self::path(entity_id);
        let body = Value::Object(POST.encode(&fields));
        let body = self.executor.post(&path, RequestBody::Json(body)).await?;
        parse_one(&POST, body, &path)
    }

    /// Creates a post whose entry embeds local images.
    ///
    /// The images are uploaded as assets of the owning entity first, then
    /// the post is created with the rewritten entry.
    #[instrument(skip(self, entity, fields, images))]
    pub async fn create_with_images<'a>(
        &self,
        entity: impl Into<EntityRef<'a>>,
        mut fields: Fields,
        images: &EmbeddedImages,
    ) -> Result<(Record, EmbedOutcome)> {
        let entity_id = entity.into().entity_id()?;
        let entry = fields.get_str("entry").unwrap_or_default().to_string();
        let outcome = embed_for_create(&self.assets, entity_id, &entry, images).await?;
        if outcome.html != entry {
            fields.insert("entry", outcome.html.clone());
        }
        let post = self.create_inner(entity_id, fields).await?;
        Ok((post, outcome))
    }

    /// Updates a post.
    ///
    /// Given a post record, only changed fields are sent (plus `name` when
    /// supplied). Given a bare post id, every supplied field is sent.
    #[instrument(skip(self, entity, post, fields))]
    pub async fn update<'a, 'b>(
        &self,
        entity: impl Into<EntityRef<'a>>,
        post: impl Into<RecordRef<'b>>,
        fields: Fields,
    ) -> Result<Record> {
        let entity_id = entity.into().entity_id()?;
        self.update_inner(entity_id, post.into(), fields).await
    }

    async fn update_inner(&self, entity_id: i64, post: RecordRef<'_>, fields: Fields) -> Result<Record> {
        let post_id = post.id()?;
        let payload = match post.record() {
            Some(record) => {
                let mut changed = record.diff(&fields);
                POST.strip_read_only(&mut changed);
                if changed.is_empty() {
                    debug!(post_id, "no changes");
                    return Ok(record.clone());
                }
                changed
            }
            None if fields.is_empty() => return self.get(entity_id, post_id).await,
            None => fields,
        };

        let path = Self::path(entity_id).join(post_id);
        let body = self
            .executor
            .patch(&path, Value::Object(POST.encode(&payload)))
            .await?;
        parse_one(&POST, body, &path)
    }

    /// Updates a post whose entry embeds local images, reconciling the
    /// owning entity's managed assets.
    ///
    /// The entry comes from `fields`, else from the post record, else from
    /// a fetch of the post.
    #[instrument(skip(self, entity, post, fields, images))]
    pub async fn update_with_images<'a, 'b>(
        &self,
        entity: impl Into<EntityRef<'a>>,
        post: impl Into<RecordRef<'b>>,
        mut fields: Fields,
        images: &EmbeddedImages,
        options: EmbedOptions,
    ) -> Result<(Record, EmbedOutcome)> {
        let entity_id = entity.into().entity_id()?;
        let post = post.into();

        let entry = match fields.get_str("entry") {
            Some(entry) => entry.to_string(),
            None => match post.record().and_then(Record::entry) {
                Some(entry) => entry.to_string(),
                None => self
                    .get(entity_id, post.id()?)
                    .await?
                    .entry()
                    .unwrap_or_default()
                    .to_string(),
            },
        };

        let outcome = embed_for_update(&self.assets, entity_id, &entry, images, options).await?;
        if !entry.is_empty() {
            fields.insert("entry", outcome.html.clone());
        }
        let updated = self.update_inner(entity_id, post, fields).await?;
        Ok((updated, outcome))
    }

    #[instrument(skip(self, entity, post))]
    pub async fn delete<'a, 'b>(
        &self,
        entity: impl Into<EntityRef<'a>>,
        post: impl Into<RecordRef<'b>>,
    ) -> Result<bool> {
        let entity_id = entity.into().entity_id()?;
        let path = Self::path(entity_id).join(post.into().id()?);
        self.executor.delete(&path, &[]).await?;
        Ok(true)
    }

    /// Pagination of the last [`PostsManager::list`] call.
    pub fn pagination(&self) -> Pagination {
        self.pagination.load()
    }

    pub fn has_next_page(&self) -> bool {
        self.pagination.load().has_next_page()
    }
}
