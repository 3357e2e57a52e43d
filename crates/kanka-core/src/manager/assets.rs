//! File, link and alias assets of an entity.

use std::path::Path;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde_json::{Map, Value, json};
use tracing::{debug, info, instrument};

use crate::Result;
use crate::executor::{ApiPath, RequestExecutor};
use crate::pagination::{Pagination, PaginationSlot};
use crate::query::page_query;
use crate::record::Record;
use crate::record::kinds::ASSET;
use crate::transport::{MultipartForm, RequestBody};
use crate::types::{AssetKind, EntityRef, Visibility};

use super::gallery::delete_gallery_image;
use super::{Upload, parse_one, parse_page};

const ALL_ASSETS_PAGE_SIZE: u32 = 100;

static GALLERY_UUID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}")
        .expect("static regex")
});

/// Extracts the gallery image uuid from an asset CDN URL.
///
/// The uuid is the last one in the URL (campaign folders may contain
/// other ids).
pub fn gallery_uuid(url: &str) -> Option<&str> {
    GALLERY_UUID.find_iter(url).last().map(|m| m.as_str())
}

/// Options for a file asset upload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileAssetOptions {
    /// Asset name; defaults to the file stem.
    pub name: Option<String>,
    pub visibility: Visibility,
    pub is_pinned: bool,
}

impl FileAssetOptions {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }
}

/// Assets under `entities/{universal_id}/entity_assets`.
#[derive(Debug)]
pub struct AssetsManager {
    executor: Arc<RequestExecutor>,
    pagination: PaginationSlot,
}

impl AssetsManager {
    pub(crate) fn new(executor: Arc<RequestExecutor>) -> Self {
        Self {
            executor,
            pagination: PaginationSlot::default(),
        }
    }

    fn path(entity_id: i64) -> ApiPath {
        ApiPath::new("entities").join(entity_id).join("entity_assets")
    }

    /// One page of an entity's assets.
    #[instrument(skip(self, entity))]
    pub async fn list<'a>(
        &self,
        entity: impl Into<EntityRef<'a>>,
        page: u32,
        limit: u32,
    ) -> Result<Vec<Record>> {
        let entity_id = entity.into().entity_id()?;
        let (records, pagination) = self.fetch_page(entity_id, page, limit).await?;
        self.pagination.store(pagination);
        Ok(records)
    }

    /// Every asset of an entity, following pages until the last one.
    ///
    /// Does not touch [`AssetsManager::pagination`].
    #[instrument(skip(self, entity))]
    pub async fn list_all<'a>(&self, entity: impl Into<EntityRef<'a>>) -> Result<Vec<Record>> {
        let entity_id = entity.into().entity_id()?;
        let mut all = Vec::new();
        let mut page = 1;
        loop {
            let (records, pagination) = self
                .fetch_page(entity_id, page, ALL_ASSETS_PAGE_SIZE)
                .await?;
            let empty = records.is_empty();
            all.extend(records);
            if empty || !pagination.has_next_page() {
                break;
            }
            page += 1;
        }
        debug!(entity_id, count = all.len(), "listed all assets");
        Ok(all)
    }

    async fn fetch_page(
        &self,
        entity_id: i64,
        page: u32,
        limit: u32,
    ) -> Result<(Vec<Record>, Pagination)> {
        let path = Self::path(entity_id);
        let body = self.executor.get(&path, &page_query(page, limit)).await?;
        parse_page(&ASSET, body, &path)
    }

    #[instrument(skip(self, entity))]
    pub async fn get<'a>(&self, entity: impl Into<EntityRef<'a>>, asset_id: i64) -> Result<Record> {
        let entity_id = entity.into().entity_id()?;
        let path = Self::path(entity_id).join(asset_id);
        let body = self.executor.get(&path, &[]).await?;
        parse_one(&ASSET, body, &path)
    }

    /// Uploads a local file as a file asset.
    #[instrument(skip(self, entity, options))]
    pub async fn create_file<'a>(
        &self,
        entity: impl Into<EntityRef<'a>>,
        file: &Path,
        options: FileAssetOptions,
    ) -> Result<Record> {
        let entity_id = entity.into().entity_id()?;
        let upload = Upload::read(file).await?;
        let options = FileAssetOptions {
            name: options.name.or(Some(upload.stem)),
            ..options
        };
        self.create_file_bytes(entity_id, upload.file_name, upload.bytes, options)
            .await
    }

    /// Uploads in-memory content as a file asset.
    #[instrument(skip(self, entity, bytes, options), fields(len = bytes.len()))]
    pub async fn create_file_bytes<'a>(
        &self,
        entity: impl Into<EntityRef<'a>>,
        file_name: String,
        bytes: Vec<u8>,
        options: FileAssetOptions,
    ) -> Result<Record> {
        let entity_id = entity.into().entity_id()?;
        let name = options.name.unwrap_or_else(|| {
            Path::new(&file_name)
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| file_name.clone())
        });

        let mut form = MultipartForm::new()
            .text("type_id", AssetKind::File.type_id().to_string())
            .text("name", name);
        if let Some(visibility_id) = options.visibility.id() {
            form = form.text("visibility_id", visibility_id.to_string());
        }
        form = form
            .text("is_pinned", if options.is_pinned { "1" } else { "0" })
            .file("file", file_name, bytes);

        let path = Self::path(entity_id);
        let body = self
            .executor
            .post(&path, RequestBody::Multipart(form))
            .await?;
        parse_one(&ASSET, body, &path)
    }

    /// Creates a link asset. `icon` is an icon class such as `fa-link`.
    #[instrument(skip(self, entity))]
    pub async fn create_link<'a>(
        &self,
        entity: impl Into<EntityRef<'a>>,
        name: &str,
        url: &str,
        icon: Option<&str>,
        visibility: Visibility,
    ) -> Result<Record> {
        let mut metadata = Map::new();
        metadata.insert("url".to_string(), Value::from(url));
        if let Some(icon) = icon {
            metadata.insert("icon".to_string(), Value::from(icon));
        }
        let body = json!({
            "type_id": AssetKind::Link.type_id(),
            "name": name,
            "metadata": metadata,
        });
        self.create_json(entity.into(), body, visibility).await
    }

    /// Creates an alias (alternate name) asset.
    #[instrument(skip(self, entity))]
    pub async fn create_alias<'a>(
        &self,
        entity: impl Into<EntityRef<'a>>,
        name: &str,
        visibility: Visibility,
    ) -> Result<Record> {
        let body = json!({
            "type_id": AssetKind::Alias.type_id(),
            "name": name,
        });
        self.create_json(entity.into(), body, visibility).await
    }

    async fn create_json(
        &self,
        entity: EntityRef<'_>,
        mut body: Value,
        visibility: Visibility,
    ) -> Result<Record> {
        let entity_id = entity.entity_id()?;
        if let (Some(visibility_id), Some(object)) = (visibility.id(), body.as_object_mut()) {
            object.insert("visibility_id".to_string(), Value::from(visibility_id));
        }
        let path = Self::path(entity_id);
        let body = self.executor.post(&path, RequestBody::Json(body)).await?;
        parse_one(&ASSET, body, &path)
    }

    #[instrument(skip(self, entity))]
    pub async fn delete<'a>(&self, entity: impl Into<EntityRef<'a>>, asset_id: i64) -> Result<bool> {
        let entity_id = entity.into().entity_id()?;
        let path = Self::path(entity_id).join(asset_id);
        self.executor.delete(&path, &[]).await?;
        Ok(true)
    }

    /// Deletes an asset and the gallery image behind its CDN URL.
    ///
    /// An asset without a gallery uuid in its URL is just deleted. A gallery
    /// image that is already gone is not an error.
    #[instrument(skip(self, entity, asset), fields(asset_id = asset.id()))]
    pub async fn delete_with_gallery_image<'a>(
        &self,
        entity: impl Into<EntityRef<'a>>,
        asset: &Record,
    ) -> Result<bool> {
        let entity_id = entity.into().entity_id()?;
        let asset_id = asset.id().ok_or(crate::error::InvalidInputError::MissingId {
            schema: asset.schema().name,
        })?;
        self.delete(entity_id, asset_id).await?;

        if let Some(uuid) = asset.get_str("url").and_then(gallery_uuid) {
            match delete_gallery_image(&self.executor, uuid).await {
                Ok(()) => info!(uuid, "deleted gallery image"),
                Err(e) if e.is_not_found() => debug!(uuid, "gallery image already gone"),
                Err(e) => return Err(e),
            }
        }
        Ok(true)
    }

    /// Pagination of the last [`AssetsManager::list`] call.
    pub fn pagination(&self) -> Pagination {
        self.pagination.load()
    }

    pub fn has_next_page(&self) -> bool {
        self.pagination.load().has_next_page()
    }
}
