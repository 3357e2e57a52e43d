//! The main and header image slots of an entity.

use std::path::Path;
use std::sync::Arc;

use tracing::instrument;

use crate::Result;
use crate::executor::{ApiPath, RequestExecutor};
use crate::record::Record;
use crate::record::kinds::ENTITY_IMAGE;
use crate::transport::{MultipartForm, RequestBody};
use crate::types::{EntityRef, ImageSlot};

use super::{Upload, parse_one};

/// Images under `entities/{universal_id}/image`.
#[derive(Debug)]
pub struct ImagesManager {
    executor: Arc<RequestExecutor>,
}

impl ImagesManager {
    pub(crate) fn new(executor: Arc<RequestExecutor>) -> Self {
        Self { executor }
    }

    fn path(entity_id: i64) -> ApiPath {
        ApiPath::new("entities").join(entity_id).join("image")
    }

    /// Both slots; `image` and `header` hold the raw image objects.
    #[instrument(skip(self, entity))]
    pub async fn get<'a>(&self, entity: impl Into<EntityRef<'a>>) -> Result<Record> {
        let path = Self::path(entity.into().entity_id()?);
        let body = self.executor.get(&path, &[]).await?;
        parse_one(&ENTITY_IMAGE, body, &path)
    }

    /// Uploads a local file into a slot.
    #[instrument(skip(self, entity))]
    pub async fn set<'a>(
        &self,
        entity: impl Into<EntityRef<'a>>,
        file: &Path,
        slot: ImageSlot,
    ) -> Result<Record> {
        let entity_id = entity.into().entity_id()?;
        let upload = Upload::read(file).await?;
        self.set_bytes(entity_id, upload.file_name, upload.bytes, slot)
            .await
    }

    /// Uploads in-memory content into a slot.
    #[instrument(skip(self, entity, bytes), fields(len = bytes.len()))]
    pub async fn set_bytes<'a>(
        &self,
        entity: impl Into<EntityRef<'a>>,
        file_name: String,
        bytes: Vec<u8>,
        slot: ImageSlot,
    ) -> Result<Record> {
        let path = Self::path(entity.into().entity_id()?);
        let mut form = MultipartForm::new();
        if slot.is_header() {
            form = form.text("is_header", "1");
        }
        form = form.file("file", file_name, bytes);

        let body = self
            .executor
            .post(&path, RequestBody::Multipart(form))
            .await?;
        parse_one(&ENTITY_IMAGE, body, &path)
    }

    /// Clears a slot.
    #[instrument(skip(self, entity))]
    pub async fn delete<'a>(&self, entity: impl Into<EntityRef<'a>>, slot: ImageSlot) -> Result<bool> {
        let path = Self::path(entity.into().entity_id()?);
        let query = if slot.is_header() {
            vec![("is_header".to_string(), "1".to_string())]
        } else {
            Vec::new()
        };
        self.executor.delete(&path, &query).await?;
        Ok(true)
    }
}
