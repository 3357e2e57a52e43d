//! The campaign image gallery.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::Result;
use crate::error::TransportError;
use crate::executor::{ApiPath, RequestExecutor, take_data};
use crate::pagination::{Pagination, PaginationSlot};
use crate::query::page_query;
use crate::record::Record;
use crate::record::kinds::GALLERY_IMAGE;
use crate::transport::{MultipartForm, RequestBody};

use super::{Upload, parse_one, parse_page, parse_records};

pub(crate) async fn delete_gallery_image(executor: &RequestExecutor, uuid: &str) -> Result<()> {
    executor
        .delete(&ApiPath::new("images").join(uuid), &[])
        .await?;
    Ok(())
}

/// Gallery images, keyed by uuid.
///
/// Listing and fetching go through `images`, uploads through `gallery`.
#[derive(Debug)]
pub struct GalleryManager {
    executor: Arc<RequestExecutor>,
    pagination: PaginationSlot,
}

impl GalleryManager {
    pub(crate) fn new(executor: Arc<RequestExecutor>) -> Self {
        Self {
            executor,
            pagination: PaginationSlot::default(),
        }
    }

    #[instrument(skip(self))]
    pub async fn list(&self, page: u32, limit: u32) -> Result<Vec<Record>> {
        let path = ApiPath::new("images");
        let body = self.executor.get(&path, &page_query(page, limit)).await?;
        let (records, pagination) = parse_page(&GALLERY_IMAGE, body, &path)?;
        self.pagination.store(pagination);
        Ok(records)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, uuid: &str) -> Result<Record> {
        let path = ApiPath::new("images").join(uuid);
        let body = self.executor.get(&path, &[]).await?;
        parse_one(&GALLERY_IMAGE, body, &path)
    }

    /// Uploads a local file, optionally into a gallery folder.
    #[instrument(skip(self))]
    pub async fn upload(&self, file: &Path, folder_id: Option<&str>) -> Result<Record> {
        let upload = Upload::read(file).await?;
        self.upload_bytes(upload.file_name, upload.bytes, folder_id)
            .await
    }

    /// Uploads in-memory content. The endpoint answers with a list; the
    /// first image is returned.
    #[instrument(skip(self, bytes), fields(len = bytes.len()))]
    pub async fn upload_bytes(
        &self,
        file_name: String,
        bytes: Vec<u8>,
        folder_id: Option<&str>,
    ) -> Result<Record> {
        let mut form = MultipartForm::new().file("file[]", file_name, bytes);
        if let Some(folder_id) = folder_id {
            form = form.text("folder_id", folder_id);
        }

        let path = ApiPath::new("gallery");
        let body = self
            .executor
            .post(&path, RequestBody::Multipart(form))
            .await?;
        let data = take_data(body, &path)?;
        parse_records(&GALLERY_IMAGE, &data, &path)?
            .into_iter()
            .next()
            .ok_or_else(|| {
                TransportError::Decode {
                    message: "gallery upload returned no images".to_string(),
                }
                .into()
            })
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, uuid: &str) -> Result<bool> {
        delete_gallery_image(&self.executor, uuid).await?;
        debug!(uuid, "deleted gallery image");
        Ok(true)
    }

    /// Pagination of the last [`GalleryManager::list`] call.
    pub fn pagination(&self) -> Pagination {
        self.pagination.load()
    }

    pub fn has_next_page(&self) -> bool {
        self.pagination.load().has_next_page()
    }
}
