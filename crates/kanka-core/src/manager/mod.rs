//! Managers: one per record type, plus the sub-resources hanging off the
//! universal id.

mod assets;
pub mod embed;
mod entity;
mod gallery;
mod images;
mod posts;

pub use assets::{AssetsManager, FileAssetOptions, gallery_uuid};
pub use embed::{EmbedOptions, EmbedOutcome, EmbeddedImages};
pub use entity::EntityManager;
pub use gallery::GalleryManager;
pub use images::ImagesManager;
pub use posts::PostsManager;

use std::path::Path;

use serde_json::Value;

use crate::Result;
use crate::error::{Error, TransportError};
use crate::executor::{ApiPath, take_data};
use crate::pagination::Pagination;
use crate::record::{Record, Schema};

/// Parses the `data` object of a single-record response.
pub(crate) fn parse_one(schema: &'static Schema, body: Value, path: &ApiPath) -> Result<Record> {
    let data = take_data(body, path)?;
    Ok(schema.parse(&data)?)
}

/// Parses a list envelope into records plus its pagination block.
pub(crate) fn parse_page(
    schema: &'static Schema,
    body: Value,
    path: &ApiPath,
) -> Result<(Vec<Record>, Pagination)> {
    let pagination = Pagination::from_envelope(&body);
    let data = take_data(body, path)?;
    let records = parse_records(schema, &data, path)?;
    Ok((records, pagination))
}

pub(crate) fn parse_records(
    schema: &'static Schema,
    data: &Value,
    path: &ApiPath,
) -> Result<Vec<Record>> {
    let Value::Array(items) = data else {
        return Err(TransportError::Decode {
            message: format!("expected a list from {}", path),
        }
        .into());
    };
    items
        .iter()
        .map(|item| schema.parse(item).map_err(Error::from))
        .collect()
}

/// A local file read for a multipart upload.
#[derive(Debug)]
pub(crate) struct Upload {
    pub(crate) file_name: String,
    pub(crate) stem: String,
    pub(crate) bytes: Vec<u8>,
}

impl Upload {
    pub(crate) async fn read(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let stem = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| file_name.clone());
        Ok(Self {
            file_name,
            stem,
            bytes,
        })
    }
}
