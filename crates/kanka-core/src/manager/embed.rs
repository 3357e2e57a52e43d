//! Embedding local images into entry HTML through managed assets.
//!
//! Each placeholder `src` in the HTML is backed by a local file. The file is
//! uploaded as a file asset named `{placeholder}:{hash}`, where `hash` is the
//! first 12 hex characters of the SHA-256 of its content, and every
//! `src="placeholder"` is rewritten to the asset's CDN URL.
//!
//! On update the entity's existing assets are reconciled against the
//! mapping:
//!
//! - a managed asset whose name and hash match a mapped file is reused;
//! - every other managed asset is deleted, and files without a matching
//!   asset are uploaded;
//! - assets whose name does not follow the pattern are never touched.
//!
//! Matching is on the pair, so placeholders that share their first 32
//! characters keep their own assets.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, warn};

use crate::Result;
use crate::record::Record;

use super::Upload;
use super::assets::{AssetsManager, FileAssetOptions};

/// Longest logical name kept in a managed asset name.
pub const MANAGED_NAME_MAX_CHARS: usize = 32;

/// Hex characters of the content hash kept in a managed asset name.
pub const HASH_PREFIX_LEN: usize = 12;

static MANAGED_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+):([0-9a-f]{12})$").expect("static regex"));

/// The first [`HASH_PREFIX_LEN`] hex characters of the SHA-256 of `bytes`.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hex = hex::encode(Sha256::digest(bytes));
    hex.truncate(HASH_PREFIX_LEN);
    hex
}

/// Builds `{logical name, truncated}:{hash}`.
pub fn managed_asset_name(logical_name: &str, hash: &str) -> String {
    format!("{}:{}", truncate_name(logical_name), hash)
}

/// Splits a managed asset name into logical name and hash.
pub fn parse_managed_asset_name(name: &str) -> Option<(&str, &str)> {
    let captures = MANAGED_NAME.captures(name)?;
    Some((captures.get(1)?.as_str(), captures.get(2)?.as_str()))
}

fn truncate_name(name: &str) -> String {
    name.chars().take(MANAGED_NAME_MAX_CHARS).collect()
}

/// Replaces `src="placeholder"` and `src='placeholder'` with the mapped URL.
pub fn rewrite_image_srcs(html: &str, urls: &[(String, String)]) -> String {
    let mut html = html.to_string();
    for (placeholder, url) in urls {
        for quote in ['"', '\''] {
            let from = format!("src={quote}{placeholder}{quote}");
            let to = format!("src={quote}{url}{quote}");
            html = html.replace(&from, &to);
        }
    }
    html
}

/// Placeholder `src` values mapped to local files, in insertion order.
///
/// ```
/// use kanka_core::EmbeddedImages;
///
/// let images = EmbeddedImages::new()
///     .with("map", "assets/city-map.png")
///     .with("portrait", "assets/aria.jpg");
/// assert_eq!(images.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmbeddedImages(Vec<(String, PathBuf)>);

impl EmbeddedImages {
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps a placeholder to a file, builder style.
    #[must_use]
    pub fn with(mut self, placeholder: impl Into<String>, file: impl Into<PathBuf>) -> Self {
        self.insert(placeholder, file);
        self
    }

    /// Maps a placeholder to a file, replacing an earlier mapping.
    pub fn insert(&mut self, placeholder: impl Into<String>, file: impl Into<PathBuf>) {
        let placeholder = placeholder.into();
        let file = file.into();
        match self.0.iter_mut().find(|(key, _)| *key == placeholder) {
            Some(entry) => entry.1 = file,
            None => self.0.push((placeholder, file)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_path()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, P: Into<PathBuf>> FromIterator<(K, P)> for EmbeddedImages {
    fn from_iter<I: IntoIterator<Item = (K, P)>>(iter: I) -> Self {
        let mut images = Self::new();
        for (placeholder, file) in iter {
            images.insert(placeholder, file);
        }
        images
    }
}

/// How replaced and orphaned managed assets are cleaned up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmbedOptions {
    /// Also delete the gallery image behind a deleted asset.
    pub delete_gallery_images: bool,
}

impl Default for EmbedOptions {
    fn default() -> Self {
        Self {
            delete_gallery_images: true,
        }
    }
}

/// What an embed pass did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmbedOutcome {
    /// The HTML with placeholders rewritten to CDN URLs.
    pub html: String,
    /// Assets uploaded in this pass.
    pub uploaded: Vec<Record>,
    /// Managed assets whose content was unchanged.
    pub reused: Vec<Record>,
    /// Managed assets deleted as replaced or orphaned.
    pub deleted: Vec<Record>,
    /// Placeholders left in the HTML because their asset has no URL.
    pub unresolved: Vec<String>,
}

impl EmbedOutcome {
    pub(crate) fn unchanged(html: &str) -> Self {
        Self {
            html: html.to_string(),
            ..Self::default()
        }
    }

    fn resolve(&mut self, placeholder: &str, asset: &Record, urls: &mut Vec<(String, String)>) {
        match asset.get_str("url") {
            Some(url) => urls.push((placeholder.to_string(), url.to_string())),
            None => {
                warn!(placeholder, asset_id = asset.id(), "asset has no url, placeholder kept");
                self.unresolved.push(placeholder.to_string());
            }
        }
    }
}

struct LocalImage {
    placeholder: String,
    hash: String,
    upload: Upload,
}

async fn read_images(images: &EmbeddedImages) -> Result<Vec<LocalImage>> {
    let mut local = Vec::with_capacity(images.len());
    for (placeholder, file) in images.iter() {
        let upload = Upload::read(file).await?;
        local.push(LocalImage {
            placeholder: placeholder.to_string(),
            hash: content_hash(&upload.bytes),
            upload,
        });
    }
    Ok(local)
}

async fn upload(assets: &AssetsManager, entity_id: i64, image: LocalImage) -> Result<Record> {
    let name = managed_asset_name(&image.placeholder, &image.hash);
    let asset = assets
        .create_file_bytes(
            entity_id,
            image.upload.file_name,
            image.upload.bytes,
            FileAssetOptions::named(name.clone()),
        )
        .await?;
    info!(entity_id, asset = %name, "uploaded managed asset");
    Ok(asset)
}

async fn remove(
    assets: &AssetsManager,
    entity_id: i64,
    asset: &Record,
    options: EmbedOptions,
) -> Result<()> {
    if options.delete_gallery_images {
        assets.delete_with_gallery_image(entity_id, asset).await?;
    } else if let Some(asset_id) = asset.id() {
        assets.delete(entity_id, asset_id).await?;
    }
    info!(entity_id, asset = asset.name().unwrap_or_default(), "deleted managed asset");
    Ok(())
}

/// Uploads every image for a freshly created entity or post.
#[instrument(skip(assets, html, images), fields(images = images.len()))]
pub(crate) async fn embed_for_create(
    assets: &AssetsManager,
    entity_id: i64,
    html: &str,
    images: &EmbeddedImages,
) -> Result<EmbedOutcome> {
    if images.is_empty() || html.is_empty() {
        return Ok(EmbedOutcome::unchanged(html));
    }

    let mut outcome = EmbedOutcome::default();
    let mut urls = Vec::new();
    for image in read_images(images).await? {
        let placeholder = image.placeholder.clone();
        let asset = upload(assets, entity_id, image).await?;
        outcome.resolve(&placeholder, &asset, &mut urls);
        outcome.uploaded.push(asset);
    }

    outcome.html = rewrite_image_srcs(html, &urls);
    Ok(outcome)
}

/// Reconciles the entity's managed assets with `images` and rewrites
/// `html`.
#[instrument(skip(assets, html, images), fields(images = images.len()))]
pub(crate) async fn embed_for_update(
    assets: &AssetsManager,
    entity_id: i64,
    html: &str,
    images: &EmbeddedImages,
    options: EmbedOptions,
) -> Result<EmbedOutcome> {
    if images.is_empty() || html.is_empty() {
        return Ok(EmbedOutcome::unchanged(html));
    }

    let local = read_images(images).await?;
    let wanted: BTreeSet<(String, String)> = local
        .iter()
        .map(|image| (truncate_name(&image.placeholder), image.hash.clone()))
        .collect();

    // (logical name, hash) -> the managed asset backing it
    let mut kept: BTreeMap<(String, String), Record> = BTreeMap::new();
    let mut stale = Vec::new();
    for asset in assets.list_all(entity_id).await? {
        let Some(key) = asset
            .name()
            .and_then(parse_managed_asset_name)
            .map(|(name, hash)| (name.to_string(), hash.to_string()))
        else {
            continue;
        };
        if wanted.contains(&key) && !kept.contains_key(&key) {
            kept.insert(key, asset);
        } else {
            // Replaced, orphaned, or a duplicate of a kept asset.
            stale.push(asset);
        }
    }
    debug!(kept = kept.len(), stale = stale.len(), "found managed assets");

    let mut outcome = EmbedOutcome::default();
    for asset in stale {
        remove(assets, entity_id, &asset, options).await?;
        outcome.deleted.push(asset);
    }

    let mut reported = BTreeSet::new();
    let mut urls = Vec::new();
    for image in local {
        let key = (truncate_name(&image.placeholder), image.hash.clone());
        let placeholder = image.placeholder.clone();
        match kept.get(&key) {
            Some(asset) => {
                debug!(placeholder = %placeholder, "reusing managed asset");
                outcome.resolve(&placeholder, asset, &mut urls);
                if reported.insert(key) {
                    outcome.reused.push(asset.clone());
                }
            }
            None => {
                let asset = upload(assets, entity_id, image).await?;
                outcome.resolve(&placeholder, &asset, &mut urls);
                kept.insert(key.clone(), asset.clone());
                reported.insert(key);
                outcome.uploaded.push(asset);
            }
        }
    }

    outcome.html = rewrite_image_srcs(html, &urls);
    Ok(outcome)
}
