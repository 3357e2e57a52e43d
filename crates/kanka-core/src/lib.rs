//! kanka-core - Typed client for the Kanka campaign API.
//!
//! A [`KankaClient`] holds one [`EntityManager`] per record type. Managers
//! turn a static schema table into CRUD, list filtering and the posts,
//! assets and images sub-resources. All requests go through one
//! [`RequestExecutor`], which classifies status codes and retries 429s per
//! the [`RetryPolicy`]. The HTTP implementation is plugged in through the
//! [`Transport`] trait (see the `kanka-http` crate).
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use kanka_core::{ClientConfig, Fields, KankaClient, ListOptions, Transport};
//!
//! # async fn example(transport: Arc<dyn Transport>) -> Result<(), kanka_core::Error> {
//! let client = KankaClient::new(ClientConfig::new("token", 42), transport);
//!
//! let aria = client
//!     .characters()
//!     .create(Fields::new().set("name", "Aria").set("title", "Wanderer"))
//!     .await?;
//!
//! let aria = client
//!     .characters()
//!     .update(&aria, Fields::new().set("title", "Archmage"))
//!     .await?;
//!
//! for character in client.characters().list(&ListOptions::new().limit(10)).await? {
//!     println!("{:?}: {:?}", character.id(), character.name());
//! }
//! # let _ = aria;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod executor;
pub mod manager;
pub mod pagination;
pub mod query;
pub mod record;
pub mod retry;
pub mod tokens;
pub mod transport;
pub mod types;

// Re-export primary types at crate root for convenience
pub use client::{ClientConfig, KankaClient};
pub use error::Error;
pub use executor::{ApiPath, RequestExecutor};
pub use manager::{
    AssetsManager, EmbedOptions, EmbedOutcome, EmbeddedImages, EntityManager, FileAssetOptions,
    GalleryManager, ImagesManager, PostsManager,
};
pub use pagination::Pagination;
pub use query::{Filters, ListOptions};
pub use record::{Field, FieldType, FieldValue, Fields, Record, RecordKind, Schema};
pub use retry::RetryPolicy;
pub use tokens::ApiToken;
pub use transport::{HttpRequest, HttpResponse, Method, MultipartForm, RequestBody, Transport};
pub use types::{ApiUrl, AssetKind, EntityRef, ImageSlot, RecordRef, Visibility};

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;
