//! Addressing and enumeration types shared by the managers.

mod api_url;
mod ids;
mod visibility;

pub use api_url::ApiUrl;
pub use ids::{EntityRef, RecordRef};
pub use visibility::{AssetKind, ImageSlot, Visibility};
