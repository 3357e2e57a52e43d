//! kanka-http - reqwest transport for the Kanka campaign API client.
//!
//! # Example
//!
//! ```no_run
//! use kanka_core::{ClientConfig, ListOptions};
//!
//! # async fn example() -> Result<(), kanka_core::Error> {
//! let client = kanka_http::connect(ClientConfig::new("token", 42))?;
//!
//! for character in client.characters().list(&ListOptions::new()).await? {
//!     println!("{:?}", character.name());
//! }
//! # Ok(())
//! # }
//! ```

mod transport;

use std::sync::Arc;

use kanka_core::{ClientConfig, KankaClient};

pub use transport::ReqwestTransport;

/// Builds a client that talks to the configured server over HTTPS.
pub fn connect(config: ClientConfig) -> kanka_core::Result<KankaClient> {
    let transport = ReqwestTransport::new()?;
    Ok(KankaClient::new(config, Arc::new(transport)))
}
