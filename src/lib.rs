//! # Mimirtool provider
//!
//! A provider plugin that manages the Alertmanager configuration of a
//! [Grafana Mimir](https://grafana.com/docs/mimir/latest/) tenant through a
//! declarative resource model.
//!
//! ## Features
//!
//! - Connection settings from the provider block, `MIMIRTOOL_*` or `MIMIR_*`
//!   environment variables
//! - Basic auth, bearer token and client certificate authentication
//! - A single `mimirtool_alertmanager` resource mapping create, read, update
//!   and delete onto Mimir's Alertmanager configuration API
//!
//! ## Example
//!
//! ```rust,no_run
//! use mimirtool_provider::framework::{object_from_json, CreateRequest, Provider, Resource};
//! use mimirtool_provider::{factory, Context};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let provider = factory("dev")();
//!     let ctx = Context::new();
//!
//!     let config = object_from_json(json!({"address": "http://localhost:9009"}))
//!         .ok_or("provider config must be an object")?;
//!     let configured = provider.configure(&ctx, &config).await;
//!
//!     let mut resource = (provider.resources()[0])();
//!     resource.configure(configured.provider_data);
//!
//!     let plan = object_from_json(json!({"config_yaml": "route:\n  receiver: default\n"}))
//!         .ok_or("plan must be an object")?;
//!     let created = resource.create(&ctx, CreateRequest { plan }).await;
//!     for diagnostic in &created.diagnostics {
//!         eprintln!("{diagnostic}");
//!     }
//!     Ok(())
//! }
//! ```

mod client;
mod config;
mod context;
mod errors;
pub mod framework;
pub mod logging;
mod provider;
mod resource_alertmanager;
mod tls;
mod types;

pub use client::MimirClient;
pub use config::{
    layered, parse_bool, ConfigError, ConnectionSettings, Environment, ProcessEnvironment,
    ProviderConfig, Sensitive, Setting,
};
pub use context::{Cancelled, Context};
pub use errors::{MimirError, Result};
pub use provider::{factory, MimirtoolProvider, PROVIDER_TYPE_NAME};
pub use resource_alertmanager::{AlertmanagerResource, ALERTMANAGER_ID};
pub use tls::TlsConfig;
pub use types::AlertmanagerUserConfig;
