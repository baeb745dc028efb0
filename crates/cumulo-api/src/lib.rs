//! # cumulo-api
//!
//! Typed client for the Cumulo control plane HTTP API.
//!
//! The control plane does the heavy lifting (deployment orchestration,
//! stencil rendering, scheduling); this crate only models its resources and
//! wraps the REST endpoints the toolbelt needs:
//!
//! - accounts, stacks and servers
//! - container services and their lifecycle actions
//! - snapshots, formations, stencils and render requests
//! - SSL certificates, environment variables, configuration files
//! - asynchronous actions and their polling
//!
//! All responses arrive wrapped in a `{"response": ...}` envelope; errors
//! carry the HTTP status and the server-provided message.
//!
//! # Example
//!
//! ```rust,no_run
//! use cumulo_api::Client;
//!
//! # async fn example() -> Result<(), cumulo_api::ApiError> {
//! let client = Client::new("https://app.cumulo.dev/api/v3", "token")?;
//! for stack in client.stacks(None).await? {
//!     println!("{} ({})", stack.name, stack.environment);
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod account;
pub mod async_action;
pub mod bundle;
pub mod client;
pub mod config_file;
pub mod env_var;
pub mod error;
pub mod formation;
pub mod render;
pub mod server;
pub mod service;
pub mod snapshot;
pub mod ssl;
pub mod stack;

pub use account::Account;
pub use async_action::AsyncAction;
pub use bundle::{BundleBaseTemplate, BundleHelmRelease, BundleItem, BundleManifest, BundleStencil};
pub use client::{Client, OperationResponse, RedeployOptions, WorkflowDocument};
pub use config_file::{ConfigFile, ConfigFileVersion};
pub use env_var::EnvVar;
pub use error::{ApiError, ApiResult};
pub use formation::{BaseTemplate, Formation, HelmRelease, Policy, Stencil, StencilGroup, Transformation};
pub use render::{RenderIssue, RenderedStencil, Renders};
pub use server::{find_server, Server};
pub use service::{ScaleTarget, Service, ServiceAction};
pub use snapshot::Snapshot;
pub use ssl::{CertificateType, SslCertificate};
pub use stack::Stack;
