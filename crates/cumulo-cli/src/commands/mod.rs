//! CLI command implementations.
//!
//! Each submodule implements one command family:
//! - [`stack`] - Stack lifecycle, SSL and configuration files
//! - [`service`] - Container service control and scaling
//! - [`snapshot`] - Snapshot listing and formation rendering
//! - [`formation`] - Formations, stencils, bundles and deployment
//! - [`env_var`] - Stack environment variables
//! - [`account`] - Organization accounts
//! - [`profile`] - Local connection profiles

pub mod account;
pub mod env_var;
pub mod formation;
pub mod profile;
pub mod service;
pub mod snapshot;
pub mod stack;

pub use account::AccountCommand;
pub use env_var::EnvVarCommand;
pub use formation::FormationCommand;
pub use profile::ProfileCommand;
pub use service::ServiceCommand;
pub use snapshot::SnapshotCommand;
pub use stack::StackCommand;
