//! # cumulo-cli
//!
//! Command-line toolbelt for the Cumulo control plane.
//!
//! The binary is `cumulo`. It talks to the control plane through
//! [`cumulo_api`] and runs formation deployment workflows through
//! [`cumulo_workflow`]. Connection profiles (API URL plus access token)
//! live under `~/.cumulo/`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bundle;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;
pub mod prompt;
pub mod resolver;

pub use error::CliError;
