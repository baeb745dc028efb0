//! # cumulo-workflow
//!
//! Workflow engine for formation deployments.
//!
//! The control plane hands the toolbelt a workflow document: a set of named
//! shell steps with dependencies between them. This crate parses the
//! document, validates the step graph and runs it with bounded concurrency,
//! per-step timeouts and an overall deadline.
//!
//! Step failures do not abort the run; they skip the failed step's
//! dependents (unless the step is marked `continue_on_fail`) and are
//! reported in the [`WorkflowReport`]. Only structural problems (bad
//! document, cycles, deadline exceeded) surface as [`WorkflowError`]s.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod executor;
pub mod types;

pub use error::{WorkflowError, WorkflowResult};
pub use executor::{Runner, RunnerOptions, StepOutcome, StepStatus, WorkflowReport};
pub use types::{Step, Workflow};
