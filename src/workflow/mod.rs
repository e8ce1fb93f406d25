//! Task status transition and stakeholder-approval workflow.
//!
//! A task moves through a fixed lifecycle (`todo → task_review →
//! in_progress → result_review → done`, with cancel/reactivate
//! side-paths). When the task creator requests a transition and the task
//! has other stakeholders, the change is deferred behind a ballot that
//! every enrolled stakeholder must approve; a single rejection is a hard
//! stop. The module follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
