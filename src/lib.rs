//! Greenlight: stakeholder sign-off for task lifecycles.
//!
//! This crate provides the state-machine core of a project-management
//! backend: validated task status transitions, an append-only status
//! ledger, and a multi-party approval workflow in which a dynamic set of
//! stakeholders must unanimously sign off before certain transitions take
//! effect.
//!
//! # Architecture
//!
//! Greenlight follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports (database, test doubles)
//!
//! The crate owns no wire protocol: it is invoked by a REST layer that
//! resolves actor identity and renders outcomes, both out of scope here.
//!
//! # Modules
//!
//! - [`workflow`]: Status transitions, ballots, and notification fan-out

pub mod workflow;
