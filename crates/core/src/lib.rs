//! Domain core of the achievement service.
//!
//! Achievements are stored twice: content in a document store and lifecycle
//! status in a relational reference store. [`coordinator`] keeps the pair
//! consistent, [`workflow`] drives the verification state machine, and
//! [`scoring`] derives points from type-specific details. Storage and
//! notification backends plug in through the traits in [`ports`].

pub mod achievement;
pub mod authorization;
pub mod coordinator;
pub mod details;
pub mod error;
pub mod notification;
pub mod pagination;
pub mod ports;
pub mod roles;
pub mod scoring;
pub mod types;
pub mod workflow;

#[cfg(any(test, feature = "test-support"))]
pub mod memory;

#[cfg(test)]
mod properties;
