//! Adapters implementing the domain ports.

pub mod inference;
pub mod prober;
pub mod store;
