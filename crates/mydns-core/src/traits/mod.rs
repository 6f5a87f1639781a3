//! Core traits for the updater
//!
//! - [`DnsUpdater`]: Resolve the public IP and push it to the provider

pub mod dns_updater;

pub use dns_updater::{Credentials, DnsUpdater, UpdateResult, UpdateStatus};
