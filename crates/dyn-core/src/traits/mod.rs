//! Core traits for the dyn agent
//!
//! These are the two capability interfaces the reconciliation loop needs:
//!
//! - [`PublicIpSource`]: Discover the caller's public IPv4 address
//! - [`DnsProvider`]: Read and update records via a provider API

pub mod dns_provider;
pub mod public_ip;

pub use dns_provider::{DnsProvider, DnsRecord, RecordType};
pub use public_ip::PublicIpSource;
