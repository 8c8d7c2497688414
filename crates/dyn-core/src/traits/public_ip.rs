// # Public IP Source Trait
//
// Defines the interface for discovering the caller's public IPv4 address.
//
// ## Implementations
//
// - DNS echo query against an explicit resolver: `dyn-ip-dns` crate
//
// ## Usage
//
// ```rust,ignore
// use dyn_core::PublicIpSource;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let source = /* PublicIpSource implementation */;
//
//     let ip = source.public_ip().await?;
//     println!("public IP: {}", ip);
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::net::Ipv4Addr;

/// Trait for public IP discovery
///
/// A source performs exactly one discovery attempt per call. It must not
/// retry, cache across calls or spawn background work; the scheduler's next
/// tick is the retry.
#[async_trait]
pub trait PublicIpSource: Send + Sync {
    /// Discover the current public IPv4 address
    ///
    /// # Returns
    ///
    /// - `Ok(Ipv4Addr)`: The first address returned by the discovery mechanism
    /// - `Err(Error::Resolution)`: Network unreachable, timeout, empty or
    ///   unparsable answer
    async fn public_ip(&self) -> Result<Ipv4Addr, crate::Error>;

    /// Get the source name (for logging/debugging)
    fn source_name(&self) -> &'static str;
}
