// # DNS Public IP Source
//
// This crate discovers the caller's public IPv4 address with a DNS query.
//
// ## How It Works
//
// Some resolvers answer a special hostname with the address the query came
// from (OpenDNS: `myip.opendns.com` at `resolver1.opendns.com`). Asking that
// resolver directly for the hostname's A record returns our public address.
//
// ## IMPORTANT: Bypasses the System Resolver
//
// The query goes straight to the configured resolver over UDP. The host's
// resolv.conf, hosts file and any caching resolver are ignored: a local or
// ISP resolver may not implement the echo convention, or may answer with a
// different address.
//
// ## Single-Shot
//
// One attempt per call, bounded by the configured timeout. No retry and no
// caching; the engine's next tick is the retry.

use async_trait::async_trait;
use dyn_core::config::{PublicIpQuery, split_resolver};
use dyn_core::traits::PublicIpSource;
use dyn_core::{Error, Result};
use hickory_resolver::TokioAsyncResolver;
use hickory_resolver::config::{NameServerConfig, Protocol, ResolverConfig, ResolverOpts};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Public IP source backed by a DNS echo query
#[derive(Debug, Clone)]
pub struct DnsPublicIpSource {
    query: PublicIpQuery,
}

impl DnsPublicIpSource {
    /// Create a new DNS public IP source
    ///
    /// # Parameters
    ///
    /// - `query`: Hostname, resolver and timeout to use
    ///
    /// # Returns
    ///
    /// - `Err(Error::Config)`: Empty host, malformed `host[:port]` resolver or
    ///   zero timeout
    pub fn new(query: PublicIpQuery) -> Result<Self> {
        query.validate()?;
        Ok(Self { query })
    }

    /// The query this source sends
    pub fn query(&self) -> &PublicIpQuery {
        &self.query
    }

    /// Resolve the configured resolver to a socket address
    ///
    /// Accepts `ip`, `ip:port`, `host` or `host:port`. Hostnames go through
    /// the system resolver once, only to find the resolver itself.
    async fn resolver_addr(&self) -> Result<SocketAddr> {
        let (host, port) = split_resolver(&self.query.resolver).ok_or_else(|| {
            Error::resolution(format!("Invalid resolver address '{}'", self.query.resolver))
        })?;

        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(SocketAddr::new(ip, port));
        }

        let mut addrs = tokio::net::lookup_host((host, port)).await.map_err(|e| {
            Error::resolution(format!("Failed to resolve resolver {}: {}", host, e))
        })?;

        addrs
            .find(|a| a.is_ipv4())
            .ok_or_else(|| Error::resolution(format!("Resolver {} has no IPv4 address", host)))
    }

    /// Build a resolver that only talks to `addr`
    fn build_resolver(&self, addr: SocketAddr) -> TokioAsyncResolver {
        let mut config = ResolverConfig::new();
        config.add_name_server(NameServerConfig::new(addr, Protocol::Udp));

        let mut opts = ResolverOpts::default();
        opts.timeout = self.query.timeout;
        opts.attempts = 1;
        opts.cache_size = 0;
        opts.use_hosts_file = false;

        TokioAsyncResolver::tokio(config, opts)
    }

    async fn lookup(&self) -> Result<Ipv4Addr> {
        let addr = self.resolver_addr().await?;
        let resolver = self.build_resolver(addr);

        tracing::debug!("Querying {} for {} (A)", addr, self.query.host);

        let lookup = resolver.ipv4_lookup(self.query.host.as_str()).await.map_err(|e| {
            Error::resolution(format!(
                "DNS lookup of {} via {} failed: {}",
                self.query.host, addr, e
            ))
        })?;

        // First answer wins; answer order is up to the resolver
        lookup.iter().next().map(|a| a.0).ok_or_else(|| {
            Error::resolution(format!(
                "DNS lookup of {} via {} returned no addresses",
                self.query.host, addr
            ))
        })
    }
}

#[async_trait]
impl PublicIpSource for DnsPublicIpSource {
    async fn public_ip(&self) -> Result<Ipv4Addr> {
        // Covers resolving the resolver's own name as well as the query
        tokio::time::timeout(self.query.timeout, self.lookup())
            .await
            .map_err(|_| {
                Error::resolution(format!(
                    "DNS lookup of {} via {} timed out after {:?}",
                    self.query.host, self.query.resolver, self.query.timeout
                ))
            })?
    }

    fn source_name(&self) -> &'static str {
        "dns"
    }
}
