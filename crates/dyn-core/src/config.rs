//! Configuration types for the dyn agent
//!
//! These are the *resolved* configuration values. Reading files and the
//! environment is the daemon's job; the core only validates what it is given.

use std::time::Duration;

/// Label that designates the zone apex instead of a subdomain
pub const ROOT_RECORD: &str = "@";

/// Default "echo my address" hostname
pub const DEFAULT_PUBLIC_IP_HOST: &str = "myip.opendns.com";

/// Default resolver that answers the echo hostname
pub const DEFAULT_PUBLIC_IP_RESOLVER: &str = "resolver1.opendns.com";

/// Default timeout for the public IP query
pub const DEFAULT_PUBLIC_IP_TIMEOUT: Duration = Duration::from_secs(5);

/// Port used when the resolver is given without one
pub const DEFAULT_DNS_PORT: u16 = 53;

/// Default capacity of the engine event channel
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 100;

/// Main dyn configuration
#[derive(Debug, Clone)]
pub struct DynConfig {
    /// DNS provider configuration
    pub provider: ProviderConfig,

    /// Zone and record to keep in sync
    pub dns: DnsConfig,

    /// Poll interval
    pub tick: Duration,

    /// Public IP discovery settings
    pub public_ip: PublicIpQuery,

    /// Optional engine settings
    pub engine: EngineConfig,
}

impl DynConfig {
    /// Create a configuration for `record` in `zone`, polled every `tick`
    pub fn new(provider: ProviderConfig, dns: DnsConfig, tick: Duration) -> Self {
        Self {
            provider,
            dns,
            tick,
            public_ip: PublicIpQuery::default(),
            engine: EngineConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.tick.is_zero() {
            return Err(crate::Error::config("tick must be greater than zero"));
        }

        self.provider.validate()?;
        self.dns.validate()?;
        self.public_ip.validate()?;
        self.engine.validate()?;

        Ok(())
    }
}

/// DNS provider configuration
#[derive(Clone)]
pub enum ProviderConfig {
    /// Cloudflare provider
    Cloudflare {
        /// Global API key (used together with `email`)
        api_key: Option<String>,
        /// Account email owning the API key
        email: Option<String>,
        /// Scoped API token (alternative to key + email)
        api_token: Option<String>,
        /// Perform reads but only log updates
        dry_run: bool,
    },
}

// Credentials must never reach Debug output
impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderConfig::Cloudflare {
                api_key,
                email,
                api_token,
                dry_run,
            } => f
                .debug_struct("Cloudflare")
                .field("api_key", &api_key.as_ref().map(|_| "<REDACTED>"))
                .field("email", email)
                .field("api_token", &api_token.as_ref().map(|_| "<REDACTED>"))
                .field("dry_run", dry_run)
                .finish(),
        }
    }
}

impl ProviderConfig {
    /// Validate the provider configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ProviderConfig::Cloudflare {
                api_key,
                email,
                api_token,
                ..
            } => {
                let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());

                if present(api_token) {
                    check_not_placeholder("provider.apiToken", api_token.as_deref().unwrap_or_default())?;
                    return Ok(());
                }

                match (present(api_key), present(email)) {
                    (true, true) => {
                        check_not_placeholder("provider.apiKey", api_key.as_deref().unwrap_or_default())?;
                        Ok(())
                    }
                    (true, false) => Err(crate::Error::config(
                        "provider.email is required when provider.apiKey is set",
                    )),
                    (false, true) => Err(crate::Error::config(
                        "provider.apiKey is required when provider.email is set",
                    )),
                    (false, false) => Err(crate::Error::config(
                        "provider credentials are required: set provider.apiToken, \
                         or provider.apiKey and provider.email",
                    )),
                }
            }
        }
    }
}

fn check_not_placeholder(key: &str, value: &str) -> Result<(), crate::Error> {
    let lower = value.to_lowercase();
    if lower.contains("your_key")
        || lower.contains("your_token")
        || lower.contains("replace_me")
        || lower == "token"
    {
        return Err(crate::Error::config(format!(
            "{} appears to be a placeholder. Use an actual credential from your DNS provider.",
            key
        )));
    }
    Ok(())
}

/// Zone and record to manage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsConfig {
    /// Zone name (e.g., "example.com")
    pub zone: String,

    /// Subdomain label (e.g., "home"), or "@" for the zone apex
    pub record: String,
}

impl DnsConfig {
    /// Create a new zone/record pair
    pub fn new(zone: impl Into<String>, record: impl Into<String>) -> Self {
        Self {
            zone: zone.into(),
            record: record.into(),
        }
    }

    /// Fully-qualified name of the managed record
    ///
    /// `"home"` in `"example.com"` is `"home.example.com"`; the root form
    /// (`"@"` or an empty label) is the zone name itself.
    pub fn fqdn(&self) -> String {
        record_fqdn(&self.zone, &self.record)
    }

    /// Validate the zone and record names
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.zone.is_empty() {
            return Err(crate::Error::config("dns.zone is required"));
        }
        validate_domain_name(&self.zone)?;

        if !is_root_record(&self.record) {
            validate_domain_name(&self.record)?;
        }

        Ok(())
    }
}

/// Whether a configured record label designates the zone apex
pub fn is_root_record(record: &str) -> bool {
    record.is_empty() || record == ROOT_RECORD
}

/// Build the fully-qualified name for `record` in `zone`
pub fn record_fqdn(zone: &str, record: &str) -> String {
    if is_root_record(record) {
        zone.to_string()
    } else {
        format!("{}.{}", record, zone)
    }
}

/// Validate that a string is a valid domain name
///
/// Basic RFC 1035 checks: total length, label length, characters and
/// hyphen placement.
pub fn validate_domain_name(domain: &str) -> Result<(), crate::Error> {
    if domain.is_empty() {
        return Err(crate::Error::config("Domain name cannot be empty"));
    }

    if domain.len() > 253 {
        return Err(crate::Error::config(format!(
            "Domain name too long: {} chars (max 253). Got: {}",
            domain.len(),
            domain
        )));
    }

    for label in domain.split('.') {
        if label.is_empty() {
            return Err(crate::Error::config(format!(
                "Domain name has empty label: '{}'",
                domain
            )));
        }

        if label.len() > 63 {
            return Err(crate::Error::config(format!(
                "Domain label too long: {} chars (max 63). Label: '{}'",
                label.len(),
                label
            )));
        }

        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err(crate::Error::config(format!(
                "Domain label contains invalid characters. Label: '{}'",
                label
            )));
        }

        if label.starts_with('-') || label.ends_with('-') {
            return Err(crate::Error::config(format!(
                "Domain label cannot start or end with hyphen. Label: '{}'",
                label
            )));
        }
    }

    Ok(())
}

/// Parse a duration string such as `"5m"`, `"90s"` or `"1h 30m"`
pub fn parse_duration(key: &str, value: &str) -> Result<Duration, crate::Error> {
    humantime::parse_duration(value.trim())
        .map_err(|e| crate::Error::config(format!("{} '{}' is not a valid duration: {}", key, value, e)))
}

/// Public IP discovery query
///
/// Immutable per invocation: the resolver builds a fresh client from it on
/// every tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicIpQuery {
    /// Hostname whose A record echoes the querying client's address
    pub host: String,

    /// Resolver to query, as `host` or `host:port` (port 53 by default)
    pub resolver: String,

    /// Upper bound for the whole query
    pub timeout: Duration,
}

impl PublicIpQuery {
    /// Validate the query settings
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.host.is_empty() {
            return Err(crate::Error::config("publicIp.host cannot be empty"));
        }
        if split_resolver(&self.resolver).is_none() {
            return Err(crate::Error::config(format!(
                "publicIp.resolver '{}' is not valid. Expected host or host:port (e.g. resolver1.opendns.com:53)",
                self.resolver
            )));
        }
        if self.timeout.is_zero() {
            return Err(crate::Error::config("publicIp.timeout must be greater than zero"));
        }
        Ok(())
    }
}

/// Split a resolver address into host and port
///
/// Accepts `host`, `host:port`, a bare IPv6 literal or `[ipv6]:port`; the port
/// defaults to 53. Returns `None` for an empty host or an unparsable port.
pub fn split_resolver(value: &str) -> Option<(&str, u16)> {
    let value = value.trim();

    // A bare IPv6 literal contains colons but no port
    if value.parse::<std::net::IpAddr>().is_ok() {
        return Some((value, DEFAULT_DNS_PORT));
    }

    let (host, port) = match value.rsplit_once(':') {
        Some((host, port)) => (host, port.parse::<u16>().ok()?),
        None => (value, DEFAULT_DNS_PORT),
    };
    let host = host.trim_start_matches('[').trim_end_matches(']');

    if host.is_empty() || host.contains(char::is_whitespace) {
        return None;
    }
    Some((host, port))
}

impl Default for PublicIpQuery {
    fn default() -> Self {
        Self {
            host: DEFAULT_PUBLIC_IP_HOST.to_string(),
            resolver: DEFAULT_PUBLIC_IP_RESOLVER.to_string(),
            timeout: DEFAULT_PUBLIC_IP_TIMEOUT,
        }
    }
}

/// What to do when public IP discovery fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResolutionFailurePolicy {
    /// Log the failure and wait for the next tick
    #[default]
    Skip,
    /// Stop the loop and report the error to the caller
    Exit,
}

impl std::str::FromStr for ResolutionFailurePolicy {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "exit" => Ok(Self::Exit),
            other => Err(crate::Error::config(format!(
                "engine.onResolutionFailure '{}' is not valid. Valid values: skip, exit",
                other
            ))),
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Behavior when the public IP cannot be discovered
    pub on_resolution_failure: ResolutionFailurePolicy,

    /// Capacity of the engine event channel
    ///
    /// When full, new events are dropped with a warning log.
    pub event_channel_capacity: usize,
}

impl EngineConfig {
    /// Validate the engine settings
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("event channel capacity must be > 0"));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            on_resolution_failure: ResolutionFailurePolicy::default(),
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
        }
    }
}
