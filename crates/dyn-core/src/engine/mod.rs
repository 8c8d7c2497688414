//! Core sync engine
//!
//! The SyncEngine is the application context: it owns the public IP source,
//! the provider client and the validated configuration, and is passed to
//! every tick. It is responsible for:
//! - Discovering the public IP via PublicIpSource
//! - Locating the managed record via DnsProvider
//! - Reconciling the two and updating on drift
//! - Isolating per-tick failures from the loop
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Scheduler  │─── tick ───┐
//! └─────────────┘            │
//!                            ▼
//!                   ┌──────────────┐
//!                   │  SyncEngine  │
//!                   └──────────────┘
//!                            │
//!         ┌──────────────────┼──────────────────┐
//!         │                  │                  │
//!         ▼                  ▼                  ▼
//! ┌───────────────┐  ┌───────────────┐  ┌─────────────┐
//! │PublicIpSource │  │  DnsProvider  │  │   Events    │
//! │ (resolve)     │  │(locate/update)│  │  (notify)   │
//! └───────────────┘  └───────────────┘  └─────────────┘
//! ```
//!
//! ## Tick Flow
//!
//! 1. Resolve the public IP
//! 2. Resolve the zone and list its A records
//! 3. Find the record by exact fully-qualified name
//! 4. Update it if its address differs
//! 5. Emit events for monitoring/logging

use crate::config::{DynConfig, ResolutionFailurePolicy};
use crate::error::{Error, Result};
use crate::locator::locate_record;
use crate::reconciler::{ReconcileOutcome, reconcile};
use crate::scheduler::Scheduler;
use crate::traits::{DnsProvider, PublicIpSource};
use std::future::Future;
use std::net::Ipv4Addr;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, error, info, warn};

/// Events emitted by the SyncEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// Engine started its loop
    Started {
        record_name: String,
        tick: Duration,
    },

    /// Public IP discovered for this tick
    PublicIpResolved { ip: Ipv4Addr },

    /// No A record with the configured name exists
    RecordNotFound { record_name: String },

    /// Record already holds the public IP
    InSync {
        record_name: String,
        ip: Ipv4Addr,
    },

    /// Record address differs from the public IP; update follows
    OutOfSync {
        record_name: String,
        recorded: Option<Ipv4Addr>,
        public_ip: Ipv4Addr,
    },

    /// Record updated to the public IP
    Updated {
        record_name: String,
        previous: Option<Ipv4Addr>,
        current: Ipv4Addr,
    },

    /// Tick ended early because of an error
    TickFailed { error: String },

    /// Engine stopped
    Stopped { reason: String },
}

/// Outcome of a single successful tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing to reconcile: the record does not exist
    RecordNotFound,
    /// The record already holds the public IP
    Unchanged { ip: Ipv4Addr },
    /// The record was updated
    Updated {
        previous: Option<Ipv4Addr>,
        current: Ipv4Addr,
    },
}

/// Core sync engine
///
/// ## Lifecycle
///
/// 1. Create with [`SyncEngine::new()`]
/// 2. Run with [`SyncEngine::run_until()`] (or call [`SyncEngine::sync_once()`]
///    directly for a one-shot reconciliation)
/// 3. Loop ends when the shutdown future resolves, or on a fatal error
///
/// ## Concurrency
///
/// At most one reconciliation is in flight at a time. The scheduler never
/// overlaps ticks, and `sync_once` additionally serializes concurrent callers
/// so that two reconciliations cannot race on the same provider record.
pub struct SyncEngine {
    /// Public IP discovery
    public_ip: Box<dyn PublicIpSource>,

    /// DNS provider for locating and updating the record
    provider: Box<dyn DnsProvider>,

    /// Zone to manage
    zone: String,

    /// Record label inside the zone ("@" for the apex)
    record: String,

    /// Fully-qualified record name (for logs and events)
    fqdn: String,

    /// Tick period
    tick: Duration,

    /// Behavior on public IP discovery failure
    on_resolution_failure: ResolutionFailurePolicy,

    /// Held for the duration of a reconciliation
    in_flight: Mutex<()>,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<SyncEvent>,
}

impl SyncEngine {
    /// Create a new sync engine
    ///
    /// # Parameters
    ///
    /// - `public_ip`: Public IP source implementation
    /// - `provider`: DNS provider implementation
    /// - `config`: dyn configuration (validated here)
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine
    /// events. Dropping the receiver is allowed; events are then discarded.
    pub fn new(
        public_ip: Box<dyn PublicIpSource>,
        provider: Box<dyn DnsProvider>,
        config: DynConfig,
    ) -> Result<(Self, mpsc::Receiver<SyncEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.engine.event_channel_capacity);

        let fqdn = config.dns.fqdn();
        let engine = Self {
            public_ip,
            provider,
            zone: config.dns.zone,
            record: config.dns.record,
            fqdn,
            tick: config.tick,
            on_resolution_failure: config.engine.on_resolution_failure,
            in_flight: Mutex::new(()),
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// Fully-qualified name of the managed record
    pub fn record_name(&self) -> &str {
        &self.fqdn
    }

    /// Perform one complete reconciliation
    ///
    /// Every call rediscovers the public IP and re-reads the record from the
    /// provider; nothing is carried over from previous calls.
    ///
    /// # Returns
    ///
    /// - `Ok(TickOutcome)`: What the tick did
    /// - `Err(Error::Resolution)`: Public IP discovery failed
    /// - `Err(Error)`: Provider lookup or update failed
    pub async fn sync_once(&self) -> Result<TickOutcome> {
        let _guard = self.in_flight.lock().await;

        let public_ip = self.public_ip.public_ip().await?;
        debug!(
            "Public IP via {}: {}",
            self.public_ip.source_name(),
            public_ip
        );
        self.emit_event(SyncEvent::PublicIpResolved { ip: public_ip });

        let Some(located) =
            locate_record(self.provider.as_ref(), &self.zone, &self.record).await?
        else {
            warn!(
                "No A record named {} found at {}, nothing to sync",
                self.fqdn,
                self.provider.provider_name()
            );
            self.emit_event(SyncEvent::RecordNotFound {
                record_name: self.fqdn.clone(),
            });
            return Ok(TickOutcome::RecordNotFound);
        };

        if located.recorded_address != Some(public_ip) {
            self.emit_event(SyncEvent::OutOfSync {
                record_name: self.fqdn.clone(),
                recorded: located.recorded_address,
                public_ip,
            });
        }

        match reconcile(self.provider.as_ref(), public_ip, &located).await? {
            ReconcileOutcome::Unchanged { address } => {
                debug!("Record {} already has IP {}", self.fqdn, address);
                self.emit_event(SyncEvent::InSync {
                    record_name: self.fqdn.clone(),
                    ip: address,
                });
                Ok(TickOutcome::Unchanged { ip: address })
            }
            ReconcileOutcome::Updated { previous, current } => {
                self.emit_event(SyncEvent::Updated {
                    record_name: self.fqdn.clone(),
                    previous,
                    current,
                });
                Ok(TickOutcome::Updated { previous, current })
            }
        }
    }

    /// Run one scheduled tick, absorbing per-tick failures
    ///
    /// Only a resolution failure under [`ResolutionFailurePolicy::Exit`] is
    /// returned as an error; everything else is logged and swallowed so the
    /// loop continues.
    async fn run_tick(&self) -> Result<()> {
        match self.sync_once().await {
            Ok(_) => Ok(()),
            Err(e) => {
                self.emit_event(SyncEvent::TickFailed {
                    error: e.to_string(),
                });

                if is_fatal(&e, self.on_resolution_failure) {
                    error!("{}; stopping (onResolutionFailure = exit)", e);
                    return Err(e);
                }

                if e.is_resolution() {
                    error!("{}; skipping this tick", e);
                } else {
                    error!("Failed to sync {}: {}", self.fqdn, e);
                }
                Ok(())
            }
        }
    }

    /// Run the engine until `shutdown` resolves
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Clean shutdown
    /// - `Err(Error)`: Fatal error (resolution failure under the exit policy)
    pub async fn run_until<S>(&self, shutdown: S) -> Result<()>
    where
        S: Future<Output = ()>,
    {
        let scheduler = Scheduler::new(self.tick)?;

        info!(
            "Syncing {} every {:?} via {}",
            self.fqdn,
            self.tick,
            self.provider.provider_name()
        );
        self.emit_event(SyncEvent::Started {
            record_name: self.fqdn.clone(),
            tick: self.tick,
        });

        let result = scheduler.run(shutdown, || self.run_tick()).await;

        let reason = match &result {
            Ok(()) => "Shutdown signal".to_string(),
            Err(e) => e.to_string(),
        };
        info!("Engine stopped: {}", reason);
        self.emit_event(SyncEvent::Stopped { reason });

        result
    }

    /// Run the engine until the oneshot fires (or its sender is dropped)
    pub async fn run_with_shutdown(
        &self,
        shutdown_rx: tokio::sync::oneshot::Receiver<()>,
    ) -> Result<()> {
        self.run_until(async {
            let _ = shutdown_rx.await;
        })
        .await
    }

    /// Emit an engine event
    fn emit_event(&self, event: SyncEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
            }
            // Nobody is listening
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("record", &self.fqdn)
            .field("provider", &self.provider.provider_name())
            .field("public_ip", &self.public_ip.source_name())
            .field("tick", &self.tick)
            .finish()
    }
}

/// Whether `error` stops the loop under `policy`
pub fn is_fatal(error: &Error, policy: ResolutionFailurePolicy) -> bool {
    error.is_resolution() && policy == ResolutionFailurePolicy::Exit
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_resolution_errors_can_be_fatal() {
        let resolution = Error::resolution("timeout");
        let provider = Error::provider("cloudflare", "boom");

        assert!(is_fatal(&resolution, ResolutionFailurePolicy::Exit));
        assert!(!is_fatal(&resolution, ResolutionFailurePolicy::Skip));
        assert!(!is_fatal(&provider, ResolutionFailurePolicy::Exit));
        assert!(!is_fatal(&provider, ResolutionFailurePolicy::Skip));
    }

    #[test]
    fn test_event_equality() {
        let event = SyncEvent::Updated {
            record_name: "dyn.example.com".to_string(),
            previous: Some(Ipv4Addr::new(198, 51, 100, 5)),
            current: Ipv4Addr::new(198, 51, 100, 9),
        };
        assert_eq!(event.clone(), event);
    }
}
