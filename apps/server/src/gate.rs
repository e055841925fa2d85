//! Admission control for broadcast blocks.
//!
//! A block is admitted when the shared rate limiter has a token and the
//! sender's address belongs to the trusted domain. Admitted blocks are
//! queued for the proposal worker; the caller never waits on processing.

use async_trait::async_trait;
use governor::clock::{Clock, DefaultClock};
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use proposal_core::Block;
use std::net::{IpAddr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

type DirectLimiter<C> =
    RateLimiter<NotKeyed, InMemoryState, C, NoOpMiddleware<<C as Clock>::Instant>>;

/// Why a block was not admitted.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Rejection {
    #[error("broadcast rate limit exceeded")]
    RateLimited,
    #[error("sender not trusted: {0}")]
    AuthRejected(String),
    #[error("proposal queue full")]
    QueueFull,
    #[error("proposal queue closed")]
    QueueClosed,
}

#[derive(Debug, Error)]
pub enum GateError {
    #[error("rate limit interval must be non-zero")]
    ZeroInterval,
}

/// Resolves a host name to its current addresses.
#[async_trait]
pub trait HostResolver: Send + Sync {
    async fn resolve(&self, host: &str) -> std::io::Result<Vec<IpAddr>>;
}

/// System resolver; every call performs a fresh lookup.
pub struct DnsResolver;

#[async_trait]
impl HostResolver for DnsResolver {
    async fn resolve(&self, host: &str) -> std::io::Result<Vec<IpAddr>> {
        let addrs = tokio::net::lookup_host((host, 0)).await?;
        Ok(addrs.map(|addr| addr.ip()).collect())
    }
}

/// Who may broadcast blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SenderPolicy {
    /// Sender address must be one of the domain's addresses.
    TrustedDomain(String),
    /// Accept any sender (development only).
    AllowAll,
}

/// Gate settings.
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// One token is replenished per interval.
    pub interval: Duration,
    pub burst: NonZeroU32,
    pub policy: SenderPolicy,
}

impl GateConfig {
    /// One block per three seconds, no burst.
    pub fn new(policy: SenderPolicy) -> Self {
        Self {
            interval: Duration::from_secs(3),
            burst: NonZeroU32::MIN,
            policy,
        }
    }
}

/// Gate counters.
#[derive(Debug, Default)]
pub struct GateStats {
    pub admitted: AtomicU64,
    pub rate_limited: AtomicU64,
    pub auth_rejected: AtomicU64,
    pub queue_dropped: AtomicU64,
}

/// Snapshot of [`GateStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateSummary {
    pub admitted: u64,
    pub rate_limited: u64,
    pub auth_rejected: u64,
    pub queue_dropped: u64,
}

impl GateStats {
    fn record(&self, outcome: &Result<(), Rejection>) {
        let counter = match outcome {
            Ok(()) => &self.admitted,
            Err(Rejection::RateLimited) => &self.rate_limited,
            Err(Rejection::AuthRejected(_)) => &self.auth_rejected,
            Err(Rejection::QueueFull | Rejection::QueueClosed) => &self.queue_dropped,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn summary(&self) -> GateSummary {
        GateSummary {
            admitted: self.admitted.load(Ordering::Relaxed),
            rate_limited: self.rate_limited.load(Ordering::Relaxed),
            auth_rejected: self.auth_rejected.load(Ordering::Relaxed),
            queue_dropped: self.queue_dropped.load(Ordering::Relaxed),
        }
    }
}

/// Rate-limited, authenticated entry point for broadcast blocks.
pub struct IngestionGate<C: Clock = DefaultClock> {
    limiter: DirectLimiter<C>,
    policy: SenderPolicy,
    resolver: Arc<dyn HostResolver>,
    queue: mpsc::Sender<Block>,
    stats: GateStats,
}

impl IngestionGate<DefaultClock> {
    pub fn new(
        config: GateConfig,
        resolver: Arc<dyn HostResolver>,
        queue: mpsc::Sender<Block>,
    ) -> Result<Self, GateError> {
        Self::with_clock(config, resolver, queue, &DefaultClock::default())
    }
}

impl<C: Clock> IngestionGate<C> {
    pub fn with_clock(
        config: GateConfig,
        resolver: Arc<dyn HostResolver>,
        queue: mpsc::Sender<Block>,
        clock: &C,
    ) -> Result<Self, GateError> {
        let quota = Quota::with_period(config.interval)
            .ok_or(GateError::ZeroInterval)?
            .allow_burst(config.burst);

        Ok(Self {
            limiter: RateLimiter::direct_with_clock(quota, clock),
            policy: config.policy,
            resolver,
            queue,
            stats: GateStats::default(),
        })
    }

    pub fn stats(&self) -> &GateStats {
        &self.stats
    }

    /// Admit or drop a block. Returns true if it was queued for processing.
    pub async fn admit(&self, sender: Option<SocketAddr>, block: Block) -> bool {
        let outcome = self.try_admit(sender, block).await;
        self.stats.record(&outcome);

        match &outcome {
            Ok(()) => debug!(?sender, "Block admitted"),
            Err(Rejection::RateLimited) => {
                info!(?sender, "Broadcast rate limit exceeded, dropping block")
            }
            Err(e) => warn!(?sender, reason = %e, "Dropping block"),
        }
        outcome.is_ok()
    }

    async fn try_admit(&self, sender: Option<SocketAddr>, block: Block) -> Result<(), Rejection> {
        if self.limiter.check().is_err() {
            return Err(Rejection::RateLimited);
        }

        self.authenticate(sender).await?;

        self.queue.try_send(block).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => Rejection::QueueFull,
            mpsc::error::TrySendError::Closed(_) => Rejection::QueueClosed,
        })
    }

    async fn authenticate(&self, sender: Option<SocketAddr>) -> Result<(), Rejection> {
        let domain = match &self.policy {
            SenderPolicy::AllowAll => return Ok(()),
            SenderPolicy::TrustedDomain(domain) => domain,
        };

        let sender_ip = sender
            .map(|addr| addr.ip().to_canonical())
            .ok_or_else(|| Rejection::AuthRejected("no peer address".to_string()))?;

        let trusted = self.resolver.resolve(domain).await.map_err(|e| {
            Rejection::AuthRejected(format!("failed to resolve {domain}: {e}"))
        })?;

        if trusted.iter().any(|ip| ip.to_canonical() == sender_ip) {
            Ok(())
        } else {
            Err(Rejection::AuthRejected(format!(
                "{sender_ip} does not match {domain}"
            )))
        }
    }
}
