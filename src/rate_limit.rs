// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Client Rate Limiter
//!
//! Per-client GCRA limiters (`governor`) keyed by client address.
//!
//! Each client may burst up to `requests_per_minute` requests and regains
//! one request every `60 / requests_per_minute` seconds. An exhausted
//! client is denied with 429.
//!
//! ## Client Keys
//!
//! The key is the socket peer address. `X-Forwarded-For` and `X-Real-IP`
//! are only read when the peer is a configured trusted proxy; from anyone
//! else they are ignored.
//!
//! ## Memory Bound
//!
//! Limiters are created lazily on first sight of a client key. A background
//! sweeper removes clients idle for longer than the idle TTL, so churn of
//! distinct client keys does not grow the map without bound.
//!
//! ## Shutdown
//!
//! The sweeper exits when its `CancellationToken` is cancelled.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use governor::{
    clock::{Clock, DefaultClock, Reference},
    middleware::NoOpMiddleware,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::auth::AuthError;
use crate::i18n::Locale;

/// Default interval between sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Default idle time after which a client's limiter is dropped.
pub const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(10 * 60);

/// Key used when no client address can be determined.
pub const UNKNOWN_CLIENT: &str = "unknown";

type DirectLimiter<C> =
    RateLimiter<NotKeyed, InMemoryState, C, NoOpMiddleware<<C as Clock>::Instant>>;

/// Proxy addresses allowed to report the original client via forwarding headers.
#[derive(Debug, Clone, Default)]
pub struct TrustedProxies(Arc<[IpAddr]>);

impl TrustedProxies {
    pub fn new(proxies: impl IntoIterator<Item = IpAddr>) -> Self {
        Self(proxies.into_iter().collect())
    }

    pub fn trusts(&self, ip: IpAddr) -> bool {
        self.0.contains(&ip)
    }
}

struct ClientEntry<C: Clock> {
    limiter: DirectLimiter<C>,
    last_seen: C::Instant,
}

/// Per-client limiter shared by every request.
pub struct ClientRateLimiter<C: Clock = DefaultClock> {
    requests_per_minute: NonZeroU32,
    quota: Quota,
    clients: Mutex<HashMap<String, ClientEntry<C>>>,
    clock: C,
    proxies: TrustedProxies,
    idle_ttl: Duration,
    sweep_interval: Duration,
}

impl<C: Clock + Clone> std::fmt::Debug for ClientRateLimiter<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientRateLimiter")
            .field("requests_per_minute", &self.requests_per_minute)
            .field("clients", &self.len())
            .field("trusted_proxies", &self.proxies)
            .field("idle_ttl", &self.idle_ttl)
            .field("sweep_interval", &self.sweep_interval)
            .finish()
    }
}

impl ClientRateLimiter {
    /// Create a limiter on the default monotonic clock.
    pub fn new(requests_per_minute: NonZeroU32) -> Self {
        Self::with_clock(requests_per_minute, DefaultClock::default())
    }
}

impl<C: Clock + Clone> ClientRateLimiter<C> {
    pub fn with_clock(requests_per_minute: NonZeroU32, clock: C) -> Self {
        Self {
            requests_per_minute,
            quota: Quota::per_minute(requests_per_minute),
            clients: Mutex::new(HashMap::new()),
            clock,
            proxies: TrustedProxies::default(),
            idle_ttl: DEFAULT_IDLE_TTL,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }

    pub fn with_trusted_proxies(mut self, proxies: TrustedProxies) -> Self {
        self.proxies = proxies;
        self
    }

    pub fn with_idle_ttl(mut self, idle_ttl: Duration) -> Self {
        self.idle_ttl = idle_ttl;
        self
    }

    pub fn with_sweep_interval(mut self, sweep_interval: Duration) -> Self {
        self.sweep_interval = sweep_interval;
        self
    }

    pub fn requests_per_minute(&self) -> u32 {
        self.requests_per_minute.get()
    }

    pub fn trusted_proxies(&self) -> &TrustedProxies {
        &self.proxies
    }

    fn clients(&self) -> MutexGuard<'_, HashMap<String, ClientEntry<C>>> {
        self.clients.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a request from `key`. Returns `false` when the client is over quota.
    pub fn admit(&self, key: &str) -> bool {
        let now = self.clock.now();
        let mut clients = self.clients();

        let entry = clients
            .entry(key.to_string())
            .or_insert_with(|| ClientEntry {
                limiter: RateLimiter::direct_with_clock(self.quota, self.clock.clone()),
                last_seen: now,
            });
        entry.last_seen = now;
        entry.limiter.check().is_ok()
    }

    /// Drop clients idle for longer than the TTL. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let ttl = self.idle_ttl;
        let mut clients = self.clients();

        let before = clients.len();
        clients.retain(|_, entry| Duration::from(now.duration_since(entry.last_seen)) <= ttl);
        before - clients.len()
    }

    /// Number of tracked clients.
    pub fn len(&self) -> usize {
        self.clients().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &str) -> bool {
        self.clients().contains_key(key)
    }

    /// Run the sweeper until the cancellation token is triggered.
    ///
    /// ```rust,ignore
    /// tokio::spawn(limiter.clone().run_sweeper(shutdown.clone()));
    /// ```
    pub async fn run_sweeper(self: Arc<Self>, shutdown: CancellationToken) {
        info!(
            interval_secs = self.sweep_interval.as_secs(),
            idle_ttl_secs = self.idle_ttl.as_secs(),
            "Rate limiter sweeper starting"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.sweep_interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Rate limiter sweeper shutting down");
                    return;
                }
            }

            let removed = self.sweep();
            if removed > 0 {
                debug!(removed, remaining = self.len(), "Swept idle rate limit clients");
            }
        }
    }
}

/// Resolve the key identifying a client.
///
/// The socket peer address, unless the peer is a trusted proxy, in which
/// case the first `X-Forwarded-For` entry, then `X-Real-IP`, is preferred.
/// Without a peer address every request shares [`UNKNOWN_CLIENT`].
pub fn client_key(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    proxies: &TrustedProxies,
) -> String {
    let Some(peer) = peer.map(|addr| addr.ip()) else {
        return UNKNOWN_CLIENT.to_string();
    };

    if proxies.trusts(peer) {
        if let Some(forwarded) = forwarded_client(headers) {
            return forwarded.to_string();
        }
    }

    peer.to_string()
}

fn forwarded_client(headers: &HeaderMap) -> Option<IpAddr> {
    let header_ip = |name: &str, first_only: bool| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|v| match first_only {
                true => v.split(',').next().unwrap_or(v),
                false => v,
            })
            .and_then(|v| v.trim().parse::<IpAddr>().ok())
    };

    header_ip("x-forwarded-for", true).or_else(|| header_ip("x-real-ip", false))
}

/// Peer address recorded by `into_make_service_with_connect_info`.
pub(crate) fn peer_addr(request: &Request) -> Option<SocketAddr> {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr)
}

/// Axum middleware applying the limiter to every request.
pub async fn rate_limit(
    State(limiter): State<Arc<ClientRateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let key = client_key(request.headers(), peer_addr(&request), limiter.trusted_proxies());

    if limiter.admit(&key) {
        return next.run(request).await;
    }

    warn!(client_key = %key, path = %request.uri().path(), "Rate limit exceeded");
    AuthError::RateLimited.into_localized_response(Locale::from_headers(request.headers()))
}
