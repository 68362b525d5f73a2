//! User activity cache.
//!
//! Answers "is the current caller active?" cheaply by caching the last
//! verdict for a TTL window, and re-querying the remote status source only
//! when the cached verdict is absent or stale. Failures fail closed: any
//! lookup error, and a caller with no status record at all, both resolve to
//! inactive. The check never panics and never returns a lookup error to the
//! gate.

use crate::clock::Clock;
use crate::error::{DeskError, Result};
use crate::notify::{InactiveNotice, Notifier};
use chrono::{DateTime, TimeDelta, Utc};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A cached verdict is trusted for this long before being re-queried.
pub const VERDICT_TTL: Duration = Duration::from_secs(5 * 60);

/// Remote source of the caller's active flag.
///
/// `Ok(None)` means the caller has no status record, which is treated
/// identically to inactive.
pub trait StatusSource: Send + Sync {
    fn fetch_active(&self, user_id: &str) -> Result<Option<bool>>;
}

/// The active/inactive result of one status query, plus when it was taken.
/// Superseded by the next query, never mutated in place.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActivityVerdict {
    pub active: bool,
    pub checked_at: DateTime<Utc>,
}

/// TTL-cached activity checks for a single session.
///
/// The cache entry is shared process-wide: concurrent gated calls within one
/// TTL window reuse whichever verdict was fetched first. Every negative
/// verdict, cached or freshly queried, broadcasts an inactive notice.
pub struct ActivityCache {
    source: Arc<dyn StatusSource>,
    clock: Arc<dyn Clock>,
    notifier: Arc<Notifier>,
    user_id: String,
    ttl: TimeDelta,
    verdict: Mutex<Option<ActivityVerdict>>,
}

impl ActivityCache {
    pub fn new(
        source: Arc<dyn StatusSource>,
        clock: Arc<dyn Clock>,
        notifier: Arc<Notifier>,
        user_id: impl Into<String>,
    ) -> Self {
        Self::with_ttl(source, clock, notifier, user_id, VERDICT_TTL)
    }

    /// TTL override, used by tests and callers with unusual staleness needs.
    pub fn with_ttl(
        source: Arc<dyn StatusSource>,
        clock: Arc<dyn Clock>,
        notifier: Arc<Notifier>,
        user_id: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        Self {
            source,
            clock,
            notifier,
            user_id: user_id.into(),
            ttl: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX),
            verdict: Mutex::new(None),
        }
    }

    /// Returns the caller's active flag, re-querying only when the cached
    /// verdict is absent or older than the TTL.
    pub fn check_activity(&self) -> bool {
        if let Some(active) = self.fresh_cached_verdict() {
            tracing::debug!(active, user = %self.user_id, "activity verdict served from cache");
            if !active {
                self.notify_inactive();
            }
            return active;
        }
        self.refresh()
    }

    /// Unconditionally re-queries the status source, bypassing the TTL, and
    /// replaces the cached verdict.
    pub fn refresh(&self) -> bool {
        let active = self.query_active();
        let verdict = ActivityVerdict {
            active,
            checked_at: self.clock.now(),
        };
        if let Ok(mut cached) = self.verdict.lock() {
            *cached = Some(verdict);
        }
        tracing::debug!(active, user = %self.user_id, "activity verdict refreshed");
        if !active {
            self.notify_inactive();
        }
        active
    }

    /// The most recent verdict, fresh or stale, if any query has run.
    pub fn last_verdict(&self) -> Option<ActivityVerdict> {
        self.verdict.lock().ok().and_then(|v| *v)
    }

    /// Returns the cached active flag only while the verdict is younger than
    /// the TTL. A negative age (clock moved backwards) counts as stale.
    fn fresh_cached_verdict(&self) -> Option<bool> {
        let cached = self.verdict.lock().ok()?;
        let verdict = cached.as_ref()?;
        let age = self.clock.now().signed_duration_since(verdict.checked_at);
        if age >= TimeDelta::zero() && age < self.ttl {
            Some(verdict.active)
        } else {
            None
        }
    }

    /// Fail-closed status query: lookup errors and missing status records
    /// both resolve to inactive.
    fn query_active(&self) -> bool {
        match self.source.fetch_active(&self.user_id) {
            Ok(Some(active)) => active,
            Ok(None) => {
                tracing::warn!(user = %self.user_id, "no status record for user, failing closed");
                false
            }
            Err(err) => {
                tracing::warn!(user = %self.user_id, error = %err, "status lookup failed, failing closed");
                false
            }
        }
    }

    fn notify_inactive(&self) {
        self.notifier
            .broadcast(&InactiveNotice::new(DeskError::InactiveUser.to_string()));
    }
}

impl std::fmt::Debug for ActivityCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivityCache")
            .field("user_id", &self.user_id)
            .field("ttl", &self.ttl)
            .field("verdict", &self.last_verdict())
            .finish()
    }
}
