//! Load sequence tracking for the model asset
//!
//! The sequence is probe → fetch → ready/failed, bounded by a timeout. Every
//! attempt gets a ticket; callbacks carrying an old ticket (a previous
//! attempt, or anything after unmount) are discarded.

use glam::Vec3;
use std::time::Duration;
use thiserror::Error;

/// User-facing load failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadFailure {
    #[error("Could not find 3D model file ({status}). Please check that the file exists.")]
    NotFound { status: u16 },
    #[error("Network error when checking model file: {0}. Please check your connection.")]
    Network(String),
    #[error("Failed to load 3D model: {0}. Please try refreshing the page.")]
    Parse(String),
}

impl LoadFailure {
    pub fn is_not_found(&self) -> bool {
        matches!(self, LoadFailure::NotFound { .. })
    }
}

/// Fatal start-up failure; no retry besides a page reload
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InitError {
    #[error("Failed to initialize 3D viewer: {0}. Your browser may not support WebGL.")]
    NoGraphics(String),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum LoadStatus {
    #[default]
    Loading,
    Ready,
    Failed(LoadFailure),
}

impl LoadStatus {
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadStatus::Loading)
    }

    pub fn failure(&self) -> Option<&LoadFailure> {
        match self {
            LoadStatus::Failed(f) => Some(f),
            _ => None,
        }
    }
}

/// Outcome of the HEAD-style existence check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeResponse {
    pub exists: bool,
    pub status: u16,
}

impl ProbeResponse {
    pub fn from_status(status: u16) -> Self {
        Self {
            exists: (200..300).contains(&status),
            status,
        }
    }
}

/// Model location plus cache-busting policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRequest {
    pub url: String,
    pub cache_bust: bool,
}

impl AssetRequest {
    pub fn new(url: impl Into<String>, cache_bust: bool) -> Self {
        Self {
            url: url.into(),
            cache_bust,
        }
    }

    /// URL for the existence probe, with `v=<token>` when cache busting
    pub fn probe_url(&self, token: u64) -> String {
        if !self.cache_bust {
            return self.url.clone();
        }
        let separator = if self.url.contains('?') { '&' } else { '?' };
        format!("{}{}v={}", self.url, separator, token)
    }

    pub fn is_remote(&self) -> bool {
        self.url.starts_with("http://") || self.url.starts_with("https://")
    }
}

/// Identifies one load attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoadTicket(u64);

impl LoadTicket {
    pub fn generation(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadPhase {
    #[default]
    Idle,
    Probing,
    Fetching,
    Settled,
}

/// What the caller should do after a probe result
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeStep {
    StartFetch,
    Failed(LoadFailure),
    /// Failure arrived after the timeout resolved the attempt; keep the placeholder
    Ignored,
    /// Ticket no longer current; do nothing
    Stale,
}

/// State machine for one mounted viewer's model load
#[derive(Debug, Clone)]
pub struct LoadTracker {
    generation: u64,
    phase: LoadPhase,
    status: LoadStatus,
    started_at: Duration,
    timeout: Duration,
    timed_out: bool,
    live: bool,
}

impl LoadTracker {
    pub fn new(timeout: Duration) -> Self {
        Self {
            generation: 0,
            phase: LoadPhase::Idle,
            status: LoadStatus::Loading,
            started_at: Duration::ZERO,
            timeout,
            timed_out: false,
            live: true,
        }
    }

    /// Start a new attempt; older tickets become stale
    pub fn begin(&mut self, now: Duration) -> LoadTicket {
        self.generation += 1;
        self.phase = LoadPhase::Probing;
        self.status = LoadStatus::Loading;
        self.started_at = now;
        self.timed_out = false;
        self.live = true;
        tracing::debug!(generation = self.generation, "Model load started");
        LoadTicket(self.generation)
    }

    pub fn is_current(&self, ticket: LoadTicket) -> bool {
        self.live && ticket.0 == self.generation
    }

    /// Move straight to fetching when probing is disabled
    pub fn skip_probe(&mut self, ticket: LoadTicket) -> bool {
        if !self.is_current(ticket) || self.phase != LoadPhase::Probing {
            return false;
        }
        self.phase = LoadPhase::Fetching;
        true
    }

    pub fn on_probe(&mut self, ticket: LoadTicket, result: Result<ProbeResponse, String>) -> ProbeStep {
        if !self.is_current(ticket) || self.phase != LoadPhase::Probing {
            tracing::debug!(generation = ticket.0, "Discarding stale probe result");
            return ProbeStep::Stale;
        }

        let failure = match result {
            Ok(probe) if probe.exists => {
                self.phase = LoadPhase::Fetching;
                return ProbeStep::StartFetch;
            }
            Ok(probe) => LoadFailure::NotFound { status: probe.status },
            Err(e) => LoadFailure::Network(e),
        };
        if self.timed_out {
            tracing::warn!(error = %failure, "Model probe failed after timeout; keeping placeholder");
            self.phase = LoadPhase::Settled;
            return ProbeStep::Ignored;
        }
        self.settle(LoadStatus::Failed(failure.clone()));
        ProbeStep::Failed(failure)
    }

    /// Record a successful parse. Accepted after a timeout too, so a slow
    /// model still replaces the placeholder.
    pub fn on_loaded(&mut self, ticket: LoadTicket) -> bool {
        if !self.is_current(ticket) || self.phase != LoadPhase::Fetching {
            tracing::debug!(generation = ticket.0, "Discarding stale load result");
            return false;
        }
        self.settle(LoadStatus::Ready);
        true
    }

    /// Record a fetch/parse failure. Ignored once the timeout has resolved
    /// the attempt.
    pub fn on_failed(&mut self, ticket: LoadTicket, message: impl Into<String>) -> Option<LoadFailure> {
        if !self.is_current(ticket) || self.phase != LoadPhase::Fetching {
            return None;
        }
        let message = message.into();
        if self.timed_out {
            tracing::warn!(error = %message, "Model failed after timeout; keeping placeholder");
            self.phase = LoadPhase::Settled;
            return None;
        }
        let failure = LoadFailure::Parse(message);
        self.settle(LoadStatus::Failed(failure.clone()));
        Some(failure)
    }

    /// Resolve a hung attempt as done without an error. Returns true once,
    /// on the frame the timeout fires.
    pub fn poll_timeout(&mut self, now: Duration) -> bool {
        let pending = matches!(self.phase, LoadPhase::Probing | LoadPhase::Fetching);
        if !self.live || !pending || self.timed_out {
            return false;
        }
        if now.saturating_sub(self.started_at) < self.timeout {
            return false;
        }
        self.timed_out = true;
        self.status = LoadStatus::Ready;
        tracing::warn!(
            timeout_secs = self.timeout.as_secs_f32(),
            "Model load timed out; continuing with placeholder"
        );
        true
    }

    /// Invalidate every outstanding ticket (unmount)
    pub fn cancel(&mut self) {
        self.live = false;
        self.generation += 1;
        self.phase = LoadPhase::Idle;
    }

    pub fn status(&self) -> &LoadStatus {
        &self.status
    }

    pub fn phase(&self) -> LoadPhase {
        self.phase
    }

    pub fn timed_out(&self) -> bool {
        self.timed_out
    }

    fn settle(&mut self, status: LoadStatus) {
        self.phase = LoadPhase::Settled;
        self.status = status;
    }
}

/// Advisory progress; `None` when the total is unknown
pub fn progress_fraction(loaded: u64, total: Option<u64>) -> Option<f32> {
    match total {
        Some(total) if total > 0 => Some((loaded as f32 / total as f32).clamp(0.0, 1.0)),
        _ => None,
    }
}

/// Axis-aligned bounds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Bounds {
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        Some(iter.fold(Bounds { min: first, max: first }, |b, p| Bounds {
            min: b.min.min(p),
            max: b.max.max(p),
        }))
    }

    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Uniform scale and offset that fit these bounds into a `target_size`
    /// box centered at the origin
    pub fn normalization(&self, target_size: f32) -> Normalization {
        let max_dim = self.size().max_element();
        let scale = if max_dim > f32::EPSILON { target_size / max_dim } else { 1.0 };
        Normalization {
            scale,
            translation: -self.center() * scale,
        }
    }
}

/// Transform applied to the model root after loading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalization {
    pub scale: f32,
    pub translation: Vec3,
}

impl Normalization {
    pub fn apply(&self, point: Vec3) -> Vec3 {
        point * self.scale + self.translation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(20);

    #[test]
    fn test_failure_messages() {
        let not_found = LoadFailure::NotFound { status: 404 };
        assert!(not_found.is_not_found());
        assert_eq!(
            not_found.to_string(),
            "Could not find 3D model file (404). Please check that the file exists."
        );
        assert!(LoadFailure::Network("offline".into()).to_string().contains("offline"));
        assert!(InitError::NoGraphics("no adapter".into()).to_string().contains("WebGL"));
    }

    #[test]
    fn test_probe_url_cache_bust() {
        let request = AssetRequest::new("models/quadcopter.glb", true);
        assert_eq!(request.probe_url(42), "models/quadcopter.glb?v=42");

        let request = AssetRequest::new("https://cdn.example.org/m.glb?token=a", true);
        assert_eq!(request.probe_url(7), "https://cdn.example.org/m.glb?token=a&v=7");
        assert!(request.is_remote());

        let request = AssetRequest::new("models/quadcopter.glb", false);
        assert_eq!(request.probe_url(42), "models/quadcopter.glb");
    }

    #[test]
    fn test_probe_status_classes() {
        assert!(ProbeResponse::from_status(200).exists);
        assert!(ProbeResponse::from_status(204).exists);
        assert!(!ProbeResponse::from_status(304).exists);
        assert!(!ProbeResponse::from_status(404).exists);
    }

    #[test]
    fn test_happy_path() {
        let mut tracker = LoadTracker::new(TIMEOUT);
        let ticket = tracker.begin(Duration::ZERO);
        assert!(tracker.status().is_loading());

        let step = tracker.on_probe(ticket, Ok(ProbeResponse::from_status(200)));
        assert_eq!(step, ProbeStep::StartFetch);
        assert_eq!(tracker.phase(), LoadPhase::Fetching);

        assert!(tracker.on_loaded(ticket));
        assert_eq!(tracker.status(), &LoadStatus::Ready);
        assert!(!tracker.poll_timeout(Duration::from_secs(60)));
    }

    #[test]
    fn test_probe_404_then_retry() {
        let mut tracker = LoadTracker::new(TIMEOUT);
        let first = tracker.begin(Duration::ZERO);
        let step = tracker.on_probe(first, Ok(ProbeResponse::from_status(404)));
        assert_eq!(step, ProbeStep::Failed(LoadFailure::NotFound { status: 404 }));
        assert!(tracker.status().failure().unwrap().is_not_found());

        // Retry issues a new probe under a new ticket
        let second = tracker.begin(Duration::from_secs(1));
        assert_ne!(first, second);
        assert!(tracker.status().is_loading());
        assert_eq!(tracker.phase(), LoadPhase::Probing);
        assert_eq!(
            tracker.on_probe(second, Ok(ProbeResponse::from_status(200))),
            ProbeStep::StartFetch
        );
    }

    #[test]
    fn test_network_error() {
        let mut tracker = LoadTracker::new(TIMEOUT);
        let ticket = tracker.begin(Duration::ZERO);
        let step = tracker.on_probe(ticket, Err("connection refused".into()));
        assert!(matches!(step, ProbeStep::Failed(LoadFailure::Network(_))));
    }

    #[test]
    fn test_parse_failure() {
        let mut tracker = LoadTracker::new(TIMEOUT);
        let ticket = tracker.begin(Duration::ZERO);
        assert!(tracker.skip_probe(ticket));
        let failure = tracker.on_failed(ticket, "invalid glb header").unwrap();
        assert_eq!(tracker.status(), &LoadStatus::Failed(failure));
    }

    #[test]
    fn test_timeout_resolves_without_error() {
        let mut tracker = LoadTracker::new(TIMEOUT);
        let ticket = tracker.begin(Duration::from_secs(1));
        tracker.on_probe(ticket, Ok(ProbeResponse::from_status(200)));

        assert!(!tracker.poll_timeout(Duration::from_secs(20)));
        assert!(tracker.poll_timeout(Duration::from_secs(21)));
        assert_eq!(tracker.status(), &LoadStatus::Ready);
        assert!(tracker.timed_out());
        // Fires once
        assert!(!tracker.poll_timeout(Duration::from_secs(22)));

        // A late failure is swallowed, a late success would still be taken
        assert!(tracker.on_failed(ticket, "late").is_none());
        assert_eq!(tracker.status(), &LoadStatus::Ready);
    }

    #[test]
    fn test_probe_failure_after_timeout_ignored() {
        let mut tracker = LoadTracker::new(TIMEOUT);
        let ticket = tracker.begin(Duration::ZERO);
        assert!(tracker.poll_timeout(Duration::from_secs(21)));
        assert_eq!(tracker.status(), &LoadStatus::Ready);

        let step = tracker.on_probe(ticket, Err("connection reset".to_string()));
        assert_eq!(step, ProbeStep::Ignored);
        assert_eq!(tracker.status(), &LoadStatus::Ready);
        assert_eq!(tracker.phase(), LoadPhase::Settled);

        // A 404 after the timeout is treated the same way
        let ticket = tracker.begin(Duration::from_secs(30));
        tracker.poll_timeout(Duration::from_secs(60));
        assert_eq!(tracker.on_probe(ticket, Ok(ProbeResponse::from_status(404))), ProbeStep::Ignored);
        assert!(tracker.status().failure().is_none());
    }

    #[test]
    fn test_late_probe_success_after_timeout_still_fetches() {
        let mut tracker = LoadTracker::new(TIMEOUT);
        let ticket = tracker.begin(Duration::ZERO);
        tracker.poll_timeout(Duration::from_secs(21));
        assert_eq!(tracker.on_probe(ticket, Ok(ProbeResponse::from_status(200))), ProbeStep::StartFetch);
        assert!(tracker.on_loaded(ticket));
        assert_eq!(tracker.status(), &LoadStatus::Ready);
    }

    #[test]
    fn test_late_success_after_timeout_accepted() {
        let mut tracker = LoadTracker::new(TIMEOUT);
        let ticket = tracker.begin(Duration::ZERO);
        tracker.skip_probe(ticket);
        tracker.poll_timeout(Duration::from_secs(30));
        assert!(tracker.on_loaded(ticket));
        assert_eq!(tracker.phase(), LoadPhase::Settled);
    }

    #[test]
    fn test_cancel_makes_callbacks_noops() {
        let mut tracker = LoadTracker::new(TIMEOUT);
        let ticket = tracker.begin(Duration::ZERO);
        tracker.on_probe(ticket, Ok(ProbeResponse::from_status(200)));
        tracker.cancel();

        assert!(!tracker.on_loaded(ticket));
        assert!(tracker.on_failed(ticket, "late").is_none());
        assert!(!tracker.poll_timeout(Duration::from_secs(60)));
        assert!(tracker.status().is_loading());
    }

    #[test]
    fn test_stale_ticket_ignored() {
        let mut tracker = LoadTracker::new(TIMEOUT);
        let old = tracker.begin(Duration::ZERO);
        let current = tracker.begin(Duration::from_secs(1));

        assert_eq!(
            tracker.on_probe(old, Ok(ProbeResponse::from_status(404))),
            ProbeStep::Stale
        );
        assert!(tracker.status().is_loading());
        assert!(tracker.is_current(current));
    }

    #[test]
    fn test_progress_fraction() {
        assert_eq!(progress_fraction(50, Some(200)), Some(0.25));
        assert_eq!(progress_fraction(500, Some(200)), Some(1.0));
        assert_eq!(progress_fraction(50, None), None);
        assert_eq!(progress_fraction(50, Some(0)), None);
    }

    #[test]
    fn test_normalization() {
        let bounds = Bounds::from_points([Vec3::new(-1.0, 0.0, -2.0), Vec3::new(3.0, 1.0, 2.0)]).unwrap();
        let norm = bounds.normalization(2.0);
        assert_eq!(norm.scale, 0.5);

        let min = norm.apply(bounds.min);
        let max = norm.apply(bounds.max);
        assert!(((max - min).max_element() - 2.0).abs() < 1e-6);
        assert!(((min + max) * 0.5).length() < 1e-6);
    }

    #[test]
    fn test_degenerate_bounds() {
        let bounds = Bounds::from_points([Vec3::ONE]).unwrap();
        assert_eq!(bounds.normalization(2.0).scale, 1.0);
        assert!(Bounds::from_points(std::iter::empty()).is_none());
    }
}
