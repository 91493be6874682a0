//! Live preview session for the add/edit website flow.
//!
//! ```text
//! Idle ─start─▶ Loading ─embed ok──▶ Loaded ─capture─▶ CaptureInProgress ─▶ Captured
//!                  │                                        ▲
//!                  └─timeout / embed error─▶ Failed ─auto───┘
//! ```
//!
//! Every transition out of `Loading` or `CaptureInProgress` is checked
//! against the session generation, so a late completion from a superseded
//! preview is dropped. `reset` and `start_preview` cancel whatever the
//! previous generation still has in flight, including its timeout.

use futures::future::BoxFuture;
use reqwest::header::{CONTENT_SECURITY_POLICY, X_FRAME_OPTIONS};
use reqwest::Client;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::fallback::{FallbackChain, FallbackStrategy};
use crate::resolver::{ImageRequest, ImageResolver};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SurfaceError {
    /// Target refused to be embedded (framing policy, HTTP error, ...)
    #[error("website blocks preview: {0}")]
    Blocked(String),

    /// The surface cannot take snapshots at all
    #[error("visual capture is not available")]
    Unsupported,

    #[error("capture refused: {0}")]
    CaptureRefused(String),
}

/// Where previews are embedded and snapshotted
pub trait PreviewSurface: Send + Sync {
    /// Completes when the page is displayed, or errors when it cannot be
    fn embed<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<(), SurfaceError>>;

    /// Snapshot of the currently embedded page as an image reference
    fn capture<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<String, SurfaceError>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    Timeout,
    Embed(String),
    Capture,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewState {
    Idle,
    Loading { url: String },
    Loaded { url: String },
    Failed { url: String, reason: FailureReason },
    CaptureInProgress { url: String },
    Captured { url: String, image: String, source: String },
}

impl PreviewState {
    pub fn url(&self) -> Option<&str> {
        match self {
            PreviewState::Idle => None,
            PreviewState::Loading { url }
            | PreviewState::Loaded { url }
            | PreviewState::Failed { url, .. }
            | PreviewState::CaptureInProgress { url }
            | PreviewState::Captured { url, .. } => Some(url),
        }
    }
}

/// Identifies one generation of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewTicket {
    generation: u64,
}

struct SessionInner {
    state: PreviewState,
    generation: u64,
    cancel: CancellationToken,
}

/// Snapshots the live page through the surface. A snapshot that takes
/// longer than `timeout` counts as declined.
struct LiveCapture {
    surface: Arc<dyn PreviewSurface>,
    timeout: Duration,
}

impl FallbackStrategy<ImageRequest, String> for LiveCapture {
    fn name(&self) -> &str {
        "live"
    }

    fn attempt<'a>(&'a self, input: &'a ImageRequest) -> BoxFuture<'a, Option<String>> {
        Box::pin(async move {
            match tokio::time::timeout(self.timeout, self.surface.capture(&input.url)).await {
                Ok(Ok(image)) => Some(image),
                Ok(Err(e)) => {
                    debug!("Live capture failed for {}: {}", input.url, e);
                    None
                }
                Err(_) => {
                    debug!("⏱️  Live capture of {} timed out after {:?}", input.url, self.timeout);
                    None
                }
            }
        })
    }
}

pub struct PreviewSession {
    inner: Mutex<SessionInner>,
    surface: Arc<dyn PreviewSurface>,
    timeout: Duration,
    /// Loaded path: live snapshot, then the resolver chain
    capture_chain: FallbackChain<ImageRequest, String>,
    /// Failed path: resolver chain only
    auto_capture_chain: FallbackChain<ImageRequest, String>,
}

impl PreviewSession {
    pub fn new(surface: Arc<dyn PreviewSurface>, resolver: Arc<ImageResolver>, timeout: Duration) -> Self {
        let capture_chain = FallbackChain::new()
            .push(LiveCapture {
                surface: surface.clone(),
                timeout,
            })
            .push(resolver.clone());
        let auto_capture_chain = FallbackChain::new().push(resolver);

        Self {
            inner: Mutex::new(SessionInner {
                state: PreviewState::Idle,
                generation: 0,
                cancel: CancellationToken::new(),
            }),
            surface,
            timeout,
            capture_chain,
            auto_capture_chain,
        }
    }

    pub fn state(&self) -> PreviewState {
        self.lock().state.clone()
    }

    pub fn is_current(&self, ticket: PreviewTicket) -> bool {
        self.lock().generation == ticket.generation
    }

    /// Begins a new preview, superseding any previous one
    pub fn start_preview(&self, url: &str) -> PreviewTicket {
        self.begin(url).0
    }

    fn begin(&self, url: &str) -> (PreviewTicket, CancellationToken) {
        let mut inner = self.lock();
        let ticket = Self::advance(&mut inner);
        inner.state = PreviewState::Loading {
            url: url.to_string(),
        };
        debug!("Preview generation {} loading {}", ticket.generation, url);
        (ticket, inner.cancel.clone())
    }

    /// Back to `Idle`, cancelling anything in flight
    pub fn reset(&self) {
        let mut inner = self.lock();
        Self::advance(&mut inner);
        inner.state = PreviewState::Idle;
    }

    /// Embed signal. Ignored unless `ticket` is current and still loading.
    pub fn mark_loaded(&self, ticket: PreviewTicket) -> bool {
        self.transition_from_loading(ticket, |url| PreviewState::Loaded { url })
    }

    /// Timeout or embed failure. Same staleness rules as `mark_loaded`.
    pub fn mark_failed(&self, ticket: PreviewTicket, reason: FailureReason) -> bool {
        self.transition_from_loading(ticket, |url| PreviewState::Failed { url, reason })
    }

    /// Starts a preview of `url` and races the embed against the timeout.
    ///
    /// Returns the state this generation ended in, or `None` if it was
    /// superseded before either side finished.
    pub async fn load(&self, url: &str) -> Option<PreviewState> {
        let (ticket, cancel) = self.begin(url);

        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Preview of {} superseded", url);
                return None;
            }
            outcome = self.surface.embed(url) => match outcome {
                Ok(()) => {
                    self.mark_loaded(ticket);
                    info!("✅ Preview loaded: {}", url);
                }
                Err(e) => {
                    warn!("⚠️  Preview failed for {}: {}", url, e);
                    self.mark_failed(ticket, FailureReason::Embed(e.to_string()));
                }
            },
            _ = tokio::time::sleep(self.timeout) => {
                warn!("⏱️  Preview of {} timed out after {:?}", url, self.timeout);
                self.mark_failed(ticket, FailureReason::Timeout);
            }
        }

        self.is_current(ticket).then(|| self.state())
    }

    /// Produces an image for the current target.
    ///
    /// From `Loaded` the live page is snapshotted, falling back to the
    /// resolver chain on any capture error. From `Failed` the resolver chain
    /// runs directly. Returns `None` when there is nothing to capture or the
    /// session was reset meanwhile.
    pub async fn capture(&self, name: &str) -> Option<String> {
        let (ticket, url, live, cancel) = {
            let mut inner = self.lock();
            let (url, live) = match &inner.state {
                PreviewState::Loaded { url } => (url.clone(), true),
                PreviewState::Failed { url, .. } => (url.clone(), false),
                PreviewState::Captured { image, .. } => return Some(image.clone()),
                _ => return None,
            };
            inner.state = PreviewState::CaptureInProgress { url: url.clone() };
            let ticket = PreviewTicket {
                generation: inner.generation,
            };
            (ticket, url, live, inner.cancel.clone())
        };

        let request = ImageRequest::new(url.clone(), name);
        let chain = if live {
            &self.capture_chain
        } else {
            &self.auto_capture_chain
        };

        let resolved = tokio::select! {
            _ = cancel.cancelled() => return None,
            resolved = chain.run(&request) => resolved,
        };

        let mut inner = self.lock();
        if inner.generation != ticket.generation {
            return None;
        }
        match resolved {
            Some(resolved) => {
                info!("📸 Screenshot for {} via {}", url, resolved.source);
                inner.state = PreviewState::Captured {
                    url,
                    image: resolved.value.clone(),
                    source: resolved.source,
                };
                Some(resolved.value)
            }
            None => {
                inner.state = PreviewState::Failed {
                    url,
                    reason: FailureReason::Capture,
                };
                None
            }
        }
    }

    /// The captured image, if the session ended with one
    pub fn result(&self) -> Option<String> {
        match &self.lock().state {
            PreviewState::Captured { image, .. } => Some(image.clone()),
            _ => None,
        }
    }

    fn transition_from_loading(
        &self,
        ticket: PreviewTicket,
        next: impl FnOnce(String) -> PreviewState,
    ) -> bool {
        let mut inner = self.lock();
        if inner.generation != ticket.generation {
            debug!("Ignoring stale preview signal (generation {})", ticket.generation);
            return false;
        }
        let url = match &inner.state {
            PreviewState::Loading { url } => url.clone(),
            _ => return false,
        };
        inner.state = next(url);
        true
    }

    fn advance(inner: &mut SessionInner) -> PreviewTicket {
        inner.cancel.cancel();
        inner.cancel = CancellationToken::new();
        inner.generation += 1;
        PreviewTicket {
            generation: inner.generation,
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// True if the response headers forbid third-party framing
pub fn frame_policy_blocks(x_frame_options: Option<&str>, csp: Option<&str>) -> bool {
    if let Some(xfo) = x_frame_options {
        let xfo = xfo.trim().to_ascii_lowercase();
        if xfo == "deny" || xfo == "sameorigin" {
            return true;
        }
    }
    if let Some(csp) = csp {
        for directive in csp.split(';') {
            let mut parts = directive.split_whitespace();
            if parts.next().map(str::to_ascii_lowercase).as_deref() == Some("frame-ancestors") {
                let sources: Vec<&str> = parts.collect();
                return !sources.contains(&"*");
            }
        }
    }
    false
}

/// Headless surface: fetches the page and honours its framing policy.
/// It has no renderer, so live capture is always unsupported and capture
/// falls through to the resolver chain.
pub struct HttpCheckSurface {
    client: Client,
}

impl HttpCheckSurface {
    pub fn new(timeout: Duration) -> crate::error::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;
        Ok(Self { client })
    }
}

impl PreviewSurface for HttpCheckSurface {
    fn embed<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<(), SurfaceError>> {
        Box::pin(async move {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| SurfaceError::Blocked(e.to_string()))?;

            if !response.status().is_success() {
                return Err(SurfaceError::Blocked(format!("HTTP {}", response.status())));
            }
            let headers = response.headers();
            let xfo = headers.get(X_FRAME_OPTIONS).and_then(|v| v.to_str().ok());
            let csp = headers.get(CONTENT_SECURITY_POLICY).and_then(|v| v.to_str().ok());
            if frame_policy_blocks(xfo, csp) {
                return Err(SurfaceError::Blocked("framing policy".to_string()));
            }
            Ok(())
        })
    }

    fn capture<'a>(&'a self, _url: &'a str) -> BoxFuture<'a, Result<String, SurfaceError>> {
        Box::pin(async { Err(SurfaceError::Unsupported) })
    }
}
