//! Admission gate in front of the serving chain.
//!
//! # Responsibilities
//! - Hold every request until the route build has finished
//! - Release held requests forward, carrying the failure if the build failed
//! - Track admitted requests until their responses are fully delivered
//! - Remove itself from the registry once the build is over and nothing it
//!   admitted is still in flight
//!
//! # Design Decisions
//! - Bookkeeping (phase + pending tickets) sits behind one mutex; the
//!   retirement check runs under it, so concurrent completions and the
//!   signal's transition cannot double-remove
//! - Completion is observed by dropping an `Admission` guard that travels
//!   inside the response body. Finished, failed and abandoned requests all
//!   drop it, so no ticket outlives its request
//! - The gate holds the registry weakly; the registry owns the gate layer

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::task::{Context, Poll};
use std::time::Instant;

use axum::body::Body;
use axum::response::Response;
use bytes::Bytes;
use http_body::{Frame, SizeHint};
use parking_lot::Mutex;

use crate::engine::{handler_fn, Handler, HandlerChain, LayerId, Next, RouteRegistry};
use crate::error::RouteError;
use crate::init::signal::InitSignal;
use crate::observability::metrics;

/// Gate lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatePhase {
    /// Installed, build still running.
    Armed,
    /// Build finished, admitted requests still in flight.
    Draining,
    /// Removed from the registry. Terminal.
    Retired,
}

#[derive(Debug)]
struct GateBook {
    phase: GatePhase,
    pending: HashMap<u64, Instant>,
}

struct GateInner {
    signal: InitSignal,
    registry: Weak<dyn RouteRegistry>,
    layer: OnceLock<LayerId>,
    book: Mutex<GateBook>,
    next_ticket: AtomicU64,
}

/// Handle to an installed gate.
#[derive(Clone)]
pub struct InitGate {
    inner: Arc<GateInner>,
}

impl InitGate {
    /// Put a gate in front of every layer of `registry`, bound to `signal`.
    ///
    /// Must be called from within a Tokio runtime: a watcher task retires the
    /// gate once the signal resolves, even if no request ever arrives.
    pub fn install(registry: &Arc<dyn RouteRegistry>, signal: InitSignal) -> Self {
        let inner = Arc::new(GateInner {
            signal,
            registry: Arc::downgrade(registry),
            layer: OnceLock::new(),
            book: Mutex::new(GateBook {
                phase: GatePhase::Armed,
                pending: HashMap::new(),
            }),
            next_ticket: AtomicU64::new(0),
        });

        {
            // Held across registration so no retirement check can run before
            // the layer id is known.
            let _book = inner.book.lock();
            let id = registry.prepend("/", HandlerChain::from(vec![gate_handler(&inner)]));
            let _ = inner.layer.set(id);
            tracing::debug!(layer = %id, "Initialization gate armed");
        }

        tokio::spawn({
            let inner = inner.clone();
            async move {
                let _ = inner.signal.wait().await;
                inner.try_retire();
            }
        });

        Self { inner }
    }

    pub fn phase(&self) -> GatePhase {
        self.inner.book.lock().phase
    }

    /// Number of admitted requests not yet completed.
    pub fn pending(&self) -> usize {
        self.inner.book.lock().pending.len()
    }

    pub fn layer_id(&self) -> Option<LayerId> {
        self.inner.layer.get().copied()
    }

    pub fn signal(&self) -> &InitSignal {
        &self.inner.signal
    }
}

impl std::fmt::Debug for InitGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let book = self.inner.book.lock();
        f.debug_struct("InitGate")
            .field("phase", &book.phase)
            .field("pending", &book.pending.len())
            .field("layer", &self.inner.layer.get())
            .finish()
    }
}

fn gate_handler(inner: &Arc<GateInner>) -> Handler {
    let inner = inner.clone();
    handler_fn(move |req, next: Next| {
        let gate = inner.clone();
        async move {
            // Stale snapshot after retirement: step aside, but on the live
            // list, which holds the routes registered by the build.
            let Some(admission) = gate.admit() else {
                return next.refreshed().run(req).await;
            };

            let outcome = gate.signal.wait().await;
            // Routes registered while the request was held must be visible.
            let next = next.refreshed();
            let response = match outcome {
                Ok(()) => next.run(req).await?,
                Err(reason) => next.fail(RouteError::InitializationFailed(reason), req).await?,
            };
            Ok(attach(response, admission))
        }
    })
}

impl GateInner {
    fn admit(self: &Arc<Self>) -> Option<Admission> {
        let mut book = self.book.lock();
        if book.phase == GatePhase::Retired {
            return None;
        }
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        book.pending.insert(ticket, Instant::now());
        metrics::record_gate_admitted();
        metrics::set_gate_pending(book.pending.len());
        tracing::trace!(ticket, phase = ?book.phase, "Request admitted by initialization gate");
        Some(Admission {
            gate: self.clone(),
            ticket,
        })
    }

    fn release(&self, ticket: u64) {
        {
            let mut book = self.book.lock();
            if let Some(admitted) = book.pending.remove(&ticket) {
                tracing::trace!(ticket, held_ms = admitted.elapsed().as_millis() as u64, "Admitted request completed");
            }
            metrics::set_gate_pending(book.pending.len());
        }
        self.try_retire();
    }

    /// Retire if the signal is terminal and nothing admitted is in flight.
    fn try_retire(&self) {
        let layer = {
            let mut book = self.book.lock();
            if book.phase == GatePhase::Retired || !self.signal.is_terminal() {
                return;
            }
            if !book.pending.is_empty() {
                if book.phase == GatePhase::Armed {
                    book.phase = GatePhase::Draining;
                    tracing::debug!(pending = book.pending.len(), "Initialization gate draining");
                }
                return;
            }
            book.phase = GatePhase::Retired;
            self.layer.get().copied()
        };

        let removed = match (layer, self.registry.upgrade()) {
            (Some(id), Some(registry)) => registry.remove(id),
            _ => false,
        };
        metrics::record_gate_retired();
        tracing::info!(removed, "Initialization gate retired");
    }
}

/// Pending-set membership of one admitted request. Dropping it completes
/// the request from the gate's point of view.
struct Admission {
    gate: Arc<GateInner>,
    ticket: u64,
}

impl Drop for Admission {
    fn drop(&mut self) {
        self.gate.release(self.ticket);
    }
}

fn attach(response: Response, admission: Admission) -> Response {
    let (parts, body) = response.into_parts();
    let body = GuardedBody {
        inner: body,
        admission: Some(admission),
    };
    Response::from_parts(parts, Body::new(body))
}

/// Response body that keeps an admission alive until the body is finished
/// (or dropped).
struct GuardedBody {
    inner: Body,
    admission: Option<Admission>,
}

impl http_body::Body for GuardedBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        let polled = Pin::new(&mut this.inner).poll_frame(cx);
        if matches!(polled, Poll::Ready(None) | Poll::Ready(Some(Err(_)))) {
            this.admission.take();
        }
        polled
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}
