//! Event emission system.
//!
//! Oracle signals are pushed to subscribers as JSON events over a
//! broadcast channel. Each subscriber has an independent buffer; slow
//! subscribers lag and drop, they never block operations.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use veris_types::{DeviationScope, Signal};

/// An event emitted by the daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Event type name (e.g. "SupplyFinalized", "OraclePaused").
    pub event_type: String,
    /// Unix timestamp.
    pub timestamp: u64,
    /// Type-specific payload.
    pub payload: serde_json::Value,
}

/// Event bus for broadcasting events to subscribers.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
    sequence: Arc<AtomicU64>,
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Emit an event to all subscribers.
    pub fn emit(&self, event: Event) {
        self.sequence.fetch_add(1, Ordering::SeqCst);
        // Ignore send errors (no subscribers)
        let _ = self.sender.send(event);
    }

    /// Emit an oracle signal as a wire event.
    pub fn emit_signal(&self, signal: &Signal, timestamp: u64) {
        self.emit(signal_event(signal, timestamp));
    }

    /// Subscribe to events. Returns a receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Get the current sequence number.
    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }
}

/// Convert an oracle signal into its wire event.
pub fn signal_event(signal: &Signal, timestamp: u64) -> Event {
    let payload = match signal {
        Signal::SupplyFinalized {
            chain,
            total_supply,
            locked_supply,
            circulating_supply,
        } => serde_json::json!({
            "chain": chain,
            "total_supply": total_supply,
            "locked_supply": locked_supply,
            "circulating_supply": circulating_supply,
        }),
        Signal::Deviation {
            scope,
            observed,
            reference,
            deviation_bps,
        } => {
            let chain = match scope {
                DeviationScope::Global => None,
                DeviationScope::Chain(chain) => Some(*chain),
            };
            serde_json::json!({
                "chain": chain,
                "observed": observed,
                "reference": reference,
                "deviation_bps": deviation_bps,
            })
        }
        Signal::Reconciled {
            aggregate_actual,
            expected,
        } => serde_json::json!({
            "aggregate_actual": aggregate_actual,
            "expected": expected,
        }),
        Signal::ExpectedSupplyChanged { old, new } => serde_json::json!({
            "old": old,
            "new": new,
        }),
        Signal::EmergencyActivated { reason } => serde_json::json!({
            "reason": reason,
        }),
        Signal::EmergencyDeactivated | Signal::Paused | Signal::Unpaused => {
            serde_json::json!({})
        }
    };

    Event {
        event_type: signal.event_type().to_string(),
        timestamp,
        payload,
    }
}
