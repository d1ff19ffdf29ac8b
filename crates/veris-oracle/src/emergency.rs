//! Pause gate and emergency mode.
//!
//! The pause gate blocks report submission unconditionally, before any
//! authorization check. Emergency mode is a separate operator-declared
//! state: it gates forced reconciliation but does not block ordinary
//! report submission.

use crate::{OracleError, Result};

/// Administrative pause and emergency state.
#[derive(Clone, Debug, Default)]
pub struct EmergencyController {
    paused: bool,
    emergency_mode: bool,
    reason: Option<String>,
    activated_at: Option<u64>,
}

impl EmergencyController {
    /// Create a controller with both gates inactive.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pause report submission. Idempotent.
    pub fn pause(&mut self) {
        tracing::warn!("oracle paused");
        self.paused = true;
    }

    /// Resume report submission. Idempotent.
    pub fn unpause(&mut self) {
        tracing::info!("oracle unpaused");
        self.paused = false;
    }

    /// Whether report submission is paused.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Fail if report submission is paused.
    ///
    /// # Errors
    ///
    /// - [`OracleError::Paused`]
    pub fn check_not_paused(&self) -> Result<()> {
        if self.paused {
            return Err(OracleError::Paused);
        }
        Ok(())
    }

    /// Activate emergency mode with an operator-supplied reason.
    pub fn activate(&mut self, reason: String, now: u64) {
        tracing::warn!(%reason, "emergency mode activated");
        self.emergency_mode = true;
        self.reason = Some(reason);
        self.activated_at = Some(now);
    }

    /// Deactivate emergency mode, clearing the reason.
    pub fn deactivate(&mut self) {
        tracing::info!("emergency mode deactivated");
        self.emergency_mode = false;
        self.reason = None;
        self.activated_at = None;
    }

    /// Whether emergency mode is active.
    pub fn is_active(&self) -> bool {
        self.emergency_mode
    }

    /// Fail unless emergency mode is active.
    ///
    /// # Errors
    ///
    /// - [`OracleError::EmergencyNotActive`]
    pub fn check_active(&self) -> Result<()> {
        if self.emergency_mode {
            Ok(())
        } else {
            Err(OracleError::EmergencyNotActive)
        }
    }

    /// The operator reason, while emergency mode is active.
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    /// Activation timestamp, while emergency mode is active.
    pub fn activated_at(&self) -> Option<u64> {
        self.activated_at
    }

    /// Rebuild the controller from persisted state.
    pub fn restore(
        paused: bool,
        emergency_mode: bool,
        reason: Option<String>,
        activated_at: Option<u64>,
    ) -> Self {
        Self {
            paused,
            emergency_mode,
            reason,
            activated_at,
        }
    }
}
