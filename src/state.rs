//! Per-row verification state machine.
//!
//! Each displayed run carries an explicit state; rendering is a pure
//! projection of the variant and never the other way around. Transitions:
//!
//! ```text
//! NotVerified ──(no proof material)──▶ MissingProof        (terminal)
//! NotVerified | Failed ──(verify)────▶ Pending
//! Pending ──(verified: true)─────────▶ Verified            (terminal)
//! Pending ──(verified: false | err)──▶ Failed              (re-triggerable)
//! ```

/// Verification status of one displayed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyState {
    NotVerified,
    Pending,
    Verified,
    Failed { reason: String },
    MissingProof,
}

impl VerifyState {
    /// Initial state for a freshly rendered row, from the stored `verified`
    /// field of its detail blob.
    pub fn from_stored(verified: Option<bool>) -> Self {
        match verified {
            Some(true) => Self::Verified,
            Some(false) => Self::Failed {
                reason: "Failed".to_string(),
            },
            None => Self::NotVerified,
        }
    }

    /// A failure state with the endpoint's reason attached.
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }

    /// Whether a verify action may start from this state. `Verified` and
    /// `MissingProof` are terminal; `Pending` already has a call in flight.
    pub fn can_start(&self) -> bool {
        matches!(self, Self::NotVerified | Self::Failed { .. })
    }

    /// Whether the row's action control is enabled. Coincides with
    /// [`can_start`](Self::can_start): terminal and in-flight states keep
    /// the control disabled.
    pub fn action_enabled(&self) -> bool {
        self.can_start()
    }

    /// Indicator text next to the row.
    pub fn indicator(&self) -> &str {
        match self {
            Self::NotVerified => "Not verified",
            Self::Pending => "Verifying…",
            Self::Verified => "Verified",
            Self::Failed { reason } => reason,
            Self::MissingProof => "Missing proof",
        }
    }

    /// Indicator style class, matching the `data-verify` values the row
    /// markup keys on.
    pub fn css_class(&self) -> &'static str {
        match self {
            Self::NotVerified => "idle",
            Self::Pending => "pending",
            Self::Verified => "ok",
            Self::Failed { .. } | Self::MissingProof => "fail",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_state_follows_stored_verified() {
        assert_eq!(VerifyState::from_stored(None), VerifyState::NotVerified);
        assert_eq!(VerifyState::from_stored(Some(true)), VerifyState::Verified);
        assert_eq!(
            VerifyState::from_stored(Some(false)),
            VerifyState::failed("Failed")
        );
    }

    #[test]
    fn only_idle_and_failed_can_start() {
        assert!(VerifyState::NotVerified.can_start());
        assert!(VerifyState::failed("boom").can_start());
        assert!(!VerifyState::Pending.can_start());
        assert!(!VerifyState::Verified.can_start());
        assert!(!VerifyState::MissingProof.can_start());
    }

    #[test]
    fn failed_indicator_carries_the_reason() {
        let state = VerifyState::failed("proof malformed");
        assert_eq!(state.indicator(), "proof malformed");
        assert_eq!(state.css_class(), "fail");
    }

    #[test]
    fn missing_proof_is_disabled_and_styled_as_failure() {
        let state = VerifyState::MissingProof;
        assert!(!state.action_enabled());
        assert_eq!(state.indicator(), "Missing proof");
        assert_eq!(state.css_class(), "fail");
    }
}
