//! Round-trip state machine states

use crate::error::FailureReason;
use std::fmt;

/// Possible states of a single round trip
///
/// `Idle -> Encoding -> AwaitingEncoded -> Decoding -> AwaitingDecoded ->
/// Verified`, with any step able to end in `Failed`. Both `Verified` and
/// `Failed` are terminal.
#[derive(Debug, Clone, PartialEq)]
pub enum RoundTripState {
    /// Nothing submitted yet
    Idle,
    /// Input frame pulled, `encode` being called
    Encoding,
    /// Encode accepted, waiting for the encoded frame
    AwaitingEncoded,
    /// Encoded frame retrieved, `decode` being called
    Decoding,
    /// Decode accepted, waiting for the decoded picture
    AwaitingDecoded,
    /// All configured checks passed
    Verified,
    Failed(FailureReason),
}

impl RoundTripState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RoundTripState::Verified | RoundTripState::Failed(_))
    }

    /// Returns true if `next` may directly follow this state.
    pub fn can_transition_to(&self, next: &RoundTripState) -> bool {
        use RoundTripState::*;

        matches!(
            (self, next),
            (Idle, Encoding)
                | (Encoding, AwaitingEncoded)
                | (AwaitingEncoded, Decoding)
                | (Decoding, AwaitingDecoded)
                | (AwaitingDecoded, Verified)
        ) || (!self.is_terminal() && matches!(next, Failed(_)))
    }
}

impl fmt::Display for RoundTripState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundTripState::Idle => write!(f, "Idle"),
            RoundTripState::Encoding => write!(f, "Encoding"),
            RoundTripState::AwaitingEncoded => write!(f, "AwaitingEncoded"),
            RoundTripState::Decoding => write!(f, "Decoding"),
            RoundTripState::AwaitingDecoded => write!(f, "AwaitingDecoded"),
            RoundTripState::Verified => write!(f, "Verified"),
            RoundTripState::Failed(_) => write!(f, "Failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_transitions() {
        use RoundTripState::*;

        let path = [Idle, Encoding, AwaitingEncoded, Decoding, AwaitingDecoded, Verified];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(&pair[1]), "{} -> {}", pair[0], pair[1]);
        }
        assert!(!Idle.can_transition_to(&Decoding));
        assert!(!Encoding.can_transition_to(&Idle));
    }

    #[test]
    fn test_terminal_states_do_not_move() {
        let failed = RoundTripState::Failed(FailureReason::MissingDecodedFrame);

        assert!(failed.is_terminal());
        assert!(RoundTripState::Verified.is_terminal());
        assert!(!RoundTripState::Verified.can_transition_to(&failed));
        assert!(!failed.can_transition_to(&RoundTripState::Idle));
    }

    #[test]
    fn test_any_active_state_can_fail() {
        let failed = RoundTripState::Failed(FailureReason::MissingDecodedFrame);
        assert!(RoundTripState::Idle.can_transition_to(&failed));
        assert!(RoundTripState::AwaitingDecoded.can_transition_to(&failed));
    }
}
