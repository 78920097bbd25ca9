//! Outcome types and the business-failure decision table.
//!
//! | type | report | settlement              |
//! |------|--------|-------------------------|
//! | 1    | yes    | reject with payload     |
//! | 2    | no     | reject with payload     |
//! | 3    | yes    | resolve with payload    |
//! | 4    | no     | resolve with payload    |
//! | 5    | yes    | reject with raw response|
//! | 6    | no     | reject with raw response|
//! | none | yes    | unsettled               |

use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric outcome flag selected per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum OutcomeType {
    /// Report, then reject with the payload.
    RejectWithPayload = 1,
    /// Reject with the payload without reporting.
    RejectSilently = 2,
    /// Report, then resolve with the payload.
    ResolveWithPayload = 3,
    /// Resolve with the payload without reporting.
    ResolveSilently = 4,
    /// Report, then reject with the raw response.
    RejectWithResponse = 5,
    /// Reject with the raw response without reporting.
    RejectResponseSilently = 6,
}

impl OutcomeType {
    /// The numeric flag, 1 to 6.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Transport failures only reject for the rejecting types; the rest
    /// leave the call unsettled.
    pub fn rejects_transport_errors(outcome: Option<Self>) -> bool {
        matches!(
            outcome,
            Some(
                OutcomeType::RejectWithPayload
                    | OutcomeType::RejectSilently
                    | OutcomeType::RejectWithResponse
                    | OutcomeType::RejectResponseSilently
            )
        )
    }
}

/// Outcome codes outside 1..=6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid outcome type {0}, expected 1-6")]
pub struct InvalidOutcomeType(pub u8);

impl TryFrom<u8> for OutcomeType {
    type Error = InvalidOutcomeType;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(OutcomeType::RejectWithPayload),
            2 => Ok(OutcomeType::RejectSilently),
            3 => Ok(OutcomeType::ResolveWithPayload),
            4 => Ok(OutcomeType::ResolveSilently),
            5 => Ok(OutcomeType::RejectWithResponse),
            6 => Ok(OutcomeType::RejectResponseSilently),
            other => Err(InvalidOutcomeType(other)),
        }
    }
}

impl From<OutcomeType> for u8 {
    fn from(outcome: OutcomeType) -> Self {
        outcome.code()
    }
}

impl fmt::Display for OutcomeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// How a business failure settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settle {
    /// Resolve with the full payload.
    ResolvePayload,
    /// Reject with [`Rejection::Payload`](crate::Rejection::Payload).
    RejectPayload,
    /// Reject with [`Rejection::Response`](crate::Rejection::Response).
    RejectResponse,
    /// Neither resolve nor reject; surfaces as
    /// [`Rejection::Unsettled`](crate::Rejection::Unsettled).
    Unsettled,
}

/// Result of looking up an outcome type in the decision table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    /// Invoke the error reporter.
    pub report: bool,
    /// How the call settles.
    pub settle: Settle,
}

/// Decide how a call whose success condition failed should settle.
pub fn decide(outcome: Option<OutcomeType>) -> Decision {
    let (report, settle) = match outcome {
        Some(OutcomeType::RejectWithPayload) => (true, Settle::RejectPayload),
        Some(OutcomeType::RejectSilently) => (false, Settle::RejectPayload),
        Some(OutcomeType::ResolveWithPayload) => (true, Settle::ResolvePayload),
        Some(OutcomeType::ResolveSilently) => (false, Settle::ResolvePayload),
        Some(OutcomeType::RejectWithResponse) => (true, Settle::RejectResponse),
        Some(OutcomeType::RejectResponseSilently) => (false, Settle::RejectResponse),
        None => (true, Settle::Unsettled),
    };
    Decision { report, settle }
}
