// Error types and error handling module
// This file defines the swap error taxonomy shared by the quoting and
// executing planes
//
// Numan Thabit 2026 Aug

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SwapError {
    /// Every eligible source quoted zero for the requested pair. Quoting
    /// reports this as a zero result instead; only the executing plane
    /// surfaces it as an error, before any transfer is attempted.
    #[error("no liquidity available for requested pair")]
    NoLiquidity,
    /// Realized output fell below the caller's floor. The whole operation
    /// is rolled back.
    #[error("slippage exceeded: realized {realized} below floor {min_return}")]
    SlippageExceeded { realized: u128, min_return: u128 },
    /// Length mismatch, allocation to a disabled/unknown source, or a unit
    /// sum over the part bound. Rejected before any venue call.
    #[error("invalid distribution: {0}")]
    InvalidDistribution(String),
    /// A venue adapter failed mid-execution. Fatal to the whole operation;
    /// distinct so the caller can re-quote with the venue disabled.
    #[error("venue {venue} failed: {reason}")]
    VenueFailure { venue: String, reason: String },
    /// Malformed request at the API boundary (amounts, masks, paths).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl SwapError {
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        SwapError::InvalidRequest(msg.into())
    }
}
