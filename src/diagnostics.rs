//! Counters for absorbed faults
//!
//! The engine keeps working on garbled input, so faults that never reach a
//! caller are counted here instead.

use serde::{Deserialize, Serialize};

/// Faults absorbed by the sequence parser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ParseStats {
    /// Sequences discarded because of an unexpected byte
    pub malformed: u64,
    /// Sequences discarded for exceeding a configured limit
    pub overflowed: u64,
    /// C0 controls dropped outside any sequence
    pub dropped_controls: u64,
    /// SGR codes skipped as unknown or malformed
    pub unsupported_sgr: u64,
}

/// Faults absorbed by the RPC layer on inbound frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RpcStats {
    /// Frames that failed validation
    pub rejected: u64,
    /// Replies nobody was waiting for
    pub unsolicited: u64,
    /// Commands or queries without a registered handler
    pub unhandled: u64,
}

/// Everything a session has absorbed so far
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Diagnostics {
    pub parse: ParseStats,
    pub rpc: RpcStats,
    /// Unknown OSC commands currently held by the dispatcher
    pub stored_osc: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_flat_counters() {
        let diagnostics = Diagnostics {
            parse: ParseStats {
                malformed: 2,
                ..ParseStats::default()
            },
            ..Diagnostics::default()
        };
        let json = serde_json::to_value(diagnostics).unwrap();
        assert_eq!(json["parse"]["malformed"], 2);
        assert_eq!(json["rpc"]["unsolicited"], 0);
    }
}
