/*!
 * Handle Statistics
 * Snapshot of lifetime registry counters and leak reporting
 */

use crate::core::types::RawHandle;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;

const SEPARATOR: &str = "----------------";

/// Handle statistics collected by a lifetime registry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandleStats {
    /// Number of initialized handles
    pub initialized: u64,
    /// Number of handles released successfully
    pub closed: u64,
    /// Number of handles whose release operation failed
    pub close_failed: u64,
    /// Handles not yet released, with their formatted initialization site
    pub in_flight: BTreeMap<RawHandle, String>,
}

impl HandleStats {
    /// Number of initialized handles never released
    #[inline]
    pub fn leaked(&self) -> u64 {
        self.initialized
            .saturating_sub(self.closed.saturating_add(self.close_failed))
    }

    /// Whether any handle was initialized without a matching release
    #[inline]
    pub fn has_leaks(&self) -> bool {
        self.initialized != self.closed.saturating_add(self.close_failed)
    }

    /// Leak report for use in a test failure message
    ///
    /// Empty when every initialized handle was released.
    pub fn report(&self) -> String {
        if !self.has_leaks() {
            return String::new();
        }

        let mut report = String::new();
        // Writing to a String cannot fail
        let _ = writeln!(report, "handle report:");
        let _ = writeln!(report, "initialized {} handles", self.initialized);
        let _ = writeln!(report, "closed {} handles successfully", self.closed);
        let _ = writeln!(report, "closed {} handles unsuccessfully", self.close_failed);
        let _ = writeln!(report, "handles in flight:");
        let _ = writeln!(report, "{}", SEPARATOR);
        for (handle, provenance) in &self.in_flight {
            let _ = writeln!(report, "HANDLE={} initialized at:", handle);
            report.push_str(provenance);
            if !provenance.ends_with('\n') {
                report.push('\n');
            }
            let _ = writeln!(report, "{}", SEPARATOR);
        }
        report
    }

    /// Serialize the snapshot as JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_balanced_stats_report_empty() {
        let stats = HandleStats {
            initialized: 3,
            closed: 2,
            close_failed: 1,
            in_flight: BTreeMap::new(),
        };
        assert!(!stats.has_leaks());
        assert_eq!(stats.leaked(), 0);
        assert_eq!(stats.report(), "");
    }

    #[test]
    fn test_report_lists_in_flight() {
        let mut in_flight = BTreeMap::new();
        in_flight.insert(5, "src/foo.rs:10:5".to_string());
        let stats = HandleStats {
            initialized: 2,
            closed: 1,
            close_failed: 0,
            in_flight,
        };

        let expected = "handle report:\n\
                        initialized 2 handles\n\
                        closed 1 handles successfully\n\
                        closed 0 handles unsuccessfully\n\
                        handles in flight:\n\
                        ----------------\n\
                        HANDLE=5 initialized at:\n\
                        src/foo.rs:10:5\n\
                        ----------------\n";
        assert_eq!(stats.report(), expected);
        assert_eq!(stats.leaked(), 1);
    }

    #[test]
    fn test_report_saturates_on_huge_counters() {
        let stats: HandleStats = serde_json::from_str(
            r#"{"initialized":0,"closed":18446744073709551615,"close_failed":1,"in_flight":{}}"#,
        )
        .unwrap();

        assert!(stats.has_leaks());
        assert_eq!(stats.leaked(), 0);
        assert!(stats.report().contains("closed 18446744073709551615 handles successfully"));
    }

    #[test]
    fn test_to_json() {
        let json = HandleStats::default().to_json().unwrap();
        assert_eq!(
            json,
            r#"{"initialized":0,"closed":0,"close_failed":0,"in_flight":{}}"#
        );
    }
}
