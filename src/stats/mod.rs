use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// StatsReport collects stats entries keyed by stats object id.
///
/// The proxy does not bridge statistics from the external implementation,
/// so `RTCPeerConnection::get_stats` always returns an empty report.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsReport {
    pub reports: HashMap<String, serde_json::Value>,
}

impl StatsReport {
    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }
}
