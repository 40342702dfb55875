use std::fmt;

use serde::{Deserialize, Serialize};

/// SDPSemantics determines which style of SDP offers and answers
/// can be used
#[derive(Default, Debug, PartialEq, Eq, Copy, Clone, Serialize, Deserialize)]
pub enum RTCSdpSemantics {
    #[default]
    Unspecified = 0,

    /// UnifiedPlan uses unified-plan offers and answers
    #[serde(rename = "unified-plan")]
    UnifiedPlan = 1,

    /// PlanB uses plan-b offers and answers
    #[serde(rename = "plan-b")]
    PlanB = 2,
}

const SDP_SEMANTICS_UNIFIED_PLAN: &str = "unified-plan";
const SDP_SEMANTICS_PLAN_B: &str = "plan-b";

impl From<&str> for RTCSdpSemantics {
    fn from(raw: &str) -> Self {
        match raw {
            SDP_SEMANTICS_UNIFIED_PLAN => RTCSdpSemantics::UnifiedPlan,
            SDP_SEMANTICS_PLAN_B => RTCSdpSemantics::PlanB,
            _ => RTCSdpSemantics::Unspecified,
        }
    }
}

impl fmt::Display for RTCSdpSemantics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            RTCSdpSemantics::UnifiedPlan => SDP_SEMANTICS_UNIFIED_PLAN,
            RTCSdpSemantics::PlanB => SDP_SEMANTICS_PLAN_B,
            RTCSdpSemantics::Unspecified => crate::UNSPECIFIED_STR,
        };
        write!(f, "{s}")
    }
}

/// ICEServer describes a single STUN and TURN server that can be used by
/// the ICE agent to establish a connection with a peer.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RTCIceServer {
    pub urls: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub username: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub credential: String,
}

/// Defines a set of parameters to configure how the peer-to-peer communication via
/// [`RTCPeerConnection`] is established or re-established.
///
/// Fields the proxy does not interpret are kept in `extra` and forwarded to
/// the external implementation unchanged.
///
/// [`RTCPeerConnection`]: crate::peer_connection::RTCPeerConnection
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RTCConfiguration {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ice_servers: Vec<RTCIceServer>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp_semantics: Option<RTCSdpSemantics>,

    /// Enables encoded-frame access on every sender and receiver of the
    /// connection.
    #[serde(default)]
    pub encoded_insertable_streams: bool,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl RTCConfiguration {
    /// encoded_insertable_streams_enabled decides whether encoded-frame
    /// interception applies to a connection: either requested explicitly, or
    /// forced by the harness for unified-plan connections.
    pub fn encoded_insertable_streams_enabled(&self, timestamp_insertable_streams: bool) -> bool {
        self.encoded_insertable_streams
            || (timestamp_insertable_streams
                && self.sdp_semantics == Some(RTCSdpSemantics::UnifiedPlan))
    }

    /// with_encoded_insertable_streams returns a copy with the flag overridden.
    pub fn with_encoded_insertable_streams(&self, enabled: bool) -> Self {
        RTCConfiguration {
            encoded_insertable_streams: enabled,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::Result;

    #[test]
    fn test_encoded_insertable_streams_enabled() {
        let tests = vec![
            (false, None, false, false),
            (true, None, false, true),
            (false, Some(RTCSdpSemantics::UnifiedPlan), true, true),
            (false, Some(RTCSdpSemantics::PlanB), true, false),
            (false, None, true, false),
            (false, Some(RTCSdpSemantics::UnifiedPlan), false, false),
        ];

        for (explicit, sdp_semantics, timestamp_insertable_streams, expected) in tests {
            let configuration = RTCConfiguration {
                encoded_insertable_streams: explicit,
                sdp_semantics,
                ..Default::default()
            };
            assert_eq!(
                configuration.encoded_insertable_streams_enabled(timestamp_insertable_streams),
                expected,
                "testCase: {explicit} {sdp_semantics:?} {timestamp_insertable_streams}"
            );
        }
    }

    #[test]
    fn test_configuration_keeps_unknown_fields() -> Result<()> {
        let raw = r#"{"iceServers":[{"urls":["stun:stun.l.google.com:19302"]}],"sdpSemantics":"unified-plan","bundlePolicy":"max-bundle"}"#;
        let configuration: RTCConfiguration = serde_json::from_str(raw)?;
        assert_eq!(configuration.ice_servers.len(), 1);
        assert_eq!(
            configuration.sdp_semantics,
            Some(RTCSdpSemantics::UnifiedPlan)
        );
        assert!(!configuration.encoded_insertable_streams);

        let forwarded: serde_json::Value =
            serde_json::to_value(configuration.with_encoded_insertable_streams(true))?;
        assert_eq!(forwarded["bundlePolicy"], "max-bundle");
        assert_eq!(forwarded["encodedInsertableStreams"], true);

        Ok(())
    }
}
