pub mod capabilities;
pub mod interceptor;
pub mod rtp_codec;
pub mod rtp_transceiver_direction;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::track::MediaStreamTrack;
use rtp_codec::RTPCodecType;
use rtp_transceiver_direction::RTCRtpTransceiverDirection;

/// RTPEncodingParameters describes one outgoing encoding of a sender.
/// <https://w3c.github.io/webrtc-pc/#dom-rtcrtpencodingparameters>
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RTCRtpEncodingParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rid: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_bitrate: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_framerate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_resolution_down_by: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scalability_mode: Option<String>,
}

fn default_active() -> bool {
    true
}

/// RTPSendParameters contains the RTP stack settings used by the sender,
/// the values an application may rewrite through `set_parameters`.
/// <https://w3c.github.io/webrtc-pc/#dom-rtcrtpsendparameters>
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RTCRtpSendParameters {
    #[serde(default)]
    pub transaction_id: String,
    #[serde(default)]
    pub encodings: Vec<RTCRtpEncodingParameters>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degradation_preference: Option<String>,
}

/// RTPTransceiverInit dictionary is used when calling the add_transceiver method.
/// <https://w3c.github.io/webrtc-pc/#dom-rtcrtptransceiverinit>
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RTCRtpTransceiverInit {
    #[serde(default)]
    pub direction: RTCRtpTransceiverDirection,
    /// Ids of the media streams the sender's track is associated with.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub streams: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub send_encodings: Vec<RTCRtpEncodingParameters>,
}

/// TrackOrKind is the first argument of add_transceiver: either a track to
/// send or the media kind of a transceiver created without one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TrackOrKind {
    Kind(RTPCodecType),
    Track(MediaStreamTrack),
}

impl TrackOrKind {
    pub fn kind(&self) -> RTPCodecType {
        match self {
            TrackOrKind::Kind(kind) => *kind,
            TrackOrKind::Track(track) => track.kind,
        }
    }
}

impl From<RTPCodecType> for TrackOrKind {
    fn from(kind: RTPCodecType) -> Self {
        TrackOrKind::Kind(kind)
    }
}

impl From<MediaStreamTrack> for TrackOrKind {
    fn from(track: MediaStreamTrack) -> Self {
        TrackOrKind::Track(track)
    }
}

/// RtpSender is a sender object handed out by the external implementation.
///
/// The proxy never owns the sender state, it only interposes on the
/// mutating operations (see [`interceptor`]).
#[async_trait::async_trait]
pub trait RtpSender: Send + Sync + 'static {
    async fn track(&self) -> Option<MediaStreamTrack>;
    async fn get_parameters(&self) -> RTCRtpSendParameters;
    async fn set_parameters(&self, parameters: RTCRtpSendParameters) -> Result<()>;
    async fn set_streams(&self, streams: Vec<String>) -> Result<()>;
    async fn replace_track(&self, track: Option<MediaStreamTrack>) -> Result<()>;

    /// is_intercepted is true for senders already wrapped by the proxy.
    fn is_intercepted(&self) -> bool {
        false
    }
}

/// RtpTransceiver is a transceiver object handed out by the external implementation.
#[async_trait::async_trait]
pub trait RtpTransceiver: Send + Sync + 'static {
    async fn mid(&self) -> Option<String>;
    async fn kind(&self) -> RTPCodecType;
    async fn direction(&self) -> RTCRtpTransceiverDirection;
    async fn sender(&self) -> Option<Arc<dyn RtpSender>>;

    /// is_intercepted is true for transceivers already wrapped by the proxy.
    fn is_intercepted(&self) -> bool {
        false
    }
}
