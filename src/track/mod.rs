use serde::{Deserialize, Serialize};

use crate::rtp_transceiver::rtp_codec::RTPCodecType;

/// MediaStreamTrack is the description of a single media track as exchanged
/// with the external implementation. The proxy never touches the media
/// itself; tracks are identified by id and kind only.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaStreamTrack {
    pub id: String,
    pub kind: RTPCodecType,
    #[serde(default)]
    pub label: String,
}

impl MediaStreamTrack {
    pub fn new(id: impl Into<String>, kind: RTPCodecType) -> Self {
        MediaStreamTrack {
            id: id.into(),
            kind,
            label: String::new(),
        }
    }
}

/// MediaStream groups tracks under a stream id.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaStream {
    pub id: String,
    #[serde(default)]
    pub tracks: Vec<MediaStreamTrack>,
}

/// TrackDirection labels a recorded track as sent or received.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TrackDirection {
    Send,
    Recv,
}

impl std::fmt::Display for TrackDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            TrackDirection::Send => write!(f, "send"),
            TrackDirection::Recv => write!(f, "recv"),
        }
    }
}
