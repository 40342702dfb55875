use std::fmt;

use serde::{Deserialize, Serialize};

pub const MIME_TYPE_H264: &str = "video/H264";
pub const MIME_TYPE_OPUS: &str = "audio/opus";
pub const MIME_TYPE_VP8: &str = "video/VP8";
pub const MIME_TYPE_VP9: &str = "video/VP9";
pub const MIME_TYPE_AV1: &str = "video/AV1";
pub const MIME_TYPE_G722: &str = "audio/G722";
pub const MIME_TYPE_PCMU: &str = "audio/PCMU";
pub const MIME_TYPE_PCMA: &str = "audio/PCMA";

/// RTPCodecType determines the type of a codec
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RTPCodecType {
    #[default]
    Unspecified = 0,

    /// RTPCodecTypeAudio indicates this is an audio codec
    Audio = 1,

    /// RTPCodecTypeVideo indicates this is a video codec
    Video = 2,
}

impl From<&str> for RTPCodecType {
    fn from(raw: &str) -> Self {
        match raw {
            "audio" => RTPCodecType::Audio,
            "video" => RTPCodecType::Video,
            _ => RTPCodecType::Unspecified,
        }
    }
}

impl From<u8> for RTPCodecType {
    fn from(v: u8) -> Self {
        match v {
            1 => RTPCodecType::Audio,
            2 => RTPCodecType::Video,
            _ => RTPCodecType::Unspecified,
        }
    }
}

impl fmt::Display for RTPCodecType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            RTPCodecType::Audio => "audio",
            RTPCodecType::Video => "video",
            RTPCodecType::Unspecified => crate::UNSPECIFIED_STR,
        };
        write!(f, "{s}")
    }
}

/// RTPCodecCapability provides information about codec capabilities.
/// <https://w3c.github.io/webrtc-pc/#dictionary-rtcrtpcodeccapability-members>
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RTCRtpCodecCapability {
    pub mime_type: String,
    pub clock_rate: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channels: Option<u16>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sdp_fmtp_line: String,
}

impl RTCRtpCodecCapability {
    /// codec_name is the mime type without its media-type prefix, lower-cased,
    /// e.g. `video/VP9` becomes `vp9`.
    pub fn codec_name(&self) -> String {
        let name = match self.mime_type.split_once('/') {
            Some((_, name)) => name,
            None => self.mime_type.as_str(),
        };
        name.to_lowercase()
    }
}

/// RTPHeaderExtensionCapability is used to define a RFC5285 RTP header extension supported by the codec.
/// <https://w3c.github.io/webrtc-pc/#dom-rtcrtpcapabilities-headerextensions>
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RTCRtpHeaderExtensionCapability {
    pub uri: String,
}

/// RTPCapabilities represents the capabilities of a transceiver
/// <https://w3c.github.io/webrtc-pc/#rtcrtpcapabilities>
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RTCRtpCapabilities {
    pub codecs: Vec<RTCRtpCodecCapability>,
    #[serde(default)]
    pub header_extensions: Vec<RTCRtpHeaderExtensionCapability>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_codec_name() {
        let tests = vec![
            (MIME_TYPE_VP9, "vp9"),
            (MIME_TYPE_H264, "h264"),
            (MIME_TYPE_OPUS, "opus"),
            ("AV1", "av1"),
        ];

        for (mime_type, expected) in tests {
            let codec = RTCRtpCodecCapability {
                mime_type: mime_type.to_owned(),
                ..Default::default()
            };
            assert_eq!(codec.codec_name(), expected, "testCase: {mime_type}");
        }
    }

    #[test]
    fn test_rtp_codec_type_string() {
        let tests = vec![
            (RTPCodecType::Unspecified, crate::UNSPECIFIED_STR),
            (RTPCodecType::Audio, "audio"),
            (RTPCodecType::Video, "video"),
        ];

        for (kind, expected_string) in tests {
            assert_eq!(kind.to_string(), expected_string);
            if kind != RTPCodecType::Unspecified {
                assert_eq!(RTPCodecType::from(expected_string), kind);
            }
        }
    }
}
