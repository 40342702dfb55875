use serde::{Deserialize, Serialize};

/// AnswerOptions structure describes the options used to control the answer
/// creation process.
#[derive(Default, Debug, PartialEq, Eq, Copy, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RTCAnswerOptions {
    /// voice_activity_detection allows the application to provide information
    /// about whether it wishes voice detection feature to be enabled or disabled.
    #[serde(default)]
    pub voice_activity_detection: bool,
}

/// OfferOptions structure describes the options used to control the offer
/// creation process
///
/// [W3C]: https://w3c.github.io/webrtc-pc/#dictionary-rtcofferoptions-members
#[derive(Default, Debug, PartialEq, Eq, Copy, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RTCOfferOptions {
    #[serde(default)]
    pub voice_activity_detection: bool,

    /// ice_restart forces the underlying ice gathering process to be restarted.
    #[serde(default)]
    pub ice_restart: bool,

    /// Legacy receive hints still sent by some applications.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offer_to_receive_audio: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offer_to_receive_video: Option<bool>,
}
