use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::peer_connection::ConnectionId;
use crate::rtp_transceiver::{RTCRtpSendParameters, RtpTransceiver};
use crate::track::{MediaStreamTrack, TrackDirection};

/// OverrideSetParametersFn rewrites the parameters an application passes to
/// `RtpSender::set_parameters` before they reach the external sender.
pub type OverrideSetParametersFn =
    Arc<dyn (Fn(RTCRtpSendParameters) -> RTCRtpSendParameters) + Send + Sync>;

/// OnWatermarkSampleFn receives every sample produced by watermark recognition.
pub type OnWatermarkSampleFn = Box<dyn Fn(WatermarkSample) + Send + Sync>;

/// PlayoutDelayOccasion tells the playout-delay collaborator which code path
/// produced the transceiver, since the right hint differs between them.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PlayoutDelayOccasion {
    AddTransceiver,
    AddStream,
    Track,
}

impl fmt::Display for PlayoutDelayOccasion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            PlayoutDelayOccasion::AddTransceiver => "addTransceiver",
            PlayoutDelayOccasion::AddStream => "addStream",
            PlayoutDelayOccasion::Track => "track",
        };
        write!(f, "{s}")
    }
}

/// WatermarkSample is one timestamp recognised in a received video frame,
/// with the end-to-end delay derived from it. Both values are in seconds.
#[derive(Default, Debug, Copy, Clone, PartialEq)]
pub struct WatermarkSample {
    pub timestamp: f64,
    pub delay: f64,
}

/// TransceiverInstrumentation is implemented by the per-feature modules the
/// proxy calls into: encoded-frame interception, playout-delay hints,
/// received-track recording and timestamp watermark recognition.
///
/// All methods default to no-ops.
#[async_trait::async_trait]
pub trait TransceiverInstrumentation: Send + Sync + 'static {
    /// Installs (or re-installs) encoded-frame interception on a transceiver.
    async fn handle_insertable_streams(
        &self,
        _id: ConnectionId,
        _transceiver: Arc<dyn RtpTransceiver>,
    ) {
    }

    /// Applies a receive-side playout delay hint.
    async fn handle_playout_delay_hint(
        &self,
        _id: ConnectionId,
        _transceiver: Arc<dyn RtpTransceiver>,
        _occasion: PlayoutDelayOccasion,
    ) {
    }

    /// Starts recognising timestamp watermarks on a received video track.
    async fn recognize_timestamp_watermark(
        &self,
        _id: ConnectionId,
        _track: MediaStreamTrack,
        _on_sample: OnWatermarkSampleFn,
    ) {
    }

    /// Feeds one end-to-end delay sample into the delay statistics.
    fn push_video_end_to_end_delay(&self, _sample: WatermarkSample) {}

    /// Records a track.
    async fn save_track(
        &self,
        _id: ConnectionId,
        _track: MediaStreamTrack,
        _direction: TrackDirection,
    ) -> Result<()> {
        Ok(())
    }
}

/// NoopInstrumentation leaves every transceiver untouched.
#[derive(Default, Debug, Copy, Clone)]
pub struct NoopInstrumentation;

impl TransceiverInstrumentation for NoopInstrumentation {}
