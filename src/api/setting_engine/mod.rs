
use std::fmt;

use serde::Deserialize;

use crate::error::Result;
use crate::instrumentation::OverrideSetParametersFn;

/// SettingEngine allows influencing behavior in ways that are not
/// supported by the WebRTC API. This allows us to support additional
/// use-cases without deviating from the WebRTC API elsewhere.
///
/// It can be built with the setters below or loaded from the camelCase JSON
/// parameter blob a test harness passes around.
#[derive(Default, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SettingEngine {
    pub(crate) timestamp_insertable_streams: bool,
    pub(crate) timestamp_watermark: bool,
    pub(crate) save_video_track: Option<u32>,
    pub(crate) save_audio_track: Option<u32>,
    pub(crate) stress_test_index: u32,
    #[serde(deserialize_with = "deserialize_codec_names")]
    pub(crate) disabled_video_codecs: Vec<String>,
    #[serde(skip)]
    pub(crate) override_set_parameters: Option<OverrideSetParametersFn>,
}

impl fmt::Debug for SettingEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettingEngine")
            .field(
                "timestamp_insertable_streams",
                &self.timestamp_insertable_streams,
            )
            .field("timestamp_watermark", &self.timestamp_watermark)
            .field("save_video_track", &self.save_video_track)
            .field("save_audio_track", &self.save_audio_track)
            .field("stress_test_index", &self.stress_test_index)
            .field("disabled_video_codecs", &self.disabled_video_codecs)
            .field(
                "override_set_parameters",
                &self.override_set_parameters.is_some(),
            )
            .finish()
    }
}

fn deserialize_codec_names<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let names = Vec::<String>::deserialize(deserializer)?;
    Ok(names.iter().map(|name| name.to_lowercase()).collect())
}

impl SettingEngine {
    /// from_json loads the settings from a camelCase JSON object. Unknown
    /// keys are ignored and missing keys keep their defaults.
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// set_timestamp_insertable_streams enables encoded-frame interception on
    /// every connection configured with unified-plan sdp semantics.
    pub fn set_timestamp_insertable_streams(&mut self, enabled: bool) {
        self.timestamp_insertable_streams = enabled;
    }

    /// set_timestamp_watermark enables watermark recognition on received
    /// video tracks.
    pub fn set_timestamp_watermark(&mut self, enabled: bool) {
        self.timestamp_watermark = enabled;
    }

    /// set_save_video_track records received video tracks for stress test
    /// indexes up to `max_index + 1`. None and `Some(0)` disable recording.
    pub fn set_save_video_track(&mut self, max_index: Option<u32>) {
        self.save_video_track = max_index;
    }

    /// set_save_audio_track is the audio counterpart of set_save_video_track.
    pub fn set_save_audio_track(&mut self, max_index: Option<u32>) {
        self.save_audio_track = max_index;
    }

    pub fn set_stress_test_index(&mut self, index: u32) {
        self.stress_test_index = index;
    }

    /// set_disabled_video_codecs sets the codec names removed from video
    /// capability queries. Names are matched case-insensitively.
    pub fn set_disabled_video_codecs<I, S>(&mut self, codecs: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.disabled_video_codecs = codecs
            .into_iter()
            .map(|codec| codec.as_ref().to_lowercase())
            .collect();
    }

    /// set_override_set_parameters installs the transform applied to the
    /// parameters of every intercepted `set_parameters` call.
    pub fn set_override_set_parameters(&mut self, f: OverrideSetParametersFn) {
        self.override_set_parameters = Some(f);
    }

    pub(crate) fn should_save_video_track(&self) -> bool {
        self.in_save_window(self.save_video_track)
    }

    pub(crate) fn should_save_audio_track(&self) -> bool {
        self.in_save_window(self.save_audio_track)
    }

    fn in_save_window(&self, max_index: Option<u32>) -> bool {
        max_index.is_some_and(|max_index| {
            max_index > 0 && self.stress_test_index <= max_index.saturating_add(1)
        })
    }
}
