use super::rtp_codec::{RTCRtpCapabilities, RTPCodecType};

/// filter_capabilities removes the codecs named in `disabled_video_codecs`
/// from a video capability list.
///
/// Codecs are matched by their mime type with the media-type prefix stripped,
/// ignoring case, so `"vp9"` removes `video/VP9`. Other kinds, and an empty
/// block-list, leave the capabilities untouched.
pub fn filter_capabilities(
    kind: RTPCodecType,
    mut capabilities: RTCRtpCapabilities,
    disabled_video_codecs: &[String],
) -> RTCRtpCapabilities {
    if disabled_video_codecs.is_empty() || kind != RTPCodecType::Video {
        return capabilities;
    }

    capabilities.codecs.retain(|codec| {
        let name = codec.codec_name();
        !disabled_video_codecs
            .iter()
            .any(|disabled| disabled.eq_ignore_ascii_case(&name))
    });
    log::debug!("RTCRtpSender getCapabilities custom: {:?}", capabilities);

    capabilities
}
