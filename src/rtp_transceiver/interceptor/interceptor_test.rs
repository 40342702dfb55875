use super::*;
use crate::peer_connection::peer_connection_test::{
    MockSender, MockTransceiver, RecordingInstrumentation,
};

fn new_interceptor(
    encoded_insertable_streams: bool,
    setting_engine: SettingEngine,
    instrumentation: &Arc<RecordingInstrumentation>,
) -> TransceiverInterceptor {
    TransceiverInterceptor::new(InterceptorContext {
        id: 7,
        name: "RTCPeerConnection-7".to_owned(),
        encoded_insertable_streams,
        instrumentation: Arc::clone(instrumentation) as Arc<dyn TransceiverInstrumentation>,
        setting_engine: Arc::new(setting_engine),
    })
}

fn video_transceiver() -> Arc<MockTransceiver> {
    MockTransceiver::new(RTPCodecType::Video, RTCRtpTransceiverDirection::Sendrecv)
}

#[tokio::test]
async fn test_wrap_is_idempotent() -> Result<()> {
    let instrumentation = Arc::new(RecordingInstrumentation::default());
    let interceptor = new_interceptor(false, SettingEngine::default(), &instrumentation);
    let transceiver = video_transceiver();

    let first = interceptor.wrap(transceiver.clone()).await;
    let second = interceptor.wrap(transceiver.clone()).await;
    let rewrapped = interceptor.wrap(Arc::clone(&first)).await;

    assert!(first.is_intercepted());
    assert!(Arc::ptr_eq(&first, &second));
    assert!(Arc::ptr_eq(&first, &rewrapped));

    let sender = first.sender().await.expect("mock has a sender");
    assert!(sender.is_intercepted());

    Ok(())
}

#[tokio::test]
async fn test_replace_track_reaches_sender_once() -> Result<()> {
    let instrumentation = Arc::new(RecordingInstrumentation::default());
    let interceptor = new_interceptor(true, SettingEngine::default(), &instrumentation);
    let transceiver = video_transceiver();

    // touched by add-transceiver and by a remote track
    let added = interceptor.on_add_transceiver(transceiver.clone()).await;
    let event = interceptor
        .on_track(TrackEvent {
            track: None,
            transceiver: transceiver.clone(),
        })
        .await;
    assert!(Arc::ptr_eq(&added, &event.transceiver));

    let sender = event.transceiver.sender().await.expect("mock has a sender");
    sender
        .replace_track(Some(MediaStreamTrack::new("screen", RTPCodecType::Video)))
        .await?;

    assert_eq!(transceiver.sender.calls().await, vec!["replaceTrack:screen"]);
    assert_eq!(
        sender.track().await.map(|t| t.id),
        Some("screen".to_owned())
    );
    assert_eq!(
        instrumentation.events(),
        vec![
            "insertable:true",
            "playout:addTransceiver",
            "playout:track",
            "insertable:true",
        ]
    );

    Ok(())
}

#[tokio::test]
async fn test_replace_track_without_insertable_streams() -> Result<()> {
    let instrumentation = Arc::new(RecordingInstrumentation::default());
    let interceptor = new_interceptor(false, SettingEngine::default(), &instrumentation);
    let transceiver = video_transceiver();

    let wrapped = interceptor.wrap(transceiver.clone()).await;
    let sender = wrapped.sender().await.expect("mock has a sender");
    sender.replace_track(None).await?;

    assert_eq!(transceiver.sender.calls().await, vec!["replaceTrack:"]);
    assert!(instrumentation.events().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_shared_sender_wrapped_once() -> Result<()> {
    let instrumentation = Arc::new(RecordingInstrumentation::default());
    let interceptor = new_interceptor(false, SettingEngine::default(), &instrumentation);

    let sender = Arc::new(MockSender::default());
    let a = MockTransceiver::with_sender(
        RTPCodecType::Audio,
        RTCRtpTransceiverDirection::Sendonly,
        Arc::clone(&sender),
    );
    let b = MockTransceiver::with_sender(
        RTPCodecType::Audio,
        RTCRtpTransceiverDirection::Sendonly,
        Arc::clone(&sender),
    );

    let wrapped_a = interceptor.wrap(a).await;
    let wrapped_b = interceptor.wrap(b).await;
    let sender_a = wrapped_a.sender().await.expect("mock has a sender");
    let sender_b = wrapped_b.sender().await.expect("mock has a sender");
    assert!(Arc::ptr_eq(&sender_a, &sender_b));

    sender_b.set_streams(vec!["s1".to_owned(), "s2".to_owned()]).await?;
    assert_eq!(sender.calls().await, vec!["setStreams:s1,s2"]);

    Ok(())
}

#[tokio::test]
async fn test_shared_sender_follows_live_transceiver() -> Result<()> {
    let instrumentation = Arc::new(RecordingInstrumentation::default());
    let interceptor = new_interceptor(true, SettingEngine::default(), &instrumentation);

    let sender = Arc::new(MockSender::default());
    let a = MockTransceiver::with_sender(
        RTPCodecType::Video,
        RTCRtpTransceiverDirection::Sendrecv,
        Arc::clone(&sender),
    );
    let b = MockTransceiver::with_sender(
        RTPCodecType::Video,
        RTCRtpTransceiverDirection::Sendrecv,
        Arc::clone(&sender),
    );

    let wrapped_a = interceptor.wrap(a).await;
    let intercepted_sender = wrapped_a.sender().await.expect("mock has a sender");
    drop(wrapped_a);

    let wrapped_b = interceptor.wrap(b).await;
    let sender_b = wrapped_b.sender().await.expect("mock has a sender");
    assert!(Arc::ptr_eq(&intercepted_sender, &sender_b));

    intercepted_sender
        .replace_track(Some(MediaStreamTrack::new("camera", RTPCodecType::Video)))
        .await?;
    assert_eq!(sender.calls().await, vec!["replaceTrack:camera"]);
    assert_eq!(instrumentation.events(), vec!["insertable:true"]);

    Ok(())
}

#[tokio::test]
async fn test_set_parameters_override() -> Result<()> {
    let instrumentation = Arc::new(RecordingInstrumentation::default());
    let mut s = SettingEngine::default();
    s.set_override_set_parameters(Arc::new(|mut params: RTCRtpSendParameters| {
        params.degradation_preference = Some("maintain-resolution".to_owned());
        params
    }));
    let interceptor = new_interceptor(false, s, &instrumentation);
    let transceiver = video_transceiver();

    let wrapped = interceptor.wrap(transceiver.clone()).await;
    let sender = wrapped.sender().await.expect("mock has a sender");
    let mut params = sender.get_parameters().await;
    params.degradation_preference = Some("balanced".to_owned());
    sender.set_parameters(params).await?;

    assert_eq!(
        transceiver.sender.calls().await,
        vec!["setParameters:maintain-resolution"]
    );

    Ok(())
}

#[tokio::test]
async fn test_set_parameters_without_override() -> Result<()> {
    let instrumentation = Arc::new(RecordingInstrumentation::default());
    let interceptor = new_interceptor(false, SettingEngine::default(), &instrumentation);
    let transceiver = video_transceiver();

    let wrapped = interceptor.wrap(transceiver.clone()).await;
    let sender = wrapped.sender().await.expect("mock has a sender");
    sender
        .set_parameters(RTCRtpSendParameters {
            degradation_preference: Some("balanced".to_owned()),
            ..Default::default()
        })
        .await?;

    assert_eq!(transceiver.sender.calls().await, vec!["setParameters:balanced"]);

    Ok(())
}

#[tokio::test]
async fn test_on_track_video() -> Result<()> {
    let instrumentation = Arc::new(RecordingInstrumentation::default());
    let mut s = SettingEngine::default();
    s.set_timestamp_watermark(true);
    s.set_save_video_track(Some(1));
    s.set_stress_test_index(1);
    let interceptor = new_interceptor(false, s, &instrumentation);

    let event = interceptor
        .on_track(TrackEvent {
            track: Some(MediaStreamTrack::new("remote-video", RTPCodecType::Video)),
            transceiver: video_transceiver(),
        })
        .await;

    assert!(event.transceiver.is_intercepted());
    assert_eq!(
        instrumentation.events(),
        vec![
            "watermark:remote-video",
            "delay:0.25",
            "save:remote-video:recv",
            "playout:track",
        ]
    );

    Ok(())
}

#[tokio::test]
async fn test_on_track_audio_save_failure_logged() -> Result<()> {
    let instrumentation = Arc::new(RecordingInstrumentation::failing_save());
    let mut s = SettingEngine::default();
    s.set_timestamp_watermark(true);
    s.set_save_audio_track(Some(2));
    s.set_save_video_track(Some(2));
    s.set_stress_test_index(3);
    let interceptor = new_interceptor(true, s, &instrumentation);

    let transceiver: Arc<dyn RtpTransceiver> =
        MockTransceiver::new(RTPCodecType::Audio, RTCRtpTransceiverDirection::Recvonly);
    let event = interceptor
        .on_track(TrackEvent {
            track: Some(MediaStreamTrack::new("remote-audio", RTPCodecType::Audio)),
            transceiver,
        })
        .await;

    assert_eq!(event.track.map(|t| t.id), Some("remote-audio".to_owned()));
    assert_eq!(
        instrumentation.events(),
        vec![
            "insertable:true",
            "save:remote-audio:recv",
            "playout:track"
        ]
    );

    Ok(())
}

#[tokio::test]
async fn test_on_track_outside_save_window() -> Result<()> {
    let instrumentation = Arc::new(RecordingInstrumentation::default());
    let mut s = SettingEngine::default();
    s.set_save_video_track(Some(1));
    s.set_stress_test_index(3);
    let interceptor = new_interceptor(false, s, &instrumentation);

    interceptor
        .on_track(TrackEvent {
            track: Some(MediaStreamTrack::new("remote-video", RTPCodecType::Video)),
            transceiver: video_transceiver(),
        })
        .await;

    assert_eq!(instrumentation.events(), vec!["playout:track"]);

    Ok(())
}

#[tokio::test]
async fn test_on_add_stream_sending_only() -> Result<()> {
    let instrumentation = Arc::new(RecordingInstrumentation::default());
    let interceptor = new_interceptor(true, SettingEngine::default(), &instrumentation);

    let transceivers: Vec<Arc<dyn RtpTransceiver>> = vec![
        MockTransceiver::new(RTPCodecType::Video, RTCRtpTransceiverDirection::Sendrecv),
        MockTransceiver::new(RTPCodecType::Video, RTCRtpTransceiverDirection::Recvonly),
        MockTransceiver::new(RTPCodecType::Audio, RTCRtpTransceiverDirection::Sendonly),
    ];
    interceptor.on_add_stream(transceivers).await;

    assert_eq!(
        instrumentation.events(),
        vec![
            "insertable:true",
            "playout:addStream",
            "insertable:true",
            "playout:addStream",
        ]
    );

    Ok(())
}
