use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::time::{sleep, Duration};
use webrtc_perf_proxy::api::setting_engine::SettingEngine;
use webrtc_perf_proxy::api::APIBuilder;
use webrtc_perf_proxy::error::Result;
use webrtc_perf_proxy::external::ExternalPeerConnection;
use webrtc_perf_proxy::peer_connection::configuration::RTCConfiguration;
use webrtc_perf_proxy::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc_perf_proxy::peer_connection::sdp::{RTCSdpType, RTCSessionDescription};
use webrtc_perf_proxy::peer_connection::ConnectionId;
use webrtc_perf_proxy::rtp_transceiver::rtp_codec::{
    RTCRtpCapabilities, RTCRtpCodecCapability, RTPCodecType,
};
use webrtc_perf_proxy::rtp_transceiver::RtpTransceiver;
use webrtc_perf_proxy::{EVENT_CONNECTION_STATE_CHANGE, EVENT_ICE_CONNECTION_STATE_CHANGE};

/// Remote records the calls as they arrive and answers after a short delay,
/// like an implementation living behind an IPC channel would.
#[derive(Default)]
struct Remote {
    calls: Mutex<Vec<String>>,
}

impl Remote {
    async fn record(&self, call: String) {
        self.calls.lock().await.push(call);
        sleep(Duration::from_millis(5)).await;
    }
}

#[async_trait::async_trait]
impl ExternalPeerConnection for Remote {
    async fn create(&self, id: ConnectionId, _options: String) -> Result<()> {
        self.record(format!("create:{id}")).await;
        Ok(())
    }

    async fn close(&self, id: ConnectionId) -> Result<()> {
        self.record(format!("close:{id}")).await;
        Ok(())
    }

    async fn add_transceiver(
        &self,
        id: ConnectionId,
        args: String,
    ) -> Result<Option<Arc<dyn RtpTransceiver>>> {
        let args: serde_json::Value = serde_json::from_str(&args)?;
        self.record(format!("addTransceiver:{id}:{}", args["trackOrKind"]))
            .await;
        Ok(None)
    }

    async fn add_stream(&self, id: ConnectionId, _stream: String) -> Result<()> {
        self.record(format!("addStream:{id}")).await;
        Ok(())
    }

    async fn create_offer(&self, id: ConnectionId, _options: String) -> Result<String> {
        self.record(format!("createOffer:{id}")).await;
        RTCSessionDescription::offer(format!("v=0 offer {id}")).marshal()
    }

    async fn create_answer(&self, id: ConnectionId, _options: String) -> Result<String> {
        self.record(format!("createAnswer:{id}")).await;
        RTCSessionDescription::answer(format!("v=0 answer {id}")).marshal()
    }

    async fn set_remote_description(
        &self,
        id: ConnectionId,
        description: String,
    ) -> Result<String> {
        self.record(format!("setRemoteDescription:{id}")).await;
        Ok(description)
    }

    async fn set_configuration(&self, id: ConnectionId, _configuration: String) -> Result<()> {
        self.record(format!("setConfiguration:{id}")).await;
        Ok(())
    }

    async fn get_capabilities(&self, kind: RTPCodecType) -> RTCRtpCapabilities {
        let mime_types: &[&str] = match kind {
            RTPCodecType::Video => &["video/VP8", "video/VP9", "video/AV1"],
            _ => &["audio/opus"],
        };
        RTCRtpCapabilities {
            codecs: mime_types
                .iter()
                .map(|mime_type| RTCRtpCodecCapability {
                    mime_type: (*mime_type).to_owned(),
                    clock_rate: 90000,
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }
    }
}

#[tokio::test]
async fn test_offer_answer_session() -> anyhow::Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();

    let remote = Arc::new(Remote::default());
    let setting_engine = SettingEngine::from_json(
        r#"{"timestampInsertableStreams": true, "disabledVideoCodecs": ["vp9", "AV1"]}"#,
    )?;
    let api = APIBuilder::new()
        .with_external(Arc::clone(&remote) as Arc<dyn ExternalPeerConnection>)
        .with_setting_engine(setting_engine)
        .build()?;

    let configuration: RTCConfiguration =
        serde_json::from_str(r#"{"sdpSemantics": "unified-plan"}"#)?;
    let pc = api.new_peer_connection(configuration).await?;
    let id = pc.id();
    assert!(pc.encoded_insertable_streams());

    let _ = pc.add_transceiver(RTPCodecType::Audio.into(), None)?;
    let _ = pc.add_transceiver(RTPCodecType::Video.into(), None)?;
    let offer = pc.create_offer(None).await?;
    assert_eq!(offer.sdp_type, RTCSdpType::Offer);
    pc.set_local_description(offer.clone()).await?;
    pc.set_remote_description(RTCSessionDescription::answer("v=0 remote".to_owned()))
        .await?;

    let calls = remote.calls.lock().await.clone();
    assert_eq!(calls.len(), 5);
    assert_eq!(calls[0], format!("create:{id}"));
    assert_eq!(calls[3], format!("createOffer:{id}"));
    assert_eq!(calls[4], format!("setRemoteDescription:{id}"));
    assert_eq!(pc.local_description().await, Some(offer));

    let video = api.get_capabilities(RTPCodecType::Video).await;
    let names: Vec<String> = video.codecs.iter().map(|c| c.codec_name()).collect();
    assert_eq!(names, vec!["vp8"]);

    api.dispatch_event(id, EVENT_ICE_CONNECTION_STATE_CHANGE, "connected")
        .await?;
    api.dispatch_event(id, EVENT_CONNECTION_STATE_CHANGE, "connected")
        .await?;
    assert_eq!(pc.connection_state(), RTCPeerConnectionState::Connected);

    pc.close().await?;
    assert!(api.registry().get(id).await.is_none());
    assert_eq!(
        remote.calls.lock().await.last().cloned(),
        Some(format!("close:{id}"))
    );

    Ok(())
}

#[tokio::test]
async fn test_connections_are_independent() -> anyhow::Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();

    let remote = Arc::new(Remote::default());
    let api = APIBuilder::new()
        .with_external(Arc::clone(&remote) as Arc<dyn ExternalPeerConnection>)
        .build()?;

    let a = api.new_peer_connection(RTCConfiguration::default()).await?;
    let b = api.new_peer_connection(RTCConfiguration::default()).await?;
    assert_ne!(a.id(), b.id());
    assert_eq!(api.registry().len().await, 2);

    api.dispatch_event(a.id(), EVENT_CONNECTION_STATE_CHANGE, "closed")
        .await?;
    assert_eq!(api.registry().ids().await, vec![b.id()]);
    assert_eq!(b.connection_state(), RTCPeerConnectionState::New);

    let answer = b.create_answer(None).await?;
    assert_eq!(answer.sdp, format!("v=0 answer {}", b.id()));

    Ok(())
}
