
pub mod configuration;
pub(crate) mod event_bridge;
pub mod offer_answer_options;
pub(crate) mod operation;
pub mod peer_connection_state;
pub mod registry;
pub mod sdp;

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

pub use event_bridge::{EventDetail, OnEventHdlrFn, TrackEvent};
pub use operation::Operation;
use portable_atomic::AtomicU8;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::api::setting_engine::SettingEngine;
use crate::error::{Error, Result};
use crate::external::ExternalPeerConnection;
use crate::ice_transport::ice_connection_state::RTCIceConnectionState;
use crate::instrumentation::TransceiverInstrumentation;
use crate::peer_connection::configuration::RTCConfiguration;
use crate::peer_connection::event_bridge::EventBridge;
use crate::peer_connection::offer_answer_options::{RTCAnswerOptions, RTCOfferOptions};
use crate::peer_connection::operation::Operations;
use crate::peer_connection::peer_connection_state::RTCPeerConnectionState;
use crate::peer_connection::registry::PeerConnectionRegistry;
use crate::peer_connection::sdp::RTCSessionDescription;
use crate::rtp_transceiver::interceptor::{InterceptorContext, TransceiverInterceptor};
use crate::rtp_transceiver::{RTCRtpTransceiverInit, RtpTransceiver, TrackOrKind};
use crate::stats::StatsReport;
use crate::track::MediaStream;
use crate::{EVENT_CONNECTION_STATE_CHANGE, EVENT_ICE_CONNECTION_STATE_CHANGE, EVENT_TRACK};

/// ConnectionId identifies a connection towards the external implementation.
pub type ConnectionId = u32;

/// Collaborators a connection is built from, handed over by the API.
pub(crate) struct PeerConnectionParams {
    pub(crate) configuration: RTCConfiguration,
    pub(crate) external: Arc<dyn ExternalPeerConnection>,
    pub(crate) instrumentation: Arc<dyn TransceiverInstrumentation>,
    pub(crate) setting_engine: Arc<SettingEngine>,
    pub(crate) registry: Weak<PeerConnectionRegistry>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AddTransceiverArgs<'a> {
    track_or_kind: &'a TrackOrKind,
    init: &'a Option<RTCRtpTransceiverInit>,
}

/// RTCPeerConnection is the application-facing proxy of a connection that
/// lives in an external implementation.
///
/// Calls are forwarded as JSON payloads. Calls that depend on the negotiation
/// state (offers, answers, descriptions and close) first wait for every call
/// submitted before them on the same connection. Events come back through
/// [`crate::api::API::dispatch_event`].
pub struct RTCPeerConnection {
    id: ConnectionId,
    name: String,

    external: Arc<dyn ExternalPeerConnection>,
    ops: Operations,
    events: EventBridge,
    interceptor: Arc<TransceiverInterceptor>,
    registry: Weak<PeerConnectionRegistry>,

    encoded_insertable_streams: bool,
    is_closed: Arc<AtomicBool>,

    peer_connection_state: AtomicU8,
    ice_connection_state: AtomicU8,

    local_description: Arc<Mutex<Option<RTCSessionDescription>>>,
    remote_description: Arc<Mutex<Option<RTCSessionDescription>>>,
}

impl fmt::Debug for RTCPeerConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RTCPeerConnection")
            .field("id", &self.id)
            .field("connection_state", &self.connection_state())
            .field("ice_connection_state", &self.ice_connection_state())
            .field("pending_tasks", &self.ops.len())
            .finish()
    }
}

impl RTCPeerConnection {
    /// new builds the proxy for `id` and submits the external create call as
    /// its first pending task. Must be called within a tokio runtime.
    pub(crate) fn new(id: ConnectionId, params: PeerConnectionParams) -> Result<Self> {
        let name = format!("RTCPeerConnection-{id}");
        let encoded_insertable_streams = params
            .configuration
            .encoded_insertable_streams_enabled(params.setting_engine.timestamp_insertable_streams);
        let configuration = params
            .configuration
            .with_encoded_insertable_streams(encoded_insertable_streams);
        let options = serde_json::to_string(&configuration)?;
        log::debug!("{} {}", name, options);

        let interceptor = Arc::new(TransceiverInterceptor::new(InterceptorContext {
            id,
            name: name.clone(),
            encoded_insertable_streams,
            instrumentation: params.instrumentation,
            setting_engine: params.setting_engine,
        }));

        let pc = RTCPeerConnection {
            id,
            name: name.clone(),
            external: params.external,
            ops: Operations::new(name.clone()),
            events: EventBridge::new(name),
            interceptor,
            registry: params.registry,
            encoded_insertable_streams,
            is_closed: Arc::new(AtomicBool::new(false)),
            peer_connection_state: AtomicU8::new(RTCPeerConnectionState::New as u8),
            ice_connection_state: AtomicU8::new(RTCIceConnectionState::New as u8),
            local_description: Arc::new(Mutex::new(None)),
            remote_description: Arc::new(Mutex::new(None)),
        };

        let external = Arc::clone(&pc.external);
        let _ = pc
            .ops
            .enqueue("create", async move { external.create(id, options).await });

        Ok(pc)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// connection_state returns the last `connectionstatechange` value
    /// reported by the external implementation.
    pub fn connection_state(&self) -> RTCPeerConnectionState {
        self.peer_connection_state.load(Ordering::SeqCst).into()
    }

    /// ice_connection_state returns the last `iceconnectionstatechange`
    /// value reported by the external implementation.
    pub fn ice_connection_state(&self) -> RTCIceConnectionState {
        self.ice_connection_state.load(Ordering::SeqCst).into()
    }

    /// encoded_insertable_streams reports whether encoded-frame interception
    /// is enabled for this connection.
    pub fn encoded_insertable_streams(&self) -> bool {
        self.encoded_insertable_streams
    }

    /// local_description returns the description produced by the last
    /// successful create_offer or create_answer.
    pub async fn local_description(&self) -> Option<RTCSessionDescription> {
        self.local_description.lock().await.clone()
    }

    /// remote_description returns the description applied by the last
    /// successful set_remote_description.
    pub async fn remote_description(&self) -> Option<RTCSessionDescription> {
        self.remote_description.lock().await.clone()
    }

    /// pending_tasks returns how many submitted calls the next state-dependent
    /// operation would wait for.
    pub fn pending_tasks(&self) -> usize {
        self.ops.len()
    }

    /// wait_pending_tasks waits for every call submitted so far. Failed calls
    /// are logged and skipped.
    pub async fn wait_pending_tasks(&self) {
        self.ops.drain().await
    }

    fn check_open(&self) -> Result<()> {
        if self.is_closed.load(Ordering::SeqCst) {
            Err(Error::ErrConnectionClosed)
        } else {
            Ok(())
        }
    }

    /// add_event_listener appends a handler for the named event. Handlers of
    /// one event run in registration order.
    pub fn add_event_listener(&self, event: &str, f: OnEventHdlrFn) {
        self.events.subscribe(event, f);
    }

    /// close waits for the pending calls, then closes the external
    /// connection and removes this proxy from the registry. Closing twice is
    /// a no-op.
    pub async fn close(&self) -> Result<()> {
        log::debug!("{} close", self.name);
        if self.is_closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let (external, id) = (Arc::clone(&self.external), self.id);
        let result = self
            .ops
            .enqueue_after_drain("close", move || async move { external.close(id).await })
            .wait()
            .await;

        if let Some(registry) = self.registry.upgrade() {
            registry.unregister(self.id).await;
        }
        result
    }

    /// add_transceiver submits the external add-transceiver call and returns
    /// at once. The returned operation resolves to the intercepted
    /// transceiver, when the external implementation hands one back; it may
    /// be dropped, later state-dependent calls wait for it regardless.
    pub fn add_transceiver(
        &self,
        track_or_kind: TrackOrKind,
        init: Option<RTCRtpTransceiverInit>,
    ) -> Result<Operation<Option<Arc<dyn RtpTransceiver>>>> {
        self.check_open()?;
        let args = serde_json::to_string(&AddTransceiverArgs {
            track_or_kind: &track_or_kind,
            init: &init,
        })?;
        log::debug!("{} addTransceiver {}", self.name, args);

        let (external, id) = (Arc::clone(&self.external), self.id);
        let interceptor = Arc::clone(&self.interceptor);
        Ok(self.ops.enqueue("addTransceiver", async move {
            match external.add_transceiver(id, args).await? {
                Some(transceiver) => Ok(Some(interceptor.on_add_transceiver(transceiver).await)),
                None => Ok(None),
            }
        }))
    }

    /// get_transceivers returns the transceivers the external implementation
    /// reports, intercepted.
    pub async fn get_transceivers(&self) -> Vec<Arc<dyn RtpTransceiver>> {
        let mut transceivers = vec![];
        for transceiver in self.external.get_transceivers(self.id).await {
            transceivers.push(self.interceptor.wrap(transceiver).await);
        }
        transceivers
    }

    /// add_stream is accepted but not forwarded: streams are not bridged to
    /// the external implementation. The sending transceivers present at this
    /// point are intercepted.
    pub async fn add_stream(&self, stream: MediaStream) -> Result<()> {
        self.check_open()?;
        log::debug!("{} addStream {}", self.name, serde_json::to_string(&stream)?);

        let transceivers = self.external.get_transceivers(self.id).await;
        self.interceptor.on_add_stream(transceivers).await;
        Ok(())
    }

    /// create_offer waits for the pending calls, then asks the external
    /// implementation for an offer and keeps it as the local description.
    pub async fn create_offer(
        &self,
        options: Option<RTCOfferOptions>,
    ) -> Result<RTCSessionDescription> {
        self.check_open()?;
        let options = serde_json::to_string(&options)?;
        log::debug!("{} createOffer {}", self.name, options);

        let (external, id) = (Arc::clone(&self.external), self.id);
        let local_description = Arc::clone(&self.local_description);
        self.ops
            .enqueue_after_drain("createOffer", move || async move {
                let raw = external.create_offer(id, options).await?;
                let description = RTCSessionDescription::unmarshal(&raw)?;
                *local_description.lock().await = Some(description.clone());
                Ok(description)
            })
            .wait()
            .await
    }

    /// create_answer waits for the pending calls, then asks the external
    /// implementation for an answer and keeps it as the local description.
    pub async fn create_answer(
        &self,
        options: Option<RTCAnswerOptions>,
    ) -> Result<RTCSessionDescription> {
        self.check_open()?;
        let options = serde_json::to_string(&options)?;
        log::debug!("{} createAnswer {}", self.name, options);

        let (external, id) = (Arc::clone(&self.external), self.id);
        let local_description = Arc::clone(&self.local_description);
        self.ops
            .enqueue_after_drain("createAnswer", move || async move {
                let raw = external.create_answer(id, options).await?;
                let description = RTCSessionDescription::unmarshal(&raw)?;
                *local_description.lock().await = Some(description.clone());
                Ok(description)
            })
            .wait()
            .await
    }

    /// set_local_description only waits for the pending calls. The external
    /// implementation already holds the description it created.
    pub async fn set_local_description(&self, description: RTCSessionDescription) -> Result<()> {
        self.check_open()?;
        log::debug!("{} setLocalDescription {}", self.name, description.sdp_type);

        self.ops
            .enqueue_after_drain("setLocalDescription", || async { Ok(()) })
            .wait()
            .await
    }

    /// set_remote_description waits for the pending calls, then hands the
    /// description to the external implementation and keeps the description
    /// it reports back.
    pub async fn set_remote_description(&self, description: RTCSessionDescription) -> Result<()> {
        self.check_open()?;
        let description = description.marshal()?;
        log::debug!("{} setRemoteDescription {}", self.name, description);

        let (external, id) = (Arc::clone(&self.external), self.id);
        let remote_description = Arc::clone(&self.remote_description);
        self.ops
            .enqueue_after_drain("setRemoteDescription", move || async move {
                let raw = external.set_remote_description(id, description).await?;
                let description = RTCSessionDescription::unmarshal(&raw)?;
                *remote_description.lock().await = Some(description);
                Ok(())
            })
            .wait()
            .await
    }

    /// get_stats is not bridged and always returns an empty report.
    pub async fn get_stats(&self) -> StatsReport {
        StatsReport::default()
    }

    /// set_configuration forwards `configuration` with the connection's
    /// encoded-frame interception flag applied.
    pub async fn set_configuration(&self, configuration: RTCConfiguration) -> Result<()> {
        self.check_open()?;
        let configuration = serde_json::to_string(
            &configuration.with_encoded_insertable_streams(self.encoded_insertable_streams),
        )?;
        log::debug!("{} setConfiguration {}", self.name, configuration);

        let (external, id) = (Arc::clone(&self.external), self.id);
        self.ops
            .enqueue("setConfiguration", async move {
                external.set_configuration(id, configuration).await
            })
            .wait()
            .await
    }

    /// dispatch_event runs the built-in handling of reserved events, then
    /// delivers the event to the registered listeners.
    pub(crate) async fn dispatch_event(&self, event: &str, detail: EventDetail) -> Result<()> {
        let detail = match event {
            EVENT_CONNECTION_STATE_CHANGE => {
                let state = RTCPeerConnectionState::from(self.state_payload(event, &detail)?);
                if state == RTCPeerConnectionState::Unspecified {
                    return Err(Error::ErrInvalidEventPayload(event.to_owned()));
                }
                log::debug!("{} connectionstatechange {}", self.name, state);
                self.peer_connection_state
                    .store(state as u8, Ordering::SeqCst);
                if state.is_terminal() {
                    self.unregister().await;
                }
                detail
            }
            EVENT_ICE_CONNECTION_STATE_CHANGE => {
                let state = RTCIceConnectionState::from(self.state_payload(event, &detail)?);
                if state == RTCIceConnectionState::Unspecified {
                    return Err(Error::ErrInvalidEventPayload(event.to_owned()));
                }
                log::debug!("{} iceconnectionstatechange {}", self.name, state);
                self.ice_connection_state
                    .store(state as u8, Ordering::SeqCst);
                if state.is_terminal() {
                    self.unregister().await;
                }
                detail
            }
            EVENT_TRACK => match detail {
                EventDetail::Track(track_event) => {
                    EventDetail::Track(self.interceptor.on_track(track_event).await)
                }
                EventDetail::Text(_) => {
                    return Err(Error::ErrInvalidEventPayload(event.to_owned()))
                }
            },
            _ => detail,
        };

        self.events.dispatch(event, detail).await
    }

    fn state_payload<'a>(&self, event: &str, detail: &'a EventDetail) -> Result<&'a str> {
        detail
            .as_text()
            .ok_or_else(|| Error::ErrInvalidEventPayload(event.to_owned()))
    }

    async fn unregister(&self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.unregister(self.id).await;
        }
    }
}
