
pub mod setting_engine;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use setting_engine::*;
use tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::external::ExternalPeerConnection;
use crate::instrumentation::{NoopInstrumentation, TransceiverInstrumentation};
use crate::peer_connection::configuration::RTCConfiguration;
use crate::peer_connection::registry::PeerConnectionRegistry;
use crate::peer_connection::{ConnectionId, EventDetail, PeerConnectionParams, RTCPeerConnection};
use crate::rtp_transceiver::capabilities::filter_capabilities;
use crate::rtp_transceiver::rtp_codec::{RTCRtpCapabilities, RTPCodecType};

pub type OnPeerConnectionCreatedHdlrFn = Box<
    dyn (FnMut(ConnectionId, Arc<RTCPeerConnection>) -> Pin<Box<dyn Future<Output = ()> + Send + 'static>>)
        + Send
        + Sync,
>;

/// API bundles what every connection of a run shares: the external
/// implementation calls are forwarded to, the instrumentation collaborator,
/// the settings and the registry of live connections.
pub struct API {
    pub(crate) setting_engine: Arc<SettingEngine>,
    pub(crate) external: Arc<dyn ExternalPeerConnection>,
    pub(crate) instrumentation: Arc<dyn TransceiverInstrumentation>,
    pub(crate) registry: Arc<PeerConnectionRegistry>,
    on_peer_connection_created_handler: Arc<ArcSwapOption<Mutex<OnPeerConnectionCreatedHdlrFn>>>,
}

impl API {
    /// new_peer_connection creates a new RTCPeerConnection with the provided
    /// configuration, under an id no live connection uses.
    pub async fn new_peer_connection(
        &self,
        configuration: RTCConfiguration,
    ) -> Result<Arc<RTCPeerConnection>> {
        let params = PeerConnectionParams {
            configuration,
            external: Arc::clone(&self.external),
            instrumentation: Arc::clone(&self.instrumentation),
            setting_engine: Arc::clone(&self.setting_engine),
            registry: Arc::downgrade(&self.registry),
        };
        let pc = self
            .registry
            .register_new(|id| RTCPeerConnection::new(id, params))
            .await?;

        if let Some(handler) = &*self.on_peer_connection_created_handler.load() {
            let mut f = handler.lock().await;
            f(pc.id(), Arc::clone(&pc)).await;
        }

        Ok(pc)
    }

    /// on_peer_connection_created sets a handler called with every
    /// connection once it is registered.
    pub fn on_peer_connection_created(&self, f: OnPeerConnectionCreatedHdlrFn) {
        self.on_peer_connection_created_handler
            .store(Some(Arc::new(Mutex::new(f))));
    }

    /// dispatch_event delivers an event emitted by the external
    /// implementation to the connection it names. Connections that were
    /// closed or reported a terminal state still receive events while the
    /// application holds them.
    pub async fn dispatch_event(
        &self,
        id: ConnectionId,
        event: &str,
        detail: impl Into<EventDetail>,
    ) -> Result<()> {
        let Some(pc) = self.registry.route(id).await else {
            log::debug!("RTCPeerConnection-{} not found for {}", id, event);
            return Err(Error::ErrConnectionNotFound(id));
        };
        pc.dispatch_event(event, detail.into()).await
    }

    /// get_capabilities returns the sender capabilities of the external
    /// implementation, without the disabled video codecs.
    pub async fn get_capabilities(&self, kind: RTPCodecType) -> RTCRtpCapabilities {
        let capabilities = self.external.get_capabilities(kind).await;
        filter_capabilities(
            kind,
            capabilities,
            &self.setting_engine.disabled_video_codecs,
        )
    }

    /// registry returns the live connections of this API.
    pub fn registry(&self) -> &Arc<PeerConnectionRegistry> {
        &self.registry
    }

    pub fn setting_engine(&self) -> &SettingEngine {
        &self.setting_engine
    }
}

#[derive(Default)]
pub struct APIBuilder {
    setting_engine: Option<Arc<SettingEngine>>,
    external: Option<Arc<dyn ExternalPeerConnection>>,
    instrumentation: Option<Arc<dyn TransceiverInstrumentation>>,
    registry: Option<Arc<PeerConnectionRegistry>>,
}

impl APIBuilder {
    pub fn new() -> Self {
        APIBuilder::default()
    }

    /// build fails when no external implementation was provided.
    pub fn build(mut self) -> Result<API> {
        let external = self
            .external
            .take()
            .ok_or(Error::ErrNoExternalPeerConnection)?;

        Ok(API {
            setting_engine: if let Some(setting_engine) = self.setting_engine.take() {
                setting_engine
            } else {
                Arc::new(SettingEngine::default())
            },
            external,
            instrumentation: if let Some(instrumentation) = self.instrumentation.take() {
                instrumentation
            } else {
                Arc::new(NoopInstrumentation)
            },
            registry: if let Some(registry) = self.registry.take() {
                registry
            } else {
                Arc::new(PeerConnectionRegistry::new())
            },
            on_peer_connection_created_handler: Arc::new(ArcSwapOption::empty()),
        })
    }

    /// with_setting_engine allows providing a SettingEngine to the API.
    /// Settings should not be changed after passing the engine to an API.
    pub fn with_setting_engine(mut self, setting_engine: SettingEngine) -> Self {
        self.setting_engine = Some(Arc::new(setting_engine));
        self
    }

    /// with_external sets the implementation every call is forwarded to.
    pub fn with_external(mut self, external: Arc<dyn ExternalPeerConnection>) -> Self {
        self.external = Some(external);
        self
    }

    /// with_instrumentation sets the collaborator notified about
    /// transceivers and remote tracks. Defaults to [`NoopInstrumentation`].
    pub fn with_instrumentation(
        mut self,
        instrumentation: Arc<dyn TransceiverInstrumentation>,
    ) -> Self {
        self.instrumentation = Some(instrumentation);
        self
    }

    /// with_registry lets several APIs, or a test, share one registry.
    pub fn with_registry(mut self, registry: Arc<PeerConnectionRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }
}
