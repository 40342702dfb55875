use std::sync::Arc;

use crate::error::Result;
use crate::peer_connection::ConnectionId;
use crate::rtp_transceiver::rtp_codec::{RTCRtpCapabilities, RTPCodecType};
use crate::rtp_transceiver::RtpTransceiver;

/// ExternalPeerConnection is the implementation the proxy forwards to.
///
/// Every argument and result that crosses this boundary is a JSON encoded
/// string, so the implementation may live in another process. Events flow
/// back through [`crate::api::API::dispatch_event`].
///
/// There is deliberately no `set_local_description`: the implementation
/// already holds the description it produced in `create_offer`/`create_answer`.
#[async_trait::async_trait]
pub trait ExternalPeerConnection: Send + Sync + 'static {
    /// create allocates the implementation side of connection `id`.
    async fn create(&self, id: ConnectionId, options: String) -> Result<()>;

    async fn close(&self, id: ConnectionId) -> Result<()>;

    /// add_transceiver receives `{"trackOrKind": .., "init": ..}` and may hand
    /// back the transceiver object it created.
    async fn add_transceiver(
        &self,
        id: ConnectionId,
        args: String,
    ) -> Result<Option<Arc<dyn RtpTransceiver>>>;

    async fn add_stream(&self, id: ConnectionId, stream: String) -> Result<()>;

    /// create_offer returns the serialized session description.
    async fn create_offer(&self, id: ConnectionId, options: String) -> Result<String>;

    /// create_answer returns the serialized session description.
    async fn create_answer(&self, id: ConnectionId, options: String) -> Result<String>;

    /// set_remote_description returns the serialized description the
    /// implementation applied.
    async fn set_remote_description(&self, id: ConnectionId, description: String)
        -> Result<String>;

    async fn set_configuration(&self, id: ConnectionId, configuration: String) -> Result<()>;

    /// get_transceivers lists the transceivers the implementation tracks for
    /// `id`, which may legitimately be none.
    async fn get_transceivers(&self, _id: ConnectionId) -> Vec<Arc<dyn RtpTransceiver>> {
        vec![]
    }

    /// get_capabilities answers sender capability queries before filtering.
    async fn get_capabilities(&self, _kind: RTPCodecType) -> RTCRtpCapabilities {
        RTCRtpCapabilities::default()
    }
}
