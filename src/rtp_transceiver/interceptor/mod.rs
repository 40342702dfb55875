#[cfg(test)]
mod interceptor_test;

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use tokio::sync::Mutex;

use crate::api::setting_engine::SettingEngine;
use crate::error::Result;
use crate::instrumentation::{PlayoutDelayOccasion, TransceiverInstrumentation};
use crate::peer_connection::event_bridge::TrackEvent;
use crate::peer_connection::ConnectionId;
use crate::rtp_transceiver::rtp_codec::RTPCodecType;
use crate::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;
use crate::rtp_transceiver::{RTCRtpSendParameters, RtpSender, RtpTransceiver};
use crate::track::{MediaStreamTrack, TrackDirection};

/// InterceptorContext is what a wrapped object needs to know about the
/// connection that owns it.
pub(crate) struct InterceptorContext {
    pub(crate) id: ConnectionId,
    pub(crate) name: String,
    pub(crate) encoded_insertable_streams: bool,
    pub(crate) instrumentation: Arc<dyn TransceiverInstrumentation>,
    pub(crate) setting_engine: Arc<SettingEngine>,
}

impl InterceptorContext {
    async fn install_insertable_streams(&self, transceiver: &Arc<dyn RtpTransceiver>) {
        if self.encoded_insertable_streams {
            self.instrumentation
                .handle_insertable_streams(self.id, Arc::clone(transceiver))
                .await;
        }
    }
}

/// InterceptedRtpSender wraps a sender of the external implementation.
///
/// `set_parameters` runs the parameters through the configured override
/// hook, `replace_track` re-installs encoded-frame interception once the
/// underlying call succeeds. Everything else is delegated as is.
pub struct InterceptedRtpSender {
    inner: Arc<dyn RtpSender>,
    // Re-pointed by the interceptor when the owning wrapper is dropped and
    // the sender shows up on another transceiver.
    transceiver: Mutex<Weak<InterceptedRtpTransceiver>>,
    ctx: Arc<InterceptorContext>,
}

impl fmt::Debug for InterceptedRtpSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptedRtpSender")
            .field("connection", &self.ctx.name)
            .finish()
    }
}

impl InterceptedRtpSender {
    /// inner returns the sender of the external implementation.
    pub fn inner(&self) -> &Arc<dyn RtpSender> {
        &self.inner
    }
}

#[async_trait::async_trait]
impl RtpSender for InterceptedRtpSender {
    async fn track(&self) -> Option<MediaStreamTrack> {
        self.inner.track().await
    }

    async fn get_parameters(&self) -> RTCRtpSendParameters {
        self.inner.get_parameters().await
    }

    async fn set_parameters(&self, parameters: RTCRtpSendParameters) -> Result<()> {
        log::debug!("{} sender.setParameters {:?}", self.ctx.name, parameters);
        let parameters = match &self.ctx.setting_engine.override_set_parameters {
            Some(f) => f(parameters),
            None => parameters,
        };
        self.inner.set_parameters(parameters).await
    }

    async fn set_streams(&self, streams: Vec<String>) -> Result<()> {
        log::debug!("{} sender.setStreams {:?}", self.ctx.name, streams);
        self.inner.set_streams(streams).await
    }

    async fn replace_track(&self, track: Option<MediaStreamTrack>) -> Result<()> {
        log::debug!("{} sender.replaceTrack {:?}", self.ctx.name, track);
        self.inner.replace_track(track).await?;

        // a new track drops the encoded-frame pipeline of the old one
        let transceiver = self.transceiver.lock().await.upgrade();
        if let Some(transceiver) = transceiver {
            let transceiver: Arc<dyn RtpTransceiver> = transceiver;
            self.ctx.install_insertable_streams(&transceiver).await;
        }
        Ok(())
    }

    fn is_intercepted(&self) -> bool {
        true
    }
}

/// InterceptedRtpTransceiver wraps a transceiver of the external
/// implementation and hands out its intercepted sender.
pub struct InterceptedRtpTransceiver {
    inner: Arc<dyn RtpTransceiver>,
    sender: Option<Arc<dyn RtpSender>>,
}

impl fmt::Debug for InterceptedRtpTransceiver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptedRtpTransceiver")
            .field("has_sender", &self.sender.is_some())
            .finish()
    }
}

impl InterceptedRtpTransceiver {
    /// inner returns the transceiver of the external implementation.
    pub fn inner(&self) -> &Arc<dyn RtpTransceiver> {
        &self.inner
    }
}

#[async_trait::async_trait]
impl RtpTransceiver for InterceptedRtpTransceiver {
    async fn mid(&self) -> Option<String> {
        self.inner.mid().await
    }

    async fn kind(&self) -> RTPCodecType {
        self.inner.kind().await
    }

    async fn direction(&self) -> RTCRtpTransceiverDirection {
        self.inner.direction().await
    }

    async fn sender(&self) -> Option<Arc<dyn RtpSender>> {
        self.sender.clone()
    }

    fn is_intercepted(&self) -> bool {
        true
    }
}

/// Wrapped remembers the wrapper handed out for each external object, keyed
/// by the object's address. A live wrapper keeps its object alive, so an
/// address cannot be reused while its entry can still be upgraded.
#[derive(Default)]
struct Wrapped {
    transceivers: HashMap<usize, Weak<InterceptedRtpTransceiver>>,
    senders: HashMap<usize, Weak<InterceptedRtpSender>>,
}

impl Wrapped {
    fn prune(&mut self) {
        self.transceivers.retain(|_, w| w.strong_count() > 0);
        self.senders.retain(|_, w| w.strong_count() > 0);
    }
}

fn identity<T: ?Sized>(object: &Arc<T>) -> usize {
    Arc::as_ptr(object) as *const () as usize
}

/// TransceiverInterceptor wraps the transceivers and senders a connection
/// hands to the application, and notifies the instrumentation collaborator
/// on each occasion a transceiver shows up.
///
/// Wrapping is idempotent: an object is wrapped at most once, however many
/// code paths touch it.
pub(crate) struct TransceiverInterceptor {
    ctx: Arc<InterceptorContext>,
    wrapped: Mutex<Wrapped>,
}

impl TransceiverInterceptor {
    pub(crate) fn new(ctx: InterceptorContext) -> Self {
        TransceiverInterceptor {
            ctx: Arc::new(ctx),
            wrapped: Mutex::new(Wrapped::default()),
        }
    }

    /// wrap returns the intercepted form of `transceiver`, creating it the
    /// first time the object is seen.
    pub(crate) async fn wrap(&self, transceiver: Arc<dyn RtpTransceiver>) -> Arc<dyn RtpTransceiver> {
        if transceiver.is_intercepted() {
            return transceiver;
        }

        let mut wrapped = self.wrapped.lock().await;
        let key = identity(&transceiver);
        if let Some(existing) = wrapped.transceivers.get(&key).and_then(Weak::upgrade) {
            return existing;
        }
        wrapped.prune();

        let inner_sender = transceiver.sender().await;
        let known_sender = match &inner_sender {
            Some(sender) if !sender.is_intercepted() => wrapped
                .senders
                .get(&identity(sender))
                .and_then(Weak::upgrade),
            _ => None,
        };
        let reused_sender: Option<Arc<dyn RtpSender>> = match (&known_sender, &inner_sender) {
            (Some(known), _) => Some(Arc::clone(known) as Arc<dyn RtpSender>),
            (None, Some(sender)) if sender.is_intercepted() => Some(Arc::clone(sender)),
            _ => None,
        };

        let mut new_sender = None;
        let intercepted = Arc::new_cyclic(|weak: &Weak<InterceptedRtpTransceiver>| {
            let sender = match (reused_sender, inner_sender) {
                (Some(sender), _) => Some(sender),
                (None, Some(inner)) => {
                    let sender = Arc::new(InterceptedRtpSender {
                        inner,
                        transceiver: Mutex::new(weak.clone()),
                        ctx: Arc::clone(&self.ctx),
                    });
                    new_sender = Some(Arc::clone(&sender));
                    Some(sender as Arc<dyn RtpSender>)
                }
                (None, None) => None,
            };
            InterceptedRtpTransceiver {
                inner: Arc::clone(&transceiver),
                sender,
            }
        });

        if let Some(sender) = known_sender {
            let mut owner = sender.transceiver.lock().await;
            if owner.strong_count() == 0 {
                log::trace!("{} sender moved to a new transceiver", self.ctx.name);
                *owner = Arc::downgrade(&intercepted);
            }
        }
        if let Some(sender) = new_sender {
            wrapped
                .senders
                .insert(identity(&sender.inner), Arc::downgrade(&sender));
        }
        wrapped.transceivers.insert(key, Arc::downgrade(&intercepted));
        log::trace!("{} wrapped transceiver", self.ctx.name);

        intercepted
    }

    /// on_add_transceiver handles a transceiver returned by the external
    /// add-transceiver call.
    pub(crate) async fn on_add_transceiver(
        &self,
        transceiver: Arc<dyn RtpTransceiver>,
    ) -> Arc<dyn RtpTransceiver> {
        let transceiver = self.wrap(transceiver).await;
        self.ctx.install_insertable_streams(&transceiver).await;
        self.ctx
            .instrumentation
            .handle_playout_delay_hint(
                self.ctx.id,
                Arc::clone(&transceiver),
                PlayoutDelayOccasion::AddTransceiver,
            )
            .await;
        transceiver
    }

    /// on_add_stream handles the sending transceivers present after a stream
    /// was added.
    pub(crate) async fn on_add_stream(&self, transceivers: Vec<Arc<dyn RtpTransceiver>>) {
        for transceiver in transceivers {
            if !transceiver.direction().await.has_send() {
                continue;
            }
            let transceiver = self.wrap(transceiver).await;
            self.ctx.install_insertable_streams(&transceiver).await;
            self.ctx
                .instrumentation
                .handle_playout_delay_hint(self.ctx.id, transceiver, PlayoutDelayOccasion::AddStream)
                .await;
        }
    }

    /// on_track handles a remote track and returns the event with its
    /// transceiver wrapped.
    pub(crate) async fn on_track(&self, event: TrackEvent) -> TrackEvent {
        let transceiver = self.wrap(event.transceiver).await;

        if let Some(track) = &event.track {
            self.ctx.install_insertable_streams(&transceiver).await;
            match track.kind {
                RTPCodecType::Video => {
                    if self.ctx.setting_engine.timestamp_watermark {
                        let instrumentation = Arc::clone(&self.ctx.instrumentation);
                        self.ctx
                            .instrumentation
                            .recognize_timestamp_watermark(
                                self.ctx.id,
                                track.clone(),
                                Box::new(move |sample| {
                                    instrumentation.push_video_end_to_end_delay(sample)
                                }),
                            )
                            .await;
                    }
                    if self.ctx.setting_engine.should_save_video_track() {
                        self.save_track(track.clone()).await;
                    }
                }
                RTPCodecType::Audio => {
                    if self.ctx.setting_engine.should_save_audio_track() {
                        self.save_track(track.clone()).await;
                    }
                }
                RTPCodecType::Unspecified => {}
            }
        }

        self.ctx
            .instrumentation
            .handle_playout_delay_hint(
                self.ctx.id,
                Arc::clone(&transceiver),
                PlayoutDelayOccasion::Track,
            )
            .await;

        TrackEvent {
            track: event.track,
            transceiver,
        }
    }

    async fn save_track(&self, track: MediaStreamTrack) {
        let track_id = track.id.clone();
        if let Err(err) = self
            .ctx
            .instrumentation
            .save_track(self.ctx.id, track, TrackDirection::Recv)
            .await
        {
            log::warn!("{} saving track {} failed: {}", self.ctx.name, track_id, err);
        }
    }
}
