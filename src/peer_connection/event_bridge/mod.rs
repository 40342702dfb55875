
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::sync::Mutex;

use crate::error::{flatten_errs, Error, Result};
use crate::rtp_transceiver::RtpTransceiver;
use crate::track::MediaStreamTrack;

pub type OnEventHdlrFn = Box<
    dyn (FnMut(EventDetail) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'static>>)
        + Send
        + Sync,
>;

/// TrackEvent is delivered with `track` events: the remote track, when the
/// receiver has one, and the transceiver it arrived on.
#[derive(Clone)]
pub struct TrackEvent {
    pub track: Option<MediaStreamTrack>,
    pub transceiver: Arc<dyn RtpTransceiver>,
}

impl fmt::Debug for TrackEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackEvent")
            .field("track", &self.track)
            .field("intercepted", &self.transceiver.is_intercepted())
            .finish()
    }
}

/// EventDetail is the payload of a named event. The external implementation
/// sends serialized payloads as text; `track` events carry objects.
#[derive(Clone, Debug)]
pub enum EventDetail {
    Text(String),
    Track(TrackEvent),
}

impl EventDetail {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            EventDetail::Text(text) => Some(text.as_str()),
            EventDetail::Track(_) => None,
        }
    }
}

impl From<&str> for EventDetail {
    fn from(text: &str) -> Self {
        EventDetail::Text(text.to_owned())
    }
}

impl From<String> for EventDetail {
    fn from(text: String) -> Self {
        EventDetail::Text(text)
    }
}

impl From<TrackEvent> for EventDetail {
    fn from(event: TrackEvent) -> Self {
        EventDetail::Track(event)
    }
}

type Handlers = HashMap<String, Vec<Arc<Mutex<OnEventHdlrFn>>>>;

/// EventBridge is the per-connection table of event listeners.
///
/// Listeners of one event run in registration order, one at a time. Each
/// invocation runs in its own task so an error or a panic only costs that
/// listener its delivery.
pub(crate) struct EventBridge {
    name: String,
    handlers: ArcSwap<Handlers>,
}

impl fmt::Debug for EventBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handlers = self.handlers.load();
        let mut events: Vec<&String> = handlers.keys().collect();
        events.sort();
        f.debug_struct("EventBridge")
            .field("name", &self.name)
            .field("events", &events)
            .finish()
    }
}

impl EventBridge {
    pub(crate) fn new(name: String) -> Self {
        EventBridge {
            name,
            handlers: ArcSwap::from_pointee(HashMap::new()),
        }
    }

    /// subscribe appends `f` to the listeners of `event`.
    pub(crate) fn subscribe(&self, event: &str, f: OnEventHdlrFn) {
        log::debug!("{} addEventListener {}", self.name, event);
        let handler = Arc::new(Mutex::new(f));
        self.handlers.rcu(|handlers| {
            let mut handlers = Handlers::clone(handlers);
            handlers
                .entry(event.to_owned())
                .or_default()
                .push(Arc::clone(&handler));
            handlers
        });
    }

    /// dispatch delivers `detail` to every listener of `event`. All listeners
    /// run even when some fail; the failures are returned together.
    pub(crate) async fn dispatch(&self, event: &str, detail: EventDetail) -> Result<()> {
        let handlers = self.handlers.load().get(event).cloned().unwrap_or_default();
        log::debug!("{} peer-connection-event-{} {:?}", self.name, event, detail);

        let mut errs = vec![];
        for handler in handlers {
            let detail = detail.clone();
            let result = tokio::spawn(async move {
                let fut = {
                    let mut f = handler.lock().await;
                    f(detail)
                };
                fut.await
            })
            .await;

            match result {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    log::error!("{} {} listener failed: {}", self.name, event, err);
                    errs.push(err);
                }
                Err(err) => {
                    log::error!("{} {} listener aborted: {}", self.name, event, err);
                    errs.push(Error::ErrEventHandler(err.to_string()));
                }
            }
        }

        flatten_errs(errs)
    }
}
