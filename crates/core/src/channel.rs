//! Live configuration channel
//!
//! While a user is signed in, [`ConfigSyncChannel`] keeps the
//! [`ParameterStore`] in line with the configuration service: one bulk fetch
//! per namespace at activation, then one by-name fetch per change
//! notification received on the push connection. Notifications carry only
//! the parameter name; the value always comes from the REST service.
//!
//! Every activation gets its own cancellation token. Deactivation cancels it
//! and closes the push connection, and any fetch that completes afterwards
//! sees the cancelled token and drops its result.

use crate::error::CoreResult;
use crate::notify::{Notifier, PARAMS_RETRIEVING_ERROR};
use crate::params::{Parameter, ParameterStore};
use crate::session::User;
use crate::spawn::Spawner;
use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::LocalBoxStream;
use serde::Deserialize;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// Header carrying the name of the changed parameter
pub const PARAMETER_NAME_HEADER: &str = "parameterName";

/// Configuration REST service
#[async_trait(?Send)]
pub trait ConfigApi {
    /// Every parameter stored under `namespace`
    async fn fetch_all_parameters(&self, namespace: &str) -> CoreResult<Vec<Parameter>>;

    /// Current value of one parameter of this application
    async fn fetch_parameter(&self, name: &str) -> CoreResult<Parameter>;

    /// Write a new value for `name`
    async fn update_parameter(&self, name: &str, value: &str) -> CoreResult<()>;

    /// Credentials to present on subsequent requests
    fn set_credentials(&self, _user: Option<&User>) {}
}

/// Inbound event of a push connection
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PushEvent {
    /// Text frame
    Message(String),
    /// Low-level transport error
    Error(String),
}

/// The live push connection: an event stream plus a way to close it
pub struct ChannelHandle {
    events: Option<LocalBoxStream<'static, PushEvent>>,
    closer: Option<Box<dyn FnOnce()>>,
}

impl ChannelHandle {
    pub fn new<F>(events: LocalBoxStream<'static, PushEvent>, closer: F) -> Self
    where
        F: FnOnce() + 'static,
    {
        Self {
            events: Some(events),
            closer: Some(Box::new(closer)),
        }
    }

    /// Take the event stream; it can only be taken once
    pub fn take_events(&mut self) -> Option<LocalBoxStream<'static, PushEvent>> {
        self.events.take()
    }

    /// Close the connection. Safe to call more than once.
    pub fn close(&mut self) {
        self.events = None;
        if let Some(closer) = self.closer.take() {
            closer();
        }
    }

    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closer.is_none()
    }
}

impl Drop for ChannelHandle {
    fn drop(&mut self) {
        self.close();
    }
}

/// Opens push connections to the configuration notification service
pub trait PushTransport {
    fn open(&self, user: &User) -> CoreResult<ChannelHandle>;
}

#[derive(Debug, Default, Deserialize)]
struct NotificationEnvelope {
    #[serde(default)]
    headers: Option<HashMap<String, serde_json::Value>>,
}

/// Extract the changed parameter name from a push frame.
///
/// Frames that are not JSON, have no headers, or carry an empty or
/// non-string `parameterName` are not notifications for this channel.
#[must_use]
pub fn parameter_name_of(frame: &str) -> Option<String> {
    let envelope: NotificationEnvelope = match serde_json::from_str(frame) {
        Ok(envelope) => envelope,
        Err(err) => {
            debug!(error = %err, "Ignoring malformed notification");
            return None;
        }
    };
    envelope
        .headers?
        .get(PARAMETER_NAME_HEADER)?
        .as_str()
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

/// Boundary collaborators and shared state the channel works with
pub struct ChannelPorts {
    pub api: Rc<dyn ConfigApi>,
    pub transport: Rc<dyn PushTransport>,
    pub store: ParameterStore,
    pub notifier: Notifier,
    pub spawner: Spawner,
}

struct Activation {
    handle: Option<ChannelHandle>,
    token: CancellationToken,
}

struct Inner {
    api: Rc<dyn ConfigApi>,
    transport: Rc<dyn PushTransport>,
    store: ParameterStore,
    notifier: Notifier,
    spawner: Spawner,
    namespaces: Vec<String>,
    active: RefCell<Option<Activation>>,
}

/// Push-driven parameter synchronization, bound to a signed-in user
#[derive(Clone)]
pub struct ConfigSyncChannel {
    inner: Rc<Inner>,
}

impl ConfigSyncChannel {
    /// `namespaces` are bulk-fetched on every activation, independently
    pub fn new(namespaces: Vec<String>, ports: ChannelPorts) -> Self {
        Self {
            inner: Rc::new(Inner {
                api: ports.api,
                transport: ports.transport,
                store: ports.store,
                notifier: ports.notifier,
                spawner: ports.spawner,
                namespaces,
                active: RefCell::new(None),
            }),
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.inner.active.borrow().is_some()
    }

    /// Whether a push connection is currently open
    #[must_use]
    pub fn has_open_connection(&self) -> bool {
        self.inner
            .active
            .borrow()
            .as_ref()
            .and_then(|activation| activation.handle.as_ref())
            .is_some_and(|handle| !handle.is_closed())
    }

    /// Start synchronizing on behalf of `user`.
    ///
    /// Called on the signed-out to signed-in transition only; a second call
    /// while active is refused so that at most one connection ever exists.
    pub fn activate(&self, user: &User) {
        if self.is_active() {
            warn!("Configuration channel already active, ignoring activation");
            return;
        }

        let token = CancellationToken::new();
        self.inner.api.set_credentials(Some(user));

        for namespace in &self.inner.namespaces {
            let this = self.clone();
            let token = token.clone();
            let namespace = namespace.clone();
            self.inner.spawner.spawn(async move {
                this.fetch_namespace(&namespace, &token).await;
            });
        }

        let handle = match self.inner.transport.open(user) {
            Ok(mut handle) => {
                if let Some(events) = handle.take_events() {
                    let this = self.clone();
                    let token = token.clone();
                    self.inner.spawner.spawn(async move {
                        this.listen(events, token).await;
                    });
                }
                Some(handle)
            }
            Err(err) => {
                error!(error = %err, "Could not open the configuration notification connection");
                None
            }
        };

        *self.inner.active.borrow_mut() = Some(Activation { handle, token });
    }

    /// Stop synchronizing: close the connection and void in-flight fetches
    pub fn deactivate(&self) {
        let Some(mut activation) = self.inner.active.borrow_mut().take() else {
            return;
        };
        activation.token.cancel();
        if let Some(handle) = activation.handle.as_mut() {
            handle.close();
        }
        self.inner.api.set_credentials(None);
        debug!("Configuration channel closed");
    }

    async fn fetch_namespace(&self, namespace: &str, token: &CancellationToken) {
        let result = self.inner.api.fetch_all_parameters(namespace).await;
        self.complete(result, token);
    }

    async fn fetch_one(&self, name: &str, token: &CancellationToken) {
        let result = self
            .inner
            .api
            .fetch_parameter(name)
            .await
            .map(|param| vec![param]);
        self.complete(result, token);
    }

    fn complete(&self, result: CoreResult<Vec<Parameter>>, token: &CancellationToken) {
        if token.is_cancelled() {
            debug!("Discarding parameter fetch completed after teardown");
            return;
        }
        match result {
            Ok(params) => {
                debug!(?params, "Received UI parameters");
                self.inner.store.apply_all(&params);
            }
            Err(err) => {
                warn!(error = %err, "Parameter retrieval failed");
                self.inner
                    .notifier
                    .error(PARAMS_RETRIEVING_ERROR, err.message());
            }
        }
    }

    async fn listen(&self, mut events: LocalBoxStream<'static, PushEvent>, token: CancellationToken) {
        loop {
            let event = tokio::select! {
                biased;
                () = token.cancelled() => break,
                event = events.next() => event,
            };

            match event {
                Some(PushEvent::Message(frame)) => self.on_message(&frame, &token),
                Some(PushEvent::Error(err)) => {
                    error!(error = %err, "Unexpected notification WebSocket error");
                }
                None => {
                    debug!("Notification stream ended");
                    break;
                }
            }
        }
    }

    fn on_message(&self, frame: &str, token: &CancellationToken) {
        let Some(name) = parameter_name_of(frame) else {
            return;
        };
        let this = self.clone();
        let token = token.clone();
        self.inner.spawner.spawn(async move {
            this.fetch_one(&name, &token).await;
        });
    }
}
