//! In-memory implementations of the shell boundaries.
//!
//! Fetches issued against [`FakeConfigApi`] stay pending until the test
//! resolves them, which lets a test pick the completion order.

use crate::channel::{ChannelHandle, ConfigApi, PushEvent, PushTransport};
use crate::error::{CoreError, CoreResult};
use crate::identity::bypass::BYPASS_USER_KEY;
use crate::identity::{
    IdentityBackend, IdentityManager, IdpSettings, LocalIdentityManager, SettingsLoader,
    SettingsSource,
};
use crate::params::Parameter;
use crate::session::{User, UserSink};
use crate::spawn::Spawner;
use crate::storage::{MemoryStorage, SessionStorage};
use crate::supervisor::PageReloader;
use async_trait::async_trait;
use futures::StreamExt;
use futures::channel::mpsc;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tokio::sync::oneshot;

/// Let every spawned task run until it blocks again
pub async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

pub fn local_spawner() -> Spawner {
    Spawner::new(|future| {
        tokio::task::spawn_local(future);
    })
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchKind {
    Namespace(String),
    Single(String),
}

struct PendingFetch {
    kind: FetchKind,
    reply: oneshot::Sender<CoreResult<Vec<Parameter>>>,
}

#[derive(Default)]
pub struct FakeConfigApi {
    pending: RefCell<Vec<PendingFetch>>,
    issued: RefCell<Vec<FetchKind>>,
    pub updates: RefCell<Vec<(String, String)>>,
    pub update_error: RefCell<Option<CoreError>>,
    pub credentials: RefCell<Option<String>>,
}

impl FakeConfigApi {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Every fetch issued so far, in issue order
    pub fn issued(&self) -> Vec<FetchKind> {
        self.issued.borrow().clone()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Complete the oldest pending fetch of `kind`
    pub fn resolve(&self, kind: &FetchKind, result: CoreResult<Vec<Parameter>>) {
        let mut pending = self.pending.borrow_mut();
        let index = pending
            .iter()
            .position(|fetch| &fetch.kind == kind)
            .unwrap_or_else(|| panic!("no pending fetch for {kind:?}"));
        let fetch = pending.remove(index);
        let _ = fetch.reply.send(result);
    }

    /// Complete the `nth` (0-based) pending fetch of `kind`
    pub fn resolve_nth(&self, kind: &FetchKind, nth: usize, result: CoreResult<Vec<Parameter>>) {
        let mut pending = self.pending.borrow_mut();
        let index = pending
            .iter()
            .enumerate()
            .filter(|(_, fetch)| &fetch.kind == kind)
            .nth(nth)
            .map(|(index, _)| index)
            .unwrap_or_else(|| panic!("no pending fetch #{nth} for {kind:?}"));
        let fetch = pending.remove(index);
        let _ = fetch.reply.send(result);
    }

    async fn wait_for(&self, kind: FetchKind) -> CoreResult<Vec<Parameter>> {
        let (reply, rx) = oneshot::channel();
        self.issued.borrow_mut().push(kind.clone());
        self.pending.borrow_mut().push(PendingFetch { kind, reply });
        rx.await
            .unwrap_or_else(|_| Err(CoreError::fetch("request dropped")))
    }
}

#[async_trait(?Send)]
impl ConfigApi for FakeConfigApi {
    async fn fetch_all_parameters(&self, namespace: &str) -> CoreResult<Vec<Parameter>> {
        self.wait_for(FetchKind::Namespace(namespace.to_string()))
            .await
    }

    async fn fetch_parameter(&self, name: &str) -> CoreResult<Parameter> {
        let mut params = self.wait_for(FetchKind::Single(name.to_string())).await?;
        params
            .pop()
            .ok_or_else(|| CoreError::fetch(format!("parameter {name} not found")))
    }

    async fn update_parameter(&self, name: &str, value: &str) -> CoreResult<()> {
        self.updates
            .borrow_mut()
            .push((name.to_string(), value.to_string()));
        match self.update_error.borrow().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn set_credentials(&self, user: Option<&User>) {
        *self.credentials.borrow_mut() = user.map(|user| user.id_token.clone());
    }
}

/// Push transport whose connections are fed by the test
#[derive(Default)]
pub struct FakeTransport {
    pub opened: Cell<usize>,
    pub open_now: Rc<Cell<usize>>,
    pub max_open: Rc<Cell<usize>>,
    pub fail_open: Cell<bool>,
    sender: RefCell<Option<mpsc::UnboundedSender<PushEvent>>>,
}

impl FakeTransport {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Deliver a frame on the latest connection; returns false once closed
    pub fn push(&self, event: PushEvent) -> bool {
        self.sender
            .borrow()
            .as_ref()
            .is_some_and(|sender| sender.unbounded_send(event).is_ok())
    }

    pub fn push_text(&self, frame: &str) -> bool {
        self.push(PushEvent::Message(frame.to_string()))
    }
}

impl PushTransport for FakeTransport {
    fn open(&self, _user: &User) -> CoreResult<ChannelHandle> {
        if self.fail_open.get() {
            return Err(CoreError::transport("connection refused"));
        }
        let (tx, rx) = mpsc::unbounded();
        self.opened.set(self.opened.get() + 1);
        self.open_now.set(self.open_now.get() + 1);
        self.max_open
            .set(self.max_open.get().max(self.open_now.get()));
        *self.sender.borrow_mut() = Some(tx.clone());

        let open_now = self.open_now.clone();
        Ok(ChannelHandle::new(rx.boxed_local(), move || {
            tx.close_channel();
            open_now.set(open_now.get() - 1);
        }))
    }
}

/// Identity backend built on the developer manager, with an optional
/// bootstrap failure
pub struct FakeIdentity {
    pub storage: Rc<MemoryStorage>,
    pub bootstrap_error: Option<String>,
}

impl FakeIdentity {
    pub fn new(storage: Rc<MemoryStorage>) -> Rc<Self> {
        Rc::new(Self {
            storage,
            bootstrap_error: None,
        })
    }

    pub fn failing(storage: Rc<MemoryStorage>, message: &str) -> Rc<Self> {
        Rc::new(Self {
            storage,
            bootstrap_error: Some(message.to_string()),
        })
    }
}

#[async_trait(?Send)]
impl IdentityBackend for FakeIdentity {
    async fn initialize_interactive(
        &self,
        sink: UserSink,
        silent_renew_page: bool,
        settings: SettingsSource,
    ) -> CoreResult<Rc<dyn IdentityManager>> {
        settings.await?;
        self.initialize_bypass(sink, silent_renew_page).await
    }

    async fn initialize_bypass(
        &self,
        sink: UserSink,
        silent_renew_page: bool,
    ) -> CoreResult<Rc<dyn IdentityManager>> {
        tokio::task::yield_now().await;
        if let Some(message) = &self.bootstrap_error {
            return Err(CoreError::identity(message.clone()));
        }
        let storage: Rc<dyn SessionStorage> = self.storage.clone();
        let manager = LocalIdentityManager::initialize(sink, silent_renew_page, storage)?;
        Ok(Rc::new(manager))
    }
}

pub struct FakeSettings;

#[async_trait(?Send)]
impl SettingsLoader for FakeSettings {
    async fn load_idp_settings(&self) -> CoreResult<IdpSettings> {
        Err(CoreError::fetch("no identity provider in tests"))
    }
}

#[derive(Default)]
pub struct CountingReloader(pub Cell<usize>);

impl PageReloader for CountingReloader {
    fn reload(&self) {
        self.0.set(self.0.get() + 1);
    }
}

/// Persist `user` the way the developer manager does after a sign-in
pub fn store_signed_in_user(storage: &MemoryStorage, user: &User) {
    storage
        .set_item(BYPASS_USER_KEY, &serde_json::to_string(user).unwrap())
        .unwrap();
}
