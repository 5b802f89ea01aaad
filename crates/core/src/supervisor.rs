//! Authentication bootstrap and session supervision
//!
//! [`AuthSessionSupervisor`] owns the one [`Session`] of the running
//! application. It picks the bootstrap strategy from the deployment mode,
//! publishes the resulting manager (or the bootstrap error), then tries a
//! silent renewal when nobody is signed in.
//!
//! Some identity-provider library versions keep stale settings across a
//! deployment and then reject the silent renewal with an authority mismatch.
//! A single page reload clears that state. The reload is guarded by a
//! session-storage latch so a persistent misconfiguration cannot cause a
//! reload loop.

use crate::config::DeploymentMode;
use crate::error::{CoreError, CoreResult};
use crate::identity::{IdentityBackend, IdentityManager, SettingsLoader, SettingsSource};
use crate::session::{Session, User, UserSink};
use crate::storage::{OneShotLatch, SessionStorage};
use serde::{Deserialize, Serialize};
use std::rc::Rc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Session-storage key of the one-shot reload guard
pub const RELOAD_GUARD_KEY: &str = "gridsuite-oidc-hack-reloaded";

/// Message the provider library reports for the stale-settings defect
pub const AUTHORITY_MISMATCH: &str = "authority mismatch on settings vs. signin state";

/// Full page reload, provided by the host
pub trait PageReloader {
    fn reload(&self);
}

/// Predicate over a silent-renew error message.
///
/// Kept as data so that a provider-library upgrade that rewords the message
/// only needs a configuration change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "pattern", rename_all = "lowercase")]
pub enum ErrorSignature {
    Exact(String),
    Contains(String),
}

impl ErrorSignature {
    #[must_use]
    pub fn authority_mismatch() -> Self {
        Self::Exact(AUTHORITY_MISMATCH.to_string())
    }

    #[must_use]
    pub fn matches(&self, message: &str) -> bool {
        match self {
            Self::Exact(expected) => message == expected,
            Self::Contains(fragment) => message.contains(fragment.as_str()),
        }
    }
}

/// Boundary collaborators the supervisor drives
pub struct SupervisorPorts {
    pub backend: Rc<dyn IdentityBackend>,
    pub settings: Rc<dyn SettingsLoader>,
    pub storage: Rc<dyn SessionStorage>,
    pub reloader: Rc<dyn PageReloader>,
}

pub struct AuthSessionSupervisor {
    mode: DeploymentMode,
    silent_renew_page: bool,
    backend: Rc<dyn IdentityBackend>,
    settings: Rc<dyn SettingsLoader>,
    reloader: Rc<dyn PageReloader>,
    reload_guard: OneShotLatch,
    reload_signatures: Vec<ErrorSignature>,
    users: UserSink,
    session: watch::Sender<Session>,
}

impl AuthSessionSupervisor {
    /// Create a supervisor in the `Pending` state.
    ///
    /// `silent_renew_page` is the route classification taken once at startup;
    /// it never changes afterwards.
    pub fn new(
        mode: DeploymentMode,
        silent_renew_page: bool,
        reload_signatures: Vec<ErrorSignature>,
        users: UserSink,
        ports: SupervisorPorts,
    ) -> Self {
        let (session, _rx) = watch::channel(Session::Pending);
        Self {
            mode,
            silent_renew_page,
            backend: ports.backend,
            settings: ports.settings,
            reloader: ports.reloader,
            reload_guard: OneShotLatch::new(ports.storage, RELOAD_GUARD_KEY),
            reload_signatures,
            users,
            session,
        }
    }

    /// Run the bootstrap, then the silent-renew attempt.
    ///
    /// Never fails: a bootstrap error is recorded in the session and renewal
    /// errors are handled here.
    pub async fn start(&self) {
        let manager = match self.bootstrap().await {
            Ok(manager) => manager,
            Err(err) => {
                debug!(error = %err, "Identity manager bootstrap failed");
                self.session.send_replace(Session::Failed(err.message()));
                return;
            }
        };

        self.session.send_replace(Session::Ready(manager.clone()));
        self.renew_if_signed_out(manager.as_ref()).await;
    }

    async fn bootstrap(&self) -> CoreResult<Rc<dyn IdentityManager>> {
        match self.mode {
            DeploymentMode::Interactive => {
                let loader = self.settings.clone();
                let settings: SettingsSource =
                    Box::pin(async move { loader.load_idp_settings().await });
                self.backend
                    .initialize_interactive(self.users.clone(), self.silent_renew_page, settings)
                    .await
            }
            DeploymentMode::Bypass => {
                self.backend
                    .initialize_bypass(self.users.clone(), self.silent_renew_page)
                    .await
            }
        }
    }

    async fn renew_if_signed_out(&self, manager: &dyn IdentityManager) {
        let user = match manager.get_user().await {
            Ok(user) => user,
            Err(err) => {
                warn!(error = %err, "Could not query the current user");
                return;
            }
        };

        if user.is_some() || self.silent_renew_page {
            return;
        }

        if let Err(err) = manager.signin_silent().await {
            self.recover_from_renew_failure(&err);
        }
    }

    fn recover_from_renew_failure(&self, err: &CoreError) {
        let message = err.message();
        if !self
            .reload_signatures
            .iter()
            .any(|signature| signature.matches(&message))
        {
            debug!(error = %message, "Silent renew failed");
            return;
        }

        match self.reload_guard.try_set() {
            Ok(true) => {
                info!("Hack oidc, reload page to make login work");
                self.reloader.reload();
            }
            Ok(false) => debug!("Reload guard already set, not reloading again"),
            Err(err) => warn!(error = %err, "Could not set the reload guard"),
        }
    }

    /// Start an interactive sign-in with the current manager
    pub async fn login(&self) -> CoreResult<()> {
        self.manager()?.signin_redirect().await
    }

    /// Hand over to the identity manager's own sign-out flow
    pub async fn logout(&self) -> CoreResult<()> {
        self.manager()?.sign_out().await
    }

    /// Complete the redirect sign-in after the provider sent the browser back
    pub async fn complete_redirect_signin(&self) -> CoreResult<()> {
        self.manager()?.signin_redirect_callback().await
    }

    /// Complete the silent renewal on the silent-renew callback page
    pub async fn complete_silent_renew(&self) -> CoreResult<()> {
        self.manager()?.signin_silent_callback().await
    }

    fn manager(&self) -> CoreResult<Rc<dyn IdentityManager>> {
        self.session.borrow().manager().ok_or(CoreError::NoManager)
    }

    /// Current session
    #[must_use]
    pub fn session(&self) -> Session {
        self.session.borrow().clone()
    }

    #[must_use]
    pub fn subscribe_session(&self) -> watch::Receiver<Session> {
        self.session.subscribe()
    }

    /// Currently signed-in user
    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.users.current()
    }
}
