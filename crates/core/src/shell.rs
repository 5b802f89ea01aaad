//! Application shell: wires the session supervisor to the configuration
//! channel and exposes state to the view layer

use crate::channel::{ChannelPorts, ConfigApi, ConfigSyncChannel, PushTransport};
use crate::config::ShellConfig;
use crate::error::CoreResult;
use crate::identity::{IdentityBackend, SettingsLoader};
use crate::notify::{Notification, Notifier, PARAMS_CHANGING_ERROR};
use crate::params::{ParamName, ParameterSnapshot, ParameterStore};
use crate::session::{Session, User, UserSink};
use crate::spawn::Spawner;
use crate::storage::SessionStorage;
use crate::supervisor::{AuthSessionSupervisor, PageReloader, SupervisorPorts};
use std::rc::Rc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Host-provided implementations of every boundary
pub struct ShellPorts {
    pub identity: Rc<dyn IdentityBackend>,
    pub settings: Rc<dyn SettingsLoader>,
    pub api: Rc<dyn ConfigApi>,
    pub transport: Rc<dyn PushTransport>,
    pub storage: Rc<dyn SessionStorage>,
    pub reloader: Rc<dyn PageReloader>,
    pub spawner: Spawner,
}

/// Session storage key holding the route to return to after sign-in
pub const PRE_LOGIN_PATH_KEY: &str = "appshell-current-path";

pub struct AppShell {
    supervisor: Rc<AuthSessionSupervisor>,
    channel: ConfigSyncChannel,
    users: UserSink,
    store: ParameterStore,
    notifier: Notifier,
    api: Rc<dyn ConfigApi>,
    storage: Rc<dyn SessionStorage>,
    spawner: Spawner,
    shutdown: CancellationToken,
}

impl AppShell {
    /// Assemble the shell.
    ///
    /// `pathname` is the page route at startup and `system_locale` the
    /// browser's preferred language tag.
    pub fn new(config: &ShellConfig, pathname: &str, system_locale: &str, ports: ShellPorts) -> Self {
        let users = UserSink::new();
        let store = ParameterStore::new(system_locale);
        let notifier = Notifier::new();

        let supervisor = AuthSessionSupervisor::new(
            config.mode(),
            config.is_silent_renew_page(pathname),
            config.renew_reload_signatures.clone(),
            users.clone(),
            SupervisorPorts {
                backend: ports.identity,
                settings: ports.settings,
                storage: ports.storage.clone(),
                reloader: ports.reloader,
            },
        );

        let channel = ConfigSyncChannel::new(
            vec![config.common_namespace.clone(), config.app_name.clone()],
            ChannelPorts {
                api: ports.api.clone(),
                transport: ports.transport,
                store: store.clone(),
                notifier: notifier.clone(),
                spawner: ports.spawner.clone(),
            },
        );

        let shutdown = CancellationToken::new();
        users.observe({
            let channel = channel.clone();
            let api = ports.api.clone();
            let shutdown = shutdown.clone();
            move |previous: Option<&User>, next: Option<&User>| {
                follow_user(&channel, api.as_ref(), &shutdown, previous, next);
            }
        });

        Self {
            supervisor: Rc::new(supervisor),
            channel,
            users,
            store,
            notifier,
            api: ports.api,
            storage: ports.storage,
            spawner: ports.spawner,
            shutdown,
        }
    }

    /// Drive the shell until [`AppShell::shutdown`] is called.
    ///
    /// The bootstrap runs detached. The channel follows user presence from
    /// inside each user publication, so nothing here polls the user.
    pub async fn run(&self) {
        let supervisor = self.supervisor.clone();
        self.spawner.spawn(async move { supervisor.start().await });

        self.shutdown.cancelled().await;
        self.channel.deactivate();
    }

    /// Tear the shell down: stops [`AppShell::run`] and closes the channel
    pub fn shutdown(&self) {
        self.shutdown.cancel();
        self.channel.deactivate();
    }

    /// Ask the configuration service to switch the theme
    pub async fn change_theme(&self, theme: &str) {
        self.change_parameter(ParamName::Theme, theme).await;
    }

    /// Ask the configuration service to switch the language
    pub async fn change_language(&self, language: &str) {
        self.change_parameter(ParamName::Language, language).await;
    }

    /// The store is not touched here: the service announces the change on
    /// the push channel and the value is fetched back from there.
    async fn change_parameter(&self, name: ParamName, value: &str) {
        if let Err(err) = self.api.update_parameter(name.as_str(), value).await {
            warn!(name = name.as_str(), error = %err, "Parameter update failed");
            self.notifier.error(PARAMS_CHANGING_ERROR, err.message());
        }
    }

    /// Start an interactive sign-in, remembering `return_path` so the
    /// sign-in callback can navigate back to it
    pub async fn login(&self, return_path: &str) -> CoreResult<()> {
        if let Err(err) = self.storage.set_item(PRE_LOGIN_PATH_KEY, return_path) {
            warn!(error = %err, "Could not remember the pre-login route");
        }
        self.supervisor.login().await
    }

    /// Route saved by the last [`AppShell::login`] in this browser session
    #[must_use]
    pub fn pre_login_path(&self) -> Option<String> {
        match self.storage.get_item(PRE_LOGIN_PATH_KEY) {
            Ok(path) => path.filter(|path| !path.is_empty()),
            Err(err) => {
                warn!(error = %err, "Could not read the pre-login route");
                None
            }
        }
    }

    /// Sign out through the identity manager
    pub async fn logout(&self) -> CoreResult<()> {
        self.supervisor.logout().await
    }

    /// Finish the provider's redirect back to the sign-in callback route
    pub async fn complete_sign_in(&self) -> CoreResult<()> {
        self.supervisor.complete_redirect_signin().await
    }

    /// Finish a silent renewal; only meaningful on the renewal callback page
    pub async fn complete_silent_renew(&self) -> CoreResult<()> {
        self.supervisor.complete_silent_renew().await
    }

    pub fn dismiss_notification(&self, id: u64) {
        self.notifier.dismiss(id);
    }

    #[must_use]
    pub fn session(&self) -> Session {
        self.supervisor.session()
    }

    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.users.current()
    }

    #[must_use]
    pub fn parameters(&self) -> ParameterSnapshot {
        self.store.snapshot()
    }

    #[must_use]
    pub fn subscribe_session(&self) -> watch::Receiver<Session> {
        self.supervisor.subscribe_session()
    }

    #[must_use]
    pub fn subscribe_user(&self) -> watch::Receiver<Option<User>> {
        self.users.subscribe()
    }

    #[must_use]
    pub fn subscribe_parameters(&self) -> watch::Receiver<ParameterSnapshot> {
        self.store.subscribe()
    }

    #[must_use]
    pub fn subscribe_notifications(&self) -> watch::Receiver<Vec<Notification>> {
        self.notifier.subscribe()
    }

    #[must_use]
    pub fn pending_notifications(&self) -> Vec<Notification> {
        self.notifier.pending()
    }

    #[must_use]
    pub fn channel(&self) -> &ConfigSyncChannel {
        &self.channel
    }
}

/// Open, close, or refresh the channel on one user transition
fn follow_user(
    channel: &ConfigSyncChannel,
    api: &dyn ConfigApi,
    shutdown: &CancellationToken,
    previous: Option<&User>,
    next: Option<&User>,
) {
    match (previous, next) {
        _ if shutdown.is_cancelled() => {}
        (None, Some(user)) => {
            info!(subject = %user.subject, "User signed in, opening configuration channel");
            channel.activate(user);
        }
        (Some(_), None) => {
            info!("User signed out, closing configuration channel");
            channel.deactivate();
        }
        (Some(old), Some(user)) if old.subject != user.subject => {
            info!(subject = %user.subject, "User switched, reopening configuration channel");
            channel.deactivate();
            channel.activate(user);
        }
        (Some(_), Some(user)) => {
            debug!(subject = %user.subject, "User renewed");
            api.set_credentials(Some(user));
        }
        (None, None) => {}
    }
}
