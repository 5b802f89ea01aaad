//! Identity managers for the browser
//!
//! The interactive manager wraps the `oidc-client-ts` `UserManager` loaded as
//! a page global (`oidc`). Developer deployments get the core's local manager
//! over `sessionStorage`.

use crate::browser::js_message;
use appshell_core::identity::SettingsSource;
use appshell_core::{
    CoreError, CoreResult, IdentityBackend, IdentityManager, IdpSettings, LocalIdentityManager,
    SessionStorage, User, UserSink,
};
use async_trait::async_trait;
use js_sys::Promise;
use serde::{Deserialize, Serialize};
use std::rc::Rc;
use tracing::{debug, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = oidc)]
    type UserManager;

    #[wasm_bindgen(constructor, catch, js_namespace = oidc)]
    fn new(settings: &JsValue) -> Result<UserManager, JsValue>;

    #[wasm_bindgen(method, js_name = getUser)]
    fn get_user(this: &UserManager) -> Promise;

    #[wasm_bindgen(method, js_name = signinSilent)]
    fn signin_silent(this: &UserManager) -> Promise;

    #[wasm_bindgen(method, js_name = signinRedirect)]
    fn signin_redirect(this: &UserManager) -> Promise;

    #[wasm_bindgen(method, js_name = signoutRedirect)]
    fn signout_redirect(this: &UserManager) -> Promise;

    #[wasm_bindgen(method, js_name = signinRedirectCallback)]
    fn signin_redirect_callback(this: &UserManager) -> Promise;

    #[wasm_bindgen(method, js_name = signinSilentCallback)]
    fn signin_silent_callback(this: &UserManager) -> Promise;

    #[wasm_bindgen(method, getter)]
    fn events(this: &UserManager) -> UserManagerEvents;

    type UserManagerEvents;

    #[wasm_bindgen(method, js_name = addUserLoaded)]
    fn add_user_loaded(this: &UserManagerEvents, callback: &JsValue);

    #[wasm_bindgen(method, js_name = addUserUnloaded)]
    fn add_user_unloaded(this: &UserManagerEvents, callback: &JsValue);

    #[wasm_bindgen(method, js_name = addSilentRenewError)]
    fn add_silent_renew_error(this: &UserManagerEvents, callback: &JsValue);
}

/// Settings handed to the `UserManager` constructor
#[derive(Serialize)]
struct ManagerSettings<'a> {
    authority: &'a str,
    client_id: &'a str,
    redirect_uri: &'a str,
    post_logout_redirect_uri: &'a str,
    silent_redirect_uri: &'a str,
    scope: &'a str,
    response_type: &'static str,
    #[serde(rename = "automaticSilentRenew")]
    automatic_silent_renew: bool,
}

impl<'a> From<&'a IdpSettings> for ManagerSettings<'a> {
    fn from(settings: &'a IdpSettings) -> Self {
        Self {
            authority: &settings.authority,
            client_id: &settings.client_id,
            redirect_uri: &settings.redirect_uri,
            post_logout_redirect_uri: &settings.post_logout_redirect_uri,
            silent_redirect_uri: &settings.silent_redirect_uri,
            scope: &settings.scope,
            response_type: "code",
            automatic_silent_renew: true,
        }
    }
}

#[derive(Deserialize)]
struct OidcProfile {
    sub: String,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Deserialize)]
struct OidcUser {
    #[serde(default)]
    id_token: Option<String>,
    profile: OidcProfile,
}

fn to_user(value: JsValue) -> CoreResult<Option<User>> {
    if value.is_null() || value.is_undefined() {
        return Ok(None);
    }
    let raw: OidcUser = serde_wasm_bindgen::from_value(value)
        .map_err(|err| CoreError::serialization_error(err.to_string()))?;
    let mut user = User::new(raw.profile.sub).with_token(raw.id_token.unwrap_or_default());
    if let Some(name) = raw.profile.name {
        user = user.with_name(name);
    }
    Ok(Some(user))
}

async fn settle(promise: Promise) -> CoreResult<JsValue> {
    JsFuture::from(promise)
        .await
        .map_err(|err| CoreError::identity(js_message(&err)))
}

/// `oidc-client-ts` user manager publishing user changes into the sink
pub struct OidcIdentityManager {
    inner: UserManager,
    sink: UserSink,
    _listeners: Vec<Closure<dyn FnMut(JsValue)>>,
}

impl OidcIdentityManager {
    fn new(settings: &IdpSettings, sink: UserSink) -> CoreResult<Self> {
        let js_settings = serde_wasm_bindgen::to_value(&ManagerSettings::from(settings))
            .map_err(|err| CoreError::serialization_error(err.to_string()))?;
        let inner = UserManager::new(&js_settings).map_err(|err| CoreError::identity(js_message(&err)))?;

        let on_loaded = {
            let sink = sink.clone();
            Closure::<dyn FnMut(JsValue)>::new(move |value: JsValue| match to_user(value) {
                Ok(user) => sink.dispatch(user),
                Err(err) => warn!(error = %err, "Ignoring unreadable user"),
            })
        };
        let on_unloaded = {
            let sink = sink.clone();
            Closure::<dyn FnMut(JsValue)>::new(move |_: JsValue| sink.dispatch(None))
        };
        let on_renew_error = Closure::<dyn FnMut(JsValue)>::new(move |err: JsValue| {
            warn!(error = %js_message(&err), "Automatic silent renew failed");
        });

        let events = inner.events();
        events.add_user_loaded(on_loaded.as_ref());
        events.add_user_unloaded(on_unloaded.as_ref());
        events.add_silent_renew_error(on_renew_error.as_ref());

        Ok(Self {
            inner,
            sink,
            _listeners: vec![on_loaded, on_unloaded, on_renew_error],
        })
    }
}

#[async_trait(?Send)]
impl IdentityManager for OidcIdentityManager {
    async fn get_user(&self) -> CoreResult<Option<User>> {
        to_user(settle(self.inner.get_user()).await?)
    }

    async fn signin_silent(&self) -> CoreResult<()> {
        let user = to_user(settle(self.inner.signin_silent()).await?)?;
        self.sink.dispatch(user);
        Ok(())
    }

    async fn signin_redirect(&self) -> CoreResult<()> {
        settle(self.inner.signin_redirect()).await.map(drop)
    }

    async fn sign_out(&self) -> CoreResult<()> {
        settle(self.inner.signout_redirect()).await?;
        self.sink.dispatch(None);
        Ok(())
    }

    async fn signin_redirect_callback(&self) -> CoreResult<()> {
        let user = to_user(settle(self.inner.signin_redirect_callback()).await?)?;
        self.sink.dispatch(user);
        Ok(())
    }

    async fn signin_silent_callback(&self) -> CoreResult<()> {
        settle(self.inner.signin_silent_callback()).await.map(drop)
    }
}

/// Builds the identity manager for the configured deployment mode
pub struct BrowserIdentity {
    storage: Rc<dyn SessionStorage>,
}

impl BrowserIdentity {
    pub fn new(storage: Rc<dyn SessionStorage>) -> Self {
        Self { storage }
    }
}

#[async_trait(?Send)]
impl IdentityBackend for BrowserIdentity {
    async fn initialize_interactive(
        &self,
        sink: UserSink,
        silent_renew_page: bool,
        settings: SettingsSource,
    ) -> CoreResult<Rc<dyn IdentityManager>> {
        let settings = settings.await?;
        debug!(authority = %settings.authority, "Identity provider settings loaded");
        let manager = OidcIdentityManager::new(&settings, sink.clone())?;

        // The renewal frame only completes the callback; the parent page owns
        // the user
        if !silent_renew_page && let Some(user) = manager.get_user().await? {
            sink.dispatch(Some(user));
        }
        Ok(Rc::new(manager))
    }

    async fn initialize_bypass(
        &self,
        sink: UserSink,
        silent_renew_page: bool,
    ) -> CoreResult<Rc<dyn IdentityManager>> {
        let manager = LocalIdentityManager::initialize(sink, silent_renew_page, self.storage.clone())?;
        Ok(Rc::new(manager))
    }
}
