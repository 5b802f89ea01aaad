//! Identity-manager boundary
//!
//! The identity provider's protocol is owned by an external library. This
//! module only fixes the shape the session supervisor talks to.

pub mod bypass;

use crate::error::CoreResult;
use crate::session::{User, UserSink};
use async_trait::async_trait;
use futures::future::LocalBoxFuture;
use serde::{Deserialize, Serialize};
use std::rc::Rc;

pub use bypass::LocalIdentityManager;

/// Handle on an initialized identity manager
#[async_trait(?Send)]
pub trait IdentityManager {
    /// Currently signed-in user, if any
    async fn get_user(&self) -> CoreResult<Option<User>>;

    /// Re-establish a session without user interaction
    async fn signin_silent(&self) -> CoreResult<()>;

    /// Start an interactive sign-in
    async fn signin_redirect(&self) -> CoreResult<()>;

    /// End the session with the provider
    async fn sign_out(&self) -> CoreResult<()>;

    /// Finish a redirect sign-in on the provider's callback route
    async fn signin_redirect_callback(&self) -> CoreResult<()> {
        Ok(())
    }

    /// Finish a silent renewal inside the hidden renewal frame
    async fn signin_silent_callback(&self) -> CoreResult<()> {
        Ok(())
    }
}

/// Pending identity-provider settings document
pub type SettingsSource = LocalBoxFuture<'static, CoreResult<IdpSettings>>;

/// Factory for identity managers, one per deployment mode
#[async_trait(?Send)]
pub trait IdentityBackend {
    /// Initialize against a real provider configured by `settings`
    async fn initialize_interactive(
        &self,
        sink: UserSink,
        silent_renew_page: bool,
        settings: SettingsSource,
    ) -> CoreResult<Rc<dyn IdentityManager>>;

    /// Initialize a local manager that needs no provider
    async fn initialize_bypass(
        &self,
        sink: UserSink,
        silent_renew_page: bool,
    ) -> CoreResult<Rc<dyn IdentityManager>>;
}

/// Source of the identity-provider settings document
#[async_trait(?Send)]
pub trait SettingsLoader {
    async fn load_idp_settings(&self) -> CoreResult<IdpSettings>;
}

/// Identity-provider settings document (`idpSettings.json`)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdpSettings {
    pub authority: String,
    pub client_id: String,
    pub redirect_uri: String,
    pub post_logout_redirect_uri: String,
    pub silent_redirect_uri: String,
    pub scope: String,
    /// Upper bound on token lifetime in seconds
    #[serde(default, rename = "maxExpiresIn", skip_serializing_if = "Option::is_none")]
    pub max_expires_in: Option<u64>,
}
