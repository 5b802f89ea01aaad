//! Provider-less identity manager used in developer deployments

use super::IdentityManager;
use crate::error::{CoreError, CoreResult};
use crate::session::{User, UserSink};
use crate::storage::SessionStorage;
use async_trait::async_trait;
use std::rc::Rc;
use tracing::debug;

/// Session-storage key holding the signed-in developer user
pub const BYPASS_USER_KEY: &str = "appshell-dev-user";

const SIGNIN_REQUIRED: &str = "End-User authentication required";

/// Identity manager that signs in a fixed developer user without talking to
/// any provider. The user survives reloads through session storage.
pub struct LocalIdentityManager {
    sink: UserSink,
    storage: Rc<dyn SessionStorage>,
    dev_user: User,
}

impl LocalIdentityManager {
    /// Build the manager and publish an already signed-in user, unless the
    /// current page is the silent-renew callback
    pub fn initialize(
        sink: UserSink,
        silent_renew_page: bool,
        storage: Rc<dyn SessionStorage>,
    ) -> CoreResult<Self> {
        let manager = Self {
            sink,
            storage,
            dev_user: Self::default_user(),
        };
        if !silent_renew_page {
            if let Some(user) = manager.stored_user()? {
                debug!(subject = %user.subject, "Restoring developer session");
                manager.sink.dispatch(Some(user));
            }
        }
        Ok(manager)
    }

    /// Replace the developer user signed in by `signin_redirect`
    #[must_use]
    pub fn with_user(mut self, user: User) -> Self {
        self.dev_user = user;
        self
    }

    fn default_user() -> User {
        User::new("john.doe@example.com").with_name("John Doe")
    }

    fn stored_user(&self) -> CoreResult<Option<User>> {
        self.storage
            .get_item(BYPASS_USER_KEY)?
            .map(|raw| serde_json::from_str(&raw).map_err(CoreError::from))
            .transpose()
    }
}

#[async_trait(?Send)]
impl IdentityManager for LocalIdentityManager {
    async fn get_user(&self) -> CoreResult<Option<User>> {
        self.stored_user()
    }

    async fn signin_silent(&self) -> CoreResult<()> {
        match self.stored_user()? {
            Some(user) => {
                self.sink.dispatch(Some(user));
                Ok(())
            }
            None => Err(CoreError::identity(SIGNIN_REQUIRED)),
        }
    }

    async fn signin_redirect(&self) -> CoreResult<()> {
        let serialized = serde_json::to_string(&self.dev_user)?;
        self.storage.set_item(BYPASS_USER_KEY, &serialized)?;
        self.sink.dispatch(Some(self.dev_user.clone()));
        Ok(())
    }

    async fn sign_out(&self) -> CoreResult<()> {
        self.storage.remove_item(BYPASS_USER_KEY)?;
        self.sink.dispatch(None);
        Ok(())
    }
}
