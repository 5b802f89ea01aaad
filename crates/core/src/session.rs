//! Session and signed-in user state

use crate::identity::IdentityManager;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use tokio::sync::watch;

/// Identity of the signed-in user, as handed over by the identity manager
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Subject claim
    pub subject: String,
    /// Display name, when the provider supplies one
    #[serde(default)]
    pub name: Option<String>,
    /// Token presented to the configuration service
    pub id_token: String,
}

impl User {
    pub fn new(subject: impl Into<String>) -> Self {
        let subject = subject.into();
        Self {
            id_token: format!("dev-token-{subject}"),
            subject,
            name: None,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.id_token = token.into();
        self
    }

    /// Name shown in the top bar
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.subject)
    }
}

/// Authentication lifecycle state.
///
/// A manager and a bootstrap error can never coexist: the variants make the
/// invalid combination unrepresentable.
#[derive(Clone, Default)]
pub enum Session {
    /// Bootstrap has not finished yet
    #[default]
    Pending,
    /// Bootstrap produced a manager
    Ready(Rc<dyn IdentityManager>),
    /// Bootstrap failed; fatal for this page load
    Failed(String),
}

impl Session {
    #[must_use]
    pub fn manager(&self) -> Option<Rc<dyn IdentityManager>> {
        match self {
            Self::Ready(manager) => Some(manager.clone()),
            _ => None,
        }
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed(message) => Some(message),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "Session::Pending"),
            Self::Ready(_) => write!(f, "Session::Ready(..)"),
            Self::Failed(message) => write!(f, "Session::Failed({message:?})"),
        }
    }
}

/// Called with the previous and the new user on every published change
pub type UserObserver = Rc<dyn Fn(Option<&User>, Option<&User>)>;

/// Dispatch target through which the identity manager publishes the
/// signed-in user.
///
/// Cloning shares the same underlying state.
#[derive(Clone)]
pub struct UserSink {
    tx: Rc<watch::Sender<Option<User>>>,
    observers: Rc<RefCell<Vec<UserObserver>>>,
}

impl UserSink {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            tx: Rc::new(tx),
            observers: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Publish the current user; identical values do not wake subscribers.
    ///
    /// Observers run before this returns, once per change; watch
    /// subscribers may only see the last of several quick changes.
    pub fn dispatch(&self, user: Option<User>) {
        let previous = self.tx.borrow().clone();
        if previous == user {
            return;
        }
        self.tx.send_replace(user.clone());

        let observers = self.observers.borrow().clone();
        for observer in observers {
            observer(previous.as_ref(), user.as_ref());
        }
    }

    /// Register a synchronous change observer
    pub fn observe(&self, observer: impl Fn(Option<&User>, Option<&User>) + 'static) {
        self.observers.borrow_mut().push(Rc::new(observer));
    }

    #[must_use]
    pub fn current(&self) -> Option<User> {
        self.tx.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<User>> {
        self.tx.subscribe()
    }
}

impl Default for UserSink {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_accessors() {
        let pending = Session::default();
        assert!(pending.is_pending());
        assert!(pending.manager().is_none());
        assert!(pending.error().is_none());

        let failed = Session::Failed("network down".to_string());
        assert!(failed.manager().is_none());
        assert_eq!(failed.error(), Some("network down"));
    }

    #[test]
    fn test_user_display_name() {
        let user = User::new("alice");
        assert_eq!(user.display_name(), "alice");
        assert_eq!(user.with_name("Alice A.").display_name(), "Alice A.");
    }

    #[test]
    fn test_user_sink_ignores_identical_dispatch() {
        let sink = UserSink::new();
        let mut rx = sink.subscribe();

        sink.dispatch(Some(User::new("alice")));
        assert!(rx.has_changed().unwrap());
        rx.borrow_and_update();

        sink.dispatch(Some(User::new("alice")));
        assert!(!rx.has_changed().unwrap());

        sink.dispatch(None);
        assert!(rx.has_changed().unwrap());
        assert!(sink.current().is_none());
    }

    #[test]
    fn test_observers_see_every_transition() {
        let sink = UserSink::new();
        let edges = Rc::new(RefCell::new(Vec::new()));
        sink.observe({
            let edges = edges.clone();
            move |previous: Option<&User>, next: Option<&User>| {
                edges.borrow_mut().push((
                    previous.map(|u| u.subject.clone()),
                    next.map(|u| u.subject.clone()),
                ));
            }
        });
        let rx = sink.subscribe();

        sink.dispatch(Some(User::new("alice")));
        sink.dispatch(Some(User::new("alice")));
        sink.dispatch(None);
        sink.dispatch(Some(User::new("john")));

        assert_eq!(
            *edges.borrow(),
            vec![
                (None, Some("alice".to_string())),
                (Some("alice".to_string()), None),
                (None, Some("john".to_string())),
            ]
        );
        // The watch side only keeps the latest value
        assert_eq!(rx.borrow().as_ref().map(|u| u.subject.as_str()), Some("john"));
    }
}
