//! Transient, dismissible user notifications

use std::cell::Cell;
use std::rc::Rc;
use tokio::sync::watch;

/// Header shown above parameter retrieval failures
pub const PARAMS_RETRIEVING_ERROR: &str = "paramsRetrievingError";
/// Header shown above parameter update failures
pub const PARAMS_CHANGING_ERROR: &str = "paramsChangingError";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotificationLevel {
    Error,
    Warning,
    Info,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub id: u64,
    /// Translation key of the header line
    pub header_id: String,
    pub message: String,
    pub level: NotificationLevel,
}

/// Queue of notifications waiting for the user to dismiss them
#[derive(Clone)]
pub struct Notifier {
    tx: Rc<watch::Sender<Vec<Notification>>>,
    next_id: Rc<Cell<u64>>,
}

impl Notifier {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Vec::new());
        Self {
            tx: Rc::new(tx),
            next_id: Rc::new(Cell::new(1)),
        }
    }

    /// Queue an error notification and return its id
    pub fn error(&self, header_id: &str, message: impl Into<String>) -> u64 {
        self.push(header_id, message.into(), NotificationLevel::Error)
    }

    fn push(&self, header_id: &str, message: String, level: NotificationLevel) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.tx.send_modify(|queue| {
            queue.push(Notification {
                id,
                header_id: header_id.to_string(),
                message,
                level,
            });
        });
        id
    }

    /// Remove a notification; unknown ids are ignored
    pub fn dismiss(&self, id: u64) {
        self.tx.send_if_modified(|queue| {
            let before = queue.len();
            queue.retain(|notification| notification.id != id);
            queue.len() != before
        });
    }

    #[must_use]
    pub fn pending(&self) -> Vec<Notification> {
        self.tx.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Vec<Notification>> {
        self.tx.subscribe()
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}
