//! AppShell core: authentication session supervision and live runtime
//! configuration for the single-page application

pub mod channel;
pub mod client;
pub mod config;
pub mod error;
pub mod identity;
pub mod language;
#[cfg(not(target_arch = "wasm32"))]
pub mod logging;
pub mod notify;
pub mod params;
pub mod session;
pub mod shell;
pub mod spawn;
pub mod storage;
pub mod supervisor;

#[cfg(test)]
mod tests;

pub use channel::{ChannelHandle, ConfigApi, ConfigSyncChannel, PushEvent, PushTransport};
pub use client::ConfigClient;
pub use config::{DeploymentMode, ShellConfig};
pub use error::{CoreError, CoreResult, ErrorContext};
pub use identity::{IdentityBackend, IdentityManager, IdpSettings, LocalIdentityManager};
pub use notify::{Notification, Notifier};
pub use params::{Parameter, ParameterSnapshot, ParameterStore};
pub use session::{Session, User, UserSink};
pub use shell::{AppShell, ShellPorts};
pub use spawn::Spawner;
pub use storage::{MemoryStorage, OneShotLatch, SessionStorage};
pub use supervisor::{AuthSessionSupervisor, ErrorSignature, PageReloader};
