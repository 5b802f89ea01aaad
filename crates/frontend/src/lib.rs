//! AppShell browser front end: DOM implementations of the shell boundaries
//! and the Yew view

pub mod app;
pub mod browser;
pub mod hooks;
pub mod logging;
pub mod oidc;
pub mod push;
pub mod routes;
pub mod theme;

pub use app::{App, AppProps};
