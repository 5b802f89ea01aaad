//! Configuration notifications over a browser WebSocket

use crate::browser::{self, js_message};
use appshell_core::{ChannelHandle, CoreError, CoreResult, PushEvent, PushTransport, User};
use futures::StreamExt;
use futures::channel::mpsc;
use tracing::{debug, warn};
use url::Url;
use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;
use web_sys::{Event, MessageEvent, WebSocket};

/// Notification endpoint for `app_name`.
///
/// `ws_base` may be relative to `page`; http(s) schemes become ws(s).
pub fn notification_url(page: &Url, ws_base: &str, app_name: &str, token: &str) -> CoreResult<Url> {
    let mut url = browser::resolve(page, &format!("{}/notify", ws_base.trim_end_matches('/')))?;

    let scheme = match url.scheme() {
        "https" => "wss",
        "http" => "ws",
        other => other,
    }
    .to_string();
    url.set_scheme(&scheme)
        .map_err(|()| CoreError::invalid_config(format!("unsupported notification scheme {scheme}")))?;

    url.query_pairs_mut()
        .append_pair("appName", app_name)
        .append_pair("access_token", token);
    Ok(url)
}

/// Opens one WebSocket per activation
pub struct WebSocketTransport {
    ws_base: String,
    app_name: String,
}

impl WebSocketTransport {
    pub fn new(ws_base: impl Into<String>, app_name: impl Into<String>) -> Self {
        Self {
            ws_base: ws_base.into(),
            app_name: app_name.into(),
        }
    }
}

impl PushTransport for WebSocketTransport {
    fn open(&self, user: &User) -> CoreResult<ChannelHandle> {
        let page = browser::document_base()?;
        let url = notification_url(&page, &self.ws_base, &self.app_name, &user.id_token)?;
        let socket = WebSocket::new(url.as_str())
            .map_err(|err| CoreError::transport(js_message(&err)))?;
        debug!(app = %self.app_name, "Notification WebSocket opened");

        let (tx, rx) = mpsc::unbounded();

        let on_message = {
            let tx = tx.clone();
            Closure::<dyn FnMut(MessageEvent)>::new(move |event: MessageEvent| {
                if let Some(text) = event.data().as_string() {
                    let _ = tx.unbounded_send(PushEvent::Message(text));
                }
            })
        };
        let on_error = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
            let _ = tx.unbounded_send(PushEvent::Error(event.type_()));
        });
        socket.set_onmessage(Some(on_message.as_ref().unchecked_ref()));
        socket.set_onerror(Some(on_error.as_ref().unchecked_ref()));

        Ok(ChannelHandle::new(rx.boxed_local(), move || {
            socket.set_onmessage(None);
            socket.set_onerror(None);
            if let Err(err) = socket.close() {
                warn!(error = %js_message(&err), "Closing the notification WebSocket failed");
            }
            // Dropping the handlers drops the last senders and ends the stream
            drop(on_message);
            drop(on_error);
        }))
    }
}
