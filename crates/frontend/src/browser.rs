//! Browser implementations of the platform boundaries

use appshell_core::{CoreError, CoreResult, ErrorContext, PageReloader, SessionStorage, Spawner};
use tracing::warn;
use url::Url;
use wasm_bindgen::{JsCast, JsValue};

/// Message carried by a JavaScript exception or rejection value
#[must_use]
pub fn js_message(value: &JsValue) -> String {
    if let Some(error) = value.dyn_ref::<js_sys::Error>() {
        return String::from(error.message());
    }
    value.as_string().unwrap_or_else(|| format!("{value:?}"))
}

fn window() -> CoreResult<web_sys::Window> {
    web_sys::window().ok_or_else(|| CoreError::invalid_config("no browser window"))
}

/// `sessionStorage` of the current tab
#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserStorage;

impl BrowserStorage {
    fn storage() -> CoreResult<web_sys::Storage> {
        window()?
            .session_storage()
            .map_err(|err| js_message(&err))
            .with_context_str("Session storage is not accessible")
            .map_err(CoreError::storage)?
            .ok_or_else(|| CoreError::storage("Session storage is not available"))
    }
}

impl SessionStorage for BrowserStorage {
    fn get_item(&self, key: &str) -> CoreResult<Option<String>> {
        Self::storage()?
            .get_item(key)
            .map_err(|err| js_message(&err))
            .with_context(|| format!("Failed to read {key}"))
            .map_err(CoreError::storage)
    }

    fn set_item(&self, key: &str, value: &str) -> CoreResult<()> {
        Self::storage()?
            .set_item(key, value)
            .map_err(|err| js_message(&err))
            .with_context(|| format!("Failed to write {key}"))
            .map_err(CoreError::storage)
    }

    fn remove_item(&self, key: &str) -> CoreResult<()> {
        Self::storage()?
            .remove_item(key)
            .map_err(|err| js_message(&err))
            .with_context(|| format!("Failed to remove {key}"))
            .map_err(CoreError::storage)
    }
}

/// Reloads the current page
#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserReloader;

impl PageReloader for BrowserReloader {
    fn reload(&self) {
        let result = window().map(|window| window.location().reload());
        match result {
            Ok(Ok(())) => {}
            Ok(Err(err)) => warn!(error = %js_message(&err), "Page reload failed"),
            Err(err) => warn!(error = %err, "Page reload failed"),
        }
    }
}

/// Spawner over the browser event loop
#[must_use]
pub fn browser_spawner() -> Spawner {
    Spawner::new(|future| wasm_bindgen_futures::spawn_local(future))
}

/// Path of the current page
#[must_use]
pub fn current_pathname() -> String {
    window()
        .ok()
        .and_then(|window| window.location().pathname().ok())
        .unwrap_or_else(|| "/".to_string())
}

/// Replace the current history entry without reloading
pub fn replace_path(path: &str) {
    let history = window().and_then(|window| {
        window
            .history()
            .map_err(|err| CoreError::invalid_config(js_message(&err)))
    });
    match history {
        Ok(history) => {
            if let Err(err) = history.replace_state_with_url(&JsValue::NULL, "", Some(path)) {
                warn!(error = %js_message(&err), path, "Could not rewrite the location");
            }
        }
        Err(err) => warn!(error = %err, "History is not available"),
    }
}

/// Preferred language of the browser, `en` when unknown
#[must_use]
pub fn system_locale() -> String {
    window()
        .ok()
        .and_then(|window| window.navigator().language())
        .unwrap_or_else(|| "en".to_string())
}

/// Base URL of the document, used to resolve configured relative URLs
pub fn document_base() -> CoreResult<Url> {
    let window = window()?;
    let base = window
        .document()
        .and_then(|document| document.base_uri().ok().flatten())
        .or_else(|| window.location().href().ok())
        .ok_or_else(|| CoreError::invalid_config("cannot determine the page URL"))?;
    Url::parse(&base).map_err(|err| CoreError::invalid_config(format!("{base}: {err}")))
}

/// Resolve `target` against `base`; absolute targets are returned unchanged
pub fn resolve(base: &Url, target: &str) -> CoreResult<Url> {
    base.join(target)
        .map_err(|err| CoreError::invalid_config(format!("{target}: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative_and_absolute() {
        let base = Url::parse("https://apps.example.org/study/").unwrap();
        assert_eq!(
            resolve(&base, "idpSettings.json").unwrap().as_str(),
            "https://apps.example.org/study/idpSettings.json"
        );
        assert_eq!(
            resolve(&base, "/api/gateway/config").unwrap().as_str(),
            "https://apps.example.org/api/gateway/config"
        );
        assert_eq!(
            resolve(&base, "https://config.example.org/v1").unwrap().as_str(),
            "https://config.example.org/v1"
        );
    }
}
