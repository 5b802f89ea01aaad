//! Document-level application of the theme and language parameters

use appshell_core::params::{DARK_THEME, LIGHT_THEME};
use tracing::warn;
use wasm_bindgen::JsCast;

/// The theme a toggle switches to
#[must_use]
pub fn toggled(theme: &str) -> &'static str {
    if theme == LIGHT_THEME {
        DARK_THEME
    } else {
        LIGHT_THEME
    }
}

fn document_element() -> Option<web_sys::HtmlElement> {
    web_sys::window()
        .and_then(|window| window.document())
        .and_then(|document| document.document_element())
        .and_then(|element| element.dyn_into::<web_sys::HtmlElement>().ok())
}

/// Toggle the `dark` class on the root element. Anything but the light theme
/// renders dark.
pub fn update_document_theme(theme: &str) {
    let Some(html_element) = document_element() else {
        return;
    };
    let class_list = html_element.class_list();
    let result = if theme == LIGHT_THEME {
        class_list.remove_1("dark")
    } else {
        class_list.add_1("dark")
    };
    if let Err(err) = result {
        warn!(?err, "Could not update the document theme");
    }
}

/// Set the root element's `lang` attribute
pub fn update_document_language(language: &str) {
    if let Some(html_element) = document_element()
        && let Err(err) = html_element.set_attribute("lang", language)
    {
        warn!(?err, "Could not update the document language");
    }
}
