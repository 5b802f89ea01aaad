//! Runtime parameters and the store that holds their last-known values

use crate::language::{self, LANG_SYSTEM};
use serde::{Deserialize, Serialize};
use std::rc::Rc;
use tokio::sync::watch;
use tracing::debug;

pub const PARAM_THEME: &str = "theme";
pub const PARAM_LANGUAGE: &str = "language";

pub const DARK_THEME: &str = "Dark";
pub const LIGHT_THEME: &str = "Light";

/// A named scalar configuration value as served by the configuration service
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub value: String,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Parameter names the store knows how to hold
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParamName {
    Theme,
    Language,
}

impl ParamName {
    /// Classify a wire name; unrecognized names yield `None`
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            PARAM_THEME => Some(Self::Theme),
            PARAM_LANGUAGE => Some(Self::Language),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Theme => PARAM_THEME,
            Self::Language => PARAM_LANGUAGE,
        }
    }

    /// Theme and language are shared by every application of the suite
    #[must_use]
    pub const fn is_common(self) -> bool {
        matches!(self, Self::Theme | Self::Language)
    }
}

/// Point-in-time view of every known parameter
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParameterSnapshot {
    pub theme: String,
    pub language: String,
    /// Always derived from `language`, never set on its own
    pub computed_language: String,
}

impl ParameterSnapshot {
    fn defaults(system_locale: &str) -> Self {
        Self {
            theme: DARK_THEME.to_string(),
            language: LANG_SYSTEM.to_string(),
            computed_language: language::computed_language(LANG_SYSTEM, system_locale),
        }
    }

    /// Raw value for a known parameter
    #[must_use]
    pub fn get(&self, name: ParamName) -> &str {
        match name {
            ParamName::Theme => &self.theme,
            ParamName::Language => &self.language,
        }
    }
}

/// Process-wide holder of the last-known parameter values.
///
/// Every mutation goes through [`ParameterStore::apply`], which publishes a
/// whole new snapshot: a reader never sees `language` updated without its
/// `computed_language`.
#[derive(Clone)]
pub struct ParameterStore {
    tx: Rc<watch::Sender<ParameterSnapshot>>,
    system_locale: Rc<str>,
}

impl ParameterStore {
    /// Create a store holding the defaults for the given system locale
    pub fn new(system_locale: impl Into<String>) -> Self {
        let system_locale: String = system_locale.into();
        let (tx, _rx) = watch::channel(ParameterSnapshot::defaults(&system_locale));
        Self {
            tx: Rc::new(tx),
            system_locale: system_locale.into(),
        }
    }

    /// Apply one parameter update.
    ///
    /// Returns `true` when the snapshot changed. Unknown names and repeated
    /// values leave the store untouched.
    pub fn apply(&self, param: &Parameter) -> bool {
        let Some(name) = ParamName::parse(&param.name) else {
            debug!(name = %param.name, "Ignoring unknown parameter");
            return false;
        };

        self.tx.send_if_modified(|snapshot| match name {
            ParamName::Theme => {
                if snapshot.theme == param.value {
                    return false;
                }
                snapshot.theme.clone_from(&param.value);
                true
            }
            ParamName::Language => {
                let computed = language::computed_language(&param.value, &self.system_locale);
                if snapshot.language == param.value && snapshot.computed_language == computed {
                    return false;
                }
                snapshot.language.clone_from(&param.value);
                snapshot.computed_language = computed;
                true
            }
        })
    }

    /// Apply a batch in order; later entries win over earlier ones
    pub fn apply_all(&self, params: &[Parameter]) {
        for param in params {
            self.apply(param);
        }
    }

    /// Current snapshot
    #[must_use]
    pub fn snapshot(&self) -> ParameterSnapshot {
        self.tx.borrow().clone()
    }

    /// Subscribe to snapshot changes
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ParameterSnapshot> {
        self.tx.subscribe()
    }
}
