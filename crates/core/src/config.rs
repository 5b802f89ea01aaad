//! Configuration for the application shell

use crate::error::CoreResult;
use crate::supervisor::ErrorSignature;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How the authentication bootstrap runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentMode {
    /// Real identity provider, settings fetched at startup
    Interactive,
    /// Local developer manager, no provider involved
    #[default]
    Bypass,
}

impl DeploymentMode {
    /// Interpret the deploy-time `USE_AUTHENTICATION` switch; only the exact
    /// string `true` turns authentication on
    #[must_use]
    pub fn from_flag(use_authentication: Option<&str>) -> Self {
        match use_authentication {
            Some("true") => Self::Interactive,
            _ => Self::Bypass,
        }
    }
}

/// Main shell configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShellConfig {
    /// Selects [`DeploymentMode::Interactive`] when true
    pub use_authentication: bool,

    /// Namespace of this application's own parameters
    pub app_name: String,

    /// Namespace shared by every application of the suite
    pub common_namespace: String,

    /// Base URL of the configuration REST service
    pub config_api_url: String,

    /// Base URL of the configuration notification WebSocket service
    pub config_notification_url: String,

    /// Location of the identity-provider settings document
    pub idp_settings_url: String,

    /// Path of the page the provider loads for silent renewals
    pub silent_renew_path: String,

    /// Silent-renew failures that trigger the one-shot reload
    #[serde(default = "default_renew_signatures")]
    pub renew_reload_signatures: Vec<ErrorSignature>,

    /// Log level filter (e.g., "info", "debug", "trace")
    pub log_level: String,
}

fn default_renew_signatures() -> Vec<ErrorSignature> {
    vec![ErrorSignature::authority_mismatch()]
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            use_authentication: false,
            app_name: "appshell".to_string(),
            common_namespace: "common".to_string(),
            config_api_url: "/api/gateway/config".to_string(),
            config_notification_url: "/config-notification".to_string(),
            idp_settings_url: "idpSettings.json".to_string(),
            silent_renew_path: "/silent-renew-callback".to_string(),
            renew_reload_signatures: default_renew_signatures(),
            log_level: "info".to_string(),
        }
    }
}

impl ShellConfig {
    #[must_use]
    pub fn mode(&self) -> DeploymentMode {
        if self.use_authentication {
            DeploymentMode::Interactive
        } else {
            DeploymentMode::Bypass
        }
    }

    /// Exact route match against the silent-renew callback path; a single
    /// trailing slash is tolerated
    #[must_use]
    pub fn is_silent_renew_page(&self, pathname: &str) -> bool {
        let normalize = |path: &str| path.strip_suffix('/').unwrap_or(path).to_string();
        normalize(pathname) == normalize(&self.silent_renew_path)
    }

    /// Load configuration from file, with `APPSHELL_*` environment overrides
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be read or parsed
    pub fn from_file<P: AsRef<Path>>(path: P) -> CoreResult<Self> {
        Self::load(Some(path.as_ref()))
    }

    /// Load configuration with defaults and environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables cannot be parsed
    pub fn from_env() -> CoreResult<Self> {
        Self::load(None)
    }

    fn load(path: Option<&Path>) -> CoreResult<Self> {
        let defaults = Self::default();

        let mut builder = config::Config::builder()
            .set_default("use_authentication", defaults.use_authentication)?
            .set_default("app_name", defaults.app_name)?
            .set_default("common_namespace", defaults.common_namespace)?
            .set_default("config_api_url", defaults.config_api_url)?
            .set_default("config_notification_url", defaults.config_notification_url)?
            .set_default("idp_settings_url", defaults.idp_settings_url)?
            .set_default("silent_renew_path", defaults.silent_renew_path)?
            .set_default("log_level", defaults.log_level)?;

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }

        let settings = builder
            .add_source(config::Environment::with_prefix("APPSHELL").try_parsing(true))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Configuration baked in at build time, for the browser bundle
    #[must_use]
    pub fn from_build_env() -> Self {
        let mut config = Self {
            use_authentication: DeploymentMode::from_flag(option_env!(
                "APPSHELL_USE_AUTHENTICATION"
            )) == DeploymentMode::Interactive,
            ..Self::default()
        };
        if let Some(app_name) = option_env!("APPSHELL_APP_NAME") {
            config.app_name = app_name.to_string();
        }
        if let Some(url) = option_env!("APPSHELL_CONFIG_API_URL") {
            config.config_api_url = url.to_string();
        }
        if let Some(url) = option_env!("APPSHELL_CONFIG_NOTIFICATION_URL") {
            config.config_notification_url = url.to_string();
        }
        if let Some(level) = option_env!("APPSHELL_LOG_LEVEL") {
            config.log_level = level.to_string();
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ShellConfig::default();
        assert_eq!(config.mode(), DeploymentMode::Bypass);
        assert_eq!(config.common_namespace, "common");
        assert_eq!(config.renew_reload_signatures.len(), 1);
    }

    #[test]
    fn test_mode_from_flag() {
        assert_eq!(DeploymentMode::from_flag(Some("true")), DeploymentMode::Interactive);
        assert_eq!(DeploymentMode::from_flag(Some("TRUE")), DeploymentMode::Bypass);
        assert_eq!(DeploymentMode::from_flag(Some("false")), DeploymentMode::Bypass);
        assert_eq!(DeploymentMode::from_flag(None), DeploymentMode::Bypass);
    }

    #[test]
    fn test_silent_renew_route_matching() {
        let config = ShellConfig::default();
        assert!(config.is_silent_renew_page("/silent-renew-callback"));
        assert!(config.is_silent_renew_page("/silent-renew-callback/"));
        assert!(!config.is_silent_renew_page("/silent-renew-callback/extra"));
        assert!(!config.is_silent_renew_page("/"));
    }

    #[test]
    fn test_from_file() {
        let dir = std::env::temp_dir().join(format!("appshell-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("shell.toml");
        std::fs::write(
            &path,
            "use_authentication = true\napp_name = \"study\"\n",
        )
        .unwrap();

        let config = ShellConfig::from_file(&path).unwrap();
        assert_eq!(config.mode(), DeploymentMode::Interactive);
        assert_eq!(config.app_name, "study");
        assert_eq!(config.common_namespace, "common");
        assert_eq!(
            config.renew_reload_signatures,
            vec![ErrorSignature::authority_mismatch()]
        );

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_from_env_starts_from_defaults() {
        let config = ShellConfig::from_env().unwrap();
        assert!(!config.app_name.is_empty());
        assert!(!config.common_namespace.is_empty());
        assert_eq!(
            config.renew_reload_signatures,
            vec![ErrorSignature::authority_mismatch()]
        );
    }
}
