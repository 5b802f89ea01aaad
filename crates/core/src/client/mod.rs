//! Configuration service HTTP client

pub mod error;

use crate::channel::ConfigApi;
use crate::error::CoreResult;
use crate::identity::{IdpSettings, SettingsLoader};
use crate::params::{ParamName, Parameter};
use crate::session::User;
use async_trait::async_trait;
use error::ClientError;
use reqwest::{Client, ClientBuilder, Method, header};
use std::cell::RefCell;
use std::rc::Rc;

/// Configuration service client
#[derive(Clone)]
pub struct ConfigClient {
    client: Client,
    base_url: String,
    idp_settings_url: Option<String>,
    app_name: String,
    common_namespace: String,
    token: Rc<RefCell<Option<String>>>,
}

impl ConfigClient {
    /// Create a new client builder
    pub fn builder() -> ConfigClientBuilder {
        ConfigClientBuilder::default()
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Replace the bearer token sent with every request
    pub fn set_auth_token(&self, token: Option<&str>) {
        *self.token.borrow_mut() = token.map(str::to_string);
    }

    /// Namespace a parameter is written under
    pub fn namespace_of(&self, name: &str) -> &str {
        if ParamName::parse(name).is_some_and(ParamName::is_common) {
            &self.common_namespace
        } else {
            &self.app_name
        }
    }

    /// Create a request builder with authentication
    pub fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.request(method, url);

        if let Some(token) = self.token.borrow().as_deref() {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        request
    }

    /// Execute a request and handle common errors
    pub async fn execute<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            Ok(response.json().await?)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(ClientError::rejected(status, &body))
        }
    }

    /// Execute a request whose response body is not needed
    pub async fn execute_empty(&self, request: reqwest::RequestBuilder) -> Result<(), ClientError> {
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(ClientError::rejected(status, &body))
        }
    }

    /// List every parameter of a namespace
    pub async fn get_parameters(&self, namespace: &str) -> Result<Vec<Parameter>, ClientError> {
        let request = self.request(
            Method::GET,
            &format!("/v1/applications/{namespace}/parameters"),
        );
        self.execute(request).await
    }

    /// Get one parameter from the namespace it belongs to
    pub async fn get_parameter(&self, name: &str) -> Result<Parameter, ClientError> {
        let namespace = self.namespace_of(name);
        let request = self.request(
            Method::GET,
            &format!("/v1/applications/{namespace}/parameters/{name}"),
        );
        self.execute(request).await
    }

    /// Write one parameter in the namespace it belongs to
    pub async fn put_parameter(&self, name: &str, value: &str) -> Result<(), ClientError> {
        let namespace = self.namespace_of(name);
        let request = self
            .request(
                Method::PUT,
                &format!("/v1/applications/{namespace}/parameters/{name}"),
            )
            .query(&[("value", value)]);
        self.execute_empty(request).await
    }

    /// Fetch the identity-provider settings document
    pub async fn get_idp_settings(&self) -> Result<IdpSettings, ClientError> {
        let url = self
            .idp_settings_url
            .clone()
            .ok_or_else(|| ClientError::Configuration("idp_settings_url is not set".into()))?;
        let request = self.client.request(Method::GET, url);
        self.execute(request).await
    }
}

#[async_trait(?Send)]
impl ConfigApi for ConfigClient {
    async fn fetch_all_parameters(&self, namespace: &str) -> CoreResult<Vec<Parameter>> {
        Ok(self.get_parameters(namespace).await?)
    }

    async fn fetch_parameter(&self, name: &str) -> CoreResult<Parameter> {
        Ok(self.get_parameter(name).await?)
    }

    async fn update_parameter(&self, name: &str, value: &str) -> CoreResult<()> {
        Ok(self.put_parameter(name, value).await?)
    }

    fn set_credentials(&self, user: Option<&User>) {
        self.set_auth_token(user.map(|user| user.id_token.as_str()));
    }
}

#[async_trait(?Send)]
impl SettingsLoader for ConfigClient {
    async fn load_idp_settings(&self) -> CoreResult<IdpSettings> {
        Ok(self.get_idp_settings().await?)
    }
}

/// Builder for ConfigClient
#[derive(Default)]
pub struct ConfigClientBuilder {
    base_url: Option<String>,
    idp_settings_url: Option<String>,
    app_name: Option<String>,
    common_namespace: Option<String>,
}

impl ConfigClientBuilder {
    /// Set the base URL of the configuration service
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the absolute URL of the identity-provider settings document
    pub fn idp_settings_url(mut self, url: impl Into<String>) -> Self {
        self.idp_settings_url = Some(url.into());
        self
    }

    /// Set the application namespace
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = Some(name.into());
        self
    }

    /// Set the shared namespace
    pub fn common_namespace(mut self, name: impl Into<String>) -> Self {
        self.common_namespace = Some(name.into());
        self
    }

    /// Build the client
    pub fn build(self) -> Result<ConfigClient, ClientError> {
        let base_url = self
            .base_url
            .ok_or_else(|| ClientError::Configuration("base_url is required".into()))?;
        let app_name = self
            .app_name
            .ok_or_else(|| ClientError::Configuration("app_name is required".into()))?;

        // Ensure base_url ends without a trailing slash
        let base_url = base_url.trim_end_matches('/').to_string();

        let client = ClientBuilder::new().build()?;

        Ok(ConfigClient {
            client,
            base_url,
            idp_settings_url: self.idp_settings_url,
            app_name,
            common_namespace: self.common_namespace.unwrap_or_else(|| "common".to_string()),
            token: Rc::new(RefCell::new(None)),
        })
    }
}
