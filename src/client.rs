use reqwest::{Client, Method, Response, StatusCode};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, RequestBuilder};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, instrument};
use url::Url;

use crate::config::{ConnectionSettings, Sensitive};
use crate::context::Context;
use crate::errors::{MimirError, Result};
use crate::tls::{self, TlsConfig};
use crate::types::AlertmanagerUserConfig;

/// Path of the Alertmanager configuration API, relative to the Mimir address
const ALERTMANAGER_CONFIG_PATH: &str = "api/v1/alerts";

/// Header Mimir uses to select the tenant
const TENANT_HEADER: &str = "X-Scope-OrgID";

#[derive(Clone, Default)]
struct Credentials {
    tenant_id: Option<String>,
    api_user: Option<String>,
    api_key: Option<Sensitive>,
    auth_token: Option<Sensitive>,
}

impl Credentials {
    /// Bearer token wins over basic auth. A key without a user authenticates
    /// as the tenant.
    fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        let request = match &self.tenant_id {
            Some(tenant_id) => request.header(TENANT_HEADER, tenant_id),
            None => request,
        };

        if let Some(token) = &self.auth_token {
            return request.bearer_auth(token.expose());
        }

        let key = self.api_key.as_ref().map(Sensitive::expose);
        match (&self.api_user, &self.tenant_id, key) {
            (Some(user), _, key) => request.basic_auth(user, key),
            (None, Some(tenant_id), Some(key)) => request.basic_auth(tenant_id, Some(key)),
            (None, None, Some(key)) => request.basic_auth("", Some(key)),
            (None, _, None) => request,
        }
    }
}

/// Client for the Mimir Alertmanager configuration API
///
/// Cheap to clone and safe to share between concurrently running resource
/// operations. Nothing in it changes after construction.
///
/// # Example
///
/// ```rust,no_run
/// use mimirtool_provider::{ConnectionSettings, Context, MimirClient, ProviderConfig};
/// use std::collections::HashMap;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let env: HashMap<String, String> =
///         HashMap::from([("MIMIRTOOL_ADDRESS".into(), "http://localhost:9009".into())]);
///     let settings = ConnectionSettings::resolve(&ProviderConfig::default(), &env)?;
///     let client = MimirClient::new(&settings, "terraform-provider-mimirtool/dev")?;
///
///     let config = client.get_alertmanager_config(&Context::new()).await?;
///     println!("{}", config.alertmanager_config);
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct MimirClient {
    client: ClientWithMiddleware,
    api_url: Url,
    credentials: Credentials,
    prometheus_http_prefix: String,
    alertmanager_http_prefix: String,
}

impl MimirClient {
    /// Create a new client from resolved connection settings
    ///
    /// # Errors
    ///
    /// Returns an error if the address is not a valid URL, if TLS material
    /// cannot be loaded, or if the HTTP client cannot be built.
    pub fn new(settings: &ConnectionSettings, user_agent: &str) -> Result<Self> {
        let tls = TlsConfig {
            ca_path: settings.tls_ca_path.as_ref().map(PathBuf::from),
            cert_path: settings.tls_cert_path.as_ref().map(PathBuf::from),
            key_path: settings.tls_key_path.as_ref().map(PathBuf::from),
            insecure_skip_verify: settings.insecure_skip_verify,
        };

        let client = tls::apply(Client::builder().user_agent(user_agent), &tls)?
            .build()
            .map_err(MimirError::BuildHttpClient)?;

        let client = ClientBuilder::new(client).build();

        Self::with_client(client, settings)
    }

    /// Create a new client with a custom reqwest middleware client
    ///
    /// TLS settings are ignored; they belong to the supplied client.
    pub fn with_client(client: ClientWithMiddleware, settings: &ConnectionSettings) -> Result<Self> {
        Ok(Self {
            client,
            api_url: parse_address(&settings.address)?,
            credentials: Credentials {
                tenant_id: settings.tenant_id.clone(),
                api_user: settings.api_user.clone(),
                api_key: settings.api_key.clone(),
                auth_token: settings.auth_token.clone(),
            },
            prometheus_http_prefix: settings.prometheus_http_prefix.clone(),
            alertmanager_http_prefix: settings.alertmanager_http_prefix.clone(),
        })
    }

    fn config_url(&self) -> Result<Url> {
        self.api_url
            .join(ALERTMANAGER_CONFIG_PATH)
            .map_err(|source| MimirError::InvalidAddress {
                address: self.api_url.to_string(),
                source,
            })
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.credentials.apply(self.client.request(method, url))
    }

    async fn send(&self, ctx: &Context, request: RequestBuilder) -> Result<Response> {
        let response = ctx
            .run(request.send())
            .await
            .map_err(|_| MimirError::Cancelled)?
            .map_err(MimirError::Request)?;

        let status = response.status();

        if !status.is_success() {
            let message = ctx
                .run(response.text())
                .await
                .map_err(|_| MimirError::Cancelled)?
                .unwrap_or_default();
            return Err(MimirError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }

    /// Push the Alertmanager configuration and its templates
    ///
    /// Mimir keeps one configuration per tenant, so this overwrites whatever
    /// was stored before.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The payload cannot be serialized
    /// - The HTTP request fails or is cancelled
    /// - Mimir returns a non-success status code
    #[instrument(
        name = "MimirClient::create_alertmanager_config",
        skip_all,
        fields(template_count = templates.len())
    )]
    pub async fn create_alertmanager_config(
        &self,
        ctx: &Context,
        config: &str,
        templates: &BTreeMap<String, String>,
    ) -> Result<()> {
        let payload = AlertmanagerUserConfig::new(config).with_templates(templates.clone());
        let body = serde_yaml::to_string(&payload).map_err(MimirError::Serialize)?;
        let url = self.config_url()?;

        debug!(url = %url, "Pushing Alertmanager configuration to Mimir");

        let request = self
            .request(Method::POST, url)
            .header(reqwest::header::CONTENT_TYPE, "application/yaml")
            .body(body);
        self.send(ctx, request).await?;

        debug!("Alertmanager configuration pushed successfully");
        Ok(())
    }

    /// Fetch the Alertmanager configuration of the tenant
    ///
    /// # Errors
    ///
    /// Returns [`MimirError::NotFound`] when the tenant has no configuration,
    /// and an error if the request fails or the response cannot be parsed.
    #[instrument(name = "MimirClient::get_alertmanager_config", skip_all)]
    pub async fn get_alertmanager_config(&self, ctx: &Context) -> Result<AlertmanagerUserConfig> {
        let url = self.config_url()?;

        debug!(url = %url, "Fetching Alertmanager configuration from Mimir");

        let response = match self.send(ctx, self.request(Method::GET, url)).await {
            Ok(response) => response,
            Err(MimirError::Api { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                return Err(MimirError::NotFound);
            }
            Err(err) => return Err(err),
        };
        let body = ctx
            .run(response.text())
            .await
            .map_err(|_| MimirError::Cancelled)?
            .map_err(|err| MimirError::Request(err.into()))?;

        serde_yaml::from_str(&body).map_err(MimirError::Deserialize)
    }

    /// Delete the Alertmanager configuration of the tenant
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP request fails or Mimir returns a
    /// non-success status code.
    #[instrument(name = "MimirClient::delete_alertmanager_config", skip_all)]
    pub async fn delete_alertmanager_config(&self, ctx: &Context) -> Result<()> {
        let url = self.config_url()?;

        debug!(url = %url, "Deleting Alertmanager configuration from Mimir");

        self.send(ctx, self.request(Method::DELETE, url)).await?;

        debug!("Alertmanager configuration deleted successfully");
        Ok(())
    }

    /// Get the base API URL
    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    pub fn tenant_id(&self) -> Option<&str> {
        self.credentials.tenant_id.as_deref()
    }

    /// Path prefix of the ruler API
    pub fn prometheus_http_prefix(&self) -> &str {
        &self.prometheus_http_prefix
    }

    /// Path prefix of the Alertmanager UI and API
    pub fn alertmanager_http_prefix(&self) -> &str {
        &self.alertmanager_http_prefix
    }
}

/// Parse the address and make it usable as a base for relative joins
fn parse_address(address: &str) -> Result<Url> {
    let invalid = |source| MimirError::InvalidAddress {
        address: address.to_string(),
        source,
    };

    let mut url = Url::parse(address).map_err(invalid)?;
    if url.cannot_be_a_base() {
        return Err(invalid(url::ParseError::RelativeUrlWithCannotBeABaseBase));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
