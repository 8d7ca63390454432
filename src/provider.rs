use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::client::MimirClient;
use crate::config::{
    ConfigError, ConnectionSettings, Environment, ProcessEnvironment, ProviderConfig, Setting,
};
use crate::context::Context;
use crate::framework::{
    Attribute, AttributeType, ConfigureResponse, Object, Provider, ProviderMetadata,
    ResourceFactory, Schema,
};
use crate::resource_alertmanager::AlertmanagerResource;

/// Type name of the provider, prefix of every resource type it serves
pub const PROVIDER_TYPE_NAME: &str = "mimirtool";

/// Provider managing Grafana Mimir through its HTTP API
pub struct MimirtoolProvider {
    /// "dev" for local builds, "test" under tests, the release version
    /// otherwise
    version: String,
    env: Arc<dyn Environment>,
}

impl MimirtoolProvider {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            env: Arc::new(ProcessEnvironment),
        }
    }

    /// Resolve environment variables from `env` instead of the process
    pub fn with_environment(mut self, env: Arc<dyn Environment>) -> Self {
        self.env = env;
        self
    }

    fn user_agent(&self) -> String {
        format!("terraform-provider-{PROVIDER_TYPE_NAME}/{}", self.version)
    }
}

/// Session factory: every call returns a fresh provider sharing no state with
/// the ones built before it.
pub fn factory(version: impl Into<String>) -> impl Fn() -> MimirtoolProvider {
    let version = version.into();
    move || MimirtoolProvider::new(version.clone())
}

#[async_trait]
impl Provider for MimirtoolProvider {
    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            type_name: PROVIDER_TYPE_NAME.to_string(),
            version: self.version.clone(),
        }
    }

    fn schema(&self) -> Schema {
        let schema = Schema::new("Manage Grafana Mimir with the mimirtool provider.");

        Setting::ALL.into_iter().fold(schema, |schema, setting| {
            let attr_type = if setting.is_bool() {
                AttributeType::Bool
            } else {
                AttributeType::String
            };
            let mut attribute =
                Attribute::optional(attr_type).with_description(setting.description());
            if setting.is_sensitive() {
                attribute = attribute.sensitive();
            }
            schema.with_attribute(setting.attribute(), attribute)
        })
    }

    async fn configure(&self, _ctx: &Context, config: &Object) -> ConfigureResponse {
        debug!("Configuring provider");
        let mut resp = ConfigureResponse::default();

        let config = match ProviderConfig::from_object(config) {
            Ok(config) => config,
            Err(diags) => {
                resp.diagnostics.extend(diags);
                return resp;
            }
        };

        let unknown = config.unknown_settings();
        if !unknown.is_empty() {
            for setting in unknown {
                resp.diagnostics
                    .push(ConfigError::UnknownValue { setting }.to_diagnostic());
            }
            return resp;
        }

        let settings = match ConnectionSettings::resolve(&config, self.env.as_ref()) {
            Ok(settings) => settings,
            Err(err) => {
                resp.diagnostics.push(err.to_diagnostic());
                return resp;
            }
        };

        debug!(
            address = %settings.address,
            tenant_id = settings.tenant_id.as_deref().unwrap_or_default(),
            auth_token = ?settings.auth_token,
            "Creating Mimirtool client"
        );

        let client = match MimirClient::new(&settings, &self.user_agent()) {
            Ok(client) => client,
            Err(err) => {
                resp.diagnostics.add_error(
                    "Unable to Create Mimirtool API Client",
                    format!(
                        "An unexpected error occurred when creating the Mimirtool API client. \
                         If the error is not clear, please contact the provider developers.\n\n\
                         Mimirtool Client Error: {err}"
                    ),
                );
                return resp;
            }
        };

        resp.provider_data = Some(Arc::new(client));

        info!(success = true, "Configured Mimirtool client");
        resp
    }

    fn resources(&self) -> Vec<ResourceFactory> {
        vec![AlertmanagerResource::boxed]
    }
}
