use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::client::MimirClient;
use crate::context::Context;
use crate::errors::MimirError;
use crate::framework::{
    get_string, get_string_map, Attribute, AttributePath, AttributeType, AttrValue,
    CreateRequest, CreateResponse, DeleteRequest, DeleteResponse, Diagnostic, Diagnostics,
    Object, ProviderData, ReadRequest, ReadResponse, Resource, Schema, UpdateRequest,
    UpdateResponse, Value,
};

/// Mimir holds a single Alertmanager configuration per tenant, so there is no
/// natural identifier. Present resources carry this constant.
pub const ALERTMANAGER_ID: &str = "alertmanager";

const ATTR_ID: &str = "id";
const ATTR_CONFIG_YAML: &str = "config_yaml";
const ATTR_TEMPLATES: &str = "templates_config_yaml";

/// Decoded resource attributes
#[derive(Debug, Clone, PartialEq, Eq)]
struct AlertmanagerModel {
    id: Option<String>,
    config_yaml: String,
    /// `None` when the attribute is null, which is not the same as an empty map
    /// for the host's diff
    templates: Option<BTreeMap<String, String>>,
}

impl AlertmanagerModel {
    fn from_object(object: &Object) -> Result<Self, Diagnostics> {
        let mut diags = Diagnostics::new();

        let id = match get_string(object, ATTR_ID) {
            Ok(id) => id.into_known(),
            Err(diag) => {
                diags.push(diag);
                None
            }
        };

        let config_yaml = match get_string(object, ATTR_CONFIG_YAML) {
            Ok(AttrValue::Known(config)) => config,
            Ok(AttrValue::Null) => {
                diags.push(Diagnostic::attribute_error(
                    AttributePath::root(ATTR_CONFIG_YAML),
                    "Missing Alertmanager configuration",
                    "The config_yaml attribute is required.",
                ));
                String::new()
            }
            Ok(AttrValue::Unknown) => {
                diags.push(Diagnostic::attribute_error(
                    AttributePath::root(ATTR_CONFIG_YAML),
                    "Unknown Alertmanager configuration",
                    "The config_yaml attribute must be known before it can be pushed to Mimir.",
                ));
                String::new()
            }
            Err(diag) => {
                diags.push(diag);
                String::new()
            }
        };

        let templates = match get_string_map(object, ATTR_TEMPLATES) {
            Ok(AttrValue::Known(templates)) => Some(templates),
            Ok(AttrValue::Null) => None,
            Ok(AttrValue::Unknown) => {
                diags.push(Diagnostic::attribute_error(
                    AttributePath::root(ATTR_TEMPLATES),
                    "Unknown Alertmanager templates",
                    "The templates_config_yaml attribute must be known before it can be pushed to Mimir.",
                ));
                None
            }
            Err(errors) => {
                diags.extend(errors);
                None
            }
        };

        if diags.has_error() {
            return Err(diags);
        }

        Ok(Self {
            id,
            config_yaml,
            templates,
        })
    }

    fn to_object(&self) -> Object {
        let templates = match &self.templates {
            Some(templates) => Value::string_map(templates.clone()),
            None => Value::Null,
        };

        Object::from([
            (ATTR_ID.to_string(), Value::from(self.id.clone())),
            (ATTR_CONFIG_YAML.to_string(), Value::from(self.config_yaml.clone())),
            (ATTR_TEMPLATES.to_string(), templates),
        ])
    }

    /// Templates to push. Absent templates are pushed as an empty set.
    fn templates_or_empty(&self) -> BTreeMap<String, String> {
        self.templates.clone().unwrap_or_default()
    }
}

/// State persisted after a successful delete
fn deleted_state() -> Object {
    Object::from([
        (ATTR_ID.to_string(), Value::from("")),
        (ATTR_CONFIG_YAML.to_string(), Value::Null),
        (ATTR_TEMPLATES.to_string(), Value::Null),
    ])
}

fn is_absent(state: &Object) -> bool {
    matches!(get_string(state, ATTR_ID), Ok(AttrValue::Known(id)) if id.is_empty())
}

/// The `<provider>_alertmanager` resource
///
/// See the [Mimir documentation](https://grafana.com/docs/mimir/latest/references/http-api/#alertmanager).
#[derive(Default)]
pub struct AlertmanagerResource {
    client: Option<Arc<MimirClient>>,
}

impl AlertmanagerResource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn boxed() -> Box<dyn Resource> {
        Box::new(Self::new())
    }

    fn client(&self) -> Result<&MimirClient, Diagnostic> {
        self.client.as_deref().ok_or_else(|| {
            Diagnostic::error(
                "Unconfigured Mimirtool API Client",
                "The provider has not been configured yet. Please report this issue to the provider developers.",
            )
        })
    }

    async fn push(&self, ctx: &Context, model: &AlertmanagerModel) -> Result<(), Diagnostic> {
        let client = self.client()?;
        let templates = model.templates_or_empty();

        debug!(template_count = templates.len(), "Pushing Alertmanager configuration");
        client
            .create_alertmanager_config(ctx, &model.config_yaml, &templates)
            .await
            .map_err(|err| {
                Diagnostic::error(
                    "Error creating Alertmanager config",
                    format!(
                        "An unexpected error occurred while creating Alertmanager config\n\nOriginal Error: {err}"
                    ),
                )
            })
    }
}

#[async_trait]
impl Resource for AlertmanagerResource {
    fn metadata(&self, provider_type_name: &str) -> String {
        format!("{provider_type_name}_alertmanager")
    }

    fn schema(&self) -> Schema {
        Schema::new(
            "[Official documentation](https://grafana.com/docs/mimir/latest/references/http-api/#alertmanager)",
        )
        .with_attribute(
            ATTR_ID,
            Attribute::computed(AttributeType::String).with_description(format!(
                "Always `{ALERTMANAGER_ID}`: Mimir holds a single Alertmanager configuration per tenant."
            )),
        )
        .with_attribute(
            ATTR_CONFIG_YAML,
            Attribute::required(AttributeType::String)
                .with_description("The Alertmanager configuration to load in Grafana Mimir as YAML."),
        )
        .with_attribute(
            ATTR_TEMPLATES,
            Attribute::optional(AttributeType::Map(Box::new(AttributeType::String)))
                .with_description("The templates to load along with the configuration."),
        )
    }

    fn configure(&mut self, provider_data: Option<ProviderData>) -> Diagnostics {
        let mut diags = Diagnostics::new();

        // The host calls this before the provider is configured as well.
        let Some(data) = provider_data else {
            return diags;
        };

        match data.downcast::<MimirClient>() {
            Ok(client) => self.client = Some(client),
            Err(_) => diags.add_error(
                "Unexpected Resource Configure Type",
                "Expected a Mimirtool API client as provider data. Please report this issue to the provider developers.",
            ),
        }

        diags
    }

    async fn create(&self, ctx: &Context, req: CreateRequest) -> CreateResponse {
        let mut resp = CreateResponse::default();

        let mut model = match AlertmanagerModel::from_object(&req.plan) {
            Ok(model) => model,
            Err(diags) => {
                resp.diagnostics = diags;
                return resp;
            }
        };

        if let Err(diag) = self.push(ctx, &model).await {
            resp.diagnostics.push(diag);
            return resp;
        }

        model.id = Some(ALERTMANAGER_ID.to_string());
        resp.state = Some(model.to_object());

        info!("Created Alertmanager configuration");
        resp
    }

    async fn read(&self, ctx: &Context, req: ReadRequest) -> ReadResponse {
        let mut resp = ReadResponse::default();

        let Some(state) = req.state.filter(|state| !is_absent(state)) else {
            debug!("Alertmanager configuration already absent from state");
            return resp;
        };

        let client = match self.client() {
            Ok(client) => client,
            Err(diag) => {
                resp.diagnostics.push(diag);
                resp.state = Some(state);
                return resp;
            }
        };

        // Only the templates matter from prior state; everything else is
        // refreshed from Mimir.
        let prior_templates = match get_string_map(&state, ATTR_TEMPLATES) {
            Ok(templates) => templates,
            Err(errors) => {
                resp.diagnostics.extend(errors);
                resp.state = Some(state);
                return resp;
            }
        };

        match client.get_alertmanager_config(ctx).await {
            Ok(remote) => {
                let templates = if remote.template_files.is_empty() && prior_templates.known().is_none() {
                    None
                } else {
                    Some(remote.template_files)
                };

                let model = AlertmanagerModel {
                    id: Some(ALERTMANAGER_ID.to_string()),
                    config_yaml: remote.alertmanager_config,
                    templates,
                };
                resp.state = Some(model.to_object());
            }
            Err(MimirError::NotFound) => {
                info!("No Alertmanager configuration in Mimir, removing from state");
            }
            Err(err) => {
                resp.diagnostics.add_error(
                    "Error reading Alertmanager config",
                    format!("Could not read Alertmanager configuration: {err}"),
                );
                resp.state = Some(state);
            }
        }

        resp
    }

    async fn update(&self, ctx: &Context, req: UpdateRequest) -> UpdateResponse {
        let mut resp = UpdateResponse::default();

        let mut model = match AlertmanagerModel::from_object(&req.plan) {
            Ok(model) => model,
            Err(diags) => {
                resp.diagnostics = diags;
                resp.state = Some(req.prior_state);
                return resp;
            }
        };

        // Mimir has no partial update; pushing overwrites the whole config.
        if let Err(diag) = self.push(ctx, &model).await {
            resp.diagnostics.push(diag);
            resp.state = Some(req.prior_state);
            return resp;
        }

        model.id = Some(ALERTMANAGER_ID.to_string());
        resp.state = Some(model.to_object());

        info!("Updated Alertmanager configuration");
        resp
    }

    async fn delete(&self, ctx: &Context, req: DeleteRequest) -> DeleteResponse {
        let mut resp = DeleteResponse::default();

        let result = match self.client() {
            Ok(client) => client.delete_alertmanager_config(ctx).await,
            Err(diag) => {
                resp.diagnostics.push(diag);
                resp.state = Some(req.prior_state);
                return resp;
            }
        };

        if let Err(err) = result {
            resp.diagnostics.add_error(
                "Error while deleting Alertmanager configuration",
                format!("Original Error: {err}"),
            );
            resp.state = Some(req.prior_state);
            return resp;
        }

        resp.state = Some(deleted_state());

        info!("Deleted Alertmanager configuration");
        resp
    }
}
