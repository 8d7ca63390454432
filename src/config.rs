//! Connection settings resolution.
//!
//! Every provider attribute can come from three places. From lowest to highest
//! precedence:
//!
//! 1. `MIMIRTOOL_<ATTRIBUTE>` environment variable
//! 2. `MIMIR_<ATTRIBUTE>` environment variable, consulted only when the first
//!    one is unset or empty
//! 3. the attribute set explicitly in the provider block
//!
//! A few attributes also carry a built-in default used when all three are
//! absent.

use std::collections::{BTreeMap, HashMap};
use std::fmt::{Debug, Display, Formatter};

use thiserror::Error;
use tracing::warn;

use crate::framework::{
    get_bool, get_string, AttrValue, AttributePath, Diagnostic, Diagnostics, Object,
};

const PRIMARY_ENV_PREFIX: &str = "MIMIRTOOL_";
const FALLBACK_ENV_PREFIX: &str = "MIMIR_";

pub const DEFAULT_PROMETHEUS_HTTP_PREFIX: &str = "/prometheus";
pub const DEFAULT_ALERTMANAGER_HTTP_PREFIX: &str = "/alertmanager";

/// Provider configuration attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Setting {
    Address,
    TenantId,
    ApiUser,
    ApiKey,
    AuthToken,
    TlsKeyPath,
    TlsCertPath,
    TlsCaPath,
    InsecureSkipVerify,
    PrometheusHttpPrefix,
    AlertmanagerHttpPrefix,
}

impl Setting {
    pub const ALL: [Setting; 11] = [
        Setting::Address,
        Setting::TenantId,
        Setting::ApiUser,
        Setting::ApiKey,
        Setting::AuthToken,
        Setting::TlsKeyPath,
        Setting::TlsCertPath,
        Setting::TlsCaPath,
        Setting::InsecureSkipVerify,
        Setting::PrometheusHttpPrefix,
        Setting::AlertmanagerHttpPrefix,
    ];

    /// Attribute name in the provider block
    pub fn attribute(&self) -> &'static str {
        match self {
            Setting::Address => "address",
            Setting::TenantId => "tenant_id",
            Setting::ApiUser => "api_user",
            Setting::ApiKey => "api_key",
            Setting::AuthToken => "auth_token",
            Setting::TlsKeyPath => "tls_key_path",
            Setting::TlsCertPath => "tls_cert_path",
            Setting::TlsCaPath => "tls_ca_path",
            Setting::InsecureSkipVerify => "insecure_skip_verify",
            Setting::PrometheusHttpPrefix => "prometheus_http_prefix",
            Setting::AlertmanagerHttpPrefix => "alertmanager_http_prefix",
        }
    }

    pub fn primary_env(&self) -> String {
        format!("{PRIMARY_ENV_PREFIX}{}", self.attribute().to_uppercase())
    }

    pub fn fallback_env(&self) -> String {
        format!("{FALLBACK_ENV_PREFIX}{}", self.attribute().to_uppercase())
    }

    pub fn is_sensitive(&self) -> bool {
        matches!(self, Setting::ApiKey | Setting::AuthToken)
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, Setting::InsecureSkipVerify)
    }

    /// Human description, without the environment variable suffix
    pub fn summary(&self) -> &'static str {
        match self {
            Setting::Address => "Address to use when contacting Grafana Mimir.",
            Setting::TenantId => "Tenant ID to use when contacting Grafana Mimir.",
            Setting::ApiUser => "API user to use when contacting Grafana Mimir.",
            Setting::ApiKey => "API key to use when contacting Grafana Mimir.",
            Setting::AuthToken => {
                "Authentication token for bearer token or JWT auth when contacting Grafana Mimir."
            }
            Setting::TlsKeyPath => {
                "Client TLS key file to use to authenticate to the Mimir server."
            }
            Setting::TlsCertPath => {
                "Client TLS certificate file to use to authenticate to the Mimir server."
            }
            Setting::TlsCaPath => {
                "Certificate CA bundle to use to verify the Mimir server's certificate."
            }
            Setting::InsecureSkipVerify => "Skip TLS certificate verification.",
            Setting::PrometheusHttpPrefix => "Path prefix to use for rules.",
            Setting::AlertmanagerHttpPrefix => "Path prefix to use for alertmanager.",
        }
    }

    pub fn description(&self) -> String {
        format!(
            "{} May alternatively be set via the `{}` or `{}` environment variable.",
            self.summary(),
            self.primary_env(),
            self.fallback_env()
        )
    }
}

/// Source of environment variables
pub trait Environment: Send + Sync {
    fn var(&self, key: &str) -> Option<String>;
}

/// Reads the process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnvironment;

impl Environment for ProcessEnvironment {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl Environment for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

impl Environment for BTreeMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Merge the three sources of a setting, highest precedence first present
pub fn layered<T>(explicit: Option<T>, primary: Option<T>, fallback: Option<T>) -> Option<T> {
    explicit.or(primary).or(fallback)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Value of `setting` from the environment, primary name first
fn env_values(env: &dyn Environment, setting: Setting) -> (Option<String>, Option<String>) {
    (
        non_empty(env.var(&setting.primary_env())),
        non_empty(env.var(&setting.fallback_env())),
    )
}

/// Parse a boolean the way the `mimirtool` CLI accepts it
pub fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

/// A secret string
///
/// Formatting never reveals the value, so secrets can flow through structs
/// that are logged or debug-printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Sensitive(String);

impl Sensitive {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The secret itself. Only pass this to the transport.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl Debug for Sensitive {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("***")
    }
}

impl Display for Sensitive {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("***")
    }
}

/// Errors raised while resolving connection settings
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Attribute depends on a value the host has not resolved yet
    #[error("The provider cannot create the Mimirtool API client as there is an unknown configuration value for `{}`. Either apply the source of the value first, set the value statically in the configuration, or use the {} environment variable.", .setting.attribute(), .setting.primary_env())]
    UnknownValue { setting: Setting },

    /// No address in configuration or environment
    #[error("The provider cannot create the Mimirtool API client as there is a missing or empty value for the Mimirtool API address. Set the address value in the configuration or use the MIMIRTOOL_ADDRESS (or MIMIR_ADDRESS) environment variable. If either is already set, ensure the value is not empty.")]
    MissingAddress,
}

impl ConfigError {
    pub fn setting(&self) -> Setting {
        match self {
            ConfigError::UnknownValue { setting } => *setting,
            ConfigError::MissingAddress => Setting::Address,
        }
    }

    pub fn summary(&self) -> String {
        match self {
            ConfigError::UnknownValue { setting } => {
                format!("Unknown Mimir API {}", setting.attribute())
            }
            ConfigError::MissingAddress => "Missing Mimir URL".to_string(),
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::attribute_error(
            AttributePath::root(self.setting().attribute()),
            self.summary(),
            self.to_string(),
        )
    }
}

/// Explicit provider block values, as decoded from the host configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    strings: BTreeMap<Setting, AttrValue<String>>,
    insecure_skip_verify: AttrValue<bool>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            strings: BTreeMap::new(),
            insecure_skip_verify: AttrValue::Null,
        }
    }
}

impl ProviderConfig {
    /// Decode the provider block. Type mismatches are reported per attribute.
    pub fn from_object(object: &Object) -> Result<Self, Diagnostics> {
        let mut config = ProviderConfig::default();
        let mut diags = Diagnostics::new();

        for setting in Setting::ALL {
            if setting.is_bool() {
                match get_bool(object, setting.attribute()) {
                    Ok(value) => config.insecure_skip_verify = value,
                    Err(diag) => diags.push(diag),
                }
            } else {
                match get_string(object, setting.attribute()) {
                    Ok(value) => {
                        config.strings.insert(setting, value);
                    }
                    Err(diag) => diags.push(diag),
                }
            }
        }

        if diags.has_error() {
            Err(diags)
        } else {
            Ok(config)
        }
    }

    pub fn with_string(mut self, setting: Setting, value: AttrValue<String>) -> Self {
        self.strings.insert(setting, value);
        self
    }

    pub fn with_insecure_skip_verify(mut self, value: AttrValue<bool>) -> Self {
        self.insecure_skip_verify = value;
        self
    }

    fn string(&self, setting: Setting) -> &AttrValue<String> {
        self.strings.get(&setting).unwrap_or(&AttrValue::Null)
    }

    /// Settings whose value is not known yet
    pub fn unknown_settings(&self) -> Vec<Setting> {
        Setting::ALL
            .into_iter()
            .filter(|s| {
                if s.is_bool() {
                    self.insecure_skip_verify.is_unknown()
                } else {
                    self.string(*s).is_unknown()
                }
            })
            .collect()
    }
}

/// Resolved connection settings for one provider session
///
/// Secrets are wrapped in [`Sensitive`], so the `Debug` output is safe to log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub address: String,
    pub tenant_id: Option<String>,
    pub api_user: Option<String>,
    pub api_key: Option<Sensitive>,
    pub auth_token: Option<Sensitive>,
    pub tls_key_path: Option<String>,
    pub tls_cert_path: Option<String>,
    pub tls_ca_path: Option<String>,
    pub insecure_skip_verify: bool,
    pub prometheus_http_prefix: String,
    pub alertmanager_http_prefix: String,
}

impl ConnectionSettings {
    /// Resolve settings from explicit configuration and the environment
    ///
    /// # Errors
    ///
    /// Returns an error if any attribute is still unknown, or if no address
    /// remains after merging all sources.
    pub fn resolve(
        config: &ProviderConfig,
        env: &dyn Environment,
    ) -> Result<Self, ConfigError> {
        if let Some(setting) = config.unknown_settings().into_iter().next() {
            return Err(ConfigError::UnknownValue { setting });
        }

        let string = |setting: Setting| -> Option<String> {
            let (primary, fallback) = env_values(env, setting);
            layered(config.string(setting).known().cloned(), primary, fallback)
        };
        // Explicit empty strings override the environment but mean "unset".
        let optional = |setting: Setting| non_empty(string(setting));

        let address = string(Setting::Address).unwrap_or_default();
        if address.is_empty() {
            return Err(ConfigError::MissingAddress);
        }

        let insecure_skip_verify = {
            let (primary, fallback) = env_values(env, Setting::InsecureSkipVerify);
            let from_env = layered(None, primary, fallback).and_then(|raw| {
                let parsed = parse_bool(&raw);
                if parsed.is_none() {
                    warn!(
                        value = %raw,
                        "Ignoring unparseable insecure_skip_verify environment value"
                    );
                }
                parsed
            });
            layered(
                config.insecure_skip_verify.known().copied(),
                from_env,
                None,
            )
            .unwrap_or(false)
        };

        Ok(Self {
            address,
            tenant_id: optional(Setting::TenantId),
            api_user: optional(Setting::ApiUser),
            api_key: optional(Setting::ApiKey).map(Sensitive),
            auth_token: optional(Setting::AuthToken).map(Sensitive),
            tls_key_path: optional(Setting::TlsKeyPath),
            tls_cert_path: optional(Setting::TlsCertPath),
            tls_ca_path: optional(Setting::TlsCaPath),
            insecure_skip_verify,
            prometheus_http_prefix: optional(Setting::PrometheusHttpPrefix)
                .unwrap_or_else(|| DEFAULT_PROMETHEUS_HTTP_PREFIX.to_string()),
            alertmanager_http_prefix: optional(Setting::AlertmanagerHttpPrefix)
                .unwrap_or_else(|| DEFAULT_ALERTMANAGER_HTTP_PREFIX.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(vars: &[(&str, &str)]) -> HashMap<String, String> {
        vars.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn explicit(setting: Setting, value: &str) -> ProviderConfig {
        ProviderConfig::default()
            .with_string(Setting::Address, AttrValue::Known("http://mimir:8080".into()))
            .with_string(setting, AttrValue::Known(value.to_string()))
    }

    fn resolved_string(settings: &ConnectionSettings, setting: Setting) -> Option<String> {
        match setting {
            Setting::Address => Some(settings.address.clone()),
            Setting::TenantId => settings.tenant_id.clone(),
            Setting::ApiUser => settings.api_user.clone(),
            Setting::ApiKey => settings.api_key.as_ref().map(|s| s.expose().to_string()),
            Setting::AuthToken => settings.auth_token.as_ref().map(|s| s.expose().to_string()),
            Setting::TlsKeyPath => settings.tls_key_path.clone(),
            Setting::TlsCertPath => settings.tls_cert_path.clone(),
            Setting::TlsCaPath => settings.tls_ca_path.clone(),
            Setting::PrometheusHttpPrefix => Some(settings.prometheus_http_prefix.clone()),
            Setting::AlertmanagerHttpPrefix => Some(settings.alertmanager_http_prefix.clone()),
            Setting::InsecureSkipVerify => unreachable!(),
        }
    }

    #[test]
    fn test_env_names() {
        assert_eq!(Setting::Address.primary_env(), "MIMIRTOOL_ADDRESS");
        assert_eq!(Setting::Address.fallback_env(), "MIMIR_ADDRESS");
        assert_eq!(
            Setting::AlertmanagerHttpPrefix.primary_env(),
            "MIMIRTOOL_ALERTMANAGER_HTTP_PREFIX"
        );
        assert!(Setting::TlsCaPath
            .description()
            .contains("`MIMIRTOOL_TLS_CA_PATH` or `MIMIR_TLS_CA_PATH`"));
    }

    #[test]
    fn test_layered_precedence() {
        assert_eq!(layered(Some(1), Some(2), Some(3)), Some(1));
        assert_eq!(layered(None, Some(2), Some(3)), Some(2));
        assert_eq!(layered(None, None, Some(3)), Some(3));
        assert_eq!(layered::<i32>(None, None, None), None);
    }

    #[test]
    fn test_precedence_for_every_string_setting() {
        let value = "/from-config";
        for setting in Setting::ALL.into_iter().filter(|s| !s.is_bool()) {
            let primary = setting.primary_env();
            let fallback = setting.fallback_env();
            // Listed first so the address setting's own variables override it.
            let base = [("MIMIR_ADDRESS", "http://fallback-address")];

            // fallback only
            let vars = env(&[base[0], (fallback.as_str(), "/fallback")]);
            let settings =
                ConnectionSettings::resolve(&ProviderConfig::default(), &vars).unwrap();
            assert_eq!(
                resolved_string(&settings, setting).as_deref(),
                Some("/fallback"),
                "{setting:?}"
            );

            // primary beats fallback
            let vars = env(&[
                base[0],
                (fallback.as_str(), "/fallback"),
                (primary.as_str(), "/primary"),
            ]);
            let settings =
                ConnectionSettings::resolve(&ProviderConfig::default(), &vars).unwrap();
            assert_eq!(
                resolved_string(&settings, setting).as_deref(),
                Some("/primary"),
                "{setting:?}"
            );

            // explicit beats both
            let settings = ConnectionSettings::resolve(&explicit(setting, value), &vars).unwrap();
            assert_eq!(
                resolved_string(&settings, setting).as_deref(),
                Some(value),
                "{setting:?}"
            );
        }
    }

    /// What a string setting resolves to when no tier sets it
    fn unset_value(setting: Setting) -> Option<String> {
        match setting {
            Setting::PrometheusHttpPrefix => Some(DEFAULT_PROMETHEUS_HTTP_PREFIX.to_string()),
            Setting::AlertmanagerHttpPrefix => Some(DEFAULT_ALERTMANAGER_HTTP_PREFIX.to_string()),
            _ => None,
        }
    }

    #[test]
    fn test_every_tier_combination() {
        for setting in Setting::ALL.into_iter().filter(|s| !s.is_bool()) {
            for mask in 0..8u8 {
                let (in_config, in_primary, in_fallback) =
                    (mask & 1 != 0, mask & 2 != 0, mask & 4 != 0);
                let case = format!(
                    "{setting:?} config={in_config} primary={in_primary} fallback={in_fallback}"
                );

                let mut config = ProviderConfig::default();
                if setting != Setting::Address {
                    config = config
                        .with_string(Setting::Address, AttrValue::Known("http://mimir:8080".into()));
                }
                if in_config {
                    config = config.with_string(setting, AttrValue::Known("http://config".into()));
                }

                let mut vars = HashMap::new();
                if in_primary {
                    vars.insert(setting.primary_env(), "http://primary".to_string());
                }
                if in_fallback {
                    vars.insert(setting.fallback_env(), "http://fallback".to_string());
                }

                let expected = if in_config {
                    Some("http://config")
                } else if in_primary {
                    Some("http://primary")
                } else if in_fallback {
                    Some("http://fallback")
                } else {
                    None
                };

                match (ConnectionSettings::resolve(&config, &vars), expected) {
                    (Ok(settings), Some(expected)) => assert_eq!(
                        resolved_string(&settings, setting).as_deref(),
                        Some(expected),
                        "{case}"
                    ),
                    (Ok(settings), None) => assert_eq!(
                        resolved_string(&settings, setting),
                        unset_value(setting),
                        "{case}"
                    ),
                    (Err(err), None) => {
                        assert_eq!(setting, Setting::Address, "{case}");
                        assert_eq!(err, ConfigError::MissingAddress, "{case}");
                    }
                    (Err(err), Some(_)) => panic!("{case}: {err}"),
                }
            }
        }
    }

    #[test]
    fn test_empty_primary_falls_back() {
        let vars = env(&[
            ("MIMIRTOOL_ADDRESS", ""),
            ("MIMIR_ADDRESS", "http://mimir:9009"),
            ("MIMIRTOOL_TENANT_ID", ""),
            ("MIMIR_TENANT_ID", "tenant-b"),
        ]);
        let settings = ConnectionSettings::resolve(&ProviderConfig::default(), &vars).unwrap();
        assert_eq!(settings.address, "http://mimir:9009");
        assert_eq!(settings.tenant_id.as_deref(), Some("tenant-b"));
    }

    #[test]
    fn test_unset_optional_settings() {
        let vars = env(&[("MIMIRTOOL_ADDRESS", "http://mimir:9009")]);
        let settings = ConnectionSettings::resolve(&ProviderConfig::default(), &vars).unwrap();
        assert_eq!(settings.tenant_id, None);
        assert_eq!(settings.api_key, None);
        assert_eq!(settings.tls_ca_path, None);
        assert!(!settings.insecure_skip_verify);
        assert_eq!(settings.prometheus_http_prefix, "/prometheus");
        assert_eq!(settings.alertmanager_http_prefix, "/alertmanager");
    }

    #[test]
    fn test_missing_address() {
        let result = ConnectionSettings::resolve(&ProviderConfig::default(), &env(&[]));
        assert_eq!(result.unwrap_err(), ConfigError::MissingAddress);
    }

    #[test]
    fn test_explicit_empty_address_overrides_env() {
        let config = ProviderConfig::default()
            .with_string(Setting::Address, AttrValue::Known(String::new()));
        let vars = env(&[("MIMIRTOOL_ADDRESS", "http://mimir:9009")]);

        let err = ConnectionSettings::resolve(&config, &vars).unwrap_err();
        assert_eq!(err, ConfigError::MissingAddress);
        let diag = err.to_diagnostic();
        assert_eq!(diag.summary, "Missing Mimir URL");
        assert_eq!(diag.attribute, Some(AttributePath::root("address")));
    }

    #[test]
    fn test_unknown_address() {
        let config = ProviderConfig::default().with_string(Setting::Address, AttrValue::Unknown);
        let vars = env(&[("MIMIRTOOL_ADDRESS", "http://mimir:9009")]);

        let err = ConnectionSettings::resolve(&config, &vars).unwrap_err();
        assert_eq!(
            err,
            ConfigError::UnknownValue {
                setting: Setting::Address
            }
        );
        assert!(err.to_string().contains("set the value statically"));
        assert_eq!(err.summary(), "Unknown Mimir API address");
    }

    #[test]
    fn test_insecure_skip_verify_resolution() {
        let base = ("MIMIRTOOL_ADDRESS", "http://mimir:9009");
        let config = ProviderConfig::default();

        let settings = ConnectionSettings::resolve(&config, &env(&[base])).unwrap();
        assert!(!settings.insecure_skip_verify);

        let vars = env(&[base, ("MIMIR_INSECURE_SKIP_VERIFY", "true")]);
        assert!(ConnectionSettings::resolve(&config, &vars).unwrap().insecure_skip_verify);

        let vars = env(&[
            base,
            ("MIMIRTOOL_INSECURE_SKIP_VERIFY", "0"),
            ("MIMIR_INSECURE_SKIP_VERIFY", "true"),
        ]);
        assert!(!ConnectionSettings::resolve(&config, &vars).unwrap().insecure_skip_verify);

        let vars = env(&[base, ("MIMIRTOOL_INSECURE_SKIP_VERIFY", "yes please")]);
        assert!(!ConnectionSettings::resolve(&config, &vars).unwrap().insecure_skip_verify);

        let explicit = config.with_insecure_skip_verify(AttrValue::Known(true));
        let vars = env(&[base, ("MIMIRTOOL_INSECURE_SKIP_VERIFY", "false")]);
        assert!(ConnectionSettings::resolve(&explicit, &vars).unwrap().insecure_skip_verify);
    }

    #[test]
    fn test_parse_bool() {
        for raw in ["1", "t", "T", "TRUE", "true", "True"] {
            assert_eq!(parse_bool(raw), Some(true), "{raw}");
        }
        for raw in ["0", "f", "F", "FALSE", "false", "False"] {
            assert_eq!(parse_bool(raw), Some(false), "{raw}");
        }
        assert_eq!(parse_bool(""), None);
        assert_eq!(parse_bool("yes"), None);
    }

    #[test]
    fn test_sensitive_values_are_redacted() {
        let vars = env(&[
            ("MIMIRTOOL_ADDRESS", "http://mimir:9009"),
            ("MIMIRTOOL_API_KEY", "very-secret-key"),
            ("MIMIRTOOL_AUTH_TOKEN", "very-secret-token"),
        ]);
        let settings = ConnectionSettings::resolve(&ProviderConfig::default(), &vars).unwrap();

        let printed = format!("{settings:?}");
        assert!(!printed.contains("very-secret-key"));
        assert!(!printed.contains("very-secret-token"));
        assert!(printed.contains("***"));
        assert_eq!(
            settings.auth_token.as_ref().map(Sensitive::expose),
            Some("very-secret-token")
        );
    }

    #[test]
    fn test_from_object_type_errors() {
        let mut object = Object::new();
        object.insert("address".into(), crate::framework::Value::Bool(true));
        object.insert("insecure_skip_verify".into(), "true".into());

        let diags = ProviderConfig::from_object(&object).unwrap_err();
        assert_eq!(diags.errors().count(), 2);
    }
}
