use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Alertmanager configuration payload exchanged with Mimir
///
/// Mimir stores exactly one of these per tenant. Pushing a new one overwrites
/// the previous configuration and its templates.
///
/// See: <https://grafana.com/docs/mimir/latest/references/http-api/#alertmanager>
///
/// # Example
///
/// ```rust
/// use mimirtool_provider::AlertmanagerUserConfig;
///
/// let config = AlertmanagerUserConfig::new("route:\n  receiver: default\n")
///     .with_template("default.tmpl", "{{ define \"title\" }}alert{{ end }}");
/// assert_eq!(config.template_files.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertmanagerUserConfig {
    /// Template name to template body
    #[serde(default)]
    pub template_files: BTreeMap<String, String>,

    /// The Alertmanager configuration document, kept verbatim
    #[serde(default)]
    pub alertmanager_config: String,
}

impl AlertmanagerUserConfig {
    pub fn new(alertmanager_config: &str) -> Self {
        Self {
            template_files: BTreeMap::new(),
            alertmanager_config: alertmanager_config.to_string(),
        }
    }

    /// Add a template
    pub fn with_template(mut self, name: &str, body: &str) -> Self {
        self.template_files
            .insert(name.to_string(), body.to_string());
        self
    }

    /// Replace all templates
    pub fn with_templates(mut self, templates: BTreeMap<String, String>) -> Self {
        self.template_files = templates;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_keeps_config_verbatim() {
        let config = AlertmanagerUserConfig::new("route:\n  receiver: default\n")
            .with_template("a.tmpl", "{{ define \"a\" }}A{{ end }}");

        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: AlertmanagerUserConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.alertmanager_config, "route:\n  receiver: default\n");
        assert_eq!(
            parsed.template_files.get("a.tmpl"),
            Some(&"{{ define \"a\" }}A{{ end }}".to_string())
        );
    }

    #[test]
    fn test_deserialize_mimir_response() {
        let body = r#"
template_files:
  default.tmpl: |
    {{ define "title" }}hello{{ end }}
alertmanager_config: |
  route:
    receiver: empty
  receivers:
    - name: empty
"#;
        let config: AlertmanagerUserConfig = serde_yaml::from_str(body).unwrap();
        assert!(config.alertmanager_config.starts_with("route:\n"));
        assert!(config.alertmanager_config.contains("- name: empty"));
        assert_eq!(
            config.template_files["default.tmpl"],
            "{{ define \"title\" }}hello{{ end }}\n"
        );
    }

    #[test]
    fn test_deserialize_without_templates() {
        let config: AlertmanagerUserConfig =
            serde_yaml::from_str("alertmanager_config: 'route: {}'\n").unwrap();
        assert!(config.template_files.is_empty());
        assert_eq!(config.alertmanager_config, "route: {}");
    }
}
