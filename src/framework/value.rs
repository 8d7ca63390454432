use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use super::diagnostics::Diagnostic;

/// Attribute name to value mapping used for provider configuration, plans and
/// persisted resource state.
pub type Object = BTreeMap<String, Value>;

/// A typed value as handed over by the host runtime
///
/// `Unknown` marks a value that the host cannot resolve yet because it depends
/// on another resource that has not been applied.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Unknown,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Name of the value's type, used in decode diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Unknown => "unknown",
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Value::Unknown)
    }

    /// Build a map value from string pairs
    pub fn string_map<K, V, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), Value::String(v.into())))
                .collect(),
        )
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<Option<String>> for Value {
    fn from(value: Option<String>) -> Self {
        value.map(Value::String).unwrap_or(Value::Null)
    }
}

/// JSON has no notion of unknown values, so a converted document is always
/// fully known. JSON objects become maps.
impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(fields) => {
                Value::Map(fields.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

/// Convert a JSON object into an attribute [`Object`]
///
/// Returns `None` when the document is not a JSON object.
pub fn object_from_json(value: serde_json::Value) -> Option<Object> {
    match Value::from(value) {
        Value::Map(fields) => Some(fields),
        _ => None,
    }
}

/// A decoded attribute value that keeps the null/unknown distinction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue<T> {
    Null,
    Unknown,
    Known(T),
}

impl<T> AttrValue<T> {
    pub fn is_null(&self) -> bool {
        matches!(self, AttrValue::Null)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, AttrValue::Unknown)
    }

    /// The value when known, `None` for null and unknown
    pub fn known(&self) -> Option<&T> {
        match self {
            AttrValue::Known(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_known(self) -> Option<T> {
        match self {
            AttrValue::Known(value) => Some(value),
            _ => None,
        }
    }
}

/// Step in an [`AttributePath`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathStep {
    Attribute(String),
    MapKey(String),
}

/// Location of an attribute, or of an element inside a map attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributePath {
    steps: Vec<PathStep>,
}

impl AttributePath {
    pub fn root(name: &str) -> Self {
        Self {
            steps: vec![PathStep::Attribute(name.to_string())],
        }
    }

    pub fn key(mut self, key: &str) -> Self {
        self.steps.push(PathStep::MapKey(key.to_string()));
        self
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }
}

impl Display for AttributePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            match step {
                PathStep::Attribute(name) if i == 0 => write!(f, "{name}")?,
                PathStep::Attribute(name) => write!(f, ".{name}")?,
                PathStep::MapKey(key) => write!(f, "[{key:?}]")?,
            }
        }
        Ok(())
    }
}

fn type_mismatch(path: AttributePath, expected: &str, got: &Value) -> Diagnostic {
    Diagnostic::attribute_error(
        path.clone(),
        "Invalid Attribute Value Type",
        format!(
            "Attribute {path} must be a {expected}, got a {} value.",
            got.type_name()
        ),
    )
}

/// Decode a string attribute. A missing attribute decodes as null.
pub fn get_string(object: &Object, name: &str) -> Result<AttrValue<String>, Diagnostic> {
    match object.get(name) {
        None | Some(Value::Null) => Ok(AttrValue::Null),
        Some(Value::Unknown) => Ok(AttrValue::Unknown),
        Some(Value::String(s)) => Ok(AttrValue::Known(s.clone())),
        Some(other) => Err(type_mismatch(AttributePath::root(name), "string", other)),
    }
}

/// Decode a bool attribute. A missing attribute decodes as null.
pub fn get_bool(object: &Object, name: &str) -> Result<AttrValue<bool>, Diagnostic> {
    match object.get(name) {
        None | Some(Value::Null) => Ok(AttrValue::Null),
        Some(Value::Unknown) => Ok(AttrValue::Unknown),
        Some(Value::Bool(b)) => Ok(AttrValue::Known(*b)),
        Some(other) => Err(type_mismatch(AttributePath::root(name), "bool", other)),
    }
}

/// Decode a map of strings attribute
///
/// Every element is checked; all offending elements are reported, none are
/// skipped.
pub fn get_string_map(
    object: &Object,
    name: &str,
) -> Result<AttrValue<BTreeMap<String, String>>, Vec<Diagnostic>> {
    let entries = match object.get(name) {
        None | Some(Value::Null) => return Ok(AttrValue::Null),
        Some(Value::Unknown) => return Ok(AttrValue::Unknown),
        Some(Value::Map(entries)) => entries,
        Some(other) => {
            return Err(vec![type_mismatch(
                AttributePath::root(name),
                "map of string",
                other,
            )])
        }
    };

    let mut decoded = BTreeMap::new();
    let mut errors = Vec::new();
    for (key, value) in entries {
        match value {
            Value::String(s) => {
                decoded.insert(key.clone(), s.clone());
            }
            other => errors.push(type_mismatch(
                AttributePath::root(name).key(key),
                "string",
                other,
            )),
        }
    }

    if errors.is_empty() {
        Ok(AttrValue::Known(decoded))
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_attribute_path_display() {
        let path = AttributePath::root("templates_config_yaml").key("default.tmpl");
        assert_eq!(path.to_string(), r#"templates_config_yaml["default.tmpl"]"#);
        assert_eq!(AttributePath::root("address").to_string(), "address");
    }

    #[test]
    fn test_get_string_states() {
        let mut object = Object::new();
        object.insert("known".into(), "value".into());
        object.insert("null".into(), Value::Null);
        object.insert("unknown".into(), Value::Unknown);

        assert_eq!(
            get_string(&object, "known").unwrap(),
            AttrValue::Known("value".to_string())
        );
        assert!(get_string(&object, "null").unwrap().is_null());
        assert!(get_string(&object, "missing").unwrap().is_null());
        assert!(get_string(&object, "unknown").unwrap().is_unknown());
    }

    #[test]
    fn test_get_string_wrong_type() {
        let mut object = Object::new();
        object.insert("address".into(), Value::Bool(true));

        let diag = get_string(&object, "address").unwrap_err();
        assert_eq!(diag.attribute, Some(AttributePath::root("address")));
        assert!(diag.detail.contains("got a bool value"));
    }

    #[test]
    fn test_get_string_map_reports_every_bad_element() {
        let object = object_from_json(json!({
            "templates": {"a": "ok", "b": 1, "c": false}
        }))
        .unwrap();

        let errors = get_string_map(&object, "templates").unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(
            errors[0].attribute,
            Some(AttributePath::root("templates").key("b"))
        );
        assert_eq!(
            errors[1].attribute,
            Some(AttributePath::root("templates").key("c"))
        );
    }

    #[test]
    fn test_get_string_map_null_and_known() {
        let object = object_from_json(json!({
            "empty": null,
            "templates": {"a.tmpl": "{{ define \"a\" }}{{ end }}"}
        }))
        .unwrap();

        assert!(get_string_map(&object, "empty").unwrap().is_null());
        let templates = get_string_map(&object, "templates")
            .unwrap()
            .into_known()
            .unwrap();
        assert_eq!(templates.len(), 1);
        assert!(templates["a.tmpl"].contains("define"));
    }

    #[test]
    fn test_object_from_json_rejects_non_objects() {
        assert!(object_from_json(json!("string")).is_none());
        assert!(object_from_json(json!([1, 2])).is_none());
    }
}
