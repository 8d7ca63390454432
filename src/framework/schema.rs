use std::collections::BTreeMap;

/// Attribute value types understood by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeType {
    String,
    Bool,
    Map(Box<AttributeType>),
}

/// Schema entry for a single attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub attr_type: AttributeType,
    pub description: String,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    /// Sensitive values are never shown by the host in plans or logs
    pub sensitive: bool,
}

impl Attribute {
    fn new(attr_type: AttributeType) -> Self {
        Self {
            attr_type,
            description: String::new(),
            required: false,
            optional: false,
            computed: false,
            sensitive: false,
        }
    }

    pub fn required(attr_type: AttributeType) -> Self {
        Self {
            required: true,
            ..Self::new(attr_type)
        }
    }

    pub fn optional(attr_type: AttributeType) -> Self {
        Self {
            optional: true,
            ..Self::new(attr_type)
        }
    }

    /// Read only attribute set by the provider
    pub fn computed(attr_type: AttributeType) -> Self {
        Self {
            computed: true,
            ..Self::new(attr_type)
        }
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Schema of a provider configuration block or of a resource type
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    pub description: String,
    pub attributes: BTreeMap<String, Attribute>,
}

impl Schema {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: &str, attribute: Attribute) -> Self {
        self.attributes.insert(name.to_string(), attribute);
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }
}
