//! Schema types and builders for tfplug
//!
//! This module provides the schema system for defining resource and data source
//! schemas, including attribute types, nested blocks, and config validation.

use crate::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// AttributeType defines the type system for Terraform attributes
/// This must match Terraform's type system exactly
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeType {
    String,
    Number, // Always f64
    Bool,
    List(Box<AttributeType>),               // Ordered, allows duplicates
    Set(Box<AttributeType>),                // Unordered, no duplicates
    Map(Box<AttributeType>),                // String keys only
    Object(HashMap<String, AttributeType>), // Fixed structure
}

impl AttributeType {
    pub fn list_of(element: AttributeType) -> Self {
        AttributeType::List(Box::new(element))
    }

    pub fn set_of(element: AttributeType) -> Self {
        AttributeType::Set(Box::new(element))
    }

    pub fn map_of(element: AttributeType) -> Self {
        AttributeType::Map(Box::new(element))
    }

    pub fn object(fields: &[(&str, AttributeType)]) -> Self {
        AttributeType::Object(
            fields
                .iter()
                .map(|(name, ty)| (name.to_string(), ty.clone()))
                .collect(),
        )
    }

    /// cty JSON type notation: `"string"`, `["list","string"]`, `["object",{...}]`
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::{json, Value};

        match self {
            AttributeType::String => json!("string"),
            AttributeType::Number => json!("number"),
            AttributeType::Bool => json!("bool"),
            AttributeType::List(elem) => json!(["list", elem.to_json()]),
            AttributeType::Set(elem) => json!(["set", elem.to_json()]),
            AttributeType::Map(elem) => json!(["map", elem.to_json()]),
            AttributeType::Object(fields) => {
                let fields: serde_json::Map<String, Value> = fields
                    .iter()
                    .collect::<BTreeMap<_, _>>()
                    .into_iter()
                    .map(|(name, ty)| (name.clone(), ty.to_json()))
                    .collect();
                json!(["object", fields])
            }
        }
    }

    pub fn type_bytes(&self) -> Vec<u8> {
        self.to_json().to_string().into_bytes()
    }

    /// Null and unknown conform to every type
    pub fn matches(&self, value: &Dynamic) -> bool {
        match (self, value) {
            (_, Dynamic::Null) | (_, Dynamic::Unknown) => true,
            (AttributeType::String, Dynamic::String(_)) => true,
            (AttributeType::Number, Dynamic::Number(_)) => true,
            (AttributeType::Bool, Dynamic::Bool(_)) => true,
            (AttributeType::List(elem), Dynamic::List(items))
            | (AttributeType::Set(elem), Dynamic::List(items)) => {
                items.iter().all(|item| elem.matches(item))
            }
            (AttributeType::Map(elem), Dynamic::Map(map)) => {
                map.values().all(|item| elem.matches(item))
            }
            (AttributeType::Object(fields), Dynamic::Map(map)) => {
                map.keys().all(|key| fields.contains_key(key))
                    && fields
                        .iter()
                        .all(|(name, ty)| map.get(name).map_or(true, |v| ty.matches(v)))
            }
            _ => false,
        }
    }

    /// Reshapes a value to this type: object fields missing from the value
    /// become null and fields the type does not declare are dropped.
    pub fn conform(&self, value: &Dynamic) -> Dynamic {
        match (self, value) {
            (_, Dynamic::Null) | (_, Dynamic::Unknown) => value.clone(),
            (AttributeType::Object(fields), Dynamic::Map(map)) => Dynamic::Map(
                fields
                    .iter()
                    .map(|(name, ty)| {
                        let field = map.get(name).unwrap_or(&Dynamic::Null);
                        (name.clone(), ty.conform(field))
                    })
                    .collect(),
            ),
            (AttributeType::List(elem), Dynamic::List(items))
            | (AttributeType::Set(elem), Dynamic::List(items)) => {
                Dynamic::List(items.iter().map(|item| elem.conform(item)).collect())
            }
            (AttributeType::Map(elem), Dynamic::Map(map)) => Dynamic::Map(
                map.iter()
                    .map(|(key, item)| (key.clone(), elem.conform(item)))
                    .collect(),
            ),
            _ => value.clone(),
        }
    }

    fn describe(&self) -> String {
        self.to_json().to_string()
    }
}

/// Schema is returned by providers/resources/data sources
/// Version is used for state migration
#[derive(Debug, Clone)]
pub struct Schema {
    pub version: i64, // Increment when schema changes require migration
    pub block: Block, // Root block containing all attributes
}

impl Schema {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.block.attributes.iter().find(|a| a.name == name)
    }

    /// Shapes a state or plan value exactly like the schema's object type
    pub fn conform(&self, value: &DynamicValue) -> DynamicValue {
        DynamicValue::new(self.block.conform(&value.value))
    }

    /// Checks a configuration against the schema
    pub fn validate_config(&self, config: &DynamicValue) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        self.block
            .validate(&config.value, &AttributePath::root(), &mut diagnostics);
        diagnostics
    }
}

/// Block represents a configuration block
#[derive(Debug, Clone)]
pub struct Block {
    pub version: i64,
    pub attributes: Vec<Attribute>,
    pub block_types: Vec<NestedBlock>,
    pub description: String,
    pub description_kind: StringKind,
    pub deprecated: bool,
}

impl Block {
    fn empty() -> Self {
        Self {
            version: 0,
            attributes: Vec::new(),
            block_types: Vec::new(),
            description: String::new(),
            description_kind: StringKind::Plain,
            deprecated: false,
        }
    }

    pub fn conform(&self, value: &Dynamic) -> Dynamic {
        let map = match value {
            Dynamic::Map(map) => map,
            _ => return value.clone(),
        };

        let mut conformed = HashMap::new();
        for attr in &self.attributes {
            let field = map.get(&attr.name).unwrap_or(&Dynamic::Null);
            conformed.insert(attr.name.clone(), attr.r#type.conform(field));
        }
        for nested in &self.block_types {
            let field = map.get(&nested.type_name).unwrap_or(&Dynamic::Null);
            conformed.insert(nested.type_name.clone(), nested.conform(field));
        }
        Dynamic::Map(conformed)
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        let map = match value {
            Dynamic::Map(map) => map,
            Dynamic::Null | Dynamic::Unknown => return,
            other => {
                diagnostics.push(
                    Diagnostic::error(
                        "Invalid block value",
                        format!("Expected an object, got {}", other.type_name()),
                    )
                    .with_attribute(path.clone()),
                );
                return;
            }
        };

        for key in map.keys() {
            let known = self.attributes.iter().any(|a| &a.name == key)
                || self.block_types.iter().any(|b| &b.type_name == key);
            if !known {
                diagnostics.push(
                    Diagnostic::error(
                        "Unsupported argument",
                        format!("An argument named \"{}\" is not expected here", key),
                    )
                    .with_attribute(path.clone().attribute(key)),
                );
            }
        }

        for attr in &self.attributes {
            let attr_path = path.clone().attribute(&attr.name);
            let value = map.get(&attr.name).unwrap_or(&Dynamic::Null);

            if attr.required && value.is_null() {
                diagnostics.push(
                    Diagnostic::error(
                        "Missing required argument",
                        format!("The argument \"{}\" is required, but no definition was found", attr.name),
                    )
                    .with_attribute(attr_path),
                );
                continue;
            }

            if !attr.required && !attr.optional && attr.computed && !value.is_null() {
                diagnostics.push(
                    Diagnostic::error(
                        "Value for unconfigurable attribute",
                        format!("Can't configure a value for \"{}\": its value will be decided automatically", attr.name),
                    )
                    .with_attribute(attr_path),
                );
                continue;
            }

            if !attr.r#type.matches(value) {
                diagnostics.push(
                    Diagnostic::error(
                        "Incorrect attribute value type",
                        format!(
                            "Attribute \"{}\" expects {} but got {}",
                            attr.name,
                            attr.r#type.describe(),
                            value.type_name()
                        ),
                    )
                    .with_attribute(attr_path),
                );
                continue;
            }

            if value.is_null() || value.contains_unknown() {
                continue;
            }

            for validator in &attr.validators {
                let response = validator.validate(ValidatorRequest {
                    config_value: DynamicValue::new(value.clone()),
                    path: attr_path.clone(),
                });
                diagnostics.extend(response.diagnostics);
            }
        }

        for nested in &self.block_types {
            let value = map.get(&nested.type_name).unwrap_or(&Dynamic::Null);
            nested.validate(value, &path.clone().attribute(&nested.type_name), diagnostics);
        }
    }
}

/// Attribute represents a single configuration attribute
#[derive(Clone)]
pub struct Attribute {
    pub name: String,
    pub r#type: AttributeType,
    pub description: String,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub sensitive: bool,
    pub deprecated: bool,
    pub validators: Vec<Arc<dyn Validator>>,
    pub plan_modifiers: Vec<Arc<dyn PlanModifier>>,
    pub default: Option<Arc<dyn AttributeDefault>>,
}

// Manual Debug implementation since validators/modifiers don't implement Debug
impl std::fmt::Debug for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attribute")
            .field("name", &self.name)
            .field("type", &self.r#type)
            .field("required", &self.required)
            .field("optional", &self.optional)
            .field("computed", &self.computed)
            .field("sensitive", &self.sensitive)
            .field(
                "validators",
                &format!("{} validators", self.validators.len()),
            )
            .field(
                "plan_modifiers",
                &format!("{} plan modifiers", self.plan_modifiers.len()),
            )
            .field("default", &self.default.is_some())
            .finish()
    }
}

/// NestedBlock represents a nested configuration block
#[derive(Debug, Clone)]
pub struct NestedBlock {
    pub type_name: String,
    pub block: Block,
    pub nesting: NestingMode,
    pub min_items: i64,
    pub max_items: i64,
}

impl NestedBlock {
    fn conform(&self, value: &Dynamic) -> Dynamic {
        match (self.nesting, value) {
            (NestingMode::Single, _) => self.block.conform(value),
            (_, Dynamic::Null) => Dynamic::List(Vec::new()),
            (_, Dynamic::List(items)) => {
                Dynamic::List(items.iter().map(|item| self.block.conform(item)).collect())
            }
            _ => value.clone(),
        }
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        match (self.nesting, value) {
            (NestingMode::Single, _) => self.block.validate(value, path, diagnostics),
            (_, Dynamic::List(items)) => {
                let count = items.len() as i64;
                if count < self.min_items || (self.max_items > 0 && count > self.max_items) {
                    diagnostics.push(
                        Diagnostic::error(
                            "Invalid number of blocks",
                            format!(
                                "Block \"{}\" expects between {} and {} items, got {}",
                                self.type_name,
                                self.min_items,
                                if self.max_items > 0 { self.max_items.to_string() } else { "unlimited".to_string() },
                                count
                            ),
                        )
                        .with_attribute(path.clone()),
                    );
                }
                for (idx, item) in items.iter().enumerate() {
                    self.block
                        .validate(item, &path.clone().index(idx as i64), diagnostics);
                }
            }
            (_, Dynamic::Null) if self.min_items > 0 => diagnostics.push(
                Diagnostic::error(
                    "Missing required block",
                    format!("At least {} \"{}\" blocks are required", self.min_items, self.type_name),
                )
                .with_attribute(path.clone()),
            ),
            _ => {}
        }
    }
}

/// NestingMode defines how nested blocks are structured
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NestingMode {
    Single,
    List,
    Set,
}

/// StringKind represents the format of string values
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StringKind {
    Plain,
    Markdown,
}

/// Validator performs validation on attribute values during planning
/// Implement this for custom validation logic
pub trait Validator: Send + Sync {
    /// Human-readable description
    fn description(&self) -> String;
    /// Perform validation; only called for known, non-null values
    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse;
}

/// Request for validators
pub struct ValidatorRequest {
    pub config_value: DynamicValue,
    pub path: AttributePath,
}

/// Response from validators
pub struct ValidatorResponse {
    pub diagnostics: Vec<Diagnostic>,
}

/// PlanModifier modifies planned values during planning
/// Common uses: RequiresReplace, UseStateForUnknown
pub trait PlanModifier: Send + Sync {
    /// Human-readable description
    fn description(&self) -> String;
    /// Modify the planned value
    fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse;
}

/// Request for plan modifiers
pub struct PlanModifierRequest {
    pub config_value: DynamicValue,
    pub state_value: DynamicValue,
    pub plan_value: DynamicValue,
    pub path: AttributePath,
    /// True when the whole resource is being created
    pub is_create: bool,
}

/// Response from plan modifiers
pub struct PlanModifierResponse {
    pub plan_value: DynamicValue,
    pub requires_replace: bool,
    pub diagnostics: Vec<Diagnostic>,
}

/// Provides a value for optional+computed attributes left out of configuration
pub trait AttributeDefault: Send + Sync {
    /// Human-readable description
    fn description(&self) -> String;
    /// Provide default value
    fn default_value(&self, request: DefaultRequest) -> DefaultResponse;
}

/// Request for default values
pub struct DefaultRequest {
    pub path: AttributePath,
}

/// Response with default value
pub struct DefaultResponse {
    pub value: DynamicValue,
}

/// AttributeBuilder provides fluent API for building attributes
/// ALWAYS use this instead of constructing Attribute directly
pub struct AttributeBuilder {
    attribute: Attribute,
}

impl AttributeBuilder {
    /// Create a new attribute builder
    pub fn new(name: &str, type_: AttributeType) -> Self {
        Self {
            attribute: Attribute {
                name: name.to_string(),
                r#type: type_,
                description: String::new(),
                required: false,
                optional: false,
                computed: false,
                sensitive: false,
                deprecated: false,
                validators: Vec::new(),
                plan_modifiers: Vec::new(),
                default: None,
            },
        }
    }

    /// Set description
    pub fn description(mut self, desc: &str) -> Self {
        self.attribute.description = desc.to_string();
        self
    }

    /// Mark as required
    pub fn required(mut self) -> Self {
        self.attribute.required = true;
        self.attribute.optional = false;
        self
    }

    /// Mark as optional
    pub fn optional(mut self) -> Self {
        self.attribute.optional = true;
        self.attribute.required = false;
        self
    }

    /// Mark as computed
    pub fn computed(mut self) -> Self {
        self.attribute.computed = true;
        self
    }

    /// Mark as sensitive (hidden)
    pub fn sensitive(mut self) -> Self {
        self.attribute.sensitive = true;
        self
    }

    /// Mark as deprecated
    pub fn deprecated(mut self) -> Self {
        self.attribute.deprecated = true;
        self
    }

    /// Add validator
    pub fn validator<V: Validator + 'static>(mut self, validator: V) -> Self {
        self.attribute.validators.push(Arc::new(validator));
        self
    }

    /// Add plan modifier
    pub fn plan_modifier<M: PlanModifier + 'static>(mut self, modifier: M) -> Self {
        self.attribute.plan_modifiers.push(Arc::new(modifier));
        self
    }

    /// Set default; only honoured for optional+computed attributes
    pub fn default<D: AttributeDefault + 'static>(mut self, default: D) -> Self {
        self.attribute.default = Some(Arc::new(default));
        self
    }

    /// Finalize the attribute
    pub fn build(self) -> Attribute {
        self.attribute
    }
}

/// Builds a nested block (`check { ... }`)
pub struct NestedBlockBuilder {
    nested: NestedBlock,
}

impl NestedBlockBuilder {
    pub fn new(type_name: &str, nesting: NestingMode) -> Self {
        Self {
            nested: NestedBlock {
                type_name: type_name.to_string(),
                block: Block::empty(),
                nesting,
                min_items: 0,
                max_items: 0,
            },
        }
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.nested.block.description = desc.to_string();
        self
    }

    pub fn attribute(mut self, attr: Attribute) -> Self {
        self.nested.block.attributes.push(attr);
        self
    }

    pub fn min_items(mut self, min: i64) -> Self {
        self.nested.min_items = min;
        self
    }

    pub fn max_items(mut self, max: i64) -> Self {
        self.nested.max_items = max;
        self
    }

    pub fn build(self) -> NestedBlock {
        self.nested
    }
}

/// SchemaBuilder provides fluent API for building schemas
/// ALWAYS use this for consistency
pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    /// Create a new schema builder
    pub fn new() -> Self {
        Self {
            schema: Schema {
                version: 0,
                block: Block::empty(),
            },
        }
    }

    /// Set schema version
    pub fn version(mut self, version: i64) -> Self {
        self.schema.version = version;
        self.schema.block.version = version;
        self
    }

    /// Add attribute
    pub fn attribute(mut self, attr: Attribute) -> Self {
        self.schema.block.attributes.push(attr);
        self
    }

    /// Add nested block
    pub fn block(mut self, block: NestedBlock) -> Self {
        self.schema.block.block_types.push(block);
        self
    }

    /// Set description
    pub fn description(mut self, desc: &str) -> Self {
        self.schema.block.description = desc.to_string();
        self
    }

    /// Set description kind
    pub fn description_kind(mut self, kind: StringKind) -> Self {
        self.schema.block.description_kind = kind;
        self
    }

    /// Mark as deprecated
    pub fn deprecated(mut self) -> Self {
        self.schema.block.deprecated = true;
        self
    }

    /// Finalize the schema
    pub fn build(self) -> Schema {
        self.schema
    }
}

impl std::default::Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_schema() -> Schema {
        SchemaBuilder::new()
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("zone", AttributeType::String)
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("ttl", AttributeType::Number)
                    .optional()
                    .computed()
                    .build(),
            )
            .block(
                NestedBlockBuilder::new("check", NestingMode::List)
                    .attribute(
                        AttributeBuilder::new("url", AttributeType::String)
                            .optional()
                            .build(),
                    )
                    .max_items(1)
                    .build(),
            )
            .build()
    }

    #[test]
    fn attribute_builder_creates_required_string() {
        let attr = AttributeBuilder::new("name", AttributeType::String)
            .description("The name of the resource")
            .required()
            .build();

        assert_eq!(attr.name, "name");
        assert!(matches!(attr.r#type, AttributeType::String));
        assert!(attr.required);
        assert!(!attr.optional);
        assert_eq!(attr.description, "The name of the resource");
    }

    #[test]
    fn type_json_matches_cty_notation() {
        assert_eq!(AttributeType::String.type_bytes(), br#""string""#.to_vec());
        assert_eq!(
            AttributeType::list_of(AttributeType::String).type_bytes(),
            br#"["list","string"]"#.to_vec()
        );
        assert_eq!(
            AttributeType::object(&[
                ("urn", AttributeType::String),
                ("port", AttributeType::Number)
            ])
            .type_bytes(),
            br#"["object",{"port":"number","urn":"string"}]"#.to_vec()
        );
    }

    #[test]
    fn conform_fills_missing_and_drops_unknown_keys() {
        let schema = record_schema();
        let value = DynamicValue::new(Dynamic::Map(HashMap::from([
            ("zone".to_string(), Dynamic::String("example.com".to_string())),
            ("legacy".to_string(), Dynamic::Bool(true)),
        ])));

        let conformed = schema.conform(&value);
        let map = conformed.get_map(&AttributePath::root()).unwrap();

        assert_eq!(map.len(), 4);
        assert_eq!(map.get("id"), Some(&Dynamic::Null));
        assert_eq!(map.get("check"), Some(&Dynamic::List(vec![])));
        assert!(!map.contains_key("legacy"));
    }

    #[test]
    fn validation_reports_missing_required_and_unsupported() {
        let schema = record_schema();
        let config = DynamicValue::new(Dynamic::Map(HashMap::from([
            ("ttl".to_string(), Dynamic::String("soon".to_string())),
            ("bogus".to_string(), Dynamic::Null),
        ])));

        let diagnostics = schema.validate_config(&config);
        let summaries: Vec<_> = diagnostics.iter().map(|d| d.summary.as_str()).collect();

        assert!(summaries.contains(&"Missing required argument"));
        assert!(summaries.contains(&"Unsupported argument"));
        assert!(summaries.contains(&"Incorrect attribute value type"));
    }

    #[test]
    fn validation_rejects_configured_computed_only_attribute() {
        let schema = record_schema();
        let config = DynamicValue::new(Dynamic::Map(HashMap::from([
            ("zone".to_string(), Dynamic::String("example.com".to_string())),
            ("id".to_string(), Dynamic::String("42".to_string())),
        ])));

        let diagnostics = schema.validate_config(&config);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].summary, "Value for unconfigurable attribute");
    }

    #[test]
    fn validation_enforces_block_max_items() {
        let schema = record_schema();
        let check = Dynamic::Map(HashMap::from([(
            "url".to_string(),
            Dynamic::String("/".to_string()),
        )]));
        let config = DynamicValue::new(Dynamic::Map(HashMap::from([
            ("zone".to_string(), Dynamic::String("example.com".to_string())),
            ("check".to_string(), Dynamic::List(vec![check.clone(), check])),
        ])));

        let diagnostics = schema.validate_config(&config);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].summary, "Invalid number of blocks");
    }

    #[test]
    fn unknown_values_match_any_type() {
        assert!(AttributeType::Number.matches(&Dynamic::Unknown));
        assert!(AttributeType::set_of(AttributeType::String)
            .matches(&Dynamic::List(vec![Dynamic::Unknown])));
        assert!(!AttributeType::Bool.matches(&Dynamic::String("true".to_string())));
    }
}
