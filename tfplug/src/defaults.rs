//! Default value providers for attributes
//!
//! Defaults are evaluated during planning for optional+computed attributes that
//! the configuration leaves null.
//!
//! ```no_run
//! use tfplug::schema::{AttributeBuilder, AttributeType};
//! use tfplug::defaults::StaticDefault;
//!
//! let ttl = AttributeBuilder::new("ttl", AttributeType::Number)
//!     .optional()
//!     .computed()
//!     .default(StaticDefault::number(3600.0))
//!     .build();
//! ```

use crate::schema::{AttributeDefault, DefaultRequest, DefaultResponse};
use crate::types::{Dynamic, DynamicValue};

/// StaticDefault provides a static default value
pub struct StaticDefault {
    value: Dynamic,
}

impl StaticDefault {
    pub fn create(value: Dynamic) -> Self {
        Self { value }
    }

    pub fn string(value: &str) -> Self {
        Self::create(Dynamic::String(value.to_string()))
    }

    pub fn number(value: f64) -> Self {
        Self::create(Dynamic::Number(value))
    }

    pub fn bool(value: bool) -> Self {
        Self::create(Dynamic::Bool(value))
    }
}

impl AttributeDefault for StaticDefault {
    fn description(&self) -> String {
        format!("static default value: {:?}", self.value)
    }

    fn default_value(&self, _request: DefaultRequest) -> DefaultResponse {
        DefaultResponse {
            value: DynamicValue::new(self.value.clone()),
        }
    }
}
