use crate::schema::{Validator, ValidatorRequest, ValidatorResponse};
use crate::types::{Diagnostic, Dynamic};

pub struct StringLengthValidator {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl StringLengthValidator {
    pub fn between(min: usize, max: usize) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn at_least(min: usize) -> Self {
        Self {
            min: Some(min),
            max: None,
        }
    }
}

impl Validator for StringLengthValidator {
    fn description(&self) -> String {
        match (self.min, self.max) {
            (Some(min), Some(max)) => format!("string length must be between {} and {}", min, max),
            (Some(min), None) => format!("string length must be at least {}", min),
            (None, Some(max)) => format!("string length must be at most {}", max),
            (None, None) => "any string length".to_string(),
        }
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let mut diagnostics = Vec::new();

        if let Some(s) = request.config_value.value.as_str() {
            let len = s.chars().count();
            if let Some(min) = self.min {
                if len < min {
                    diagnostics.push(
                        Diagnostic::error(
                            format!("{} must have minimum length of {}", request.path, min),
                            format!("Got length {}", len),
                        )
                        .with_attribute(request.path.clone()),
                    );
                }
            }
            if let Some(max) = self.max {
                if len > max {
                    diagnostics.push(
                        Diagnostic::error(
                            format!("{} must have maximum length of {}", request.path, max),
                            format!("Got length {}", len),
                        )
                        .with_attribute(request.path.clone()),
                    );
                }
            }
        }

        ValidatorResponse { diagnostics }
    }
}

/// Restricts a string attribute to a fixed set of values
pub struct StringOneOfValidator {
    pub values: Vec<String>,
}

impl StringOneOfValidator {
    pub fn new(values: &[&str]) -> Self {
        Self {
            values: values.iter().map(|v| v.to_string()).collect(),
        }
    }
}

impl Validator for StringOneOfValidator {
    fn description(&self) -> String {
        format!("value must be one of: {}", self.values.join(", "))
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let mut diagnostics = Vec::new();

        if let Some(s) = request.config_value.value.as_str() {
            if !self.values.iter().any(|v| v == s) {
                diagnostics.push(
                    Diagnostic::error(
                        format!("Invalid value for {}", request.path),
                        format!(
                            "Value '{}' is not one of: {}",
                            s,
                            self.values.join(", ")
                        ),
                    )
                    .with_attribute(request.path),
                );
            }
        }

        ValidatorResponse { diagnostics }
    }
}

pub struct StringPatternValidator {
    pub pattern: regex::Regex,
    pub description: String,
}

impl StringPatternValidator {
    pub fn new(pattern: regex::Regex, description: &str) -> Self {
        Self {
            pattern,
            description: description.to_string(),
        }
    }
}

impl Validator for StringPatternValidator {
    fn description(&self) -> String {
        format!("value must match {}", self.description)
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let mut diagnostics = Vec::new();

        if let Some(s) = request.config_value.value.as_str() {
            if !self.pattern.is_match(s) {
                diagnostics.push(
                    Diagnostic::error(
                        format!("{} must match {}", request.path, self.description),
                        format!("Value '{}' does not match pattern", s),
                    )
                    .with_attribute(request.path),
                );
            }
        }

        ValidatorResponse { diagnostics }
    }
}

pub struct NumberRangeValidator {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl NumberRangeValidator {
    pub fn between(min: f64, max: f64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn at_least(min: f64) -> Self {
        Self {
            min: Some(min),
            max: None,
        }
    }
}

impl Validator for NumberRangeValidator {
    fn description(&self) -> String {
        match (self.min, self.max) {
            (Some(min), Some(max)) => format!("value must be between {} and {}", min, max),
            (Some(min), None) => format!("value must be at least {}", min),
            (None, Some(max)) => format!("value must be at most {}", max),
            (None, None) => "any number".to_string(),
        }
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let mut diagnostics = Vec::new();

        if let Some(n) = request.config_value.value.as_number() {
            if let Some(min) = self.min {
                if n < min {
                    diagnostics.push(
                        Diagnostic::error(
                            format!("{} must be at least {}", request.path, min),
                            format!("Got {}", n),
                        )
                        .with_attribute(request.path.clone()),
                    );
                }
            }
            if let Some(max) = self.max {
                if n > max {
                    diagnostics.push(
                        Diagnostic::error(
                            format!("{} must be at most {}", request.path, max),
                            format!("Got {}", n),
                        )
                        .with_attribute(request.path.clone()),
                    );
                }
            }
        }

        ValidatorResponse { diagnostics }
    }
}

pub struct ListLengthValidator {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl ListLengthValidator {
    pub fn at_least(min: usize) -> Self {
        Self {
            min: Some(min),
            max: None,
        }
    }
}

impl Validator for ListLengthValidator {
    fn description(&self) -> String {
        match (self.min, self.max) {
            (Some(min), Some(max)) => format!("list must have between {} and {} items", min, max),
            (Some(min), None) => format!("list must have at least {} items", min),
            (None, Some(max)) => format!("list must have at most {} items", max),
            (None, None) => "any list length".to_string(),
        }
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let mut diagnostics = Vec::new();

        if let Dynamic::List(items) = &request.config_value.value {
            if let Some(min) = self.min {
                if items.len() < min {
                    diagnostics.push(
                        Diagnostic::error(
                            format!("{} must have at least {} items", request.path, min),
                            format!("Got {} items", items.len()),
                        )
                        .with_attribute(request.path.clone()),
                    );
                }
            }
            if let Some(max) = self.max {
                if items.len() > max {
                    diagnostics.push(
                        Diagnostic::error(
                            format!("{} must have at most {} items", request.path, max),
                            format!("Got {} items", items.len()),
                        )
                        .with_attribute(request.path.clone()),
                    );
                }
            }
        }

        ValidatorResponse { diagnostics }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AttributePath, DynamicValue};

    fn run(validator: &dyn Validator, value: Dynamic) -> Vec<Diagnostic> {
        validator
            .validate(ValidatorRequest {
                config_value: DynamicValue::new(value),
                path: AttributePath::new("field"),
            })
            .diagnostics
    }

    #[test]
    fn string_length_validator_accepts_valid_length() {
        let validator = StringLengthValidator::between(3, 10);
        assert!(run(&validator, Dynamic::String("hello".to_string())).is_empty());
    }

    #[test]
    fn string_length_validator_rejects_too_short() {
        let validator = StringLengthValidator::at_least(5);
        let diags = run(&validator, Dynamic::String("hi".to_string()));

        assert_eq!(diags.len(), 1);
        assert!(diags[0].summary.contains("minimum length"));
        assert_eq!(diags[0].attribute, Some(AttributePath::new("field")));
    }

    #[test]
    fn string_one_of_rejects_unlisted_value() {
        let validator = StringOneOfValidator::new(&["A", "AAAA", "CNAME"]);

        assert!(run(&validator, Dynamic::String("CNAME".to_string())).is_empty());

        let diags = run(&validator, Dynamic::String("cname".to_string()));
        assert_eq!(diags.len(), 1);
        assert!(diags[0].detail.contains("A, AAAA, CNAME"));
    }

    #[test]
    fn string_pattern_validator_rejects_non_matching() {
        let validator = StringPatternValidator::new(
            regex::Regex::new(r"^[^@\s]+@[^@\s]+$").unwrap(),
            "an email address",
        );

        assert!(run(&validator, Dynamic::String("ops@example.com".to_string())).is_empty());

        let diags = run(&validator, Dynamic::String("invalid".to_string()));
        assert_eq!(diags.len(), 1);
        assert!(diags[0].summary.contains("an email address"));
    }

    #[test]
    fn number_range_validator_checks_both_bounds() {
        let validator = NumberRangeValidator::between(1.0, 65535.0);

        assert!(run(&validator, Dynamic::Number(443.0)).is_empty());
        assert_eq!(run(&validator, Dynamic::Number(0.0)).len(), 1);
        assert_eq!(run(&validator, Dynamic::Number(70000.0)).len(), 1);
    }

    #[test]
    fn list_length_validator_rejects_too_few_items() {
        let validator = ListLengthValidator::at_least(1);
        let diags = run(&validator, Dynamic::List(vec![]));

        assert_eq!(diags.len(), 1);
        assert!(diags[0].summary.contains("at least 1 items"));
    }

    #[test]
    fn validators_ignore_other_types() {
        let validator = NumberRangeValidator::at_least(60.0);
        assert!(run(&validator, Dynamic::String("3600".to_string())).is_empty());
    }
}
