//! Built-in attribute plan modifiers
//!
//! Plan modifiers run after defaults have been applied and computed attributes
//! have been marked unknown. They can rewrite the planned value or flag that a
//! change forces the resource to be replaced.

use crate::schema::{PlanModifier, PlanModifierRequest, PlanModifierResponse};
use crate::types::Dynamic;

/// Marks an attribute as requiring replacement when it changes
pub struct RequiresReplace;

impl PlanModifier for RequiresReplace {
    fn description(&self) -> String {
        "changing this attribute forces replacement".to_string()
    }

    fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse {
        let requires_replace = changed_on_update(&request);

        PlanModifierResponse {
            plan_value: request.plan_value,
            requires_replace,
            diagnostics: Vec::new(),
        }
    }
}

/// Like [`RequiresReplace`] but only when the predicate also agrees
pub struct RequiresReplaceIf<F>
where
    F: Fn(&PlanModifierRequest) -> bool + Send + Sync,
{
    predicate: F,
    description: String,
}

impl<F> RequiresReplaceIf<F>
where
    F: Fn(&PlanModifierRequest) -> bool + Send + Sync,
{
    pub fn new(predicate: F, description: impl Into<String>) -> Self {
        Self {
            predicate,
            description: description.into(),
        }
    }
}

impl<F> PlanModifier for RequiresReplaceIf<F>
where
    F: Fn(&PlanModifierRequest) -> bool + Send + Sync,
{
    fn description(&self) -> String {
        self.description.clone()
    }

    fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse {
        let requires_replace = changed_on_update(&request) && (self.predicate)(&request);

        PlanModifierResponse {
            plan_value: request.plan_value,
            requires_replace,
            diagnostics: Vec::new(),
        }
    }
}

/// Keeps the prior state value for a computed attribute whose plan is unknown
///
/// Used for identifiers and creation timestamps that never change after
/// create, so updates do not show them as "known after apply".
pub struct UseStateForUnknown;

impl PlanModifier for UseStateForUnknown {
    fn description(&self) -> String {
        "value does not change after creation".to_string()
    }

    fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse {
        let plan_value = if request.plan_value.is_unknown() && !request.state_value.is_null() {
            request.state_value.clone()
        } else {
            request.plan_value
        };

        PlanModifierResponse {
            plan_value,
            requires_replace: false,
            diagnostics: Vec::new(),
        }
    }
}

// A create never replaces, and neither does an unknown plan: the change may
// still turn out to be a no-op.
fn changed_on_update(request: &PlanModifierRequest) -> bool {
    !request.is_create
        && !request.plan_value.has_unknowns()
        && !values_equal(&request.state_value.value, &request.plan_value.value)
}

/// Structural equality with a tolerance for float round-off
pub fn values_equal(a: &Dynamic, b: &Dynamic) -> bool {
    match (a, b) {
        (Dynamic::Null, Dynamic::Null) => true,
        (Dynamic::Unknown, Dynamic::Unknown) => true,
        (Dynamic::Bool(a), Dynamic::Bool(b)) => a == b,
        (Dynamic::Number(a), Dynamic::Number(b)) => (a - b).abs() < f64::EPSILON,
        (Dynamic::String(a), Dynamic::String(b)) => a == b,
        (Dynamic::List(a), Dynamic::List(b)) => {
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| values_equal(x, y))
        }
        (Dynamic::Map(a), Dynamic::Map(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(k, v)| b.get(k).is_some_and(|v2| values_equal(v, v2)))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AttributePath, DynamicValue};

    fn request(state: Dynamic, plan: Dynamic, is_create: bool) -> PlanModifierRequest {
        PlanModifierRequest {
            config_value: DynamicValue::new(plan.clone()),
            state_value: DynamicValue::new(state),
            plan_value: DynamicValue::new(plan),
            path: AttributePath::new("region"),
            is_create,
        }
    }

    #[test]
    fn requires_replace_on_changed_value() {
        let response = RequiresReplace.modify(request(
            Dynamic::String("GRA7".to_string()),
            Dynamic::String("SBG5".to_string()),
            false,
        ));
        assert!(response.requires_replace);
    }

    #[test]
    fn requires_replace_ignores_create_and_unchanged() {
        let create = RequiresReplace.modify(request(
            Dynamic::Null,
            Dynamic::String("GRA7".to_string()),
            true,
        ));
        assert!(!create.requires_replace);

        let same = RequiresReplace.modify(request(
            Dynamic::String("GRA7".to_string()),
            Dynamic::String("GRA7".to_string()),
            false,
        ));
        assert!(!same.requires_replace);
    }

    #[test]
    fn requires_replace_when_unset_attribute_gets_a_value() {
        let set = RequiresReplace.modify(request(
            Dynamic::Null,
            Dynamic::String("net-1".to_string()),
            false,
        ));
        assert!(set.requires_replace);

        let still_unset = RequiresReplace.modify(request(Dynamic::Null, Dynamic::Null, false));
        assert!(!still_unset.requires_replace);
    }

    #[test]
    fn requires_replace_ignores_unknown_plan() {
        let response = RequiresReplace.modify(request(
            Dynamic::String("GRA7".to_string()),
            Dynamic::Unknown,
            false,
        ));
        assert!(!response.requires_replace);
    }

    #[test]
    fn requires_replace_if_consults_predicate() {
        let only_shrink = RequiresReplaceIf::new(
            |req: &PlanModifierRequest| {
                let old = req.state_value.value.as_number().unwrap_or(0.0);
                let new = req.plan_value.value.as_number().unwrap_or(0.0);
                new < old
            },
            "disk size can only grow",
        );

        let grow = only_shrink.modify(request(Dynamic::Number(80.0), Dynamic::Number(160.0), false));
        assert!(!grow.requires_replace);

        let shrink = only_shrink.modify(request(Dynamic::Number(160.0), Dynamic::Number(80.0), false));
        assert!(shrink.requires_replace);
    }

    #[test]
    fn use_state_for_unknown_copies_prior_value() {
        let response = UseStateForUnknown.modify(request(
            Dynamic::String("abc".to_string()),
            Dynamic::Unknown,
            false,
        ));
        assert_eq!(response.plan_value.value, Dynamic::String("abc".to_string()));

        let created = UseStateForUnknown.modify(request(Dynamic::Null, Dynamic::Unknown, true));
        assert!(created.plan_value.is_unknown());
    }

    #[test]
    fn values_equal_compares_nested() {
        let a = Dynamic::List(vec![Dynamic::Number(1.0), Dynamic::String("x".to_string())]);
        let b = Dynamic::List(vec![Dynamic::Number(1.0), Dynamic::String("x".to_string())]);
        assert!(values_equal(&a, &b));
        assert!(!values_equal(&a, &Dynamic::List(vec![])));
    }
}
