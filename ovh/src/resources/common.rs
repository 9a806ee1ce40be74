//! Plumbing shared by every resource and data source

use std::any::Any;
use std::sync::Arc;
use tfplug::data_source::ReadDataSourceResponse;
use tfplug::import::{invalid_import_id, split_import_id};
use tfplug::plan_modifier::{RequiresReplace, UseStateForUnknown};
use tfplug::resource::{
    CreateResourceResponse, DeleteResourceResponse, ImportResourceStateRequest,
    ImportResourceStateResponse, ImportedResource, ReadResourceResponse, UpdateResourceResponse,
};
use tfplug::schema::{Attribute, AttributeBuilder, AttributeType};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};

use crate::api::{ApiError, Client, WaitError};
use crate::provider_data::OvhProviderData;

/// Fallback for `service_name` on Public Cloud resources
pub const CLOUD_PROJECT_SERVICE_ENV: &str = "OVH_CLOUD_PROJECT_SERVICE";

/// Extracts [`OvhProviderData`] from what the provider's configure returned
///
/// Terraform configures resources before the provider during validation, so
/// missing data is not an error here.
pub fn configure_provider_data(
    provider_data: Option<Arc<dyn Any + Send + Sync>>,
) -> Result<Option<OvhProviderData>, Diagnostic> {
    match provider_data {
        None => Ok(None),
        Some(data) => data
            .downcast_ref::<OvhProviderData>()
            .cloned()
            .map(Some)
            .ok_or_else(|| {
                Diagnostic::error(
                    "Invalid provider data",
                    "Failed to extract provider data from configure request",
                )
            }),
    }
}

pub fn client(provider_data: &Option<OvhProviderData>) -> Result<&Client, Diagnostic> {
    provider_data
        .as_ref()
        .map(|data| data.client.as_ref())
        .ok_or_else(not_configured)
}

pub fn not_configured() -> Diagnostic {
    Diagnostic::error(
        "Provider not configured",
        "Provider data was not properly configured",
    )
}

pub fn api_diagnostic(summary: &str, error: &ApiError) -> Diagnostic {
    Diagnostic::error(summary, format!("API error: {}", error))
}

pub fn wait_diagnostic(summary: &str, error: &WaitError) -> Diagnostic {
    Diagnostic::error(summary, error.to_string())
}

pub fn missing_attribute(name: &str) -> Diagnostic {
    Diagnostic::error(
        format!("Missing {}", name),
        format!("The '{}' attribute is required", name),
    )
    .with_attribute(AttributePath::new(name))
}

/// Treats a 404 on delete as already gone
pub fn ignore_not_found(result: Result<(), ApiError>) -> Result<(), ApiError> {
    match result {
        Err(e) if e.is_not_found() => Ok(()),
        other => other,
    }
}

/// A failed create keeps the state only once the entity exists, so
/// Terraform can taint it instead of losing track of it
pub fn create_response(
    mut state: DynamicValue,
    result: Result<(), Diagnostic>,
) -> CreateResourceResponse {
    match result {
        Ok(()) => CreateResourceResponse {
            new_state: state,
            diagnostics: vec![],
        },
        Err(diagnostic) => {
            let new_state = if state.is_null_or_unknown_at(&AttributePath::new("id")) {
                DynamicValue::null()
            } else {
                state.unknowns_to_null();
                state
            };
            CreateResourceResponse {
                new_state,
                diagnostics: vec![diagnostic],
            }
        }
    }
}

/// `Ok(None)` drops the resource from state
pub fn read_response(
    current_state: DynamicValue,
    result: Result<Option<DynamicValue>, Diagnostic>,
) -> ReadResourceResponse {
    match result {
        Ok(new_state) => ReadResourceResponse {
            new_state,
            diagnostics: vec![],
        },
        Err(diagnostic) => ReadResourceResponse {
            new_state: Some(current_state),
            diagnostics: vec![diagnostic],
        },
    }
}

pub fn update_response(
    prior_state: DynamicValue,
    new_state: DynamicValue,
    result: Result<(), Diagnostic>,
) -> UpdateResourceResponse {
    match result {
        Ok(()) => UpdateResourceResponse {
            new_state,
            diagnostics: vec![],
        },
        Err(diagnostic) => UpdateResourceResponse {
            new_state: prior_state,
            diagnostics: vec![diagnostic],
        },
    }
}

pub fn delete_response(result: Result<(), Diagnostic>) -> DeleteResourceResponse {
    DeleteResourceResponse {
        diagnostics: result.err().into_iter().collect(),
    }
}

/// Data sources report null state alongside any error
pub fn data_source_response(result: Result<DynamicValue, Diagnostic>) -> ReadDataSourceResponse {
    match result {
        Ok(state) => ReadDataSourceResponse {
            state,
            diagnostics: vec![],
        },
        Err(diagnostic) => ReadDataSourceResponse {
            state: DynamicValue::null(),
            diagnostics: vec![diagnostic],
        },
    }
}

pub fn configure_response(
    target: &mut Option<OvhProviderData>,
    provider_data: Option<Arc<dyn Any + Send + Sync>>,
) -> Vec<Diagnostic> {
    match configure_provider_data(provider_data) {
        Ok(Some(data)) => {
            *target = Some(data);
            vec![]
        }
        Ok(None) => vec![],
        Err(diagnostic) => vec![diagnostic],
    }
}

/// Adapts a GET result to a waiter refresh: 404 reads as deleted
pub fn refresh_result<T>(
    result: Result<T, ApiError>,
    status: impl Fn(&T) -> String,
) -> Result<Option<(T, String)>, ApiError> {
    match result {
        Ok(value) => {
            let status = status(&value);
            Ok(Some((value, status)))
        }
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Imports a composite ID, one segment per attribute name
pub fn import_composite_id(
    request: &ImportResourceStateRequest,
    separator: char,
    attributes: &[&str],
    expected: &str,
) -> ImportResourceStateResponse {
    let Some(segments) = split_import_id(&request.id, separator, attributes.len()) else {
        return ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![invalid_import_id(&request.id, expected)],
        };
    };

    let mut state = DynamicValue::object();
    for (name, segment) in attributes.iter().zip(segments) {
        let _ = state.set_string(&AttributePath::new(name), segment);
    }
    ImportResourceStateResponse {
        imported_resources: vec![ImportedResource {
            type_name: request.type_name.clone(),
            state,
        }],
        diagnostics: vec![],
    }
}

pub fn required_string(value: &DynamicValue, name: &str) -> Result<String, Diagnostic> {
    value
        .get_string(&AttributePath::new(name))
        .map_err(|_| missing_attribute(name))
}

/// Reads an attribute holding a numeric API identifier as a string
pub fn numeric_id(value: &DynamicValue, name: &str) -> Result<i64, Diagnostic> {
    let raw = required_string(value, name)?;
    raw.parse().map_err(|_| {
        Diagnostic::error(
            "Invalid identifier",
            format!("'{}' must be numeric, got '{}'", name, raw),
        )
        .with_attribute(AttributePath::new(name))
    })
}

pub fn opt_string(value: &DynamicValue, name: &str) -> Option<String> {
    value.get_string(&AttributePath::new(name)).ok()
}

pub fn opt_i64(value: &DynamicValue, name: &str) -> Option<i64> {
    value.get_i64(&AttributePath::new(name)).ok()
}

pub fn opt_bool(value: &DynamicValue, name: &str) -> Option<bool> {
    value.get_bool(&AttributePath::new(name)).ok()
}

pub fn opt_string_list(value: &DynamicValue, name: &str) -> Option<Vec<String>> {
    value.get_string_list(&AttributePath::new(name)).ok()
}

/// `service_name` from the given value, else the environment
///
/// The resolved name is written back so the computed attribute is known.
pub fn service_name(value: &mut DynamicValue) -> Result<String, Diagnostic> {
    let service_name = opt_string(value, "service_name")
        .or_else(|| std::env::var(CLOUD_PROJECT_SERVICE_ENV).ok())
        .filter(|name| !name.is_empty())
        .ok_or_else(|| {
            Diagnostic::error(
                "Missing service_name",
                format!(
                    "Set 'service_name' or the {} environment variable",
                    CLOUD_PROJECT_SERVICE_ENV
                ),
            )
            .with_attribute(AttributePath::new("service_name"))
        })?;
    let _ = value.set_string(&AttributePath::new("service_name"), service_name.clone());
    Ok(service_name)
}

pub fn service_name_attribute(description: &str) -> Attribute {
    AttributeBuilder::new("service_name", AttributeType::String)
        .description(description)
        .optional()
        .computed()
        .plan_modifier(UseStateForUnknown)
        .plan_modifier(RequiresReplace)
        .build()
}

/// Server-assigned identifier that never changes
pub fn id_attribute(description: &str) -> Attribute {
    AttributeBuilder::new("id", AttributeType::String)
        .description(description)
        .computed()
        .plan_modifier(UseStateForUnknown)
        .build()
}

pub fn computed(name: &str, type_: AttributeType, description: &str) -> Attribute {
    AttributeBuilder::new(name, type_)
        .description(description)
        .computed()
        .build()
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::api::Credentials;
    use serial_test::serial;

    #[test]
    fn missing_provider_data_is_not_an_error() {
        assert!(configure_provider_data(None).unwrap().is_none());
    }

    #[test]
    fn wrong_provider_data_type_is_reported() {
        let data: Arc<dyn Any + Send + Sync> = Arc::new(42u32);
        let err = configure_provider_data(Some(data)).err().unwrap();
        assert_eq!(err.summary, "Invalid provider data");
    }

    #[test]
    fn provider_data_is_extracted() {
        let client = Client::new(
            "https://eu.api.ovh.com/1.0",
            Credentials::AccessToken("token".to_string()),
        )
        .unwrap();
        let data: Arc<dyn Any + Send + Sync> = Arc::new(OvhProviderData::new(client));

        let extracted = configure_provider_data(Some(data)).unwrap();
        assert_eq!(
            self::client(&extracted).unwrap().endpoint(),
            "https://eu.api.ovh.com/1.0"
        );
        assert_eq!(
            self::client(&None).err().unwrap().summary,
            "Provider not configured"
        );
    }

    #[test]
    #[serial]
    fn service_name_falls_back_to_environment() {
        std::env::set_var(CLOUD_PROJECT_SERVICE_ENV, "project-from-env");
        let mut state = DynamicValue::object();

        assert_eq!(service_name(&mut state).unwrap(), "project-from-env");
        assert_eq!(
            state.get_string(&AttributePath::new("service_name")).unwrap(),
            "project-from-env"
        );

        let mut explicit = DynamicValue::object();
        let _ = explicit.set_string(&AttributePath::new("service_name"), "explicit".to_string());
        assert_eq!(service_name(&mut explicit).unwrap(), "explicit");
        std::env::remove_var(CLOUD_PROJECT_SERVICE_ENV);
    }

    #[test]
    #[serial]
    fn service_name_is_required_without_environment() {
        std::env::remove_var(CLOUD_PROJECT_SERVICE_ENV);
        let mut state = DynamicValue::object();
        let err = service_name(&mut state).err().unwrap();
        assert_eq!(err.summary, "Missing service_name");
    }

    #[test]
    fn composite_import_fills_each_attribute() {
        let request = ImportResourceStateRequest {
            type_name: "ovh_cloud_project_kube_nodepool".to_string(),
            id: "abc123/kube-1/pool-1".to_string(),
        };
        let response = import_composite_id(
            &request,
            '/',
            &["service_name", "kube_id", "id"],
            "service_name/kube_id/id",
        );

        let state = &response.imported_resources[0].state;
        assert_eq!(state.get_string(&AttributePath::new("kube_id")).unwrap(), "kube-1");
        assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), "pool-1");

        let bad = ImportResourceStateRequest {
            type_name: request.type_name.clone(),
            id: "abc123/kube-1".to_string(),
        };
        let response = import_composite_id(&bad, '/', &["service_name", "kube_id", "id"], "x");
        assert!(response.imported_resources.is_empty());
        assert_eq!(response.diagnostics[0].summary, "Invalid import ID");
    }

    #[test]
    fn failed_create_keeps_state_only_with_an_id() {
        let mut planned = DynamicValue::object();
        let _ = planned.mark_unknown(&AttributePath::new("id"));
        let response = create_response(planned, Err(not_configured()));
        assert!(response.new_state.is_null());

        let mut created = DynamicValue::object();
        let _ = created.set_string(&AttributePath::new("id"), "kube-1".to_string());
        let _ = created.mark_unknown(&AttributePath::new("url"));
        let response = create_response(created, Err(not_configured()));
        assert!(!response.new_state.has_unknowns());
        assert_eq!(
            response.new_state.get_string(&AttributePath::new("id")).unwrap(),
            "kube-1"
        );
    }

    #[test]
    fn not_found_is_ignored_on_delete() {
        let not_found = ApiError::ApiError {
            status: 404,
            class: "Client::NotFound".to_string(),
            message: "gone".to_string(),
            query_id: "EU.ext-1.abc".to_string(),
        };
        assert!(ignore_not_found(Err(not_found)).is_ok());
        assert!(ignore_not_found(Err(ApiError::RateLimited)).is_err());
    }
}
