//! Import helpers for simplifying resource import implementations

use crate::context::Context;
use crate::resource::{ImportResourceStateRequest, ImportResourceStateResponse, ImportedResource};
use crate::types::{AttributePath, Diagnostic, DynamicValue};

/// Sets the import ID to a specific attribute in state
///
/// This is useful for simple resources where the import ID maps directly to
/// a single attribute in the resource state.
///
/// Example: ID "my-key" -> state.id = "my-key"
pub fn import_state_passthrough_id(
    _ctx: &Context,
    attr_path: AttributePath,
    request: &ImportResourceStateRequest,
    response: &mut ImportResourceStateResponse,
) {
    let mut state = DynamicValue::object();

    if let Err(e) = state.set_string(&attr_path, request.id.clone()) {
        response.diagnostics.push(
            Diagnostic::error(
                format!("Failed to set import ID: {}", e),
                format!("Could not set attribute '{}' to value '{}'", attr_path, request.id),
            )
            .with_attribute(attr_path),
        );
        return;
    }

    response.imported_resources.push(ImportedResource {
        type_name: request.type_name.clone(),
        state,
    });
}

/// Splits a composite import ID into exactly `parts` non-empty segments
///
/// `split_import_id("sn/kube/pool", '/', 3)` yields `["sn", "kube", "pool"]`.
/// The last segment keeps any further separators, so
/// `split_import_id("42.www.example.com", '.', 2)` yields
/// `["42", "www.example.com"]`.
pub fn split_import_id(id: &str, separator: char, parts: usize) -> Option<Vec<String>> {
    let segments: Vec<String> = id.splitn(parts, separator).map(str::to_string).collect();

    if segments.len() != parts || segments.iter().any(String::is_empty) {
        return None;
    }
    Some(segments)
}

/// Diagnostic for a malformed composite import ID
pub fn invalid_import_id(id: &str, expected: &str) -> Diagnostic {
    Diagnostic::error(
        "Invalid import ID",
        format!("Import ID '{}' is not formatted as {}", id, expected),
    )
}
