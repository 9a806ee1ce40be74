//! IAM v2 policies (`/v2/iam/policy`)

use serde::{Deserialize, Serialize};
use tfplug::types::{AttributePath, Dynamic, DynamicValue};

use super::{path_escape, ApiError, Client};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub identities: Vec<String>,
    #[serde(default)]
    pub resources: Vec<PolicyResource>,
    #[serde(default)]
    pub permissions: Permissions,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default)]
    pub owner: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PolicyResource {
    pub urn: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Permissions {
    #[serde(default)]
    pub allow: Vec<Action>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub except: Vec<Action>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deny: Vec<Action>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Action {
    pub action: String,
}

fn actions(names: &[String]) -> Vec<Action> {
    names
        .iter()
        .map(|action| Action {
            action: action.clone(),
        })
        .collect()
}

fn action_names(actions: &[Action]) -> Vec<String> {
    actions.iter().map(|a| a.action.clone()).collect()
}

impl Permissions {
    pub fn new(allow: &[String], except: &[String], deny: &[String]) -> Self {
        Self {
            allow: actions(allow),
            except: actions(except),
            deny: actions(deny),
        }
    }
}

impl Policy {
    pub fn resource_urns(&self) -> Vec<String> {
        self.resources.iter().map(|r| r.urn.clone()).collect()
    }

    /// Empty action lists are stored as null to match unset configuration
    pub fn apply_to_state(&self, state: &mut DynamicValue) {
        let _ = state.set_string(&AttributePath::new("id"), self.id.clone());
        let _ = state.set_string(&AttributePath::new("name"), self.name.clone());
        let _ = state.set_optional_string(&AttributePath::new("description"), self.description.clone());
        let _ = state.set_string_list(&AttributePath::new("identities"), &self.identities);
        let _ = state.set_string_list(&AttributePath::new("resources"), &self.resource_urns());
        for (name, list) in [
            ("allow", &self.permissions.allow),
            ("except", &self.permissions.except),
            ("deny", &self.permissions.deny),
        ] {
            if list.is_empty() {
                let _ = state.set_dynamic(&AttributePath::new(name), Dynamic::Null);
            } else {
                let _ = state.set_string_list(&AttributePath::new(name), &action_names(list));
            }
        }
        let _ = state.set_optional_string(&AttributePath::new("created_at"), self.created_at.clone());
        let _ = state.set_optional_string(&AttributePath::new("updated_at"), self.updated_at.clone());
        let _ = state.set_bool(&AttributePath::new("read_only"), self.read_only);
        let _ = state.set_optional_string(&AttributePath::new("owner"), self.owner.clone());
    }
}

/// Request body for POST and PUT on /v2/iam/policy
#[derive(Debug, Serialize)]
pub struct PolicyRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub identities: Vec<String>,
    pub resources: Vec<PolicyResource>,
    pub permissions: Permissions,
}

impl PolicyRequest {
    pub fn new(name: String, identities: Vec<String>, resource_urns: Vec<String>) -> Self {
        Self {
            name,
            description: None,
            identities,
            resources: resource_urns
                .into_iter()
                .map(|urn| PolicyResource { urn })
                .collect(),
            permissions: Permissions::default(),
        }
    }
}

pub struct IamApi<'a> {
    client: &'a Client,
    base: String,
}

impl<'a> IamApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self {
            client,
            base: "/v2/iam/policy".to_string(),
        }
    }

    fn path(&self, id: &str) -> String {
        format!("{}/{}", self.base, path_escape(id))
    }

    pub async fn list_policies(&self) -> Result<Vec<Policy>, ApiError> {
        self.client.get(&self.base).await
    }

    pub async fn get_policy(&self, id: &str) -> Result<Policy, ApiError> {
        self.client.get(&self.path(id)).await
    }

    pub async fn create_policy(&self, request: &PolicyRequest) -> Result<Policy, ApiError> {
        self.client.post(&self.base, request).await
    }

    pub async fn update_policy(&self, id: &str, request: &PolicyRequest) -> Result<Policy, ApiError> {
        self.client.put(&self.path(id), request).await
    }

    pub async fn delete_policy(&self, id: &str) -> Result<(), ApiError> {
        self.client.delete::<()>(&self.path(id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_omits_empty_except_and_deny() {
        let mut request = PolicyRequest::new(
            "ops".to_string(),
            vec!["urn:v1:eu:identity:group:xx1234-ovh/admins".to_string()],
            vec!["urn:v1:eu:resource:vps:vps-1.vps.ovh.net".to_string()],
        );
        request.permissions = Permissions::new(&["vps:apiovh:reboot".to_string()], &[], &[]);

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["permissions"]["allow"][0]["action"], "vps:apiovh:reboot");
        assert!(body["permissions"].get("deny").is_none());
        assert_eq!(body["resources"][0]["urn"], "urn:v1:eu:resource:vps:vps-1.vps.ovh.net");
        assert!(body.get("description").is_none());
    }

    #[test]
    fn policy_state_flattens_actions() {
        let policy: Policy = serde_json::from_str(
            r#"{"id":"p-1","name":"ops","identities":["urn:a"],"resources":[{"urn":"urn:r"}],
                "permissions":{"allow":[{"action":"*"}],"deny":[{"action":"account:apiovh:me/edit"}]},
                "readOnly":false,"owner":"xx1234-ovh"}"#,
        )
        .unwrap();
        let mut state = DynamicValue::object();
        policy.apply_to_state(&mut state);

        assert_eq!(state.get_string_list(&AttributePath::new("allow")).unwrap(), vec!["*"]);
        assert_eq!(
            state.get_string_list(&AttributePath::new("deny")).unwrap(),
            vec!["account:apiovh:me/edit"]
        );
        assert!(state.is_null_or_unknown_at(&AttributePath::new("except")));
        assert_eq!(state.get_string_list(&AttributePath::new("resources")).unwrap(), vec!["urn:r"]);
    }
}
