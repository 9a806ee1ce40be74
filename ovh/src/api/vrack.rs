//! vRack private networks (`/vrack/{serviceName}`)

use serde::{Deserialize, Serialize};

use super::{path_escape, ApiError, Client};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: i64,
    pub function: String,
    pub status: String,
    #[serde(default)]
    pub service_name: Option<String>,
    #[serde(default)]
    pub target_domain: Option<String>,
}

/// Attachment of a Public Cloud project
#[derive(Debug, Clone, Deserialize)]
pub struct CloudProjectAttachment {
    pub project: String,
    pub vrack: String,
}

#[derive(Debug, Serialize)]
struct AttachCloudProjectRequest<'a> {
    project: &'a str,
}

pub struct VrackApi<'a> {
    client: &'a Client,
    base: String,
}

impl<'a> VrackApi<'a> {
    pub fn new(client: &'a Client, service_name: &str) -> Self {
        Self {
            client,
            base: format!("/vrack/{}", path_escape(service_name)),
        }
    }

    fn cloud_project_path(&self, project: &str) -> String {
        format!("{}/cloudProject/{}", self.base, path_escape(project))
    }

    pub async fn attach_cloud_project(&self, project: &str) -> Result<Task, ApiError> {
        self.client
            .post(
                &format!("{}/cloudProject", self.base),
                &AttachCloudProjectRequest { project },
            )
            .await
    }

    pub async fn cloud_project(&self, project: &str) -> Result<CloudProjectAttachment, ApiError> {
        self.client.get(&self.cloud_project_path(project)).await
    }

    pub async fn detach_cloud_project(&self, project: &str) -> Result<Task, ApiError> {
        self.client.delete(&self.cloud_project_path(project)).await
    }

    /// Tasks disappear once completed, so a 404 here means done
    pub async fn task(&self, task_id: i64) -> Result<Task, ApiError> {
        self.client
            .get(&format!("{}/task/{}", self.base, task_id))
            .await
    }
}
