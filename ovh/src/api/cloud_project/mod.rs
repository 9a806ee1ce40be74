//! Public Cloud project (`/cloud/project/{serviceName}`) API

pub mod database;
pub mod kube;
pub mod nodepool;
pub mod registry;
pub mod user;

use super::{path_escape, Client};

pub struct CloudProjectApi<'a> {
    client: &'a Client,
    base: String,
}

impl<'a> CloudProjectApi<'a> {
    pub fn new(client: &'a Client, service_name: &str) -> Self {
        Self {
            client,
            base: format!("/cloud/project/{}", path_escape(service_name)),
        }
    }

    /// Managed Kubernetes clusters
    pub fn kube(&self) -> kube::KubeApi<'a> {
        kube::KubeApi::new(self.client, format!("{}/kube", self.base))
    }

    /// Managed database clusters of one engine
    pub fn database(&self, engine: &str) -> database::DatabaseApi<'a> {
        database::DatabaseApi::new(
            self.client,
            format!("{}/database/{}", self.base, path_escape(engine)),
        )
    }

    /// Managed private registries
    pub fn container_registry(&self) -> registry::RegistryApi<'a> {
        registry::RegistryApi::new(self.client, format!("{}/containerRegistry", self.base))
    }

    /// OpenStack users of the project
    pub fn users(&self) -> user::UsersApi<'a> {
        user::UsersApi::new(self.client, format!("{}/user", self.base))
    }
}
