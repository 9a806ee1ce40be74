//! Resource implementations, one module per API family

pub mod cloud_project;
pub mod common;
pub mod dedicated_server;
pub mod domain;
pub mod iam;
pub mod iploadbalancing;
pub mod me;
pub mod vrack;

pub use cloud_project::{
    CloudProjectUserResource, ContainerRegistryResource, ContainerRegistryUserResource,
    DatabaseResource, DatabaseUserResource, KubeNodePoolResource, KubeResource,
};
pub use dedicated_server::{DedicatedServerUpdateResource, RebootTaskResource};
pub use domain::ZoneRecordResource;
pub use iam::IamPolicyResource;
pub use iploadbalancing::{HttpFarmResource, HttpFarmServerResource, RefreshResource};
pub use me::SshKeyResource;
pub use vrack::VrackCloudProjectResource;
