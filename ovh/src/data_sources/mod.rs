//! Data source implementations

pub mod data_source_cloud_project_containerregistry;
pub mod data_source_cloud_project_database;
pub mod data_source_cloud_project_kube;
pub mod data_source_dedicated_server;
pub mod data_source_domain_zone;
pub mod data_source_iam_policy;
pub mod data_source_iploadbalancing;
pub mod data_source_me;

pub use data_source_cloud_project_containerregistry::ContainerRegistryDataSource;
pub use data_source_cloud_project_database::DatabaseDataSource;
pub use data_source_cloud_project_kube::KubeDataSource;
pub use data_source_dedicated_server::{DedicatedServerDataSource, DedicatedServersDataSource};
pub use data_source_domain_zone::DomainZoneDataSource;
pub use data_source_iam_policy::{IamPoliciesDataSource, IamPolicyDataSource};
pub use data_source_iploadbalancing::IpLoadbalancingDataSource;
pub use data_source_me::MeDataSource;
