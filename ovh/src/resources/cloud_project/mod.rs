pub mod resource_containerregistry;
pub mod resource_containerregistry_user;
pub mod resource_database;
pub mod resource_database_user;
pub mod resource_kube;
pub mod resource_kube_nodepool;
pub mod resource_user;

pub use resource_containerregistry::ContainerRegistryResource;
pub use resource_containerregistry_user::ContainerRegistryUserResource;
pub use resource_database::DatabaseResource;
pub use resource_database_user::DatabaseUserResource;
pub use resource_kube::KubeResource;
pub use resource_kube_nodepool::KubeNodePoolResource;
pub use resource_user::CloudProjectUserResource;
