pub mod resource_policy;

pub use resource_policy::IamPolicyResource;
