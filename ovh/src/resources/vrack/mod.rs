pub mod resource_cloudproject;

pub use resource_cloudproject::VrackCloudProjectResource;
