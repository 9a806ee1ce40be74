pub mod resource_reboot_task;
pub mod resource_update;

pub use resource_reboot_task::RebootTaskResource;
pub use resource_update::DedicatedServerUpdateResource;
