pub mod resource_ssh_key;

pub use resource_ssh_key::SshKeyResource;
