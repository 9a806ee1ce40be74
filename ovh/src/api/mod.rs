//! OVHcloud REST API client and typed endpoint groups

pub mod auth;
pub mod client;
pub mod cloud_project;
pub mod dedicated_server;
pub mod domain;
pub mod error;
pub mod iam;
pub mod iploadbalancing;
pub mod me;
pub mod vrack;
pub mod wait;

pub use auth::Credentials;
pub use client::{Client, RetryConfig};
pub use error::ApiError;
pub use wait::{wait_for_state, StateChangeConf, WaitError, CHANGE_PENDING, DELETED};

/// Escapes a user-supplied value for use as a single path segment
pub fn path_escape(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}

/// Task statuses shared by the dedicated, vrack and load balancer task APIs
pub(crate) const TASK_PENDING: &[&str] = &["init", "todo", "doing"];
pub(crate) const TASK_DONE: &[&str] = &["done"];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_escape_keeps_segments_whole() {
        assert_eq!(path_escape("ns1234.ip-1-2-3.eu"), "ns1234.ip-1-2-3.eu");
        assert_eq!(path_escape("a/b"), "a%2Fb");
        assert_eq!(path_escape("my key"), "my%20key");
    }
}
