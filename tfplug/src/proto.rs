//! Generated protobuf types for Terraform Plugin Protocol v6.9
//!
//! Several generated messages share names with framework types
//! (`DynamicValue`, `Diagnostic`, `Schema`, `AttributePath`). Refer to them
//! through the `proto::` prefix.

include!(concat!(env!("OUT_DIR"), "/tfplugin6.rs"));

pub use provider_server::{Provider as ProviderService, ProviderServer};
