//! Provider data handed to resources and data sources by `configure`

use crate::api::Client;
use std::sync::Arc;

#[derive(Clone)]
pub struct OvhProviderData {
    pub client: Arc<Client>,
}

impl OvhProviderData {
    pub fn new(client: Client) -> Self {
        Self {
            client: Arc::new(client),
        }
    }
}
