pub mod resource_http_farm;
pub mod resource_http_farm_server;
pub mod resource_refresh;

pub use resource_http_farm::HttpFarmResource;
pub use resource_http_farm_server::HttpFarmServerResource;
pub use resource_refresh::RefreshResource;
