//! Account details of the authenticated user

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceSchemaRequest,
    DataSourceSchemaResponse, DataSourceWithConfigure, ReadDataSourceRequest,
    ReadDataSourceResponse,
};
use tfplug::schema::{AttributeType, SchemaBuilder};
use tfplug::types::{Diagnostic, DynamicValue};

use crate::provider_data::OvhProviderData;
use crate::resources::common::{
    api_diagnostic, client, computed, configure_response, data_source_response,
};

#[derive(Default)]
pub struct MeDataSource {
    provider_data: Option<OvhProviderData>,
}

impl MeDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn read_me(&self, config: DynamicValue) -> Result<DynamicValue, Diagnostic> {
        let client = client(&self.provider_data)?;
        let me = client
            .me()
            .get()
            .await
            .map_err(|e| api_diagnostic("Failed to read account", &e))?;

        let mut state = config;
        me.apply_to_state(&mut state);
        Ok(state)
    }
}

#[async_trait]
impl DataSource for MeDataSource {
    fn type_name(&self) -> &str {
        "ovh_me"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        let mut builder = SchemaBuilder::new()
            .version(0)
            .description("Gets the details of the OVHcloud account");
        for (name, description) in [
            ("id", "Account nichandle"),
            ("nichandle", "Account identifier"),
            ("firstname", "First name"),
            ("name", "Last name"),
            ("email", "Contact email"),
            ("country", "Country"),
            ("currency_code", "Billing currency"),
            ("organisation", "Organisation name"),
            ("state", "Account state"),
            ("ovh_subsidiary", "OVHcloud subsidiary"),
            ("language", "Preferred language"),
            ("customer_code", "Customer code used by support"),
        ] {
            builder = builder.attribute(computed(name, AttributeType::String, description));
        }

        DataSourceSchemaResponse {
            schema: builder.build(),
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        data_source_response(self.read_me(request.config).await)
    }
}

#[async_trait]
impl DataSourceWithConfigure for MeDataSource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
        ConfigureDataSourceResponse {
            diagnostics: configure_response(&mut self.provider_data, request.provider_data),
        }
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::api::{Client, Credentials};
    use tfplug::types::AttributePath;

    #[tokio::test]
    async fn read_maps_account() {
        let mut server = mockito::Server::new_async().await;
        let _me = server
            .mock("GET", "/me")
            .with_body(
                r#"{"nichandle":"xx1111-ovh","firstname":"Ada","name":"Lovelace",
                    "currency":{"code":"EUR","symbol":"EURO"},"ovhSubsidiary":"FR"}"#,
            )
            .create_async()
            .await;

        let client = Client::new(&server.url(), Credentials::AccessToken("token".to_string())).unwrap();
        let data_source = MeDataSource {
            provider_data: Some(OvhProviderData::new(client)),
        };
        let response = data_source
            .read(
                Context::new(),
                ReadDataSourceRequest {
                    type_name: "ovh_me".to_string(),
                    config: DynamicValue::object(),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        assert_eq!(response.state.get_string(&AttributePath::new("id")).unwrap(), "xx1111-ovh");
        assert_eq!(
            response.state.get_string(&AttributePath::new("currency_code")).unwrap(),
            "EUR"
        );
        assert!(response.state.is_null_or_unknown_at(&AttributePath::new("email")));
    }

    #[tokio::test]
    async fn unconfigured_read_fails() {
        let response = MeDataSource::new()
            .read(
                Context::new(),
                ReadDataSourceRequest {
                    type_name: "ovh_me".to_string(),
                    config: DynamicValue::object(),
                },
            )
            .await;

        assert_eq!(response.diagnostics[0].summary, "Provider not configured");
        assert!(response.state.is_null());
    }
}
