//! DNS record of a zone hosted by OVH

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::defaults::StaticDefault;
use tfplug::plan_modifier::RequiresReplace;
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceSchemaRequest, ResourceSchemaResponse,
    ResourceWithConfigure, UpdateResourceRequest, UpdateResourceResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};
use tfplug::validator::{NumberRangeValidator, StringOneOfValidator};

use crate::api::domain::{CreateRecordRequest, UpdateRecordRequest};
use crate::api::Client;
use crate::provider_data::OvhProviderData;
use crate::resources::common::{
    api_diagnostic, client, configure_response, create_response, delete_response,
    id_attribute, ignore_not_found, import_composite_id, opt_i64, opt_string, read_response,
    required_string, update_response,
};

pub const FIELD_TYPES: &[&str] = &[
    "A", "AAAA", "CAA", "CNAME", "DKIM", "DMARC", "DNAME", "LOC", "MX", "NAPTR", "NS", "PTR",
    "SPF", "SRV", "SSHFP", "TLSA", "TXT",
];

pub const DEFAULT_TTL: f64 = 3600.0;
pub const MIN_TTL: f64 = 60.0;

#[derive(Default)]
pub struct ZoneRecordResource {
    provider_data: Option<OvhProviderData>,
}

fn record_id(state: &DynamicValue) -> Result<i64, Diagnostic> {
    let id = required_string(state, "id")?;
    id.parse::<i64>().map_err(|_| {
        Diagnostic::error("Invalid record id", format!("'{}' is not a numeric record id", id))
            .with_attribute(AttributePath::new("id"))
    })
}

async fn refresh_zone(client: &Client, zone: &str) -> Result<(), Diagnostic> {
    client
        .domain()
        .refresh_zone(zone)
        .await
        .map_err(|e| api_diagnostic("Failed to refresh zone", &e))
}

impl ZoneRecordResource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn create_record(&self, state: &mut DynamicValue) -> Result<(), Diagnostic> {
        let client = client(&self.provider_data)?;
        let zone = required_string(state, "zone")?;
        let request = CreateRecordRequest {
            field_type: required_string(state, "fieldtype")?,
            sub_domain: opt_string(state, "subdomain").unwrap_or_default(),
            target: required_string(state, "target")?,
            ttl: opt_i64(state, "ttl").unwrap_or(DEFAULT_TTL as i64),
        };

        tracing::info!(
            "Creating {} record {:?} in zone {}",
            request.field_type,
            request.sub_domain,
            zone
        );
        let record = client
            .domain()
            .records(&zone)
            .create(&request)
            .await
            .map_err(|e| api_diagnostic("Failed to create record", &e))?;
        record.apply_to_state(state);

        refresh_zone(client, &zone).await
    }

    async fn read_record(&self, state: &DynamicValue) -> Result<Option<DynamicValue>, Diagnostic> {
        let client = client(&self.provider_data)?;
        let zone = required_string(state, "zone")?;
        let id = record_id(state)?;

        match client.domain().records(&zone).get(id).await {
            Ok(record) => {
                let mut new_state = state.clone();
                record.apply_to_state(&mut new_state);
                Ok(Some(new_state))
            }
            Err(e) if e.is_not_found() => {
                tracing::warn!("Record {} of zone {} no longer exists", id, zone);
                Ok(None)
            }
            Err(e) => Err(api_diagnostic("Failed to read record", &e)),
        }
    }

    async fn update_record(
        &self,
        prior_state: &DynamicValue,
        state: &mut DynamicValue,
    ) -> Result<(), Diagnostic> {
        let client = client(&self.provider_data)?;
        let zone = required_string(prior_state, "zone")?;
        let id = record_id(prior_state)?;
        let request = UpdateRecordRequest {
            sub_domain: opt_string(state, "subdomain").unwrap_or_default(),
            target: required_string(state, "target")?,
            ttl: opt_i64(state, "ttl").unwrap_or(DEFAULT_TTL as i64),
        };

        let records = client.domain().records(&zone);
        records
            .update(id, &request)
            .await
            .map_err(|e| api_diagnostic("Failed to update record", &e))?;
        refresh_zone(client, &zone).await?;

        let record = records
            .get(id)
            .await
            .map_err(|e| api_diagnostic("Failed to read record", &e))?;
        record.apply_to_state(state);
        Ok(())
    }

    async fn delete_record(&self, state: &DynamicValue) -> Result<(), Diagnostic> {
        let client = client(&self.provider_data)?;
        let zone = required_string(state, "zone")?;
        let id = record_id(state)?;

        ignore_not_found(client.domain().records(&zone).delete(id).await)
            .map_err(|e| api_diagnostic("Failed to delete record", &e))?;
        refresh_zone(client, &zone).await
    }
}

#[async_trait]
impl Resource for ZoneRecordResource {
    fn type_name(&self) -> &str {
        "ovh_domain_zone_record"
    }

    async fn schema(&self, _ctx: Context, _request: ResourceSchemaRequest) -> ResourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Manages a record of a DNS zone")
            .attribute(id_attribute("Record identifier"))
            .attribute(
                AttributeBuilder::new("zone", AttributeType::String)
                    .description("Zone name, e.g. example.com")
                    .required()
                    .plan_modifier(RequiresReplace)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("subdomain", AttributeType::String)
                    .description("Record subdomain, empty for the zone apex")
                    .optional()
                    .computed()
                    .default(StaticDefault::string(""))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("fieldtype", AttributeType::String)
                    .description("Record type")
                    .required()
                    .validator(StringOneOfValidator::new(FIELD_TYPES))
                    .plan_modifier(RequiresReplace)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("target", AttributeType::String)
                    .description("Record value")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("ttl", AttributeType::Number)
                    .description("Time to live in seconds")
                    .optional()
                    .computed()
                    .default(StaticDefault::number(DEFAULT_TTL))
                    .validator(NumberRangeValidator::at_least(MIN_TTL))
                    .build(),
            )
            .build();

        ResourceSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn create(&self, _ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let mut state = request.planned_state;
        let result = self.create_record(&mut state).await;
        create_response(state, result)
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let result = self.read_record(&request.current_state).await;
        read_response(request.current_state, result)
    }

    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let mut new_state = request.planned_state;
        let result = self.update_record(&request.prior_state, &mut new_state).await;
        update_response(request.prior_state, new_state, result)
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        delete_response(self.delete_record(&request.prior_state).await)
    }

    /// Import ID is `<record id>.<zone>`
    async fn import_state(
        &self,
        _ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        import_composite_id(&request, '.', &["id", "zone"], "<record id>.<zone>")
    }
}

#[async_trait]
impl ResourceWithConfigure for ZoneRecordResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        ConfigureResourceResponse {
            diagnostics: configure_response(&mut self.provider_data, request.provider_data),
        }
    }
}
