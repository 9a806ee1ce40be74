pub mod resource_zone_record;

pub use resource_zone_record::ZoneRecordResource;
