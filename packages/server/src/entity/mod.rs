pub mod attribute_log;
pub mod entity_scalar;
pub mod entity_set;
pub mod index_outbox;
pub mod record_field;
