pub mod query_envelope;
pub mod result;
pub mod schema;
pub mod verdict;

pub use query_envelope::{
    QUERY_ENVELOPE_SCHEMA_VERSION, QueryEnvelope, QueryEnvelopeCommandFailure, QueryEnvelopeError,
    QueryEnvelopeMeta, QueryEnvelopeWarning,
};
pub use result::{Cell, ChartDataValidation, QueryResult, ResultValidation, Row};
pub use schema::{ColumnSchema, DatabaseSchema, json_schema};
pub use verdict::{InvalidColumn, SchemaValidationResult, ValidationResult};
