//! Test helpers: one-time tracing setup and small schema/batch fixtures.

use std::sync::{Arc, Once};

use arrow::array::ArrayRef;
use arrow::datatypes::{DataType, Field};
use arrow::record_batch::RecordBatch;
use polyplan_result::Result;
use polyplan_types::{BatchSchema, key_field};

static INIT: Once = Once::new();

/// Initialize tracing for test binaries. Safe to call multiple times.
pub fn init_tracing_for_tests() {
    INIT.call_once(|| {
        use tracing_subscriber::filter::EnvFilter;
        use tracing_subscriber::fmt;
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        // Another harness may have installed a global subscriber already.
        let _ = fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_test_writer()
            .try_init();
    });
}

#[cfg(feature = "auto-init")]
mod auto {
    use ctor::ctor;

    #[ctor]
    fn init() {
        super::init_tracing_for_tests();
    }
}

/// Nullable fields with the given names and types, without a key.
pub fn schema_of(columns: &[(&str, DataType)]) -> BatchSchema {
    BatchSchema::from_fields(
        columns
            .iter()
            .map(|(name, data_type)| Field::new(*name, data_type.clone(), true))
            .collect(),
    )
}

/// Like [`schema_of`], with the canonical key field in front.
pub fn schema_with_key(columns: &[(&str, DataType)]) -> BatchSchema {
    let mut fields = vec![key_field()];
    fields.extend(
        columns
            .iter()
            .map(|(name, data_type)| Field::new(*name, data_type.clone(), true)),
    );
    BatchSchema::from_fields(fields)
}

/// Build a record batch over `schema` from column arrays.
pub fn batch_of(schema: &BatchSchema, columns: Vec<ArrayRef>) -> Result<RecordBatch> {
    Ok(RecordBatch::try_new(Arc::clone(schema.arrow_schema()), columns)?)
}
