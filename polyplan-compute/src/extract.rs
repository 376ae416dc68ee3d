//! Builtin `extract(path, unit)`: calendar field of an epoch-milliseconds timestamp.

use polyplan_expr::{ScalarExpr, ScalarFunction, TemporalUnit};
use polyplan_result::{Error, Result};
use time::OffsetDateTime;

use crate::function::{Function, FunctionParams, MappingType};

pub const EXTRACT: &str = "extract";

#[derive(Debug, Default, Clone, Copy)]
pub struct Extract;

impl Function for Extract {
    fn identifier(&self) -> &str {
        EXTRACT
    }

    fn mapping_type(&self) -> MappingType {
        MappingType::RowMapping
    }

    fn transform(
        &self,
        mut args: Vec<ScalarExpr>,
        params: FunctionParams<'_>,
    ) -> Result<ScalarExpr> {
        if args.len() != 1 {
            return Err(Error::malformed(format_args!(
                "extract expects 1 column argument, got {}",
                args.len()
            )));
        }
        let unit_name = params
            .get(0, "field")
            .and_then(|value| value.as_binary())
            .ok_or_else(|| Error::malformed("extract expects a field name argument"))?;
        let unit_name = String::from_utf8_lossy(unit_name);
        let unit = TemporalUnit::parse(&unit_name)
            .ok_or_else(|| Error::unsupported(format_args!("extract field '{unit_name}'")))?;
        let arg = args.pop().ok_or_else(|| Error::Internal("extract argument vanished".into()))?;
        Ok(ScalarExpr::call(ScalarFunction::Extract(unit), vec![arg]))
    }
}

/// Calendar field `unit` of `millis` since the Unix epoch, in UTC.
pub fn extract_unit(millis: i64, unit: TemporalUnit) -> Result<i64> {
    let nanos = i128::from(millis) * 1_000_000;
    let datetime = OffsetDateTime::from_unix_timestamp_nanos(nanos)
        .map_err(|err| Error::evaluation(format_args!("timestamp {millis} out of range: {err}")))?;
    Ok(match unit {
        TemporalUnit::Year => i64::from(datetime.year()),
        TemporalUnit::Month => i64::from(u8::from(datetime.month())),
        TemporalUnit::Day => i64::from(datetime.day()),
        TemporalUnit::Hour => i64::from(datetime.hour()),
        TemporalUnit::Minute => i64::from(datetime.minute()),
        TemporalUnit::Second => i64::from(datetime.second()),
    })
}
