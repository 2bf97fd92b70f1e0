use diesel::prelude::*;
use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;

/// Key of the one and only counter record.
pub const COUNTER_VERSION: i32 = 1;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Queryable, Selectable, Insertable)]
#[diesel(table_name = crate::schema::counter)]
pub struct CounterRecord {
    pub version: i32,
    pub total_count: i64,
}

impl CounterRecord {
    pub fn new(total_count: i64) -> CounterRecord {
        CounterRecord { version: COUNTER_VERSION, total_count }
    }
}

/// The counter as returned to callers.
///
/// This is shaped like a DynamoDB number attribute (`{"N": "42"}`) because
/// that is what the deployed function handed back and what the front end
/// reads.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CounterResponse {
    #[serde(rename = "N")]
    pub n: String,
}

impl CounterResponse {
    pub fn total_count(&self) -> Option<i64> {
        self.n.parse().ok()
    }
}

impl From<i64> for CounterResponse {
    fn from(total_count: i64) -> Self {
        CounterResponse { n: total_count.to_string() }
    }
}

#[cfg(test)]
mod test {
    use super::CounterResponse;

    #[test]
    fn test_response_shape() {
        let body = serde_json::to_value(CounterResponse::from(17)).unwrap();
        assert_eq!(body, serde_json::json!({ "N": "17" }));
        let parsed: CounterResponse =
            serde_json::from_value(serde_json::json!({ "N": "-3" })).unwrap();
        assert_eq!(parsed.total_count(), Some(-3));
    }
}
