use super::CounterStore;
use crate::config::DynamoConfig;
use crate::error::CounterError;
use crate::model::COUNTER_VERSION;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::config::Region;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::types::ReturnValue;
use aws_sdk_dynamodb::Client;
use std::collections::HashMap;

const KEY_ATTRIBUTE: &str = "Version";
const COUNT_ATTRIBUTE: &str = "TotalCount";
const INCREMENT_CONDITION: &str =
    "attribute_exists(#version) AND attribute_exists(#count)";

/// Counter record kept as a single item in a DynamoDB table.
///
/// The item is keyed by the number attribute `Version` and carries the count
/// in the number attribute `TotalCount`.
#[derive(Clone, Debug)]
pub struct DynamoStore {
    client: Client,
    table_name: String,
    consistent_read: bool,
}

impl DynamoStore {
    pub fn new(
        client: Client,
        table_name: impl Into<String>,
        consistent_read: bool,
    ) -> DynamoStore {
        DynamoStore { client, table_name: table_name.into(), consistent_read }
    }

    /// Loads AWS settings from the usual provider chain, overridden by
    /// whatever `config` specifies.
    pub async fn from_config(config: &DynamoConfig) -> DynamoStore {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &config.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(endpoint_url) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint_url);
        }
        let sdk_config = loader.load().await;
        DynamoStore::new(
            Client::new(&sdk_config),
            config.table_name.clone(),
            config.consistent_read,
        )
    }
}

fn counter_key() -> AttributeValue {
    AttributeValue::N(COUNTER_VERSION.to_string())
}

fn total_count_from(
    item: &HashMap<String, AttributeValue>,
) -> Result<i64, CounterError> {
    let value = item.get(COUNT_ATTRIBUTE).ok_or_else(|| {
        CounterError::malformed(format!("no {} attribute", COUNT_ATTRIBUTE))
    })?;
    let number = value.as_n().map_err(|_| {
        CounterError::malformed(format!("{} is not a number", COUNT_ATTRIBUTE))
    })?;
    number.parse().map_err(|error| {
        CounterError::malformed(format!(
            "{} {:?} is not an integer: {}",
            COUNT_ATTRIBUTE, number, error
        ))
    })
}

#[async_trait]
impl CounterStore for DynamoStore {
    async fn increment(&self) -> Result<i64, CounterError> {
        // Without the condition a missing item would be created, and a
        // missing count would fail validation instead of the condition.
        let output = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .key(KEY_ATTRIBUTE, counter_key())
            .update_expression("SET #count = #count + :v")
            .condition_expression(INCREMENT_CONDITION)
            .expression_attribute_names("#count", COUNT_ATTRIBUTE)
            .expression_attribute_names("#version", KEY_ATTRIBUTE)
            .expression_attribute_values(":v", AttributeValue::N("1".into()))
            .return_values(ReturnValue::UpdatedNew)
            .send()
            .await
            .map_err(|error| match error.as_service_error() {
                Some(e) if e.is_conditional_check_failed_exception() => {
                    CounterError::RecordNotFound
                }
                _ => CounterError::service(
                    "updating counter",
                    DisplayErrorContext(&error).to_string(),
                ),
            })?;
        let attributes = output.attributes().ok_or_else(|| {
            CounterError::malformed("update returned no attributes")
        })?;
        total_count_from(attributes)
    }

    async fn read(&self) -> Result<i64, CounterError> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key(KEY_ATTRIBUTE, counter_key())
            .projection_expression("#count")
            .expression_attribute_names("#count", COUNT_ATTRIBUTE)
            .consistent_read(self.consistent_read)
            .send()
            .await
            .map_err(|error| {
                CounterError::service(
                    "loading counter",
                    DisplayErrorContext(&error).to_string(),
                )
            })?;
        let item = output.item().ok_or(CounterError::RecordNotFound)?;
        total_count_from(item)
    }

    async fn seed(&self, initial: i64) -> Result<bool, CounterError> {
        let result = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .item(KEY_ATTRIBUTE, counter_key())
            .item(COUNT_ATTRIBUTE, AttributeValue::N(initial.to_string()))
            .condition_expression("attribute_not_exists(#version)")
            .expression_attribute_names("#version", KEY_ATTRIBUTE)
            .send()
            .await;
        match result {
            Ok(_) => Ok(true),
            Err(error) => match error.as_service_error() {
                Some(e) if e.is_conditional_check_failed_exception() => {
                    Ok(false)
                }
                _ => Err(CounterError::service(
                    "seeding counter",
                    DisplayErrorContext(&error).to_string(),
                )),
            },
        }
    }
}

#[cfg(test)]
mod test {
    use super::total_count_from;
    use super::DynamoStore;
    use super::COUNT_ATTRIBUTE;
    use super::INCREMENT_CONDITION;
    use crate::error::CounterError;
    use crate::store::CounterStore;
    use aws_config::BehaviorVersion;
    use aws_sdk_dynamodb::config::retry::RetryConfig;
    use aws_sdk_dynamodb::config::Credentials;
    use aws_sdk_dynamodb::config::Region;
    use aws_sdk_dynamodb::types::AttributeValue;
    use aws_sdk_dynamodb::Client;
    use aws_smithy_runtime::client::http::test_util::ReplayEvent;
    use aws_smithy_runtime::client::http::test_util::StaticReplayClient;
    use aws_smithy_types::body::SdkBody;
    use serde_json::json;
    use std::collections::HashMap;

    fn item(value: AttributeValue) -> HashMap<String, AttributeValue> {
        HashMap::from([(COUNT_ATTRIBUTE.to_string(), value)])
    }

    #[test]
    fn test_total_count_from_item() {
        assert_eq!(
            total_count_from(&item(AttributeValue::N("42".into()))),
            Ok(42)
        );
    }

    #[test]
    fn test_total_count_from_bad_items() {
        let missing = total_count_from(&HashMap::new());
        assert!(matches!(missing, Err(CounterError::MalformedResponse { .. })));

        let string = total_count_from(&item(AttributeValue::S("7".into())));
        assert!(matches!(string, Err(CounterError::MalformedResponse { .. })));

        let fraction =
            total_count_from(&item(AttributeValue::N("1.5".into())));
        assert!(matches!(
            fraction,
            Err(CounterError::MalformedResponse { .. })
        ));

        let huge = total_count_from(&item(AttributeValue::N(
            "9223372036854775808".into(),
        )));
        assert!(matches!(huge, Err(CounterError::MalformedResponse { .. })));
    }

    const CONDITIONAL_CHECK_FAILED: &str = r#"{
        "__type": "ConditionalCheckFailedException",
        "message": "The conditional request failed"
    }"#;

    fn replay(status: u16, body: &'static str) -> ReplayEvent {
        ReplayEvent::new(
            http::Request::builder()
                .uri("https://dynamodb.us-east-1.amazonaws.com/")
                .body(SdkBody::empty())
                .unwrap(),
            http::Response::builder()
                .status(status)
                .header("content-type", "application/x-amz-json-1.0")
                .body(SdkBody::from(body))
                .unwrap(),
        )
    }

    fn replay_store(
        events: Vec<ReplayEvent>,
    ) -> (DynamoStore, StaticReplayClient) {
        let http_client = StaticReplayClient::new(events);
        let config = aws_sdk_dynamodb::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .credentials_provider(Credentials::new(
                "test-access-key",
                "test-secret-key",
                None,
                None,
                "test",
            ))
            .retry_config(RetryConfig::disabled())
            .http_client(http_client.clone())
            .build();
        let store = DynamoStore::new(
            Client::from_conf(config),
            "VisitorCounterDB",
            true,
        );
        (store, http_client)
    }

    fn sent_bodies(http_client: &StaticReplayClient) -> Vec<serde_json::Value> {
        http_client
            .actual_requests()
            .map(|request| {
                serde_json::from_slice(request.body().bytes().unwrap())
                    .unwrap()
            })
            .collect()
    }

    #[tokio::test]
    async fn test_increment_request() {
        let (store, http_client) = replay_store(vec![replay(
            200,
            r#"{"Attributes": {"TotalCount": {"N": "8"}}}"#,
        )]);
        assert_eq!(store.increment().await, Ok(8));

        let bodies = sent_bodies(&http_client);
        assert_eq!(bodies.len(), 1);
        let body = &bodies[0];
        assert_eq!(body["TableName"], "VisitorCounterDB");
        assert_eq!(body["Key"], json!({ "Version": { "N": "1" } }));
        assert_eq!(body["UpdateExpression"], "SET #count = #count + :v");
        assert_eq!(body["ConditionExpression"], INCREMENT_CONDITION);
        assert_eq!(
            body["ExpressionAttributeNames"],
            json!({ "#count": "TotalCount", "#version": "Version" })
        );
        assert_eq!(
            body["ExpressionAttributeValues"],
            json!({ ":v": { "N": "1" } })
        );
        assert_eq!(body["ReturnValues"], "UPDATED_NEW");
    }

    #[tokio::test]
    async fn test_increment_missing_record_or_count() {
        // DynamoDB answers the same way whether the item or just its count
        // is absent, since both are part of the condition.
        let (store, http_client) =
            replay_store(vec![replay(400, CONDITIONAL_CHECK_FAILED)]);
        assert_eq!(store.increment().await, Err(CounterError::RecordNotFound));

        let condition = &sent_bodies(&http_client)[0]["ConditionExpression"];
        let condition = condition.as_str().unwrap();
        assert!(condition.contains("attribute_exists(#version)"));
        assert!(condition.contains("attribute_exists(#count)"));
    }

    #[tokio::test]
    async fn test_increment_service_error() {
        let (store, _) = replay_store(vec![replay(
            400,
            r#"{
                "__type": "com.amazon.coral.validate#ValidationException",
                "message": "Requested resource not found"
            }"#,
        )]);
        assert!(matches!(
            store.increment().await,
            Err(CounterError::Service { operation: "updating counter", .. })
        ));
    }

    #[tokio::test]
    async fn test_read_request() {
        let (store, http_client) = replay_store(vec![replay(
            200,
            r#"{"Item": {"TotalCount": {"N": "5"}}}"#,
        )]);
        assert_eq!(store.read().await, Ok(5));

        let body = &sent_bodies(&http_client)[0];
        assert_eq!(body["Key"], json!({ "Version": { "N": "1" } }));
        assert_eq!(body["ProjectionExpression"], "#count");
        assert_eq!(
            body["ExpressionAttributeNames"],
            json!({ "#count": "TotalCount" })
        );
        assert_eq!(body["ConsistentRead"], true);
    }

    #[tokio::test]
    async fn test_read_without_item() {
        let (store, _) = replay_store(vec![replay(200, "{}")]);
        assert_eq!(store.read().await, Err(CounterError::RecordNotFound));
    }

    #[tokio::test]
    async fn test_seed() {
        let (store, http_client) = replay_store(vec![
            replay(200, "{}"),
            replay(400, CONDITIONAL_CHECK_FAILED),
        ]);
        assert_eq!(store.seed(0).await, Ok(true));
        assert_eq!(store.seed(0).await, Ok(false));

        let bodies = sent_bodies(&http_client);
        assert_eq!(
            bodies[0]["Item"],
            json!({ "Version": { "N": "1" }, "TotalCount": { "N": "0" } })
        );
        assert_eq!(
            bodies[0]["ConditionExpression"],
            "attribute_not_exists(#version)"
        );
    }
}
