//! Running the handler as an AWS Lambda function.

use crate::handler::Handler;
use crate::model::CounterResponse;
use anyhow::anyhow;
use lambda_runtime::service_fn;
use lambda_runtime::LambdaEvent;
use slog::error;

/// Handle one Lambda invocation.  The event may be any JSON value; it is
/// passed through to the handler unread.
pub async fn handle_event(
    handler: &Handler,
    log: &slog::Logger,
    event: LambdaEvent<serde_json::Value>,
) -> Result<CounterResponse, lambda_runtime::Error> {
    let request_id = event.context.request_id.clone();
    match handler.invoke(event.payload, event.context).await {
        Ok(total_count) => Ok(CounterResponse::from(total_count)),
        Err(error) => {
            error!(log, "invocation failed";
                "request_id" => request_id,
                "error_message" => %error);
            Err(error.into())
        }
    }
}

/// Serve invocations from the Lambda runtime API until the runtime stops.
pub async fn run(handler: &Handler, log: &slog::Logger) -> anyhow::Result<()> {
    lambda_runtime::run(service_fn(
        move |event: LambdaEvent<serde_json::Value>| async move {
            handle_event(handler, log, event).await
        },
    ))
    .await
    .map_err(|error| anyhow!("running lambda runtime: {:#}", error))
}
