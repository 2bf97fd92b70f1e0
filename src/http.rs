use crate::error::CounterError;
use crate::handler::Handler;
use crate::model::CounterResponse;
use anyhow::anyhow;
use dropshot::endpoint;
use dropshot::ApiDescription;
use dropshot::ConfigDropshot;
use dropshot::HttpError;
use dropshot::HttpResponseOk;
use dropshot::HttpServerStarter;
use dropshot::RequestContext;
use slog::error;

/// The server-wide context is just the counting handler and its store
pub struct CounterContext {
    handler: Handler,
}

impl CounterContext {
    fn new(handler: Handler) -> CounterContext {
        CounterContext { handler }
    }
}

impl From<CounterError> for HttpError {
    fn from(error: CounterError) -> Self {
        let (status_code, error_code) = match &error {
            CounterError::RecordNotFound => {
                (http::StatusCode::NOT_FOUND, "RecordNotFound")
            }
            CounterError::MalformedResponse { .. } => {
                (http::StatusCode::BAD_GATEWAY, "MalformedResponse")
            }
            CounterError::Service { .. } => {
                (http::StatusCode::SERVICE_UNAVAILABLE, "ServiceUnavailable")
            }
        };
        let message = error.to_string();
        dropshot::HttpError {
            status_code,
            error_code: Some(error_code.to_string()),
            external_message: message.clone(),
            internal_message: message,
        }
    }
}

pub fn counter_api() -> anyhow::Result<ApiDescription<CounterContext>> {
    let mut api = ApiDescription::new();
    api.register(api_update_count)
        .map_err(|error| anyhow!("registering update_count: {}", error))?;
    api.register(api_get_counter)
        .map_err(|error| anyhow!("registering counter: {}", error))?;
    Ok(api)
}

pub async fn create_dropshot_server(
    config_dropshot: ConfigDropshot,
    log: slog::Logger,
    handler: Handler,
) -> anyhow::Result<dropshot::HttpServer<CounterContext>> {
    let api = counter_api()?;
    let api_context = CounterContext::new(handler);

    Ok(HttpServerStarter::new(&config_dropshot, api, api_context, &log)
        .map_err(|error| anyhow!("creating Dropshot server: {:#}", error))?
        .start())
}

/// Count a visit and return the new total.
#[endpoint {
    method = GET,
    path = "/update_count",
}]
async fn api_update_count(
    rqctx: RequestContext<CounterContext>,
) -> Result<HttpResponseOk<CounterResponse>, HttpError> {
    let api_context = rqctx.context();
    let total_count = api_context
        .handler
        .invoke(&rqctx.request_id, &rqctx.log)
        .await
        .map_err(|error| {
            error!(rqctx.log, "counting visit failed";
                "error_message" => %error);
            error
        })?;
    Ok(HttpResponseOk(CounterResponse::from(total_count)))
}

/// Fetch the current value of the counter.
#[endpoint {
    method = GET,
    path = "/counter",
}]
async fn api_get_counter(
    rqctx: RequestContext<CounterContext>,
) -> Result<HttpResponseOk<CounterResponse>, HttpError> {
    let api_context = rqctx.context();
    let total_count =
        api_context.handler.current().await.map_err(|error| {
            error!(rqctx.log, "loading counter failed";
                "error_message" => %error);
            error
        })?;
    Ok(HttpResponseOk(CounterResponse::from(total_count)))
}
