//! Spin HTTP entry point.

use anyhow::{anyhow, Context, Result};
use futures::SinkExt;
use http::StatusCode;
use spin_sdk::http::{Fields, IncomingRequest, OutgoingResponse, ResponseOutparam};
use spin_sdk::http_component;

use edge_sdk::edge_cache::KeyValueStore;
use edge_sdk::edge_core::{Method, ProxyConfig, RequestContext};
use edge_sdk::edge_data::SpinTransport;
use edge_sdk::edge_executor::BackgroundTasks;
use edge_sdk::edge_observability::init_logging_from_config;
use edge_sdk::edge_security::AllowedOrigins;

use crate::dispatcher::{ProxyHandler, WORKLOAD_NAME};
use crate::response::{ProxyResponse, MISCONFIGURED};

type SpinProxy = ProxyHandler<KeyValueStore, SpinTransport>;

/// Main HTTP handler.
#[http_component]
async fn handle(req: IncomingRequest, response_out: ResponseOutparam) {
    let ctx = request_context(&req);
    let mut tasks = BackgroundTasks::new();

    let response = match build_proxy() {
        Ok(proxy) => proxy.handle(&ctx, &mut tasks).await,
        Err(e) => {
            tracing::error!(
                workload = WORKLOAD_NAME,
                request_id = %ctx.request_id,
                error = %format!("{e:#}"),
                "Proxy setup failed"
            );
            let origins = AllowedOrigins::default();
            ProxyResponse::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                MISCONFIGURED,
                origins.resolve(ctx.origin()),
            )
        }
    };

    if let Err(e) = write_response(response, response_out).await {
        tracing::error!(
            request_id = %ctx.request_id,
            error = %format!("{e:#}"),
            "Failed to write response"
        );
    }

    // Runs after the body is closed, so the client already has its answer.
    let ran = tasks.run_to_completion().await;
    if ran > 0 {
        tracing::debug!(request_id = %ctx.request_id, tasks = ran, "Background tasks complete");
    }
}

/// Read configuration and open the cache store.
fn build_proxy() -> Result<SpinProxy> {
    let config = ProxyConfig::from_lookup(|name| spin_sdk::variables::get(name).ok())
        .context("invalid component variables")?;
    init_logging_from_config(&config.log);

    let store = KeyValueStore::open(&config.cache.store)
        .with_context(|| format!("opening key-value store '{}'", config.cache.store))?;

    ProxyHandler::new(&config, store, SpinTransport).context("invalid allowed origins")
}

/// Convert the incoming request into the platform request context.
fn request_context(req: &IncomingRequest) -> RequestContext {
    let method = Method::parse(method_token(&req.method()));
    let mut ctx = RequestContext::new(method, &req.path_with_query().unwrap_or_default());

    for (name, value) in req.headers().entries() {
        ctx = ctx.with_header(name, String::from_utf8_lossy(&value).into_owned());
    }

    ctx
}

fn method_token(method: &spin_sdk::http::Method) -> &str {
    use spin_sdk::http::Method as M;

    match method {
        M::Get => "GET",
        M::Head => "HEAD",
        M::Post => "POST",
        M::Put => "PUT",
        M::Delete => "DELETE",
        M::Connect => "CONNECT",
        M::Options => "OPTIONS",
        M::Trace => "TRACE",
        M::Patch => "PATCH",
        M::Other(other) => other,
    }
}

/// Send status, headers and body, then close the stream.
async fn write_response(response: ProxyResponse, response_out: ResponseOutparam) -> Result<()> {
    let header_list: Vec<(String, Vec<u8>)> = response
        .headers
        .into_iter()
        .map(|(name, value)| (name.to_ascii_lowercase(), value.into_bytes()))
        .collect();

    let headers = Fields::from_list(&header_list).map_err(|e| anyhow!("invalid headers: {e:?}"))?;
    let outgoing = OutgoingResponse::new(headers);
    outgoing
        .set_status_code(response.status.as_u16())
        .map_err(|()| anyhow!("invalid status code {}", response.status))?;

    let mut body = outgoing.take_body();
    response_out.set(outgoing);

    if !response.body.is_empty() {
        body.send(response.body)
            .await
            .map_err(|e| anyhow!("writing body: {e:?}"))?;
    }
    body.close().await.map_err(|e| anyhow!("closing body: {e:?}"))?;

    Ok(())
}
