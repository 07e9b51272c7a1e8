//! The single dispatch handler behind every path.

use crate::docs::{DOCS_CONTENT_TYPE, DOCS_PATH, render_docs};
use crate::error::ServerError;
use crate::normalize::{RawRequest, normalize};
use crate::state::AppState;
use axum::{
    Json,
    body::Bytes,
    extract::{State, rejection::BytesRejection},
    http::{HeaderMap, Method, StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use mirage_core::HttpMethod;
use std::sync::Arc;
use tracing::Instrument;

/// Serve `/docs`, or match the request to an endpoint and run it.
pub async fn dispatch(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let path = uri.path();
    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            tracing::warn!(method = %method, path, reason = %rejection.body_text(), "Rejected request body");
            return ServerError::from(rejection).into_response();
        }
    };

    if method == Method::GET && path == DOCS_PATH {
        return (
            StatusCode::OK,
            [(header::CONTENT_TYPE, DOCS_CONTENT_TYPE)],
            render_docs(state.matcher.endpoints()),
        )
            .into_response();
    }

    match handle(&state, &method, &uri, &headers, &body).await {
        Ok(response) => response,
        Err(err) => for_caller(err, state.expose_error_detail).into_response(),
    }
}

async fn handle(
    state: &AppState,
    method: &Method,
    uri: &Uri,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<Response, ServerError> {
    let path = uri.path();
    let not_found = || ServerError::RouteNotFound {
        method: method.to_string(),
        path: path.to_string(),
    };

    let http_method: HttpMethod = method.as_str().parse().map_err(|_| not_found())?;
    let Some(route) = state.matcher.find(http_method, path) else {
        tracing::debug!(method = %method, path, "No endpoint matched");
        return Err(not_found());
    };

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    let input = normalize(
        &route.params,
        RawRequest {
            method: http_method,
            query: uri.query(),
            content_type,
            body,
        },
    )?;

    let request_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!(
        "dispatch",
        %request_id,
        endpoint = %route.endpoint.name,
        method = %http_method,
        path,
    );

    let outcome = async {
        tracing::info!("Dispatching request");
        state.orchestrator.run(route.endpoint, &input).await
    }
    .instrument(span)
    .await
    .map_err(|e| {
        tracing::error!(%request_id, error = %e, "Request failed");
        ServerError::internal(&e)
    })?;

    Ok((StatusCode::OK, Json(outcome.into_json())).into_response())
}

/// Strip internal detail unless the server is configured to expose it.
pub(crate) fn for_caller(err: ServerError, expose_error_detail: bool) -> ServerError {
    if expose_error_detail {
        err
    } else {
        err.redacted()
    }
}
