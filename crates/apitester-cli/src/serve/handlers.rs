//! HTTP route handlers.
//!
//! Handlers are kept thin, delegating to [`SuiteManager`](apitester_core::SuiteManager).

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        Response,
    },
};
use futures::{Stream, StreamExt};
use tracing::info;

use apitester_core::{CaseResult, ChannelKey, Subscription, TestSuite};

use super::models::{ApiError, CancelReply, Format};
use super::AppState;

type ApiResult = Result<Response, ApiError>;

// =============================================================================
// Suite Handlers
// =============================================================================

/// GET `/tests` - Lists all suites.
pub async fn list_suites(State(state): State<Arc<AppState>>, headers: HeaderMap) -> ApiResult {
    let suites = state.manager.list_suites()?;
    Ok(Format::of_response(&headers).render(StatusCode::OK, &suites))
}

/// POST `/tests` - Creates a suite and returns it with its new id.
pub async fn create_suite(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult {
    let suite: TestSuite = Format::of_request(&headers).parse(&body)?;
    let suite = state.manager.create_suite(suite)?;
    Ok(Format::of_response(&headers).render(StatusCode::CREATED, &suite))
}

/// GET `/tests/{id}` - Returns one suite.
pub async fn get_suite(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult {
    let suite = state.manager.get_suite(&id)?;
    Ok(Format::of_response(&headers).render(StatusCode::OK, &suite))
}

/// PUT `/tests/{id}` - Replaces a suite; the id in the path wins.
pub async fn replace_suite(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult {
    let suite: TestSuite = Format::of_request(&headers).parse(&body)?;
    let suite = state.manager.replace_suite(&id, suite)?;
    Ok(Format::of_response(&headers).render(StatusCode::OK, &suite))
}

/// DELETE `/tests/{id}` - Deletes a suite with all of its results.
pub async fn delete_suite(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.manager.delete_suite(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Run Handlers
// =============================================================================

/// POST `/tests/{id}/run` - Runs the suite and returns its case results.
///
/// Responds once the run is over; watch `/tests/{id}/events` to follow it
/// case by case.
pub async fn run_suite(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult {
    let run = state.manager.run_suite(&id).await?;
    Ok(Format::of_response(&headers).render(StatusCode::OK, &run))
}

/// POST `/tests/{id}/cancel` - Stops in-flight runs after their current case.
pub async fn cancel_run(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult {
    state.manager.get_suite(&id)?;
    let cancelled = state.manager.cancel_run(&id);
    info!(suite = %id, cancelled, "Cancel requested");
    Ok(Format::of_response(&headers).render(StatusCode::OK, &CancelReply { cancelled }))
}

// =============================================================================
// Result Handlers
// =============================================================================

/// GET `/tests/{id}/results` - Latest summary of every executed case.
pub async fn get_results(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult {
    let results = state.manager.get_results(&id)?;
    Ok(Format::of_response(&headers).render(StatusCode::OK, &results))
}

/// POST `/tests/{id}/results` - Records a result produced elsewhere, such
/// as by a proxy that saw the tagged request, and returns the updated
/// summary.
pub async fn record_result(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult {
    let result: CaseResult = Format::of_request(&headers).parse(&body)?;
    if result.test_case.trim().is_empty() {
        return Err(ApiError::bad_request("testCase must not be empty"));
    }

    state.manager.record_external_result(&id, result).await?;
    let results = state.manager.get_results(&id)?;
    Ok(Format::of_response(&headers).render(StatusCode::OK, &results))
}

/// GET `/tests/{id}/cases/{case}/results` - Run history of one case.
pub async fn get_case_history(
    State(state): State<Arc<AppState>>,
    Path((id, case)): Path<(String, String)>,
    headers: HeaderMap,
) -> ApiResult {
    let history = state.manager.get_case_history(&id, &case)?;
    Ok(Format::of_response(&headers).render(StatusCode::OK, &history))
}

// =============================================================================
// Live Updates
// =============================================================================

/// GET `/tests/{id}/events` - Streams the suite summary after every case.
pub async fn suite_events(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    state.manager.get_suite(&id)?;
    let subscription = state.manager.subscribe(ChannelKey::suite(&id)).await;
    Ok(event_stream(subscription))
}

/// GET `/tests/{id}/cases/{case}/events` - Streams one case's history.
pub async fn case_events(
    State(state): State<Arc<AppState>>,
    Path((id, case)): Path<(String, String)>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    state.manager.get_suite(&id)?;
    let subscription = state.manager.subscribe(ChannelKey::case(&id, &case)).await;
    Ok(event_stream(subscription))
}

fn event_stream(subscription: Subscription) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = subscription
        .into_stream()
        .map(|document| Ok(Event::default().event("update").data(document)));

    Sse::new(stream).keep_alive(KeepAlive::default())
}
