use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::context::AppContext;
use crate::telemetry::AccessEvent;

/// `POST /telemetry/access` -- always accepted. The core forwards the event
/// to whatever sink the context was built with and never inspects the
/// result; telemetry delivery failures are the sink's problem, not this
/// endpoint's.
pub async fn record(
    State(ctx): State<AppContext>,
    Json(event): Json<AccessEvent>,
) -> StatusCode {
    ctx.telemetry().record(&event);
    StatusCode::ACCEPTED
}
