use std::convert::Infallible;

use axum::{
    extract::State,
    middleware,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use futures_util::{Stream, StreamExt};
use tokio_stream::wrappers::BroadcastStream;

use crate::middleware::auth::auth_middleware;
use crate::state::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(snapshot_updates))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// GET /v1/stream
/// Push side of the subscribe-then-refetch contract: each message only
/// announces that a newer snapshot version exists, clients re-read the
/// views they care about.
async fn snapshot_updates(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.sync.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| async move {
        match result {
            Ok(update) => {
                let data = serde_json::to_string(&update).ok()?;
                Some(Ok(Event::default().event("snapshot").data(data)))
            }
            // A lagged receiver only skipped intermediate versions; the
            // next update carries the latest one anyway
            Err(_) => None,
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
