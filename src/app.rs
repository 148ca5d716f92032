use std::{net::SocketAddr, time::Duration};

use axum::{
    http::{Request, Response},
    routing::get,
    Json, Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{field::Empty, Span};

use crate::config::AppConfig;
use crate::envelope::Envelope;
use crate::state::AppState;
use crate::{auth, contacts, users};

async fn root() -> Json<Envelope<()>> {
    Json(Envelope::message("gymo"))
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .nest("/v1",
              Router::new()
                  .route("/", get(root))
                  .merge(auth::router())
                  .merge(users::router())
                  .merge(contacts::router())
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &Request<_>| {
                    tracing::info_span!(
                        "request",
                        method = %req.method(),
                        path = %req.uri().path(),
                        status = Empty,
                        latency_ms = Empty,
                    )
                })
                .on_response(|res: &Response<_>, latency: Duration, span: &Span| {
                    let status = res.status();
                    span.record("status", status.as_u16());
                    span.record("latency_ms", latency.as_millis() as u64);
                    if status.is_server_error() {
                        tracing::error!(%status, "request failed");
                    } else {
                        tracing::debug!(%status, "request done");
                    }
                }),
        )
}

pub async fn serve(app: Router, config: &AppConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
