mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::Extension,
    routing::{get, patch, post},
    Router,
};

use crate::api::{API, DynAPI};
use crate::server::handlers::{bids, drivers, rides};

pub async fn serve<T: API + Sync + Send + 'static>(api: T, addr: SocketAddr) {
    tracing_subscriber::fmt::init();

    let api = Arc::new(api) as DynAPI;

    let app = Router::new()
        .route("/rides", post(rides::create))
        .route("/rides/pending", get(rides::pending))
        .route("/rides/:id", get(rides::find))
        .route("/rides/:id/accept", patch(rides::accept))
        .route("/rides/:id/start", patch(rides::start))
        .route("/rides/:id/complete", patch(rides::complete))
        .route("/rides/:id/cancel", patch(rides::cancel))
        .route("/rides/:id/rate", patch(rides::rate))
        .route("/rides/:id/route", get(rides::route_preview))
        .route("/rides/:id/bids", post(bids::submit).get(bids::list))
        .route("/rides/:id/bids/:bid_id/accept", patch(bids::accept))
        .route("/users/:id/rides", get(rides::for_participant))
        .route("/drivers/nearby", get(drivers::nearby))
        .route("/drivers/:id/location", patch(drivers::update_location).get(drivers::find_location))
        .route("/drivers/:id/online", patch(drivers::set_online))
        .layer(Extension(api));

    tracing::info!("listening on {}", addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await
        .unwrap();
}
