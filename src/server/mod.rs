mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::Extension,
    routing::{get, patch, post},
    Router,
};

use crate::api::{DynAPI, API};
use crate::auth::User;
use crate::server::handlers::{drivers, fares, payments, share, trips};

pub async fn serve<T: API + Sync + Send + 'static>(api: T, addr: SocketAddr) {
    let api = Arc::new(api) as DynAPI;

    let app = Router::new()
        .route("/trips", post(trips::create))
        .route("/trips/:id", get(trips::find))
        .route("/trips/:id/accept", patch(trips::accept))
        .route("/trips/:id/arrived", patch(trips::arrived))
        .route("/trips/:id/start", patch(trips::start))
        .route("/trips/:id/end", patch(trips::end))
        .route("/trips/:id/cancel", patch(trips::cancel))
        .route("/trips/:id/reassign", patch(trips::reassign))
        .route("/trips/:id/payments", post(payments::create))
        .route("/drivers/location", post(drivers::update_location))
        .route("/drivers/logout", post(drivers::logout))
        .route("/fares/estimate", post(fares::estimate))
        // public: anyone holding a share token may watch the trip
        .route("/share/:token", get(share::resolve))
        .layer(Extension(api))
        .layer(Extension(User::new_system_user()));

    tracing::info!("listening on {}", addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await
        .unwrap();
}
