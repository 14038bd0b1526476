pub mod access;
pub mod admins;
pub mod agents;
pub mod auth;
pub mod invitations;
pub mod orders;
pub mod outlets;
pub mod products;
pub mod store;

use axum::Router;

use crate::AppState;

pub fn api_router() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(outlets::router())
        .merge(admins::router())
        .merge(invitations::router())
        .merge(products::router())
        .merge(agents::router())
        .merge(orders::router())
        .merge(store::router())
}
