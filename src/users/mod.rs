pub mod dto;
pub mod error;
pub mod handlers;
pub mod repo;
pub mod service;

use axum::routing::{get, post};
use axum::Router;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

use crate::state::AppState;

/// Wire format for birth dates, both parsing and rendering.
pub(crate) const DATE_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]");

pub fn router() -> Router<AppState> {
    // axum treats "/api/users" and "/api/users/" as distinct routes; the
    // create endpoint answers on both forms.
    Router::new()
        .route("/api/users", post(handlers::create_user))
        .route("/api/users/", post(handlers::create_user))
        .route(
            "/api/users/:uuid",
            get(handlers::get_user)
                .patch(handlers::update_user)
                .delete(handlers::delete_user),
        )
}
