/// Router Module Index
///
/// Resources are exposed as viewsets registered on an `ApiRouter`; the
/// handful of plain endpoints (health, signup, login) live in `public`.
/// Access control happens inside the handlers, so no route layer is needed.

/// Viewset and API root machinery.
pub mod viewset;

/// Routes that are not part of any resource.
pub mod public;

use axum::Router;

use crate::{AppState, handlers, hyperlinks};
use viewset::ApiRouter;

/// The registered resources, in API root order.
pub fn api_router() -> ApiRouter {
    ApiRouter::new()
        .register("users", handlers::users::viewset())
        .register("snippets", handlers::snippets::viewset())
        .register(hyperlinks::QUESTIONS, handlers::polls::question_viewset())
        .register(hyperlinks::CHOICES, handlers::polls::choice_viewset())
}

/// All application routes, state not yet applied.
pub fn api_routes() -> Router<AppState> {
    api_router().into_router().merge(public::public_routes())
}
