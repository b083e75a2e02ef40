//! Request handlers, one module per resource.
//!
//! Bodies are taken as `Payload<T>` so malformed JSON becomes an `ApiError`
//! (400 with a `detail`) instead of axum's plain-text rejection, and so it is
//! parsed only after the permission checks have passed.

use axum::{Json, extract::rejection::JsonRejection};

pub mod accounts;
pub mod polls;
pub mod snippets;
pub mod users;

pub type Payload<T> = Result<Json<T>, JsonRejection>;
