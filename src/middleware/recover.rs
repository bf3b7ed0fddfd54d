//! Last-resort failure boundary
//!
//! Panics escaping a handler are turned into the same generic 500 body as
//! [`AppError::Internal`], with the panic text logged server-side only.

use std::any::Any;

use axum::response::{IntoResponse, Response};

use crate::error::{panic_message, AppError};

pub fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic_message(panic.as_ref());
    AppError::Internal(format!("handler panicked: {}", detail)).into_response()
}
