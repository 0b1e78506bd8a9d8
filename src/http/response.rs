//! Response handling.
//!
//! # Responsibilities
//! - Turn the coordinator's final response into the caller's response
//! - Copy upstream status and end-to-end headers verbatim
//! - Provide the bare 500 used when nothing else can answer
//!
//! # Design Decisions
//! - Hop-by-hop headers stripped; hyper frames the buffered body itself

use axum::body::Body;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::proxy::coordinator::FinalResponse;
use crate::proxy::headers::copy_end_to_end;

impl IntoResponse for FinalResponse {
    fn into_response(self) -> Response {
        let (_, upstream) = self.into_parts();

        let mut response = Response::new(Body::from(upstream.body));
        *response.status_mut() = upstream.status;
        copy_end_to_end(&upstream.headers, response.headers_mut(), &[]);
        response
    }
}

/// 500 with no body.
pub fn internal_error() -> Response {
    StatusCode::INTERNAL_SERVER_ERROR.into_response()
}
