//! HTTP adapter mapping for domain errors.
//!
//! Purpose: keep the domain error type HTTP-agnostic while allowing Actix
//! handlers to turn domain failures into consistent JSON responses and status
//! codes.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use tracing::error;

use crate::domain::{Error, ErrorCode};
use crate::middleware::trace::TRACE_ID_HEADER;

/// Convenient result alias for HTTP handlers.
pub type ApiResult<T> = Result<T, Error>;

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorCode::Forbidden => StatusCode::FORBIDDEN,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        // Duplicate enrollments and exhausted capacity are both conflicts
        // with current state; the body's code and reason disambiguate.
        ErrorCode::Conflict | ErrorCode::CapacityExceeded => StatusCode::CONFLICT,
        ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn redact_if_internal(error: &Error) -> Error {
    if matches!(error.code(), ErrorCode::InternalError) {
        let mut redacted = Error::internal("Internal server error");
        if let Some(id) = error.trace_id() {
            redacted = redacted.with_trace_id(id.to_owned());
        }
        redacted
    } else {
        error.clone()
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        status_for(self.code())
    }

    fn error_response(&self) -> HttpResponse {
        let mut builder = HttpResponse::build(self.status_code());
        if let Some(id) = self.trace_id() {
            builder.insert_header((TRACE_ID_HEADER, id.to_owned()));
        }

        builder.json(redact_if_internal(self))
    }
}

impl From<actix_web::Error> for Error {
    fn from(err: actix_web::Error) -> Self {
        // Do not leak implementation details to clients.
        error!(error = %err, "actix error promoted to domain error");
        Error::internal("Internal server error")
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use rstest::rstest;
    use serde_json::Value;

    use super::*;

    #[rstest]
    #[case(Error::invalid_request("x"), StatusCode::BAD_REQUEST)]
    #[case(Error::unauthorized("x"), StatusCode::UNAUTHORIZED)]
    #[case(Error::forbidden("x"), StatusCode::FORBIDDEN)]
    #[case(Error::not_found("x"), StatusCode::NOT_FOUND)]
    #[case(Error::conflict("x"), StatusCode::CONFLICT)]
    #[case(Error::capacity_exceeded("x"), StatusCode::CONFLICT)]
    #[case(Error::service_unavailable("x"), StatusCode::SERVICE_UNAVAILABLE)]
    #[case(Error::internal("x"), StatusCode::INTERNAL_SERVER_ERROR)]
    fn codes_map_to_statuses(#[case] error: Error, #[case] status: StatusCode) {
        assert_eq!(error.status_code(), status);
    }

    #[actix_web::test]
    async fn internal_messages_are_redacted() {
        let error = Error::internal("connection string leaked");
        let response = error.error_response();
        let body = actix_web::body::to_bytes(response.into_body())
            .await
            .expect("body bytes");
        let value: Value = serde_json::from_slice(&body).expect("error payload");
        assert_eq!(
            value.get("message").and_then(Value::as_str),
            Some("Internal server error")
        );
    }

    #[actix_web::test]
    async fn non_internal_messages_pass_through() {
        let error = Error::conflict("Student already enrolled in this course");
        let response = error.error_response();
        let body = actix_web::body::to_bytes(response.into_body())
            .await
            .expect("body bytes");
        let value: Value = serde_json::from_slice(&body).expect("error payload");
        assert_eq!(
            value.get("message").and_then(Value::as_str),
            Some("Student already enrolled in this course")
        );
        assert_eq!(value.get("code").and_then(Value::as_str), Some("conflict"));
    }

    #[actix_web::test]
    async fn explicit_trace_id_is_echoed_in_the_header() {
        let error = Error::internal("boom").with_trace_id("abc-123");
        let response = error.error_response();
        let header = response
            .headers()
            .get(TRACE_ID_HEADER)
            .and_then(|v| v.to_str().ok());
        assert_eq!(header, Some("abc-123"));
    }
}
