//! Response shapes shared by every summary-service endpoint.
//!
//! Failures are always a JSON object with a single `error` key. Forecast
//! failures keep status 200 so that callers which only look at the body
//! (the mesh bridge scripts) see the message; request validation failures
//! use 422.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// `{ "error": "<message>" }`
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Serialize `data` as a 200 JSON response.
pub fn ok<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(data)).into_response()
}

/// Forecast could not be produced; reported in-band with status 200.
pub fn prediction_failed(msg: impl Into<String>) -> Response {
    error_response(StatusCode::OK, msg)
}

/// The request body is not a valid reading.
pub fn unprocessable(msg: impl Into<String>) -> Response {
    error_response(StatusCode::UNPROCESSABLE_ENTITY, msg)
}

fn error_response(status: StatusCode, msg: impl Into<String>) -> Response {
    (status, Json(ErrorBody { error: msg.into() })).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_prediction_failed_is_200_with_error() {
        let resp = prediction_failed("model offline");
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await, serde_json::json!({"error": "model offline"}));
    }

    #[tokio::test]
    async fn test_unprocessable_shape() {
        let resp = unprocessable("nh3 has 3 values");
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body_json(resp).await["error"], "nh3 has 3 values");
    }
}
