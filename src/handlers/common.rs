use crate::{errors::ServiceError, ApiResponse};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use validator::Validate;

/// Standard success response
pub fn success_response<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(ApiResponse::success(data))).into_response()
}

/// Standard created response
pub fn created_response<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(ApiResponse::success(data))).into_response()
}

/// Validate request input, reporting every failing field.
pub fn validate_input<T: Validate>(input: &T) -> Result<(), ServiceError> {
    input.validate().map_err(ServiceError::from)
}

/// Trims optional free text, treating blank as absent.
pub fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[derive(Validate)]
    struct Notes {
        #[validate(length(max = 3, message = "too long"))]
        notes: String,
    }

    #[test]
    fn validation_failures_list_fields() {
        let err = validate_input(&Notes {
            notes: "four".into(),
        })
        .unwrap_err();
        assert_eq!(err.field_errors(), vec!["notes: too long".to_string()]);
    }

    #[test]
    fn blank_text_is_absent() {
        assert_eq!(optional_text(Some("   ".into())), None);
        assert_eq!(optional_text(Some(" ok ".into())).as_deref(), Some("ok"));
    }

    #[tokio::test]
    async fn created_responses_wrap_data() {
        let response = created_response("x");
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["data"], "x");
    }
}
