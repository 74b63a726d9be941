use crate::models::ErrorResponse;
use axum::http::StatusCode;
use axum::Json;

/// Largest page size a single list request may ask for
pub const MAX_PAGE_LIMIT: i64 = 1000;

/// Default page size for list endpoints
pub fn default_limit() -> i64 {
    100
}

/// Validate pagination query parameters before they reach the service layer
pub fn validate_limit_offset(
    limit: i64,
    offset: i64,
) -> Result<(), (StatusCode, Json<ErrorResponse>)> {
    if limit <= 0 {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::with_param(
                "Limit must be positive".to_string(),
                "invalid_parameter".to_string(),
                "limit".to_string(),
            )),
        ));
    }
    if limit > MAX_PAGE_LIMIT {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::with_param(
                format!("Limit cannot exceed {}", MAX_PAGE_LIMIT),
                "invalid_parameter".to_string(),
                "limit".to_string(),
            )),
        ));
    }
    if offset < 0 {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::with_param(
                "Offset must be non-negative".to_string(),
                "invalid_parameter".to_string(),
                "offset".to_string(),
            )),
        ));
    }
    Ok(())
}
