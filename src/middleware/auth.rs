use actix_web::{dev::Payload, http::header, web, FromRequest, HttpRequest};
use futures::future::{ready, Ready};

use crate::error::AppError;
use crate::AppState;

/// Guard for endpoints that require the static API key. Handlers opt in by
/// taking this extractor; public routes simply omit it.
pub struct ApiKeyAuth;

impl FromRequest for ApiKeyAuth {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let result = check_api_key(req);
        ready(result)
    }
}

fn check_api_key(req: &HttpRequest) -> Result<ApiKeyAuth, AppError> {
    let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or_else(|| AppError::Internal("App state not found".to_string()))?;

    let provided = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    match extract_bearer(provided) {
        Some(key) if key == state.config.api_key => Ok(ApiKeyAuth),
        _ => Err(AppError::Forbidden("Invalid API key".to_string())),
    }
}

fn extract_bearer(header_value: Option<&str>) -> Option<&str> {
    header_value?.strip_prefix("Bearer ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_bearer_token() {
        assert_eq!(extract_bearer(Some("Bearer secret-key")), Some("secret-key"));
    }

    #[test]
    fn rejects_missing_or_malformed_headers() {
        assert_eq!(extract_bearer(None), None);
        assert_eq!(extract_bearer(Some("secret-key")), None);
        assert_eq!(extract_bearer(Some("Basic secret-key")), None);
    }
}
