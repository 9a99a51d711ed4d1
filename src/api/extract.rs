//! Bearer-token extraction. Handlers take [`BearerToken`] as an argument and
//! get a 401 rejection before running when the header is missing or not a
//! bearer credential. The token itself is forwarded to the API server
//! verbatim; no validation happens here.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::errors::AppError;

#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("");

        match header.strip_prefix("Bearer ") {
            Some(token) if !token.trim().is_empty() => Ok(BearerToken(token.trim().to_string())),
            _ => Err(AppError::Unauthorized("missing bearer token".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;

    async fn extract(header: Option<&str>) -> Result<BearerToken, AppError> {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        BearerToken::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn extracts_bearer_token() {
        let token = extract(Some("Bearer abc123")).await.unwrap();
        assert_eq!(token.0, "abc123");
    }

    #[tokio::test]
    async fn trims_surrounding_whitespace() {
        let token = extract(Some("Bearer   abc123  ")).await.unwrap();
        assert_eq!(token.0, "abc123");
    }

    #[tokio::test]
    async fn rejects_missing_or_malformed_header() {
        assert!(extract(None).await.is_err());
        assert!(extract(Some("Basic dXNlcjpwdw==")).await.is_err());
        assert!(extract(Some("Bearer ")).await.is_err());
        assert!(extract(Some("abc123")).await.is_err());
    }
}
