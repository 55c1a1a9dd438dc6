//! Extractors whose rejections use the API error body.
//!
//! axum's own `Json`, `Path` and `Query` reject with plain text. These
//! wrappers turn every rejection into a `400` with `{"error", "kind"}`.

use axum::{
    Json,
    extract::{
        FromRequest, FromRequestParts, Path, Query, Request,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::request::Parts,
};
use serde::de::DeserializeOwned;
use tourney::ServiceError;

use super::errors::ApiError;

/// JSON request body.
#[derive(Debug)]
pub struct ApiJson<T>(pub T);

/// Path parameters.
#[derive(Debug)]
pub struct ApiPath<T>(pub T);

/// Query string parameters.
#[derive(Debug)]
pub struct ApiQuery<T>(pub T);

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(ServiceError::Validation(rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError(ServiceError::Validation(rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError(ServiceError::Validation(rejection.body_text()))
    }
}

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(request, state).await?;
        Ok(Self(value))
    }
}

impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, response::IntoResponse};
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Payload {
        #[allow(dead_code)]
        name: String,
    }

    #[tokio::test]
    async fn test_malformed_json_is_validation() {
        let request = Request::builder()
            .method("POST")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let err = ApiJson::<Payload>::from_request(request, &())
            .await
            .unwrap_err();
        assert!(matches!(err.0, ServiceError::Validation(_)));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_missing_content_type_is_validation() {
        let request = Request::builder()
            .method("POST")
            .body(Body::from(r#"{"name":"ada"}"#))
            .unwrap();

        let err = ApiJson::<Payload>::from_request(request, &())
            .await
            .unwrap_err();
        assert!(matches!(err.0, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_bad_query_is_validation() {
        let request = Request::builder()
            .uri("/leaderboard?start=abc")
            .body(Body::empty())
            .unwrap();
        let (mut parts, _) = request.into_parts();

        #[derive(Debug, Deserialize)]
        struct Window {
            #[allow(dead_code)]
            start: Option<i64>,
        }

        let err = ApiQuery::<Window>::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert!(matches!(err.0, ServiceError::Validation(_)));
    }
}
