use axum::{
    extract::{FromRequestParts, Query},
    http::request::Parts,
};
use serde::Deserialize;

use crate::db::UserId;

use super::error::ApiError;

pub const USER_HEADER: &str = "x-user-id";

#[derive(Debug, Default, Deserialize)]
struct IdentityQuery {
    user_id: Option<String>,
}

fn parse_user_id(raw: &str) -> Result<UserId, ApiError> {
    raw.trim()
        .parse::<i64>()
        .map(UserId)
        .map_err(|_| ApiError::validation("Invalid user_id"))
}

/// `user_id` query parameter, then the `x-user-id` header, then the demo user.
impl<S> FromRequestParts<S> for UserId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let query = Query::<IdentityQuery>::try_from_uri(&parts.uri)
            .map(|Query(query)| query)
            .unwrap_or_default();

        if let Some(raw) = query.user_id.as_deref().filter(|raw| !raw.is_empty()) {
            return parse_user_id(raw);
        }

        if let Some(value) = parts.headers.get(USER_HEADER) {
            let raw = value
                .to_str()
                .map_err(|_| ApiError::validation("Invalid user_id"))?;
            return parse_user_id(raw);
        }

        Ok(UserId::DEMO)
    }
}

/// A `user_id` in a JSON body wins over the request identity.
pub fn resolve_user(request_user: UserId, body_user: Option<i64>) -> UserId {
    body_user.map(UserId).unwrap_or(request_user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(request: Request<()>) -> Result<UserId, ApiError> {
        let (mut parts, _) = request.into_parts();
        UserId::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn defaults_to_demo_user() {
        let request = Request::builder().uri("/api/medications").body(()).unwrap();
        assert_eq!(extract(request).await.unwrap(), UserId::DEMO);
    }

    #[tokio::test]
    async fn query_beats_header() {
        let request = Request::builder()
            .uri("/api/medications?user_id=7&limit=3")
            .header(USER_HEADER, "9")
            .body(())
            .unwrap();
        assert_eq!(extract(request).await.unwrap(), UserId(7));
    }

    #[tokio::test]
    async fn header_is_used_without_query() {
        let request = Request::builder()
            .uri("/api/users/stats")
            .header(USER_HEADER, "9")
            .body(())
            .unwrap();
        assert_eq!(extract(request).await.unwrap(), UserId(9));
    }

    #[tokio::test]
    async fn garbage_is_rejected() {
        let request = Request::builder()
            .uri("/api/medications?user_id=abc")
            .body(())
            .unwrap();
        assert!(matches!(extract(request).await, Err(ApiError::Validation(_))));
    }

    #[test]
    fn body_user_wins() {
        assert_eq!(resolve_user(UserId(3), Some(5)), UserId(5));
        assert_eq!(resolve_user(UserId(3), None), UserId(3));
    }
}
