//! Authentication middleware.
//!
//! Extracts and validates the `Authorization: Bearer <jwt>` header and
//! injects the decoded identity into the request extensions.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::models::user::{Actor, Role};
use crate::services::auth_service::{AuthService, Claims};

/// Extension that holds authenticated user information
#[derive(Debug, Clone)]
pub struct AuthExtension {
    pub user_id: Uuid,
    pub name: String,
    pub role: Role,
}

impl AuthExtension {
    /// The acting identity descriptor handed to the workflow engine.
    pub fn actor(&self) -> Actor {
        Actor {
            id: self.user_id,
            role: self.role,
        }
    }
}

impl From<Claims> for AuthExtension {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            name: claims.name,
            role: claims.role,
        }
    }
}

/// Token extraction result
#[derive(Debug, PartialEq)]
enum ExtractedToken<'a> {
    Bearer(&'a str),
    None,
    Invalid,
}

/// Extract token from the Authorization header
fn extract_token(auth_header: Option<&str>) -> ExtractedToken<'_> {
    match auth_header {
        None => ExtractedToken::None,
        Some(value) => match value.strip_prefix("Bearer ") {
            Some(token) if !token.is_empty() => ExtractedToken::Bearer(token),
            _ => ExtractedToken::Invalid,
        },
    }
}

fn header_value(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
}

/// Authentication middleware function - requires a valid bearer token
pub async fn auth_middleware(
    State(auth_service): State<Arc<AuthService>>,
    mut request: Request,
    next: Next,
) -> Response {
    match extract_token(header_value(&request)) {
        ExtractedToken::Bearer(token) => match auth_service.validate_token(token) {
            Ok(claims) => {
                request.extensions_mut().insert(AuthExtension::from(claims));
                next.run(request).await
            }
            Err(_) => (StatusCode::UNAUTHORIZED, "Invalid or expired token").into_response(),
        },
        ExtractedToken::None => {
            (StatusCode::UNAUTHORIZED, "Missing authorization header").into_response()
        }
        ExtractedToken::Invalid => {
            (StatusCode::UNAUTHORIZED, "Invalid authorization header format").into_response()
        }
    }
}

/// Admin-only middleware - requires an authenticated admin user
pub async fn admin_middleware(
    State(auth_service): State<Arc<AuthService>>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_ext = match extract_token(header_value(&request)) {
        ExtractedToken::Bearer(token) => match auth_service.validate_token(token) {
            Ok(claims) => AuthExtension::from(claims),
            Err(_) => {
                return (StatusCode::UNAUTHORIZED, "Invalid or expired token").into_response()
            }
        },
        ExtractedToken::None => {
            return (StatusCode::UNAUTHORIZED, "Missing authorization header").into_response();
        }
        ExtractedToken::Invalid => {
            return (StatusCode::UNAUTHORIZED, "Invalid authorization header format")
                .into_response();
        }
    };

    if !auth_ext.role.is_admin() {
        return (StatusCode::FORBIDDEN, "Admin access required").into_response();
    }

    request.extensions_mut().insert(auth_ext);
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_token_bearer() {
        assert_eq!(
            extract_token(Some("Bearer abc.def.ghi")),
            ExtractedToken::Bearer("abc.def.ghi")
        );
    }

    #[test]
    fn test_extract_token_missing_header() {
        assert_eq!(extract_token(None), ExtractedToken::None);
    }

    #[test]
    fn test_extract_token_wrong_scheme() {
        assert_eq!(extract_token(Some("Basic dXNlcg==")), ExtractedToken::Invalid);
    }

    #[test]
    fn test_extract_token_empty_bearer() {
        assert_eq!(extract_token(Some("Bearer ")), ExtractedToken::Invalid);
    }

    #[test]
    fn test_auth_extension_actor() {
        let ext = AuthExtension {
            user_id: Uuid::new_v4(),
            name: "Sana Kapoor".to_string(),
            role: Role::Hod,
        };
        let actor = ext.actor();
        assert_eq!(actor.id, ext.user_id);
        assert_eq!(actor.role, Role::Hod);
    }
}
