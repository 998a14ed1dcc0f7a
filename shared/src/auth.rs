//! Caller identity from the Cognito user pool authorizer.
//!
//! API Gateway validates the bearer token before the function runs; these
//! helpers only read the claims it forwards in the request context.

use lambda_http::{Request, RequestExt};

use crate::{Error, Result};

/// User information forwarded by the authorizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    /// User's Cognito subject
    pub user_id: String,
}

/// Extract user from API Gateway authorizer claims.
///
/// When using Cognito authorizer, user info is in requestContext.authorizer.claims
pub fn extract_user_from_context(claims: &serde_json::Value) -> Result<AuthenticatedUser> {
    let sub = claims
        .get("sub")
        .and_then(|v| v.as_str())
        .filter(|sub| !sub.is_empty())
        .ok_or_else(|| Error::Auth("Missing sub claim".to_string()))?;

    Ok(AuthenticatedUser {
        user_id: sub.to_string(),
    })
}

/// Find the authorizer claims on an API Gateway request.
pub fn user_from_request(event: &Request) -> Result<AuthenticatedUser> {
    let claims = event
        .request_context_ref()
        .and_then(|ctx| ctx.authorizer())
        .and_then(|authorizer| authorizer.fields.get("claims"))
        .ok_or_else(|| Error::Auth("Missing claims in authorizer context".to_string()))?;

    extract_user_from_context(claims)
}
