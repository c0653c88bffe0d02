/// Authenticated request context
///
/// After successful token validation, the API server's auth middleware adds
/// an [`AuthContext`] to the request extensions; handlers extract it with
/// Axum's `Extension` extractor.
///
/// # Example
///
/// ```
/// use taskboard_shared::auth::context::AuthContext;
/// use taskboard_shared::auth::jwt::Claims;
/// use taskboard_shared::models::user::Role;
/// use uuid::Uuid;
///
/// let claims = Claims::new(Uuid::new_v4(), Role::Manager);
/// let ctx = AuthContext::from_claims(&claims);
/// assert_eq!(ctx.role, Role::Manager);
/// ```

use super::jwt::Claims;
use crate::models::user::Role;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity attached to every authenticated request
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AuthContext {
    /// Authenticated user ID
    pub user_id: Uuid,

    /// Role carried by the token
    pub role: Role,
}

impl AuthContext {
    /// Creates a context from validated token claims
    pub fn from_claims(claims: &Claims) -> Self {
        Self {
            user_id: claims.sub,
            role: claims.role,
        }
    }

    /// Whether this request is from an Admin
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_claims() {
        let claims = Claims::new(Uuid::new_v4(), Role::Manager);
        let ctx = AuthContext::from_claims(&claims);

        assert_eq!(ctx.user_id, claims.sub);
        assert_eq!(ctx.role, Role::Manager);
        assert!(!ctx.is_admin());

        let admin = AuthContext::from_claims(&Claims::new(Uuid::new_v4(), Role::Admin));
        assert!(admin.is_admin());
    }
}
