use tracing::warn;

use crate::claims::{Claims, TokenType};
use crate::error::{AuthError, AuthResult};

/// Ensures `claims` is an access token granting every scope in `required`.
///
/// Superfluous granted scopes are fine; an empty requirement only checks the token type.
pub fn authorize<I, S>(claims: Claims, required: I) -> AuthResult<Claims>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    if claims.token_type != TokenType::Access {
        return Err(AuthError::WrongTokenType {
            expected: TokenType::Access,
            found: claims.token_type,
        });
    }

    let mut missing: Vec<String> = required
        .into_iter()
        .filter(|scope| !claims.has_scope(scope.as_ref()))
        .map(|scope| scope.as_ref().to_string())
        .collect();

    if missing.is_empty() {
        return Ok(claims);
    }

    missing.sort();
    missing.dedup();
    warn!(subject = %claims.subject, ?missing, "scope_check_failed");
    Err(AuthError::InsufficientScope { missing })
}
