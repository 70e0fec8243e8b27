pub mod authorizer;
pub mod claims;
pub mod codec;
pub mod config;
pub mod error;
pub mod factory;
pub mod rotation;
pub mod scopes;
pub mod session;

pub use authorizer::authorize;
pub use claims::{Claims, TokenType};
pub use codec::{SignedToken, TokenCodec};
pub use config::{parse_algorithm, TokenConfig};
pub use error::{AuthError, AuthResult};
pub use factory::{IssuedToken, TokenFactory, TokenPair};
pub use jsonwebtoken::Algorithm;
pub use rotation::{InMemoryRefreshTokenStore, RefreshTokenStore};
pub use scopes::{DEFAULT_SCOPES, SCOPE_ADMIN, SCOPE_USER};
pub use session::{Principal, PrincipalDirectory, SessionService};
