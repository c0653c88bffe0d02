/// Authentication primitives
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and verification
/// - [`jwt`]: Signed identity tokens with a fixed 24-hour window
/// - [`context`]: Authenticated request context carried in extensions
///
/// # Security Features
///
/// - **Password Hashing**: Argon2id with 64 MB memory, 3 iterations
/// - **Tokens**: HS256 signing, issuer and expiration validation
/// - **Constant-time Comparison**: verification never short-circuits on
///   content

pub mod context;
pub mod jwt;
pub mod password;
