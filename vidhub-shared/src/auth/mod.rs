/// Authentication utilities
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and length policy
/// - [`jwt`]: access/refresh token issuance and verification
/// - [`middleware`]: token extraction from cookies, headers and bodies, and
///   the authentication error taxonomy
///
/// # Example
///
/// ```no_run
/// use vidhub_shared::auth::password::{hash_password, verify_password};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
/// # Ok(())
/// # }
/// ```

pub mod jwt;
pub mod middleware;
pub mod password;
