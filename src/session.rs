//! Password hashing and the administrator session entries.

use actix_session::Session;
use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, SaltString};
use argon2::{Argon2, PasswordVerifier};
use once_cell::sync::Lazy;

/// Session key holding the logged in administrator's name.
pub const ADMIN_NAME_KEY: &str = "admin";
/// Session key holding the logged in administrator's id.
pub const ADMIN_ID_KEY: &str = "admin_id";

static ARGON2: Lazy<Argon2<'static>> = Lazy::new(Argon2::default);

pub fn get_argon2() -> &'static Argon2<'static> {
    &ARGON2
}

/// Hashes a password into a PHC string.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(get_argon2()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

/// Checks a password against a stored PHC string. A malformed hash never matches.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => get_argon2()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            log::error!("verify_password: stored hash is not a PHC string: {}", e);
            false
        }
    }
}

/// Marks the session as belonging to an administrator.
pub fn login_admin(
    session: &Session,
    admin_id: i32,
    name: &str,
) -> Result<(), actix_web::Error> {
    session.renew();
    session
        .insert(ADMIN_NAME_KEY, name)
        .and_then(|_| session.insert(ADMIN_ID_KEY, admin_id))
        .map_err(|e| {
            log::error!("login_admin: session insert failed: {}", e);
            actix_web::error::ErrorInternalServerError("middleware error")
        })
}

pub fn logout_admin(session: &Session) {
    session.remove(ADMIN_NAME_KEY);
    session.remove(ADMIN_ID_KEY);
}
