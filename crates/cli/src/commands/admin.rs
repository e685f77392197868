//! Admin account management.
//!
//! # Usage
//!
//! ```bash
//! cf-cli admin create -e admin@chezflora.fr -f Claire -l Martin -p 'a long password'
//! cf-cli admin promote -e claire@example.com
//! ```

use thiserror::Error;

use chezflora_core::{Email, Role};
use chezflora_storefront::db::users::UserRepository;
use chezflora_storefront::services::auth::{AuthError, AuthService, Registration};

use super::{CommandError, connect_store};

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Connect(#[from] CommandError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("No account with email: {0}")]
    UserNotFound(String),
}

/// Create an admin account that can log in with email and password.
///
/// # Errors
///
/// Returns `AdminError` for invalid input, an existing account, or database failures.
pub async fn create_user(
    email: &str,
    first_name: &str,
    last_name: &str,
    password: &str,
) -> Result<(), AdminError> {
    let store = connect_store().await?;

    tracing::info!("Creating admin user: {email}");
    let user = AuthService::new(&store)
        .create_user(
            Registration {
                email: email.to_owned(),
                password: password.to_owned(),
                first_name: first_name.to_owned(),
                last_name: last_name.to_owned(),
            },
            Role::Admin,
        )
        .await?;

    tracing::info!("Admin user created successfully! ID: {}, Email: {}", user.id, user.email);
    Ok(())
}

/// Give an existing account the admin role.
///
/// # Errors
///
/// Returns `AdminError::UserNotFound` if no account uses `email`.
pub async fn promote(email: &str) -> Result<(), AdminError> {
    let email = Email::parse(email).map_err(AuthError::from)?;
    let store = connect_store().await?;

    let user = UserRepository::new(&store)
        .get_by_email(&email)
        .await
        .map_err(AuthError::from)?
        .ok_or_else(|| AdminError::UserNotFound(email.to_string()))?;

    AuthService::new(&store).set_role(&user.id, Role::Admin).await?;
    tracing::info!("{} is now an admin", user.email);
    Ok(())
}
