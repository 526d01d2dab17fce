use chrono::Utc;
use rsvp_shared::pii::MaskedEmail;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::User;
use crate::password::{hash_password, verify_password};
use crate::repository::{StoreError, UserRepository};

/// Sign-up form. Missing fields deserialize as empty and are rejected by `register`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub emp_id: String,
    pub designation: String,
    pub password: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("All fields are required")]
    MissingFields,
    #[error("Email already exists")]
    EmailTaken,
    #[error("Username already taken")]
    UsernameTaken,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("User not found")]
    NotFound,
    #[error("Password hashing failed: {0}")]
    Hashing(String),
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
}

impl From<StoreError> for AccountError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(field) if field.contains("username") => AccountError::UsernameTaken,
            StoreError::Duplicate(_) => AccountError::EmailTaken,
            StoreError::NotFound(_) => AccountError::NotFound,
            StoreError::Conflict(msg) | StoreError::Unavailable(msg) => AccountError::StoreUnavailable(msg),
        }
    }
}

/// Registration, credential checks and profile lookup.
pub struct AccountService {
    users: Arc<dyn UserRepository>,
}

impl AccountService {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    pub async fn register(&self, registration: Registration) -> Result<User, AccountError> {
        let username = registration.username.trim().to_lowercase();
        let email = registration.email.trim().to_string();
        let emp_id = registration.emp_id.trim().to_string();
        let designation = registration.designation.trim().to_string();
        let password = registration.password;

        if username.is_empty()
            || email.is_empty()
            || emp_id.is_empty()
            || designation.is_empty()
            || password.is_empty()
        {
            return Err(AccountError::MissingFields);
        }

        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AccountError::EmailTaken);
        }
        if self.users.find_by_username(&username).await?.is_some() {
            return Err(AccountError::UsernameTaken);
        }

        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| AccountError::Hashing(e.to_string()))?
            .map_err(|e| AccountError::Hashing(e.to_string()))?;

        let user = User {
            id: Uuid::new_v4(),
            username,
            email,
            emp_id,
            designation,
            password_hash,
            created_at: Utc::now(),
        };
        self.users.create_user(&user).await?;

        info!(user_id = %user.id, email = %MaskedEmail(&user.email), "Registered user");
        Ok(user)
    }

    /// Unknown email and wrong password are indistinguishable to the caller.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User, AccountError> {
        let user = match self.users.find_by_email(email.trim()).await? {
            Some(user) => user,
            None => {
                warn!(email = %MaskedEmail(email), "Login for unknown email");
                return Err(AccountError::InvalidCredentials);
            }
        };

        let password = password.to_string();
        let hash = user.password_hash.clone();
        let matches = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| AccountError::Hashing(e.to_string()))?;

        if !matches {
            warn!(user_id = %user.id, "Login with wrong password");
            return Err(AccountError::InvalidCredentials);
        }
        Ok(user)
    }

    pub async fn profile(&self, user_id: Uuid) -> Result<User, AccountError> {
        self.users.get_user(user_id).await?.ok_or(AccountError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    fn registration(username: &str, email: &str) -> Registration {
        Registration {
            username: username.to_string(),
            email: email.to_string(),
            emp_id: "E-042".to_string(),
            designation: "Engineer".to_string(),
            password: "s3cret-pass".to_string(),
        }
    }

    fn service() -> AccountService {
        AccountService::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_register_then_authenticate() {
        let accounts = service();
        let user = accounts.register(registration("Alice", "alice@example.com")).await.unwrap();
        assert_eq!(user.username, "alice");
        assert_ne!(user.password_hash, "s3cret-pass");

        let logged_in = accounts.authenticate("alice@example.com", "s3cret-pass").await.unwrap();
        assert_eq!(logged_in.id, user.id);
        assert_eq!(accounts.profile(user.id).await.unwrap().email, "alice@example.com");

        assert!(matches!(
            accounts.authenticate("alice@example.com", "wrong").await,
            Err(AccountError::InvalidCredentials)
        ));
        assert!(matches!(
            accounts.authenticate("nobody@example.com", "s3cret-pass").await,
            Err(AccountError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_register_rejects_blank_fields() {
        let accounts = service();
        let mut form = registration("carol", "carol@example.com");
        form.designation = "   ".to_string();
        assert!(matches!(accounts.register(form).await, Err(AccountError::MissingFields)));

        let form: Registration = serde_json::from_str(r#"{"username": "dave"}"#).unwrap();
        assert!(matches!(accounts.register(form).await, Err(AccountError::MissingFields)));
    }

    #[tokio::test]
    async fn test_register_rejects_taken_email_and_username() {
        let accounts = service();
        accounts.register(registration("erin", "erin@example.com")).await.unwrap();

        assert!(matches!(
            accounts.register(registration("someone", "erin@example.com")).await,
            Err(AccountError::EmailTaken)
        ));
        assert!(matches!(
            accounts.register(registration("ERIN", "other@example.com")).await,
            Err(AccountError::UsernameTaken)
        ));
    }

    #[test]
    fn test_registration_reads_camel_case() {
        let form: Registration = serde_json::from_str(
            r#"{"username":"f","email":"f@x.io","empId":"E1","designation":"QA","password":"p"}"#,
        )
        .unwrap();
        assert_eq!(form.emp_id, "E1");
    }

    #[tokio::test]
    async fn test_profile_of_unknown_user() {
        assert!(matches!(service().profile(Uuid::new_v4()).await, Err(AccountError::NotFound)));
    }
}
