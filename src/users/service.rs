use std::collections::HashMap;
use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use sha2::{Digest, Sha256};
use time::Date;
use tracing::warn;
use uuid::Uuid;

use crate::users::dto::CreateUserRequest;
use crate::users::error::UserError;
use crate::users::repo::{NewUser, RepoError, User, UserRepository};
use crate::users::DATE_FORMAT;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Unsalted single-round SHA-256, hex-encoded. Kept bit-for-bit compatible
/// with the user store this service inherits; too weak for anything new.
fn password_digest(plain: &str) -> String {
    hex::encode(Sha256::digest(plain.as_bytes()))
}

fn parse_identifier(raw: &str) -> Result<Uuid, UserError> {
    Uuid::parse_str(raw).map_err(|_| UserError::InvalidUuid)
}

fn parse_birth_date(raw: &str) -> Result<Date, UserError> {
    Date::parse(raw, DATE_FORMAT).map_err(|_| UserError::InvalidDate)
}

fn storage(err: RepoError) -> UserError {
    match err {
        RepoError::DuplicateEmail => UserError::EmailRegistered,
        other => UserError::Storage(other),
    }
}

/// Validation and orchestration for user records. All persistence goes
/// through the injected repository.
#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(repo: Arc<dyn UserRepository>) -> Self {
        Self { repo }
    }

    pub async fn get(&self, id: &str) -> Result<User, UserError> {
        let id = parse_identifier(id)?;
        self.fetch(id).await
    }

    pub async fn create(&self, input: CreateUserRequest) -> Result<User, UserError> {
        let birth_date = parse_birth_date(&input.birth_date)?;
        if !is_valid_email(&input.email) {
            return Err(UserError::InvalidEmail);
        }
        if self.repo.email_taken(&input.email).await.map_err(storage)? {
            return Err(UserError::EmailRegistered);
        }
        // The unique index catches concurrent inserts the advisory check
        // above cannot see; those come back as EmailRegistered too.
        self.repo
            .insert(NewUser {
                name: input.name,
                birth_date,
                email: input.email,
                password: password_digest(&input.password),
                address: input.address,
            })
            .await
            .map_err(storage)
    }

    pub async fn update(
        &self,
        id: &str,
        fields: HashMap<String, String>,
    ) -> Result<User, UserError> {
        let id = parse_identifier(id)?;
        let mut user = self.fetch(id).await?;

        // Everything merges into a local copy; nothing persists until the
        // single replace below, so any validation failure leaves the stored
        // record untouched.
        if let Some(name) = fields.get("name") {
            user.name = name.clone();
        }
        if let Some(raw) = fields.get("birth_date") {
            user.birth_date = parse_birth_date(raw)?;
        }
        if let Some(email) = fields.get("email") {
            if !is_valid_email(email) {
                return Err(UserError::InvalidEmail);
            }
            if self
                .repo
                .email_taken_by_other(email, id)
                .await
                .map_err(storage)?
            {
                return Err(UserError::EmailRegistered);
            }
            user.email = email.clone();
        }
        if let Some(password) = fields.get("password") {
            user.password = password_digest(password);
        }
        if let Some(address) = fields.get("address") {
            user.address = address.clone();
        }

        self.repo.replace(user).await.map_err(storage)
    }

    pub async fn delete(&self, id: &str) -> Result<(), UserError> {
        let id = parse_identifier(id)?;
        self.fetch(id).await?;
        self.repo.delete(id).await.map_err(storage)
    }

    // Absent records and failed lookups report the same way; the existing
    // API never distinguished them.
    async fn fetch(&self, id: Uuid) -> Result<User, UserError> {
        match self.repo.find_by_id(id).await {
            Ok(Some(user)) => Ok(user),
            Ok(None) => Err(UserError::NotFound),
            Err(err) => {
                warn!(error = %err, user_id = %id, "lookup failed");
                Err(UserError::NotFound)
            }
        }
    }
}
