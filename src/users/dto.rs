use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::users::repo::User;
use crate::users::DATE_FORMAT;

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub birth_date: String,
    pub email: String,
    pub address: String,
    pub password: String,
}

/// Record shape returned by every endpoint. `password` carries the stored
/// digest, matching the API this service replaces; the plaintext is never
/// echoed back.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub uuid: Uuid,
    pub name: String,
    pub birth_date: String,
    pub email: String,
    pub address: String,
    pub password: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            uuid: user.id,
            name: user.name,
            birth_date: user.birth_date.format(DATE_FORMAT).unwrap_or_default(),
            email: user.email,
            address: user.address,
            password: user.password,
        }
    }
}

#[cfg(test)]
mod tests {
    use time::macros::{date, datetime};

    use super::*;

    #[test]
    fn response_renders_date_and_uuid_as_strings() {
        let user = User {
            id: Uuid::new_v4(),
            name: "Ada".into(),
            birth_date: date!(1815 - 12 - 10),
            email: "ada@example.com".into(),
            password: "digest".into(),
            address: "London".into(),
            created_at: datetime!(2024-01-01 00:00 UTC),
            updated_at: datetime!(2024-01-01 00:00 UTC),
        };
        let json = serde_json::to_value(UserResponse::from(user.clone())).unwrap();
        assert_eq!(json["uuid"], user.id.to_string());
        assert_eq!(json["birth_date"], "1815-12-10");
        assert!(json.get("created_at").is_none());
    }
}
