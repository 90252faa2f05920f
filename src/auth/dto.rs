use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::repo::{Role, User};

/// Request body for user registration.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub role: Option<Role>,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest {
    pub refresh_token: String,
}

/// Public part of the user returned to clients.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

/// Payload returned by register, login and refresh.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthTokens {
    pub user: PublicUser,
    pub access_token: String,
    pub refresh_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_user_serializes_camel_case() {
        let user = PublicUser {
            id: Uuid::new_v4(),
            first_name: "A".into(),
            last_name: "B".into(),
            email: "a@b.com".into(),
            role: Role::Customer,
        };
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["firstName"], "A");
        assert_eq!(json["role"], "customer");
        assert!(json.get("passwordHash").is_none());
    }

    #[test]
    fn register_request_defaults_missing_fields_to_empty() {
        let req: RegisterRequest = serde_json::from_str(r#"{"email":"a@b.com"}"#).unwrap();
        assert!(req.first_name.is_empty());
        assert!(req.role.is_none());
    }
}
