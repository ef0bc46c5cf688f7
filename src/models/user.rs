// src/models/user.rs

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::{Validate, ValidationError};

use super::{email_address, empty_as_none, rule_error};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "gender", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl FromStr for Gender {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            "other" => Ok(Gender::Other),
            _ => Err(()),
        }
    }
}

/// Represents the 'users' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: i64,

    pub name: String,

    /// Unique login identifier.
    pub email: String,

    /// Argon2 password hash.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password: String,

    pub department: Option<String>,
    pub job_role: Option<String>,

    /// Public URL of the stored avatar image.
    pub avatar: Option<String>,

    pub bio: Option<String>,
    pub address: Option<String>,
    pub gender: Option<Gender>,
    pub phone: Option<String>,

    /// Only changeable through the admin-status operation.
    pub is_admin: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Columns for a freshly registered user. There is deliberately no admin flag.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub department: Option<String>,
    pub job_role: Option<String>,
    pub gender: Option<Gender>,
    pub address: Option<String>,
    pub phone: Option<String>,
}

/// Partial profile update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub name: Option<String>,
    pub department: Option<String>,
    pub job_role: Option<String>,
    pub bio: Option<String>,
    pub address: Option<String>,
    pub gender: Option<Gender>,
    pub phone: Option<String>,
    pub avatar: Option<String>,
}

/// Restricts gender to the enumerated values.
fn validate_gender(gender: &str) -> Result<(), ValidationError> {
    gender
        .parse::<Gender>()
        .map(|_| ())
        .map_err(|_| rule_error("in", "The selected gender is invalid."))
}

/// DTO for creating a new user (Registration).
///
/// Unknown keys such as `is_admin` are ignored.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[serde(default, deserialize_with = "empty_as_none")]
    #[validate(
        required(message = "The name field is required."),
        length(max = 255, message = "The name field must not be greater than 255 characters.")
    )]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "email_address")]
    #[validate(
        required(message = "The email field is required."),
        email(message = "The email field must be a valid email address."),
        length(max = 255, message = "The email field must not be greater than 255 characters.")
    )]
    pub email: Option<String>,

    #[serde(default, deserialize_with = "empty_as_none")]
    #[validate(
        required(message = "The password field is required."),
        length(min = 8, message = "The password field must be at least 8 characters.")
    )]
    pub password: Option<String>,

    #[serde(default)]
    pub password_confirmation: Option<String>,

    #[serde(default, deserialize_with = "empty_as_none")]
    #[validate(length(
        max = 255,
        message = "The department field must not be greater than 255 characters."
    ))]
    pub department: Option<String>,

    #[serde(default, deserialize_with = "empty_as_none")]
    #[validate(length(
        max = 255,
        message = "The job role field must not be greater than 255 characters."
    ))]
    pub job_role: Option<String>,

    #[serde(default, deserialize_with = "empty_as_none")]
    #[validate(custom(function = validate_gender))]
    pub gender: Option<String>,

    #[serde(default, deserialize_with = "empty_as_none")]
    pub address: Option<String>,

    #[serde(default, deserialize_with = "empty_as_none")]
    pub phone: Option<String>,
}

impl RegisterRequest {
    /// Converts a validated request into insertable columns.
    pub fn into_new_user(self, password_hash: String) -> NewUser {
        NewUser {
            name: self.name.unwrap_or_default(),
            email: self.email.unwrap_or_default(),
            password: password_hash,
            department: self.department,
            job_role: self.job_role,
            gender: self.gender.and_then(|g| g.parse().ok()),
            address: self.address,
            phone: self.phone,
        }
    }
}

/// DTO for user login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(default, deserialize_with = "email_address")]
    #[validate(
        required(message = "The email field is required."),
        email(message = "The email field must be a valid email address.")
    )]
    pub email: Option<String>,

    #[serde(default, deserialize_with = "empty_as_none")]
    #[validate(required(message = "The password field is required."))]
    pub password: Option<String>,
}

/// DTO for updating the caller's own profile. Every field is optional.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[serde(default, deserialize_with = "empty_as_none")]
    #[validate(length(
        max = 255,
        message = "The name field must not be greater than 255 characters."
    ))]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "empty_as_none")]
    #[validate(length(
        max = 255,
        message = "The department field must not be greater than 255 characters."
    ))]
    pub department: Option<String>,

    #[serde(default, deserialize_with = "empty_as_none")]
    #[validate(length(
        max = 255,
        message = "The job role field must not be greater than 255 characters."
    ))]
    pub job_role: Option<String>,

    #[serde(default, deserialize_with = "empty_as_none")]
    pub bio: Option<String>,

    #[serde(default, deserialize_with = "empty_as_none")]
    pub address: Option<String>,

    #[serde(default, deserialize_with = "empty_as_none")]
    #[validate(custom(function = validate_gender))]
    pub gender: Option<String>,

    #[serde(default, deserialize_with = "empty_as_none")]
    pub phone: Option<String>,
}

impl UpdateProfileRequest {
    pub fn into_changes(self) -> ProfileChanges {
        ProfileChanges {
            name: self.name,
            department: self.department,
            job_role: self.job_role,
            bio: self.bio,
            address: self.address,
            gender: self.gender.and_then(|g| g.parse().ok()),
            phone: self.phone,
            avatar: None,
        }
    }
}

/// DTO for changing the caller's password.
#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[serde(default, deserialize_with = "empty_as_none")]
    #[validate(required(message = "The current password field is required."))]
    pub current_password: Option<String>,

    #[serde(default, deserialize_with = "empty_as_none")]
    #[validate(
        required(message = "The password field is required."),
        length(min = 8, message = "The password field must be at least 8 characters.")
    )]
    pub password: Option<String>,

    #[serde(default)]
    pub password_confirmation: Option<String>,
}

/// Accepts the loose boolean spellings forms send: true/false, 1/0, "1"/"0", "true"/"false".
fn as_boolean(value: &serde_json::Value) -> Option<bool> {
    match value {
        serde_json::Value::Bool(b) => Some(*b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(1) => Some(true),
            Some(0) => Some(false),
            _ => None,
        },
        serde_json::Value::String(s) => match s.as_str() {
            "1" | "true" => Some(true),
            "0" | "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn validate_boolean(value: &serde_json::Value) -> Result<(), ValidationError> {
    as_boolean(value)
        .map(|_| ())
        .ok_or_else(|| rule_error("boolean", "The is admin field must be true or false."))
}

/// DTO for the admin-only privilege change.
#[derive(Debug, Deserialize, Validate)]
pub struct AdminStatusRequest {
    #[serde(default)]
    #[validate(
        required(message = "The is admin field is required."),
        custom(function = validate_boolean)
    )]
    pub is_admin: Option<serde_json::Value>,
}

impl AdminStatusRequest {
    pub fn flag(&self) -> Option<bool> {
        self.is_admin.as_ref().and_then(as_boolean)
    }
}
