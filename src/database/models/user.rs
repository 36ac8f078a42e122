use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

use crate::auth::password::{hash_password, PasswordError};
use crate::database::patch::{double_option, Assignments, Patch};

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: i32,
    pub email: String,
    #[serde(skip_serializing)]
    #[sqlx(rename = "password")]
    pub password_hash: String,
    pub full_name: String,
    pub signup_type: String,
    pub gender: String,
    pub mobile_no: Option<String>,
    pub is_mobile_verified: bool,
    pub is_email_verified: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// The user shape returned alongside issued tokens.
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub id: i32,
    pub email: String,
    pub full_name: String,
    pub gender: String,
    pub mobile_no: Option<String>,
    pub is_mobile_verified: bool,
    pub is_email_verified: bool,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            gender: user.gender.clone(),
            mobile_no: user.mobile_no.clone(),
            is_mobile_verified: user.is_mobile_verified,
            is_email_verified: user.is_email_verified,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Gender {
    #[serde(rename = "m")]
    Male,
    #[serde(rename = "f")]
    Female,
    #[serde(rename = "o")]
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "m",
            Gender::Female => "f",
            Gender::Other => "o",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = String;

    /// Case-insensitive; accepts the stored codes and the spelled-out forms.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "m" | "male" => Ok(Gender::Male),
            "f" | "female" => Ok(Gender::Female),
            "o" | "other" => Ok(Gender::Other),
            other => Err(format!("invalid gender '{}', expected one of m, f, o", other)),
        }
    }
}

impl<'de> Deserialize<'de> for Gender {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Insert payload; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub signup_type: String,
    pub gender: Gender,
    pub mobile_no: Option<String>,
    pub is_mobile_verified: bool,
    pub is_email_verified: bool,
}

/// Client-supplied user changes. Keys outside this set are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPatch {
    pub email: Option<String>,
    pub password: Option<String>,
    pub full_name: Option<String>,
    pub gender: Option<Gender>,
    #[serde(default, deserialize_with = "double_option")]
    pub mobile_no: Option<Option<String>>,
    pub signup_type: Option<String>,
    pub is_mobile_verified: Option<bool>,
    pub is_email_verified: Option<bool>,
}

impl UserPatch {
    /// Hash any new password, producing the changes that are written.
    pub fn prepare(self) -> Result<UserChanges, PasswordError> {
        let password_hash = match self.password.as_deref() {
            Some(plain) if !plain.is_empty() => Some(hash_password(plain)?),
            _ => None,
        };

        Ok(UserChanges {
            email: self.email,
            password_hash,
            full_name: self.full_name,
            gender: self.gender,
            mobile_no: self.mobile_no,
            signup_type: self.signup_type,
            is_mobile_verified: self.is_mobile_verified,
            is_email_verified: self.is_email_verified,
        })
    }
}

/// Column changes for `users`, ready to write.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub full_name: Option<String>,
    pub gender: Option<Gender>,
    pub mobile_no: Option<Option<String>>,
    pub signup_type: Option<String>,
    pub is_mobile_verified: Option<bool>,
    pub is_email_verified: Option<bool>,
}

impl Patch for UserChanges {
    const TABLE: &'static str = "users";

    fn write(self, out: &mut Assignments) {
        out.required("email", self.email)
            .required("password", self.password_hash)
            .required("full_name", self.full_name)
            .required("gender", self.gender.map(|g| g.as_str().to_string()))
            .nullable("mobile_no", self.mobile_no)
            .required("signup_type", self.signup_type)
            .required("is_mobile_verified", self.is_mobile_verified)
            .required("is_email_verified", self.is_email_verified);
    }
}
