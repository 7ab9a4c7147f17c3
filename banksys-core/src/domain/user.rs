//! User domain model and credential validation

use chrono::NaiveDateTime;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::result::{Error, Result};
use super::wire::deserialize_optional_timestamp;

/// Email shape accepted by the backend's user collection
const EMAIL_PATTERN: &str = r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$";

/// Minimum password length accepted on registration
pub const MIN_PASSWORD_LEN: usize = 6;

/// Represents an authenticated user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    /// Brazilian tax id (11 digits), used as the login identifier
    pub cpf: String,
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub profile_image: Option<String>,
    #[serde(default)]
    pub biometric_enabled: bool,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub created_at: Option<NaiveDateTime>,
}

impl User {
    pub fn new(
        id: impl Into<String>,
        cpf: impl Into<String>,
        full_name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            cpf: cpf.into(),
            full_name: full_name.into(),
            email: email.into(),
            phone: String::new(),
            profile_image: None,
            biometric_enabled: false,
            created_at: None,
        }
    }

    /// A usable identity has at least an id
    pub fn is_present(&self) -> bool {
        !self.id.trim().is_empty()
    }

    /// First word of the display name, for greetings
    pub fn first_name(&self) -> &str {
        self.full_name.split_whitespace().next().unwrap_or("")
    }
}

/// Login request body
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub cpf: String,
    pub password: String,
}

impl LoginRequest {
    /// Validate and normalize raw credentials
    pub fn new(identifier: &str, secret: &str) -> Result<Self> {
        let cpf = normalize_cpf(identifier)?;
        if secret.is_empty() {
            return Err(Error::validation("Password is required"));
        }
        Ok(Self {
            cpf,
            password: secret.to_string(),
        })
    }
}

/// Login response body
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    #[serde(alias = "token")]
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub user: User,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// Registration request body
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub cpf: String,
    pub password: String,
    pub full_name: String,
    pub email: String,
    pub phone: String,
}

impl RegisterRequest {
    pub fn new(
        cpf: &str,
        password: &str,
        full_name: &str,
        email: &str,
        phone: &str,
    ) -> Result<Self> {
        let cpf = normalize_cpf(cpf)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(Error::validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        let full_name = full_name.trim();
        if full_name.chars().count() < 2 {
            return Err(Error::validation("Full name is required"));
        }
        let email = email.trim();
        let email_re = Regex::new(EMAIL_PATTERN)
            .map_err(|e| Error::validation(format!("email pattern: {}", e)))?;
        if !email_re.is_match(email) {
            return Err(Error::validation("Must be a valid email address"));
        }
        let phone = phone.trim();
        if phone.is_empty() {
            return Err(Error::validation("Phone number is required"));
        }
        Ok(Self {
            cpf,
            password: password.to_string(),
            full_name: full_name.to_string(),
            email: email.to_string(),
            phone: phone.to_string(),
        })
    }
}

/// Normalize a CPF to its 11 bare digits
///
/// Accepts the formatted form (`123.456.789-01`) as well as plain digits.
pub fn normalize_cpf(input: &str) -> Result<String> {
    let digits: String = input
        .trim()
        .chars()
        .filter(|c| !matches!(c, '.' | '-' | ' '))
        .collect();

    if digits.len() != 11 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(Error::validation("CPF must be 11 digits"));
    }
    Ok(digits)
}

/// Format a CPF for display with the usual masking
pub fn mask_cpf(cpf: &str) -> String {
    if cpf.len() != 11 || !cpf.chars().all(|c| c.is_ascii_digit()) {
        return cpf.to_string();
    }
    format!("***.{}.{}-**", &cpf[3..6], &cpf[6..9])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_creation() {
        let user = User::new("u1", "12345678901", "Maria Silva Santos", "maria@email.com");
        assert_eq!(user.id, "u1");
        assert!(user.is_present());
        assert_eq!(user.first_name(), "Maria");
    }

    #[test]
    fn test_normalize_cpf() {
        assert_eq!(normalize_cpf("12345678901").unwrap(), "12345678901");
        assert_eq!(normalize_cpf("123.456.789-01").unwrap(), "12345678901");
        assert!(normalize_cpf("1234567890").is_err());
        assert!(normalize_cpf("1234567890a").is_err());
        assert!(normalize_cpf("").is_err());
    }

    #[test]
    fn test_login_request_validation() {
        assert!(LoginRequest::new("12345678901", "senha123").is_ok());
        let err = LoginRequest::new("12345678901", "").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        let err = LoginRequest::new("abc", "senha123").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_register_request_validation() {
        assert!(RegisterRequest::new(
            "98765432100",
            "senha123",
            "João Silva",
            "joao@email.com",
            "+55 11 99999-0000"
        )
        .is_ok());
        assert!(
            RegisterRequest::new("98765432100", "123", "João", "joao@email.com", "1").is_err()
        );
        assert!(
            RegisterRequest::new("98765432100", "senha123", "João", "not-an-email", "1").is_err()
        );
    }

    #[test]
    fn test_login_response_accepts_token_alias() {
        let json = r#"{
            "token": "t1",
            "user": {"id": "u1", "cpf": "12345678901", "full_name": "Maria Silva Santos",
                     "email": "maria@email.com", "phone": "11999999999",
                     "biometric_enabled": true, "created_at": "2024-01-01T12:00:00"}
        }"#;
        let resp: LoginResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.access_token, "t1");
        assert_eq!(resp.token_type, "bearer");
        assert!(resp.user.biometric_enabled);
        assert!(resp.user.created_at.is_some());
    }

    #[test]
    fn test_user_roundtrips_through_cache_format() {
        let json = r#"{"id": "u1", "cpf": "12345678901", "full_name": "Maria",
                       "email": "m@e.com", "created_at": "2024-01-01T12:00:00.000000"}"#;
        let user: User = serde_json::from_str(json).unwrap();
        let cached = serde_json::to_string(&user).unwrap();
        let restored: User = serde_json::from_str(&cached).unwrap();
        assert_eq!(user, restored);
    }

    #[test]
    fn test_mask_cpf() {
        assert_eq!(mask_cpf("12345678901"), "***.456.789-**");
        assert_eq!(mask_cpf("short"), "short");
    }
}
