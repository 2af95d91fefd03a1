use axum::http::HeaderMap;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::error::ApiError;
use crate::models::{Principal, Role};

/// Claims carried by the bearer token issued by the authentication service
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Numeric user id
    pub sub: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub institution_id: Option<i64>,
    pub exp: i64,
}

/// HS256 token validator built once from configuration
#[derive(Clone)]
pub struct JwtValidator {
    key: DecodingKey,
    validation: Validation,
}

impl JwtValidator {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_aud = false;

        Self {
            key: DecodingKey::from_secret(secret.trim_matches('"').as_bytes()),
            validation,
        }
    }

    /// Validate a token and build the principal it describes.
    /// Unknown role names are dropped rather than failing the request.
    pub fn validate(&self, token: &str) -> Result<Principal, ApiError> {
        let token_data = decode::<Claims>(token, &self.key, &self.validation).map_err(|e| {
            tracing::warn!("JWT validation failed: {}", e);
            ApiError::Unauthorized(format!("Invalid JWT token: {}", e))
        })?;
        let claims = token_data.claims;

        let user_id = claims
            .sub
            .parse::<i64>()
            .map_err(|_| ApiError::Unauthorized("Invalid subject in JWT".to_string()))?;

        let mut principal = Principal::new(user_id);
        for name in &claims.roles {
            match name.parse::<Role>() {
                Ok(role) => {
                    principal.roles.insert(role);
                }
                Err(e) => debug!("Ignoring role claim: {}", e),
            }
        }
        principal.institution_id = claims.institution_id;

        Ok(principal)
    }

    /// Authenticate a request from its Authorization header
    pub fn principal_from_headers(&self, headers: &HeaderMap) -> Result<Principal, ApiError> {
        let auth_header = headers.get("Authorization").and_then(|h| h.to_str().ok());
        let token = extract_jwt_from_header(auth_header)?;
        self.validate(token)
    }
}

/// Extract JWT token from Authorization header
/// Expected format: "Bearer <token>"
pub fn extract_jwt_from_header(auth_header: Option<&str>) -> Result<&str, ApiError> {
    let auth_value = auth_header.ok_or_else(|| {
        ApiError::Unauthorized("Missing Authorization header".to_string())
    })?;

    auth_value
        .strip_prefix("Bearer ")
        .ok_or_else(|| {
            ApiError::Unauthorized("Invalid Authorization header format, expected 'Bearer <token>'".to_string())
        })
}
