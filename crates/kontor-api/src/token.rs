//! JWT token service
//!
//! HS256 with the algorithm pinned explicitly so a tampered header cannot
//! downgrade verification.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use kontor_core::{KontorError, Result, Staff};

const JWT_ALGORITHM: Algorithm = Algorithm::HS256;

/// Minimum secret length (256 bits) for HS256
const MIN_SECRET_LENGTH: usize = 32;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (staff id)
    pub sub: String,
    pub iss: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Unique token identifier
    pub jti: String,
    /// "access" or "refresh"
    pub token_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Issues and verifies gateway tokens.
#[derive(Clone)]
pub struct TokenService {
    secret: String,
    issuer: String,
    access_token_expiry_secs: i64,
    refresh_token_expiry_secs: i64,
}

impl TokenService {
    pub fn new(
        secret: String,
        issuer: String,
        access_token_expiry_secs: i64,
        refresh_token_expiry_secs: i64,
    ) -> Self {
        if secret.len() < MIN_SECRET_LENGTH {
            warn!(
                "JWT secret is only {} bytes, recommended minimum is {} bytes for HS256",
                secret.len(),
                MIN_SECRET_LENGTH
            );
        }
        Self {
            secret,
            issuer,
            access_token_expiry_secs,
            refresh_token_expiry_secs,
        }
    }

    fn issue(&self, staff: &Staff, token_type: &str, expiry_secs: i64) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: staff.id.to_string(),
            iss: self.issuer.clone(),
            exp: (now + Duration::seconds(expiry_secs)).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::now_v7().to_string(),
            token_type: token_type.to_string(),
            email: Some(staff.email.clone()),
        };

        encode(
            &Header::new(JWT_ALGORITHM),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| KontorError::internal_error(format!("failed to sign token: {}", e)))
    }

    /// Issue an access/refresh token pair for a staff member.
    pub fn issue_pair(&self, staff: &Staff) -> Result<TokenPair> {
        Ok(TokenPair {
            access_token: self.issue(staff, "access", self.access_token_expiry_secs)?,
            refresh_token: self.issue(staff, "refresh", self.refresh_token_expiry_secs)?,
            token_type: "Bearer".to_string(),
            expires_in: self.access_token_expiry_secs,
        })
    }

    /// Verify an access token and return its claims.
    pub fn verify_access_token(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(JWT_ALGORITHM);
        validation.set_issuer(&[&self.issuer]);

        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|e| KontorError::unauthenticated(format!("invalid token: {}", e)))?;

        if data.claims.token_type != "access" {
            return Err(KontorError::unauthenticated("not an access token"));
        }
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kontor_core::{StaffDepartmentId, StaffId, StaffPositionId};

    fn test_staff() -> Staff {
        let now = Utc::now();
        Staff {
            id: StaffId::new(),
            email: "jane@example.com".to_string(),
            first_name: "Jane".to_string(),
            last_name: "Smith".to_string(),
            password_hash: "hash".to_string(),
            bio: None,
            position_id: StaffPositionId::new(),
            department_id: StaffDepartmentId::new(),
            is_root: false,
            created_by_id: None,
            updated_by_id: None,
            deleted_by_id: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    fn service() -> TokenService {
        TokenService::new(
            "a-test-secret-that-is-long-enough!!".to_string(),
            "kontor-test".to_string(),
            3600,
            86400,
        )
    }

    #[test]
    fn test_issue_and_verify_roundtrip() {
        let service = service();
        let staff = test_staff();
        let pair = service.issue_pair(&staff).unwrap();

        let claims = service.verify_access_token(&pair.access_token).unwrap();
        assert_eq!(claims.sub, staff.id.to_string());
        assert_eq!(claims.token_type, "access");
    }

    #[test]
    fn test_refresh_token_rejected_as_access() {
        let service = service();
        let pair = service.issue_pair(&test_staff()).unwrap();
        assert!(service.verify_access_token(&pair.refresh_token).is_err());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let service = service();
        let other = TokenService::new(
            "another-secret-that-is-long-enough!".to_string(),
            "kontor-test".to_string(),
            3600,
            86400,
        );
        let pair = service.issue_pair(&test_staff()).unwrap();
        assert!(other.verify_access_token(&pair.access_token).is_err());
    }

    #[test]
    fn test_garbage_token_rejected() {
        assert!(service().verify_access_token("garbage").is_err());
    }
}
