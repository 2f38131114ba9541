// mimir-service/src/utils/mod.rs
use crate::models::{Claims, ServiceError, User};
use actix_web::http::header;
use actix_web::HttpRequest;
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use std::env;

// JWT utility functions
pub mod jwt {
    use super::*;

    // Get JWT secret from environment or use default
    fn get_jwt_secret() -> String {
        env::var("JWT_SECRET").unwrap_or_else(|_| "mimir_super_secret_key".to_string())
    }

    // Generate a new JWT token for a user
    pub fn generate_token(user: &User) -> Result<String, ServiceError> {
        let secret = get_jwt_secret();
        let expiration = Utc::now()
            .checked_add_signed(Duration::days(7))
            .expect("Valid timestamp")
            .timestamp() as usize;

        let claims = Claims {
            sub: user.id.clone(),
            email: user.email.clone(),
            exp: expiration,
            iat: Utc::now().timestamp() as usize,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_ref()),
        )
            .map_err(|_| ServiceError::InternalServerError)
    }

    // Validate and decode a JWT token
    pub fn decode_token(token: &str) -> Result<Claims, ServiceError> {
        let secret = get_jwt_secret();

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret.as_ref()),
            &Validation::default(),
        )
            .map(|data| data.claims)
            .map_err(|_| ServiceError::Unauthorized)
    }

    // Extract JWT from Authorization header
    pub fn extract_token_from_header(auth_header: &str) -> Result<String, ServiceError> {
        if !auth_header.starts_with("Bearer ") {
            return Err(ServiceError::Unauthorized);
        }

        Ok(auth_header.trim_start_matches("Bearer ").to_string())
    }
}

// Password utility functions
pub mod password {
    use super::*;

    // Hash a password using bcrypt
    pub fn hash_password(password: &str) -> Result<String, ServiceError> {
        hash(password, DEFAULT_COST)
            .map_err(|_| ServiceError::InternalServerError)
    }

    // Verify a password against a hash
    pub fn verify_password(password: &str, hash: &str) -> Result<bool, ServiceError> {
        verify(password, hash)
            .map_err(|_| ServiceError::InternalServerError)
    }
}

// Identity resolution: every authorization path starts here. A request with
// no resolvable actor gets nothing further.
pub mod identity {
    use super::*;

    // Resolve the calling actor from the request's bearer token.
    // None means unauthenticated; it carries no other meaning.
    pub fn resolve_actor(req: &HttpRequest) -> Option<Claims> {
        let auth_header = req.headers().get(header::AUTHORIZATION)?;
        let auth_str = auth_header.to_str().ok()?;
        let token = jwt::extract_token_from_header(auth_str).ok()?;
        jwt::decode_token(&token).ok()
    }

    // Fail-closed variant for route handlers
    pub fn require_actor(req: &HttpRequest) -> Result<Claims, ServiceError> {
        resolve_actor(req).ok_or(ServiceError::Unauthorized)
    }
}
