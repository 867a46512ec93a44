use crate::error::AppError;
use crate::models::auth_jwt_claims::{Claims, IncomingClaims, VerifiedClaims, coerce_subject_id};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, decode_header, encode};
use log::{debug, error, info, trace};

/// The only signing algorithm accepted on verification.
pub const ALLOWED_ALGORITHM: Algorithm = Algorithm::HS256;

// Default JWT duration in hours
pub const DEFAULT_JWT_DURATION_HOURS: i64 = 72;

/// HMAC keys derived from the server secret.
#[derive(Clone)]
pub struct JwtKeys {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_duration: Duration,
}

impl JwtKeys {
    pub fn from_secret(jwt_secret: &str, token_duration_hours: i64) -> Self {
        info!("Initializing JWT keys from configuration");
        let secret = jwt_secret.as_bytes();
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            token_duration: Duration::try_hours(token_duration_hours)
                .unwrap_or_else(|| Duration::hours(DEFAULT_JWT_DURATION_HOURS)),
        }
    }

    /// Generate a JWT token for a user
    pub fn generate_token(&self, user_id: i64, email: Option<&str>) -> Result<String, AppError> {
        let iat = Utc::now();
        let exp = iat
            .checked_add_signed(self.token_duration)
            .ok_or_else(|| AppError::Internal("Failed to calculate JWT expiration time".to_string()))?;

        let claims = Claims {
            id: user_id,
            email: email.map(str::to_string),
            iat: iat.timestamp(),
            exp: exp.timestamp(),
        };

        debug!("Generating JWT token for user {} (exp: {})", user_id, exp);
        encode(&Header::new(ALLOWED_ALGORITHM), &claims, &self.encoding_key).map_err(|e| {
            error!("Failed to generate JWT token: {}", e);
            AppError::Internal(format!("Token generation failed: {}", e))
        })
    }

    /// Verify a JWT token and extract the identity claims.
    ///
    /// The header algorithm is checked against [`ALLOWED_ALGORITHM`] before the
    /// signature is looked at, independent of what the decoder would accept.
    pub fn verify_token(&self, token: &str) -> Result<VerifiedClaims, AppError> {
        trace!("Verifying JWT token");

        let header = decode_header(token)
            .map_err(|err| AppError::Auth(format!("Invalid token header: {}", err)))?;
        if header.alg != ALLOWED_ALGORITHM {
            return Err(AppError::Auth(format!(
                "Unexpected signing algorithm: {:?}",
                header.alg
            )));
        }

        let mut validation = Validation::new(ALLOWED_ALGORITHM);
        validation.algorithms = vec![ALLOWED_ALGORITHM];
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp"]);

        let token_data = decode::<IncomingClaims>(token, &self.decoding_key, &validation)
            .map_err(|err| match err.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    AppError::Auth("Token has expired".to_string())
                }
                jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                    AppError::Auth("Invalid token signature".to_string())
                }
                jsonwebtoken::errors::ErrorKind::InvalidAlgorithm => {
                    AppError::Auth("Invalid token algorithm".to_string())
                }
                jsonwebtoken::errors::ErrorKind::MissingRequiredClaim(claim) => {
                    AppError::Auth(format!("Token missing required claim: {}", claim))
                }
                _ => AppError::Auth(format!("Token validation failed: {:?}", err.kind())),
            })?;

        let claims = token_data.claims;
        let user_id = claims
            .id
            .as_ref()
            .and_then(coerce_subject_id)
            .ok_or_else(|| AppError::Auth("Missing or invalid subject claim".to_string()))?;
        let email = claims
            .email
            .as_ref()
            .and_then(|value| value.as_str())
            .map(str::to_string);

        debug!("JWT token verified successfully for user {}", user_id);
        Ok(VerifiedClaims { user_id, email })
    }
}
