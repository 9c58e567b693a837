use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::{Authorization, HeaderMapExt};
use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use tracing::warn;

use cofound_types::api::Claims;
use cofound_types::models::User;

use crate::error::ApiError;
use crate::run_blocking;
use crate::state::AppState;

/// The resolved caller, inserted by [`require_user`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

enum Keys {
    Secret(DecodingKey),
    Jwks(JwkSet),
}

/// Verifies bearer tokens issued by the identity provider.
pub struct TokenVerifier {
    keys: Keys,
    /// Accepted `azp` values. A token without `azp` is accepted.
    allowed_parties: Vec<String>,
}

impl TokenVerifier {
    /// HS256 tokens signed with a shared secret.
    pub fn from_secret(secret: &str, allowed_parties: Vec<String>) -> Self {
        Self {
            keys: Keys::Secret(DecodingKey::from_secret(secret.as_bytes())),
            allowed_parties,
        }
    }

    /// RS256 tokens signed by one of the keys in `jwks`, picked by `kid`.
    pub fn from_jwks(jwks: JwkSet, allowed_parties: Vec<String>) -> Self {
        Self {
            keys: Keys::Jwks(jwks),
            allowed_parties,
        }
    }

    /// Fetch the provider's key set once, at startup.
    pub async fn fetch_jwks(url: &str) -> anyhow::Result<JwkSet> {
        let jwks = reqwest::get(url).await?.error_for_status()?.json::<JwkSet>().await?;
        Ok(jwks)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, ApiError> {
        let invalid = || ApiError::Unauthorized("Invalid authentication token".into());

        let decoded = match &self.keys {
            Keys::Secret(key) => decode::<Claims>(token, key, &validation(Algorithm::HS256)),
            Keys::Jwks(jwks) => {
                let header = decode_header(token).map_err(|_| invalid())?;
                let kid = header.kid.ok_or_else(invalid)?;
                let jwk = jwks.find(&kid).ok_or_else(|| {
                    warn!("Token signed with unknown key id {}", kid);
                    invalid()
                })?;
                let key = DecodingKey::from_jwk(jwk).map_err(|_| invalid())?;
                decode::<Claims>(token, &key, &validation(Algorithm::RS256))
            }
        };

        let claims = decoded
            .map_err(|e| match e.kind() {
                JwtErrorKind::ExpiredSignature => ApiError::Unauthorized("Token has expired".into()),
                _ => {
                    warn!("Rejected token: {}", e);
                    invalid()
                }
            })?
            .claims;

        if let Some(azp) = &claims.azp {
            if !self.allowed_parties.iter().any(|p| p == azp) {
                warn!("Rejected token issued for {}", azp);
                return Err(ApiError::Unauthorized("Invalid token origin".into()));
            }
        }
        if claims.sub.is_empty() {
            return Err(ApiError::Unauthorized("Invalid token payload - missing subject".into()));
        }
        Ok(claims)
    }
}

fn validation(algorithm: Algorithm) -> Validation {
    let mut validation = Validation::new(algorithm);
    validation.validate_nbf = true;
    // Provider session tokens carry no audience.
    validation.validate_aud = false;
    validation
}

/// Verify the bearer token and insert its [`Claims`].
pub async fn require_token(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let bearer = req
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .ok_or_else(|| ApiError::Unauthorized("Could not validate credentials".into()))?;

    let claims = state.verifier.verify(bearer.token())?;
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Resolve the token subject to a local user. Runs after [`require_token`].
pub async fn require_user(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = req
        .extensions()
        .get::<Claims>()
        .cloned()
        .ok_or_else(|| ApiError::Unauthorized("Could not validate credentials".into()))?;

    let mm = state.matchmaker.clone();
    let user = run_blocking(move || Ok(mm.db().get_user_by_external_id(&claims.sub)?))
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found. Please complete onboarding first.".into()))?;

    if user.is_banned {
        return Err(ApiError::Forbidden("User account is banned".into()));
    }
    if !user.is_active {
        return Err(ApiError::Forbidden("User account is inactive".into()));
    }

    req.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use jsonwebtoken::{EncodingKey, Header, encode};

    use super::*;

    const SECRET: &str = "test-signing-secret";

    fn token(sub: &str, azp: Option<&str>, exp_offset: i64) -> String {
        let claims = Claims {
            sub: sub.to_string(),
            exp: (chrono::Utc::now().timestamp() + exp_offset) as usize,
            nbf: None,
            azp: azp.map(str::to_string),
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_bytes())).unwrap()
    }

    fn verifier() -> TokenVerifier {
        TokenVerifier::from_secret(SECRET, vec!["http://localhost:3000".into()])
    }

    #[test]
    fn accepts_valid_token() {
        let claims = verifier().verify(&token("user_1", Some("http://localhost:3000"), 600)).unwrap();
        assert_eq!(claims.sub, "user_1");

        // azp is optional
        assert!(verifier().verify(&token("user_1", None, 600)).is_ok());
    }

    #[test]
    fn rejects_foreign_origin_and_expiry() {
        let err = verifier()
            .verify(&token("user_1", Some("https://evil.example"), 600))
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid token origin");

        let err = verifier().verify(&token("user_1", None, -3600)).unwrap_err();
        assert_eq!(err.to_string(), "Token has expired");

        let other = TokenVerifier::from_secret("another-secret", vec![]);
        assert!(other.verify(&token("user_1", None, 600)).is_err());
    }
}
