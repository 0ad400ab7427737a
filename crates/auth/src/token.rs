//! HS256 bearer-token issuance and verification.
//!
//! Tokens are stateless: any correctly signed, unexpired token is accepted and
//! there is no server-side revocation. A token therefore stays valid until
//! `exp` even after logout or account deletion; the session layer closes the
//! deleted-account case by re-reading the account on every request.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::Serialize;

use omniven_core::UserId;

use crate::claims::{AccessClaims, TokenError, TokenIdentity, validate_claims};
use crate::SigningSecret;

/// Policy default token lifetime.
pub const DEFAULT_VALIDITY_DAYS: i64 = 365;

/// Token handed back to the client after a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_at: DateTime<Utc>,
}

pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    validity: Duration,
}

impl TokenService {
    pub fn new(secret: &SigningSecret, validity: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against the injected clock in `validate_claims`,
        // not against the library's wall clock.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            validity,
        }
    }

    /// Service with the default 365-day validity.
    pub fn with_default_validity(secret: &SigningSecret) -> Self {
        Self::new(secret, Duration::days(DEFAULT_VALIDITY_DAYS))
    }

    pub fn validity(&self) -> Duration {
        self.validity
    }

    pub fn issue(
        &self,
        subject_id: UserId,
        subject_username: &str,
        now: DateTime<Utc>,
    ) -> Result<AccessToken, TokenError> {
        let expires_at = now
            .checked_add_signed(self.validity)
            .ok_or_else(|| TokenError::Encoding("expiry out of range".to_string()))?;
        let claims = AccessClaims {
            sub: subject_username.to_string(),
            id: subject_id,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Encoding(e.to_string()))?;

        Ok(AccessToken {
            access_token: token,
            token_type: "bearer",
            expires_at,
        })
    }

    /// Verify signature first, then claims against `now`.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<TokenIdentity, TokenError> {
        let result = self
            .check_mac(token)
            .and_then(|()| {
                jsonwebtoken::decode::<AccessClaims>(token, &self.decoding, &self.validation)
                    .map_err(map_jwt_error)
            })
            .and_then(|data| validate_claims(&data.claims, now));

        if let Err(err) = &result {
            tracing::debug!(error = %err, "access token rejected");
        }
        result
    }

    /// HS256 MAC over `header.payload`, checked before either segment is
    /// decoded so a tampered header is a signature failure too.
    fn check_mac(&self, token: &str) -> Result<(), TokenError> {
        let Some((message, signature)) = token.rsplit_once('.') else {
            return Err(TokenError::Malformed("expected three segments".to_string()));
        };
        if message.matches('.').count() != 1 {
            return Err(TokenError::Malformed("expected three segments".to_string()));
        }

        match jsonwebtoken::crypto::verify(signature, message.as_bytes(), &self.decoding, Algorithm::HS256) {
            Ok(true) => Ok(()),
            Ok(false) => Err(TokenError::InvalidSignature),
            Err(err) => Err(map_jwt_error(err)),
        }
    }
}

impl core::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenService")
            .field("validity", &self.validity)
            .finish_non_exhaustive()
    }
}

fn map_jwt_error(err: jsonwebtoken::errors::Error) -> TokenError {
    match err.kind() {
        // A token signed under another algorithm was not signed by us.
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => TokenError::InvalidSignature,
        ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Malformed(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn secret() -> SigningSecret {
        SigningSecret::new("test-secret-0123456789").unwrap()
    }

    fn service() -> TokenService {
        TokenService::with_default_validity(&secret())
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    /// Replace the character at `idx` with a different base64url character.
    fn flip_char(token: &str, idx: usize) -> String {
        let mut chars: Vec<char> = token.chars().collect();
        chars[idx] = if chars[idx] == 'A' { 'B' } else { 'A' };
        chars.into_iter().collect()
    }

    #[test]
    fn issue_then_verify_returns_subject() {
        let svc = service();
        let id = UserId::new();
        let token = svc.issue(id, "ann", t0()).unwrap();
        assert_eq!(token.token_type, "bearer");
        assert_eq!(token.expires_at, t0() + Duration::days(365));

        let identity = svc.verify(&token.access_token, t0()).unwrap();
        assert_eq!(identity.subject_id, id);
        assert_eq!(identity.subject_username, "ann");
        assert_eq!(identity.issued_at, t0());
        assert_eq!(identity.expires_at, t0() + Duration::days(365));
    }

    #[test]
    fn verify_after_validity_is_expired() {
        let svc = service();
        let token = svc.issue(UserId::new(), "ann", t0()).unwrap();

        let last_valid = t0() + svc.validity();
        assert!(svc.verify(&token.access_token, last_valid).is_ok());
        assert_eq!(
            svc.verify(&token.access_token, last_valid + Duration::seconds(1)),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn token_from_another_secret_is_invalid_signature() {
        let other = TokenService::with_default_validity(
            &SigningSecret::new("another-secret-abcdefgh").unwrap(),
        );
        let token = other.issue(UserId::new(), "ann", t0()).unwrap();
        assert_eq!(
            service().verify(&token.access_token, t0()),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn wrong_segment_count_is_malformed() {
        assert!(matches!(service().verify("garbage", t0()), Err(TokenError::Malformed(_))));
        assert!(matches!(service().verify("a.b", t0()), Err(TokenError::Malformed(_))));
        assert!(matches!(service().verify("a.b.c.d", t0()), Err(TokenError::Malformed(_))));
        assert!(matches!(service().verify("", t0()), Err(TokenError::Malformed(_))));
    }

    #[test]
    fn three_unsigned_segments_are_invalid_signature() {
        assert_eq!(service().verify("not.a.token", t0()), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn every_header_character_is_covered_by_the_signature() {
        let svc = service();
        let token = svc.issue(UserId::new(), "ann", t0()).unwrap().access_token;
        let header_len = token.find('.').unwrap();

        for idx in 0..header_len {
            assert_eq!(
                svc.verify(&flip_char(&token, idx), t0()),
                Err(TokenError::InvalidSignature),
                "header index {idx}"
            );
        }
    }

    #[test]
    fn expiry_beyond_calendar_range_is_an_error() {
        let svc = TokenService::new(&secret(), Duration::days(100_000_000));
        assert!(matches!(
            svc.issue(UserId::new(), "ann", t0()),
            Err(TokenError::Encoding(_))
        ));
    }

    #[test]
    fn missing_id_claim_is_malformed() {
        #[derive(Serialize)]
        struct Partial<'a> {
            sub: &'a str,
            iat: i64,
            exp: i64,
        }
        let raw = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &Partial {
                sub: "ann",
                iat: t0().timestamp(),
                exp: t0().timestamp() + 60,
            },
            &EncodingKey::from_secret(secret().as_bytes()),
        )
        .unwrap();

        assert!(matches!(service().verify(&raw, t0()), Err(TokenError::Malformed(_))));
    }

    #[test]
    fn missing_exp_claim_is_malformed() {
        #[derive(Serialize)]
        struct NoExp<'a> {
            sub: &'a str,
            id: UserId,
            iat: i64,
        }
        let raw = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &NoExp {
                sub: "ann",
                id: UserId::new(),
                iat: t0().timestamp(),
            },
            &EncodingKey::from_secret(secret().as_bytes()),
        )
        .unwrap();

        assert!(matches!(service().verify(&raw, t0()), Err(TokenError::Malformed(_))));
    }

    #[test]
    fn hs512_token_with_same_key_is_rejected() {
        let claims = AccessClaims {
            sub: "ann".to_string(),
            id: UserId::new(),
            iat: t0().timestamp(),
            exp: t0().timestamp() + 60,
        };
        let raw = jsonwebtoken::encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(secret().as_bytes()),
        )
        .unwrap();

        assert_eq!(service().verify(&raw, t0()), Err(TokenError::InvalidSignature));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 64,
            ..ProptestConfig::default()
        })]

        /// Property: changing any single character of any segment is always
        /// rejected as an invalid signature.
        #[test]
        fn tampered_token_is_rejected(pick in any::<prop::sample::Index>()) {
            let svc = service();
            let token = svc.issue(UserId::new(), "ann", t0()).unwrap().access_token;
            let idx = pick.index(token.len());
            prop_assume!(token.as_bytes()[idx] != b'.');

            let tampered = flip_char(&token, idx);
            prop_assert_eq!(svc.verify(&tampered, t0()), Err(TokenError::InvalidSignature));
        }
    }
}
