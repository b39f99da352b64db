//! Last-resort principal recovery from an unverified token payload.
//!
//! Decodes the JWT payload without checking the signature. This is
//! explicitly not a trust boundary: the identity server remains the source
//! of truth, and this path only fills in display identity when
//! introspection is unavailable.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;

use super::Principal;

/// Loose claim shape; identity servers vary in which fields they emit.
#[derive(Debug, Deserialize)]
struct UnverifiedClaims {
    sub: Option<String>,
    username: Option<String>,
    #[serde(alias = "preferred_username")]
    name: Option<String>,
    email: Option<String>,
    role: Option<String>,
    created_at: Option<u64>,
}

/// Decode the payload segment of a JWT without verifying its signature.
fn decode_payload(token: &str) -> Option<UnverifiedClaims> {
    let mut segments = token.split('.');
    let _header = segments.next()?;
    let payload = segments.next()?;
    // A JWT has exactly three segments
    segments.next()?;
    if segments.next().is_some() {
        return None;
    }

    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// Build a degraded principal from the token's unverified payload.
///
/// Returns `None` when the token is not a decodable JWT or carries no
/// subject at all. Missing role defaults to `"user"`.
pub fn principal_from_token(token: &str) -> Option<Principal> {
    let claims = decode_payload(token)?;
    let id = claims.sub?;
    let username = claims
        .username
        .or(claims.name)
        .unwrap_or_else(|| id.clone());

    Some(Principal {
        id,
        username,
        email: claims.email,
        role: claims.role.unwrap_or_else(|| "user".to_string()),
        created_at: claims.created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header};
    use serde::Serialize;

    #[derive(Serialize)]
    struct TestClaims {
        sub: String,
        username: String,
        role: String,
        exp: u64,
    }

    fn mint(claims: &TestClaims) -> String {
        jsonwebtoken::encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap()
    }

    #[test]
    fn test_decodes_minted_token() {
        let token = mint(&TestClaims {
            sub: "user-42".to_string(),
            username: "alice".to_string(),
            role: "admin".to_string(),
            exp: 4_000_000_000,
        });

        let principal = principal_from_token(&token).unwrap();
        assert_eq!(principal.id, "user-42");
        assert_eq!(principal.username, "alice");
        assert_eq!(principal.role, "admin");
        assert_eq!(principal.email, None);
    }

    #[test]
    fn test_missing_role_defaults_to_user() {
        #[derive(Serialize)]
        struct Minimal {
            sub: String,
        }
        let token = jsonwebtoken::encode(
            &Header::default(),
            &Minimal {
                sub: "user-7".to_string(),
            },
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        let principal = principal_from_token(&token).unwrap();
        assert_eq!(principal.role, "user");
        assert_eq!(principal.username, "user-7");
    }

    #[test]
    fn test_rejects_non_jwt_tokens() {
        assert!(principal_from_token("opaque-bearer-token").is_none());
        assert!(principal_from_token("a.b").is_none());
        assert!(principal_from_token("a.b.c.d").is_none());
        assert!(principal_from_token("").is_none());
    }

    #[test]
    fn test_rejects_payload_without_subject() {
        #[derive(Serialize)]
        struct NoSub {
            username: String,
        }
        let token = jsonwebtoken::encode(
            &Header::default(),
            &NoSub {
                username: "ghost".to_string(),
            },
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        assert!(principal_from_token(&token).is_none());
    }

    #[test]
    fn test_rejects_garbage_payload() {
        // Valid shape, payload is not base64url JSON
        assert!(principal_from_token("eyJh.!!!.sig").is_none());
    }
}
