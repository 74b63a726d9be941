use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;

/// Number of random bytes behind each acceptance token.
const TOKEN_BYTES: usize = 32;

/// Issues unguessable, URL-safe acceptance tokens. Issuance is pure
/// generation; uniqueness is enforced by the storage layer's unique index,
/// not assumed from randomness.
#[derive(Debug, Clone, Default)]
pub struct TokenIssuer;

impl TokenIssuer {
    pub fn new() -> Self {
        Self
    }

    pub fn issue(&self) -> String {
        let mut bytes = [0u8; TOKEN_BYTES];
        rand::rng().fill_bytes(&mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }
}
