//! Canonical request message and HMAC-SHA256 digests.
//!
//! The signed message is the concatenation of:
//! 1. the first value of each configured header, in configured order
//!    (a missing header contributes an empty string),
//! 2. the request body encoded as an HTML-safe JSON string literal,
//! 3. the raw query string (empty when absent).

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use http::header::{HeaderMap, HeaderName};
use sha2::Sha256;

use crate::keys::{KeyError, KeySet};

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the base64 (standard alphabet) encoded digest.
pub const HMAC_HEADER: HeaderName = HeaderName::from_static("x-hmac-hash");

/// Borrowed view of the request content covered by a signature.
#[derive(Debug, Clone, Copy)]
pub struct SigningInput<'a> {
    headers: &'a HeaderMap,
    body: &'a [u8],
    query: &'a str,
}

impl<'a> SigningInput<'a> {
    #[must_use]
    pub fn new(headers: &'a HeaderMap, body: &'a [u8], query: Option<&'a str>) -> Self {
        Self {
            headers,
            body,
            query: query.unwrap_or_default(),
        }
    }

    #[must_use]
    pub fn from_parts(parts: &'a http::request::Parts, body: &'a [u8]) -> Self {
        Self::new(&parts.headers, body, parts.uri.query())
    }
}

/// Signs and verifies requests against a fixed, ordered header list.
///
/// Immutable after construction; share it behind an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct HmacSigner {
    headers: Vec<HeaderName>,
}

impl HmacSigner {
    #[must_use]
    pub fn new(headers: Vec<HeaderName>) -> Self {
        Self { headers }
    }

    #[must_use]
    pub fn headers(&self) -> &[HeaderName] {
        &self.headers
    }

    /// Build the canonical message for `input`.
    #[must_use]
    pub fn message(&self, input: &SigningInput<'_>) -> String {
        let mut message = String::new();

        for name in &self.headers {
            if let Some(value) = input.headers.get(name) {
                message.push_str(&String::from_utf8_lossy(value.as_bytes()));
            }
        }

        message.push_str(&json_string_literal(input.body));

        message.push_str(input.query);
        message
    }

    /// Raw HMAC-SHA256 digest of the canonical message.
    ///
    /// Any secret is accepted here, including an empty one; rejecting weak
    /// secrets is [`KeySet::validate`]'s job.
    #[must_use]
    pub fn sign(&self, input: &SigningInput<'_>, secret: &[u8]) -> Vec<u8> {
        let mut mac = keyed_mac(secret);
        mac.update(self.message(input).as_bytes());
        mac.finalize().into_bytes().to_vec()
    }

    /// Base64 form of [`sign`](Self::sign), as carried in [`HMAC_HEADER`].
    #[must_use]
    pub fn sign_encoded(&self, input: &SigningInput<'_>, secret: &[u8]) -> String {
        BASE64.encode(self.sign(input, secret))
    }

    /// Sign with the most recently created key of `keys`.
    ///
    /// # Errors
    /// Returns [`KeyError::EmptyKeySet`] if `keys` holds no keys.
    pub fn sign_with_latest(
        &self,
        input: &SigningInput<'_>,
        keys: &KeySet,
    ) -> Result<String, KeyError> {
        let key = keys.latest_key()?;
        Ok(self.sign_encoded(input, key.value.as_bytes()))
    }

    /// True iff some key in `keys` reproduces `presented`.
    ///
    /// Comparison is constant-time per key. An empty key set never verifies.
    #[must_use]
    pub fn verify(&self, input: &SigningInput<'_>, keys: &KeySet, presented: &[u8]) -> bool {
        let message = self.message(input);
        keys.keys().iter().any(|key| {
            let mut mac = keyed_mac(key.value.as_bytes());
            mac.update(message.as_bytes());
            mac.verify_slice(presented).is_ok()
        })
    }
}

/// HTML-safe JSON string literal for `body`, as peers using Go's
/// `encoding/json` encode it.
///
/// On top of the `serde_json` escapes, `<`, `>`, `&`, U+2028 and U+2029 are
/// written as `\u` escapes, and each byte that is not valid UTF-8 becomes
/// `\ufffd`.
fn json_string_literal(body: &[u8]) -> String {
    let mut out = String::with_capacity(body.len() + 2);
    out.push('"');
    for chunk in body.utf8_chunks() {
        let encoded = serde_json::Value::String(chunk.valid().to_owned()).to_string();
        let contents = encoded
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .unwrap_or_default();
        for ch in contents.chars() {
            match ch {
                '<' => out.push_str("\\u003c"),
                '>' => out.push_str("\\u003e"),
                '&' => out.push_str("\\u0026"),
                '\u{2028}' => out.push_str("\\u2028"),
                '\u{2029}' => out.push_str("\\u2029"),
                other => out.push(other),
            }
        }
        for _ in chunk.invalid() {
            out.push_str("\\ufffd");
        }
    }
    out.push('"');
    out
}

fn keyed_mac(secret: &[u8]) -> HmacSha256 {
    #[allow(clippy::expect_used)]
    HmacSha256::new_from_slice(secret).expect("HMAC accepts keys of any length")
}
