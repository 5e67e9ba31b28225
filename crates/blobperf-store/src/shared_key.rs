use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{StoreError, StoreResult};

type HmacSha256 = Hmac<Sha256>;

/// Storage account shared key.
///
/// The key is kept in its base64 form exactly as handed out by the portal
/// and decoded on every signature, so a malformed key surfaces as a
/// [`StoreError::Signing`] at the point of use rather than at construction.
#[derive(Clone)]
pub struct SharedKeyCredential {
    account: String,
    key: String,
}

impl SharedKeyCredential {
    pub fn new(account: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            key: key.into(),
        }
    }

    /// Account the key belongs to.
    pub fn account(&self) -> &str {
        &self.account
    }

    /// HMAC-SHA256 over `string_to_sign` with the decoded key, base64-encoded.
    pub fn sign(&self, string_to_sign: &str) -> StoreResult<String> {
        let key = STANDARD
            .decode(self.key.trim())
            .map_err(|e| StoreError::Signing(format!("account key is not valid base64: {e}")))?;
        let mut mac = HmacSha256::new_from_slice(&key)
            .map_err(|e| StoreError::Signing(e.to_string()))?;
        mac.update(string_to_sign.as_bytes());
        Ok(STANDARD.encode(mac.finalize().into_bytes()))
    }
}

impl std::fmt::Debug for SharedKeyCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SharedKeyCredential({}, <redacted>)", self.account)
    }
}

/// Headers that participate in a Shared Key request signature.
#[derive(Clone, Debug, Default)]
pub struct SignedRequest<'a> {
    pub method: &'a str,
    pub content_length: u64,
    pub content_type: &'a str,
    /// `x-ms-*` headers; order does not matter, they are sorted on signing.
    pub ms_headers: Vec<(&'a str, String)>,
    /// Canonical resource: `/{account}{url path}`.
    pub resource: String,
}

impl SignedRequest<'_> {
    /// Build the Shared Key string-to-sign for blob service versions
    /// 2015-02-21 and later (a zero content length is sent as empty).
    pub fn string_to_sign(&self) -> String {
        let content_length = if self.content_length == 0 {
            String::new()
        } else {
            self.content_length.to_string()
        };

        let standard = [
            self.method,
            "", // Content-Encoding
            "", // Content-Language
            content_length.as_str(),
            "", // Content-MD5
            self.content_type,
            "", // Date (x-ms-date is used instead)
            "", // If-Modified-Since
            "", // If-Match
            "", // If-None-Match
            "", // If-Unmodified-Since
            "", // Range
        ];

        let mut headers: Vec<(String, &str)> = self
            .ms_headers
            .iter()
            .map(|(name, value)| (name.to_ascii_lowercase(), value.trim()))
            .collect();
        headers.sort();

        let mut out = standard.join("\n");
        out.push('\n');
        for (name, value) in headers {
            out.push_str(&name);
            out.push(':');
            out.push_str(value);
            out.push('\n');
        }
        out.push_str(&self.resource);
        out
    }

    /// Value of the `Authorization` header for this request.
    pub fn authorization(&self, credential: &SharedKeyCredential) -> StoreResult<String> {
        let signature = credential.sign(&self.string_to_sign())?;
        Ok(format!("SharedKey {}:{}", credential.account(), signature))
    }
}
