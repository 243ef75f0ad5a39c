//! OAuth 1.0a request signing (HMAC-SHA1) for user-context API calls.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::{engine::general_purpose::STANDARD, Engine};
use hmac::{Hmac, Mac};
use sha1::Sha1;
use url::Url;

use crate::account::Credentials;
use crate::api::ApiError;

#[derive(Debug, Clone)]
pub struct RequestSigner {
    credentials: Credentials,
}

impl RequestSigner {
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }

    /// `Authorization` header value for a request with the given query/form parameters.
    pub fn authorization(
        &self,
        method: &str,
        url: &Url,
        params: &[(String, String)],
    ) -> Result<String, ApiError> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs().to_string())
            .unwrap_or_else(|_| "0".to_string());
        self.authorization_with(method, url, params, &generate_nonce(), &timestamp)
    }

    fn authorization_with(
        &self,
        method: &str,
        url: &Url,
        params: &[(String, String)],
        nonce: &str,
        timestamp: &str,
    ) -> Result<String, ApiError> {
        let mut oauth_params: BTreeMap<String, String> = BTreeMap::new();
        oauth_params.insert(
            "oauth_consumer_key".to_string(),
            self.credentials.consumer_key.clone(),
        );
        oauth_params.insert("oauth_nonce".to_string(), nonce.to_string());
        oauth_params.insert(
            "oauth_signature_method".to_string(),
            "HMAC-SHA1".to_string(),
        );
        oauth_params.insert("oauth_timestamp".to_string(), timestamp.to_string());
        oauth_params.insert(
            "oauth_token".to_string(),
            self.credentials.access_token_key.clone(),
        );
        oauth_params.insert("oauth_version".to_string(), "1.0".to_string());

        let signature = self.signature(method, url, &oauth_params, params)?;
        oauth_params.insert("oauth_signature".to_string(), signature);

        let header_parts: Vec<String> = oauth_params
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", percent_encode(k), percent_encode(v)))
            .collect();
        Ok(format!("OAuth {}", header_parts.join(", ")))
    }

    fn signature(
        &self,
        method: &str,
        url: &Url,
        oauth_params: &BTreeMap<String, String>,
        params: &[(String, String)],
    ) -> Result<String, ApiError> {
        let port = url.port().map(|port| format!(":{port}")).unwrap_or_default();
        let base_url = format!(
            "{}://{}{}{}",
            url.scheme(),
            url.host_str().unwrap_or(""),
            port,
            url.path()
        );

        // Sorted by encoded key, then encoded value.
        let mut encoded: Vec<(String, String)> = oauth_params
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .chain(params.iter().cloned())
            .chain(url.query_pairs().map(|(k, v)| (k.into_owned(), v.into_owned())))
            .map(|(k, v)| (percent_encode(&k), percent_encode(&v)))
            .collect();
        encoded.sort();
        let param_string = encoded
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");

        let signature_base = format!(
            "{}&{}&{}",
            method.to_uppercase(),
            percent_encode(&base_url),
            percent_encode(&param_string)
        );
        let signing_key = format!(
            "{}&{}",
            percent_encode(&self.credentials.consumer_secret),
            percent_encode(&self.credentials.access_token_secret)
        );

        let mut mac = Hmac::<Sha1>::new_from_slice(signing_key.as_bytes())
            .map_err(|e| ApiError::Signing(e.to_string()))?;
        mac.update(signature_base.as_bytes());
        Ok(STANDARD.encode(mac.finalize().into_bytes()))
    }
}

fn generate_nonce() -> String {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    let bytes: Vec<u8> = (0..32).map(|_| rand::random()).collect();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Percent-encode a string per RFC 3986.
fn percent_encode(s: &str) -> String {
    let mut result = String::new();
    for byte in s.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~') {
            result.push(byte as char);
        } else {
            result.push_str(&format!("%{byte:02X}"));
        }
    }
    result
}
