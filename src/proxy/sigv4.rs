//! AWS Signature Version 4 for GET requests against IoT TwinMaker.
//!
//! Canonical request hashing, credential scope and the HMAC-SHA256 key
//! chain per the SigV4 specification. Only bodyless GET requests are
//! supported; that is the whole surface the forwarding proxy needs.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::Url;
use sha2::{Digest, Sha256};

use crate::web::error::AppError;

type HmacSha256 = Hmac<Sha256>;

/// SHA-256 of an empty payload.
const EMPTY_BODY_SHA256: &str =
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

const SIGNING_ALGORITHM: &str = "AWS4-HMAC-SHA256";
const SERVICE_NAME: &str = "iottwinmaker";

#[derive(Debug, Clone)]
pub struct AwsCredentials {
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
}

/// Headers to attach to the outbound request.
#[derive(Debug)]
pub struct SignedHeaders {
    pub amz_date: String,
    pub authorization: String,
}

pub struct SigV4Signer {
    credentials: AwsCredentials,
}

impl SigV4Signer {
    pub fn new(credentials: AwsCredentials) -> Self {
        Self { credentials }
    }

    /// Signs a bodyless GET request to `url` as of `signed_at`.
    ///
    /// The timestamp is a parameter so the signature is deterministic under
    /// test; production callers pass `Utc::now()`.
    pub fn sign_get(&self, url: &Url, signed_at: DateTime<Utc>) -> Result<SignedHeaders, AppError> {
        let host = url
            .host_str()
            .ok_or_else(|| AppError::InvalidInput(format!("target URL has no host: {url}")))?;
        let amz_date = signed_at.format("%Y%m%dT%H%M%SZ").to_string();
        let datestamp = signed_at.format("%Y%m%d").to_string();

        let canonical_headers = format!("host:{host}\nx-amz-date:{amz_date}\n");
        let signed_header_names = "host;x-amz-date";
        let canonical_request = format!(
            "GET\n{}\n{}\n{}\n{}\n{}",
            url.path(),
            canonical_query_string(url),
            canonical_headers,
            signed_header_names,
            EMPTY_BODY_SHA256,
        );

        let scope = format!(
            "{datestamp}/{}/{SERVICE_NAME}/aws4_request",
            self.credentials.region
        );
        let string_to_sign = format!(
            "{SIGNING_ALGORITHM}\n{amz_date}\n{scope}\n{}",
            hex::encode(Sha256::digest(canonical_request.as_bytes())),
        );

        let signing_key = self.signing_key(&datestamp);
        let signature = hex::encode(hmac_sha256(&signing_key, string_to_sign.as_bytes()));

        let authorization = format!(
            "{SIGNING_ALGORITHM} Credential={}/{scope}, SignedHeaders={signed_header_names}, Signature={signature}",
            self.credentials.access_key_id,
        );

        Ok(SignedHeaders {
            amz_date,
            authorization,
        })
    }

    fn signing_key(&self, datestamp: &str) -> Vec<u8> {
        let secret = format!("AWS4{}", self.credentials.secret_access_key);
        let key = hmac_sha256(secret.as_bytes(), datestamp.as_bytes());
        let key = hmac_sha256(&key, self.credentials.region.as_bytes());
        let key = hmac_sha256(&key, SERVICE_NAME.as_bytes());
        hmac_sha256(&key, b"aws4_request")
    }
}

/// Query parameters re-encoded and sorted as SigV4 canonicalization requires.
fn canonical_query_string(url: &Url) -> String {
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(key, value)| {
            (
                urlencoding::encode(&key).into_owned(),
                urlencoding::encode(&value).into_owned(),
            )
        })
        .collect();
    pairs.sort();
    pairs
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&")
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC-SHA256 accepts any key length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}
