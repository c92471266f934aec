use crate::config::AuthConfig;
use crate::error::DownloadError;
use base64::Engine;
use std::path::Path;

/// The five auth modes named in spec §4.C; `Mtls` is handled separately since
/// it configures the client builder's identity rather than a header.
#[derive(Debug, Clone)]
pub enum AuthMode {
    None,
    Basic { username: String, password: String },
    Bearer { token: String },
    Header { name: String, value: String },
}

pub fn apply_headers(auth: &AuthConfig, headers: &mut reqwest::header::HeaderMap) -> Result<(), DownloadError> {
    match auth {
        AuthConfig::Basic { username, password } => {
            let encoded = base64::engine::general_purpose::STANDARD.encode(format!("{username}:{password}"));
            let value = reqwest::header::HeaderValue::from_str(&format!("Basic {encoded}"))?;
            headers.insert(reqwest::header::AUTHORIZATION, value);
        }
        AuthConfig::Bearer { token } => {
            let value = reqwest::header::HeaderValue::from_str(&format!("Bearer {token}"))?;
            headers.insert(reqwest::header::AUTHORIZATION, value);
        }
        AuthConfig::Header { name, value } => {
            let header_name = reqwest::header::HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| DownloadError::Io(std::io::Error::other(format!("invalid header name '{name}'"))))?;
            let header_value = reqwest::header::HeaderValue::from_str(value)?;
            headers.insert(header_name, header_value);
        }
        AuthConfig::Mtls { .. } => unreachable!("mTLS is applied to the client builder, not headers"),
    }
    Ok(())
}

pub fn apply_mtls(
    builder: reqwest::ClientBuilder,
    client_cert_path: &Path,
    client_key_path: &Path,
) -> Result<reqwest::ClientBuilder, DownloadError> {
    let mut identity_pem = std::fs::read(client_cert_path)?;
    identity_pem.extend_from_slice(&std::fs::read(client_key_path)?);
    let identity = reqwest::Identity::from_pem(&identity_pem).map_err(DownloadError::Request)?;
    Ok(builder.identity(identity))
}
