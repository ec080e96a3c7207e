//! TLS certificate provisioning
//!
//! Loads the previously generated self-signed certificate if both PEM files
//! are present, otherwise generates a fresh one whose Subject-Alternative
//! -Names are derived from the TLS listen address and persists it. Viewers
//! install the certificate once so `wss://` connections are trusted; the
//! DER form is kept around for the download endpoints.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{RelayError, Result};

const CERT_FILE: &str = "skyrelay-cert.pem";
const KEY_FILE: &str = "skyrelay-key.pem";

/// Paths and encodings of the certificate served to viewers
#[derive(Debug, Clone)]
pub struct TlsAssets {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
    pub cert_pem: Vec<u8>,
    pub cert_der: Vec<u8>,
}

/// Load the persisted certificate or generate and persist a new one
pub fn ensure_tls_assets(dir: &Path, https_listen: &SocketAddr) -> Result<TlsAssets> {
    let cert_path = dir.join(CERT_FILE);
    let key_path = dir.join(KEY_FILE);

    if cert_path.exists() && key_path.exists() {
        let cert_pem = std::fs::read(&cert_path)?;
        let cert_der = der_from_pem(&cert_pem)?;
        info!("Reusing TLS certificate at {}", cert_path.display());

        return Ok(TlsAssets {
            cert_path,
            key_path,
            cert_pem,
            cert_der,
        });
    }

    let assets = generate_self_signed(cert_path, key_path, https_listen)?;
    info!("Generated TLS certificate at {}", assets.cert_path.display());
    Ok(assets)
}

/// Generate a self-signed certificate for the listen address and persist
/// both PEM files
fn generate_self_signed(
    cert_path: PathBuf,
    key_path: PathBuf,
    https_listen: &SocketAddr,
) -> Result<TlsAssets> {
    let certified_key = rcgen::generate_simple_self_signed(subject_alt_names(https_listen))
        .map_err(|e| RelayError::Certificate(format!("failed to generate certificate: {}", e)))?;

    let cert_pem = certified_key.cert.pem().into_bytes();
    let key_pem = certified_key.signing_key.serialize_pem().into_bytes();
    let cert_der = certified_key.cert.der().to_vec();

    std::fs::write(&cert_path, &cert_pem)?;
    std::fs::write(&key_path, &key_pem)?;

    Ok(TlsAssets {
        cert_path,
        key_path,
        cert_pem,
        cert_der,
    })
}

/// Names the certificate must cover: always localhost plus both loopback
/// IPs, and the configured host when it is a concrete one
fn subject_alt_names(https_listen: &SocketAddr) -> Vec<String> {
    let mut names = vec![
        "localhost".to_string(),
        "127.0.0.1".to_string(),
        "::1".to_string(),
    ];

    let host = https_listen.ip();
    if !host.is_unspecified() {
        let host = host.to_string();
        if !names.contains(&host) {
            names.push(host);
        }
    }

    names
}

/// Extract the DER encoding of the first certificate in a PEM file
fn der_from_pem(cert_pem: &[u8]) -> Result<Vec<u8>> {
    let mut reader = std::io::BufReader::new(cert_pem);

    for cert in rustls_pemfile::certs(&mut reader) {
        match cert {
            Ok(c) => return Ok(c.to_vec()),
            Err(e) => {
                return Err(RelayError::Certificate(format!(
                    "failed to parse certificate: {}",
                    e
                )));
            }
        }
    }

    Err(RelayError::Certificate(
        "no certificates found in PEM data".to_string(),
    ))
}
