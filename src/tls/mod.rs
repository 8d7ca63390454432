#[cfg(any(feature = "native-tls", feature = "rustls-tls"))]
use std::path::Path;
use std::path::PathBuf;

use reqwest::ClientBuilder;

use crate::errors::{MimirError, Result};

#[cfg(all(feature = "native-tls", not(feature = "rustls-tls")))]
mod key;

/// TLS material for talking to Mimir
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsConfig {
    pub ca_path: Option<PathBuf>,
    pub cert_path: Option<PathBuf>,
    pub key_path: Option<PathBuf>,
    pub insecure_skip_verify: bool,
}

impl TlsConfig {
    /// True when nothing deviates from the transport defaults
    pub fn is_default(&self) -> bool {
        self == &TlsConfig::default()
    }
}

#[cfg(any(feature = "native-tls", feature = "rustls-tls"))]
fn read(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|source| MimirError::ReadTlsFile {
        path: path.to_path_buf(),
        source,
    })
}

/// Apply `tls` to the client builder
#[cfg(any(feature = "native-tls", feature = "rustls-tls"))]
pub(crate) fn apply(builder: ClientBuilder, tls: &TlsConfig) -> Result<ClientBuilder> {
    // PEM identities are only understood by the rustls backend.
    #[cfg(feature = "rustls-tls")]
    let mut builder = builder.use_rustls_tls();
    #[cfg(not(feature = "rustls-tls"))]
    let mut builder = builder;

    if let Some(ca_path) = &tls.ca_path {
        let pem = read(ca_path)?;
        let certs = reqwest::Certificate::from_pem_bundle(&pem).map_err(|source| MimirError::Tls {
            path: ca_path.clone(),
            source,
        })?;
        for cert in certs {
            builder = builder.add_root_certificate(cert);
        }
    }

    match (&tls.cert_path, &tls.key_path) {
        (Some(cert_path), Some(key_path)) => {
            let cert = read(cert_path)?;
            let key = read(key_path)?;
            builder = builder.identity(identity(cert, key, cert_path, key_path)?);
        }
        (None, None) => {}
        _ => return Err(MimirError::IncompleteTlsIdentity),
    }

    if tls.insecure_skip_verify {
        builder = builder.danger_accept_invalid_certs(true);
    }

    Ok(builder)
}

#[cfg(feature = "rustls-tls")]
fn identity(
    mut cert: Vec<u8>,
    key: Vec<u8>,
    cert_path: &Path,
    _key_path: &Path,
) -> Result<reqwest::Identity> {
    cert.push(b'\n');
    cert.extend_from_slice(&key);
    reqwest::Identity::from_pem(&cert).map_err(|source| MimirError::Tls {
        path: cert_path.to_path_buf(),
        source,
    })
}

/// The native backend only takes PKCS#8 keys, so PKCS#1 and SEC1 keys are
/// rewrapped first.
#[cfg(all(feature = "native-tls", not(feature = "rustls-tls")))]
fn identity(
    cert: Vec<u8>,
    key: Vec<u8>,
    cert_path: &Path,
    key_path: &Path,
) -> Result<reqwest::Identity> {
    let key = key::to_pkcs8_pem(&key).map_err(|source| MimirError::ReadTlsFile {
        path: key_path.to_path_buf(),
        source,
    })?;
    reqwest::Identity::from_pkcs8_pem(&cert, key.as_bytes()).map_err(|source| MimirError::Tls {
        path: cert_path.to_path_buf(),
        source,
    })
}

#[cfg(not(any(feature = "native-tls", feature = "rustls-tls")))]
pub(crate) fn apply(builder: ClientBuilder, tls: &TlsConfig) -> Result<ClientBuilder> {
    if tls.is_default() {
        Ok(builder)
    } else {
        Err(MimirError::TlsUnsupported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_accepted() {
        let builder = apply(reqwest::Client::builder(), &TlsConfig::default()).unwrap();
        assert!(builder.build().is_ok());
        assert!(TlsConfig::default().is_default());
    }

    #[test]
    #[cfg(any(feature = "native-tls", feature = "rustls-tls"))]
    fn test_missing_ca_file() {
        let tls = TlsConfig {
            ca_path: Some(PathBuf::from("/nonexistent/mimir/ca.pem")),
            ..Default::default()
        };

        match apply(reqwest::Client::builder(), &tls) {
            Err(MimirError::ReadTlsFile { path, .. }) => {
                assert_eq!(path, PathBuf::from("/nonexistent/mimir/ca.pem"));
            }
            Err(other) => panic!("Expected ReadTlsFile error, got {other}"),
            Ok(_) => panic!("Expected ReadTlsFile error"),
        }
    }

    #[test]
    #[cfg(any(feature = "native-tls", feature = "rustls-tls"))]
    fn test_cert_without_key() {
        let tls = TlsConfig {
            cert_path: Some(PathBuf::from("/etc/mimir/client.crt")),
            ..Default::default()
        };

        assert!(matches!(
            apply(reqwest::Client::builder(), &tls),
            Err(MimirError::IncompleteTlsIdentity)
        ));
    }

    #[cfg(any(feature = "native-tls", feature = "rustls-tls"))]
    fn testdata(name: &str) -> Option<PathBuf> {
        Some(Path::new(env!("CARGO_MANIFEST_DIR")).join("testdata").join(name))
    }

    #[test]
    #[cfg(any(feature = "native-tls", feature = "rustls-tls"))]
    fn test_client_identity_key_formats() {
        for (cert, key) in [
            ("rsa.crt", "rsa-pkcs1.key"),
            ("rsa.crt", "rsa-pkcs8.key"),
            ("ec.crt", "ec-sec1.key"),
        ] {
            let tls = TlsConfig {
                cert_path: testdata(cert),
                key_path: testdata(key),
                ..Default::default()
            };

            let builder = apply(reqwest::Client::builder(), &tls)
                .unwrap_or_else(|err| panic!("{key}: {err}"));
            assert!(builder.build().is_ok(), "{key}");
        }
    }

    #[test]
    #[cfg(any(feature = "native-tls", feature = "rustls-tls"))]
    fn test_key_file_without_key() {
        let tls = TlsConfig {
            cert_path: testdata("rsa.crt"),
            key_path: testdata("rsa.crt"),
            ..Default::default()
        };

        assert!(apply(reqwest::Client::builder(), &tls).is_err());
    }

    #[test]
    #[cfg(any(feature = "native-tls", feature = "rustls-tls"))]
    fn test_insecure_skip_verify() {
        let tls = TlsConfig {
            insecure_skip_verify: true,
            ..Default::default()
        };
        let builder = apply(reqwest::Client::builder(), &tls).unwrap();
        assert!(builder.build().is_ok());
    }
}
