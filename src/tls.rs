// ABOUTME: Loads mutual TLS material from PEM files on disk.
// ABOUTME: Produces the root certificate and client identity used by the transport.

use std::path::Path;

use crate::config::TlsPaths;
use crate::error::TlsError;

/// Root trust anchor and client identity for a TLS connection.
pub struct TlsCredentials {
    pub(crate) root_ca: reqwest::Certificate,
    pub(crate) identity: reqwest::Identity,
}

impl std::fmt::Debug for TlsCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsCredentials").finish_non_exhaustive()
    }
}

impl TlsCredentials {
    /// Load a root CA certificate, a client certificate, and its private key.
    ///
    /// The client certificate and key are concatenated into a single PEM
    /// identity. Errors name the file that could not be used, or both halves
    /// of the identity when they do not form a valid pair.
    pub fn load(
        root_ca: impl AsRef<Path>,
        cert: impl AsRef<Path>,
        key: impl AsRef<Path>,
    ) -> Result<Self, TlsError> {
        let root_ca = root_ca.as_ref();
        let cert = cert.as_ref();
        let key = key.as_ref();

        let ca_pem = read(root_ca)?;
        let root_ca_cert =
            reqwest::Certificate::from_pem(&ca_pem).map_err(|source| {
                TlsError::InvalidCertificate {
                    path: root_ca.to_path_buf(),
                    source,
                }
            })?;

        let mut identity_pem = read(cert)?;
        identity_pem.push(b'\n');
        identity_pem.extend_from_slice(&read(key)?);
        let identity =
            reqwest::Identity::from_pem(&identity_pem).map_err(|source| {
                TlsError::InvalidIdentity {
                    cert: cert.to_path_buf(),
                    key: key.to_path_buf(),
                    source,
                }
            })?;

        tracing::debug!(
            root_ca = %root_ca.display(),
            cert = %cert.display(),
            "loaded TLS credentials"
        );

        Ok(Self {
            root_ca: root_ca_cert,
            identity,
        })
    }

    /// Load credentials when every path is configured, otherwise run without TLS.
    pub fn from_paths(paths: &TlsPaths) -> Result<Option<Self>, TlsError> {
        match paths.complete() {
            Some((root_ca, cert, key)) => Self::load(root_ca, cert, key).map(Some),
            None => Ok(None),
        }
    }
}

fn read(path: &Path) -> Result<Vec<u8>, TlsError> {
    std::fs::read(path).map_err(|source| TlsError::Read {
        path: path.to_path_buf(),
        source,
    })
}
