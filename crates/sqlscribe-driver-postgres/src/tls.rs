//! PostgreSQL TLS support
//!
//! Maps libpq-style `sslmode` values onto a native-tls connector for tokio-postgres.

use native_tls::{Certificate, TlsConnector as NativeTlsConnector, TlsConnectorBuilder};
use postgres_native_tls::MakeTlsConnector;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// Error types for TLS operations
#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    #[error("Unknown sslmode '{0}' (expected disable, prefer, require, verify-ca or verify-full)")]
    UnknownMode(String),

    /// Failed to read the root certificate file
    #[error("Failed to load CA certificate from {path}: {source}")]
    CaCertLoadFailed {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid CA certificate format: {0}")]
    InvalidCaCert(String),

    #[error("sslmode {mode} requires a root certificate (POSTGRES_SSLROOTCERT)")]
    MissingRootCert { mode: SslMode },

    #[error("TLS configuration error: {0}")]
    ConfigurationError(String),

    #[error("TLS is disabled for sslmode {mode}")]
    UnsupportedMode { mode: SslMode },
}

/// Transport security mode, named after libpq's `sslmode`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SslMode {
    Disable,
    /// Try TLS, fall back to plaintext if the server refuses
    #[default]
    Prefer,
    /// TLS without certificate verification unless a root certificate is given
    Require,
    /// TLS with chain verification, hostname not checked
    VerifyCa,
    /// TLS with chain and hostname verification
    VerifyFull,
}

impl SslMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SslMode::Disable => "disable",
            SslMode::Prefer => "prefer",
            SslMode::Require => "require",
            SslMode::VerifyCa => "verify-ca",
            SslMode::VerifyFull => "verify-full",
        }
    }

    pub fn uses_tls(&self) -> bool {
        *self != SslMode::Disable
    }

    /// The mode tokio-postgres negotiates with. Verification strength lives in the connector.
    pub(crate) fn negotiation(&self) -> tokio_postgres::config::SslMode {
        match self {
            SslMode::Disable => tokio_postgres::config::SslMode::Disable,
            SslMode::Prefer => tokio_postgres::config::SslMode::Prefer,
            SslMode::Require | SslMode::VerifyCa | SslMode::VerifyFull => {
                tokio_postgres::config::SslMode::Require
            }
        }
    }
}

impl std::fmt::Display for SslMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SslMode {
    type Err = TlsError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "disable" => Ok(SslMode::Disable),
            "prefer" | "allow" => Ok(SslMode::Prefer),
            "require" => Ok(SslMode::Require),
            "verify-ca" | "verify_ca" => Ok(SslMode::VerifyCa),
            "verify-full" | "verify_full" => Ok(SslMode::VerifyFull),
            other => Err(TlsError::UnknownMode(other.to_string())),
        }
    }
}

/// Build a TLS connector for the given mode.
///
/// `Disable` is rejected; callers connect with `NoTls` instead.
pub fn build_tls_connector(
    mode: SslMode,
    root_cert: Option<&Path>,
) -> Result<MakeTlsConnector, TlsError> {
    if !mode.uses_tls() {
        return Err(TlsError::UnsupportedMode { mode });
    }

    debug!(mode = %mode, has_root_cert = root_cert.is_some(), "building PostgreSQL TLS connector");

    let mut builder = NativeTlsConnector::builder();
    configure_verification(&mut builder, mode, root_cert.is_some())?;

    if let Some(path) = root_cert {
        apply_root_cert(&mut builder, path)?;
    }

    let connector = builder
        .build()
        .map_err(|e| TlsError::ConfigurationError(e.to_string()))?;

    Ok(MakeTlsConnector::new(connector))
}

fn configure_verification(
    builder: &mut TlsConnectorBuilder,
    mode: SslMode,
    has_root_cert: bool,
) -> Result<(), TlsError> {
    match mode {
        SslMode::Disable => return Err(TlsError::UnsupportedMode { mode }),
        SslMode::Prefer | SslMode::Require if !has_root_cert => {
            builder.danger_accept_invalid_certs(true);
            builder.danger_accept_invalid_hostnames(true);
        }
        // libpq verifies the chain for `require` once a root certificate is configured
        SslMode::Prefer | SslMode::Require => {
            builder.danger_accept_invalid_hostnames(true);
        }
        SslMode::VerifyCa => {
            if !has_root_cert {
                return Err(TlsError::MissingRootCert { mode });
            }
            builder.danger_accept_invalid_hostnames(true);
        }
        SslMode::VerifyFull => {}
    }
    Ok(())
}

fn apply_root_cert(builder: &mut TlsConnectorBuilder, path: &Path) -> Result<(), TlsError> {
    debug!(path = %path.display(), "loading CA certificate");

    let pem_data = fs::read(path).map_err(|e| TlsError::CaCertLoadFailed {
        path: path.display().to_string(),
        source: e,
    })?;

    let cert =
        Certificate::from_pem(&pem_data).map_err(|e| TlsError::InvalidCaCert(e.to_string()))?;
    builder.add_root_certificate(cert);
    Ok(())
}
