pub mod clienthello;
pub mod extension;
pub mod grease;
pub mod ja3;
pub mod ja4;
pub mod record;
pub mod types;

use thiserror::Error;

use crate::fingerprint::clienthello::DecodeError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FingerprintError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("no supported TLS version to report (supported_versions missing or empty)")]
    MissingSupportedVersions,
}

/// Render values as decimal integers joined by `sep`.
pub(crate) fn join_decimal(values: &[u16], sep: &str) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(sep)
}
