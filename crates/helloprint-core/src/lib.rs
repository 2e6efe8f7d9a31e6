//! ClientHello decoding and JA3 / JA3N / JA4 fingerprinting.
//!
//! ```text
//! raw record ─▶ decode_client_hello ─▶ ClientHello ─▶ normalized()
//!                                                        ├─▶ compute_ja3
//!                                                        └─▶ compute_ja4 (+ ConnectionMeta)
//! ```

pub mod fingerprint;

pub use fingerprint::clienthello::{
    decode_client_hello, decode_client_hello_with, ClientHello, DecodeError, DecodeMode,
    Extension, Field,
};
pub use fingerprint::extension::{interpret, ExtensionValue};
pub use fingerprint::ja3::{compute_ja3, ja3_md5};
pub use fingerprint::ja4::compute_ja4;
pub use fingerprint::record::{ConnectionMeta, FingerprintRecord};
pub use fingerprint::types::{Ja3Result, Ja4Result, NormalizedFields};
pub use fingerprint::FingerprintError;
