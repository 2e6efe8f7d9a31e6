use std::fmt;

use chrono::DateTime;
use tls_parser::nom::bytes::complete::take;
use tls_parser::nom::combinator::complete;
use tls_parser::nom::multi::{length_data, many0};
use tls_parser::nom::number::complete::{be_u16, be_u24, be_u32, be_u8};
use tls_parser::nom::IResult;
use tls_parser::TlsExtensionType;
use tracing::debug;

use crate::fingerprint::extension::{interpret, ExtensionValue};
use crate::fingerprint::types::NormalizedFields;

/// Length of the random bytes following the 4-byte random timestamp.
pub const RANDOM_BYTES_LEN: usize = 28;

/// A ClientHello field that could not be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    ContentType,
    Version,
    HandshakeHeader,
    HandshakeType,
    HandshakeBody,
    ClientVersion,
    RandomTime,
    RandomBytes,
    SessionId,
    CipherSuites,
    CompressionMethods,
    ExtensionsBlock,
}

impl Field {
    pub fn name(&self) -> &'static str {
        match self {
            Field::ContentType => "content-type",
            Field::Version => "version",
            Field::HandshakeHeader => "handshake-header",
            Field::HandshakeType => "handshake-type",
            Field::HandshakeBody => "handshake-body",
            Field::ClientVersion => "client-version",
            Field::RandomTime => "random-time",
            Field::RandomBytes => "random-bytes",
            Field::SessionId => "session-id",
            Field::CipherSuites => "cipher-suites",
            Field::CompressionMethods => "compression-methods",
            Field::ExtensionsBlock => "extensions-block",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed client hello: {0}")]
    Malformed(Field),
}

impl DecodeError {
    pub fn field(&self) -> Field {
        match self {
            DecodeError::Malformed(field) => *field,
        }
    }
}

/// How to treat a malformed trailing entry in the cipher suite list or the
/// extensions block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodeMode {
    /// Skip the trailing cipher byte, stop enumerating extensions.
    #[default]
    Lenient,
    /// Fail the decode with `cipher-suites` / `extensions-block`.
    Strict,
}

/// A single extension as it appeared on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extension {
    pub ext_type: u16,
    pub data: Vec<u8>,
}

impl Extension {
    /// Interpret the payload according to the extension type.
    pub fn value(&self) -> ExtensionValue {
        interpret(self.ext_type, &self.data)
    }
}

/// A decoded ClientHello record. Extensions keep their wire order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientHello {
    pub content_type: u8,
    /// Record-layer version
    pub message_version: u16,
    /// Client version from the handshake body (legacy_version)
    pub handshake_version: u16,
    pub handshake_type: u8,
    /// First 4 bytes of the client random, big-endian
    pub random_time: u32,
    pub random_bytes: [u8; RANDOM_BYTES_LEN],
    pub session_id: Vec<u8>,
    pub cipher_suites: Vec<u16>,
    pub compression_methods: Vec<u8>,
    pub extensions: Vec<Extension>,
}

/// Decode a TLS record carrying a ClientHello, tolerating a malformed
/// trailing cipher or extension entry.
pub fn decode_client_hello(raw: &[u8]) -> Result<ClientHello, DecodeError> {
    decode_client_hello_with(raw, DecodeMode::Lenient)
}

/// Decode a TLS record carrying a ClientHello.
///
/// The input starts with the 5-byte record header. Reads are strictly
/// sequential; the first one that fails aborts the decode with the name of
/// the field it was reading. Content type and handshake type are recorded
/// as-is, and anything after the handshake block is ignored.
pub fn decode_client_hello_with(
    raw: &[u8],
    mode: DecodeMode,
) -> Result<ClientHello, DecodeError> {
    let (rest, content_type) = read(raw, Field::ContentType, be_u8)?;
    let (rest, message_version) = read(rest, Field::Version, be_u16)?;
    let (_, handshake) = read(rest, Field::HandshakeHeader, length_data(be_u16))?;

    let (handshake, handshake_type) = read(handshake, Field::HandshakeType, be_u8)?;
    let (_, body) = read(handshake, Field::HandshakeBody, length_data(be_u24))?;

    let (body, handshake_version) = read(body, Field::ClientVersion, be_u16)?;
    let (body, random_time) = read(body, Field::RandomTime, be_u32)?;
    let (body, random) = read(body, Field::RandomBytes, take(RANDOM_BYTES_LEN))?;
    let (body, session_id) = read(body, Field::SessionId, length_data(be_u8))?;
    let (body, cipher_block) = read(body, Field::CipherSuites, length_data(be_u16))?;
    let cipher_suites = decode_cipher_suites(cipher_block, mode)?;
    let (body, compression_methods) =
        read(body, Field::CompressionMethods, length_data(be_u8))?;
    let (_, extension_block) = read(body, Field::ExtensionsBlock, length_data(be_u16))?;
    let extensions = decode_extensions(extension_block, mode)?;

    let mut random_bytes = [0u8; RANDOM_BYTES_LEN];
    random_bytes.copy_from_slice(random);

    Ok(ClientHello {
        content_type,
        message_version,
        handshake_version,
        handshake_type,
        random_time,
        random_bytes,
        session_id: session_id.to_vec(),
        cipher_suites,
        compression_methods: compression_methods.to_vec(),
        extensions,
    })
}

/// Apply one parser, naming `field` if it fails.
fn read<'a, O>(
    input: &'a [u8],
    field: Field,
    mut parser: impl FnMut(&'a [u8]) -> IResult<&'a [u8], O>,
) -> Result<(&'a [u8], O), DecodeError> {
    parser(input).map_err(|_| DecodeError::Malformed(field))
}

fn decode_cipher_suites(block: &[u8], mode: DecodeMode) -> Result<Vec<u16>, DecodeError> {
    let (rest, suites) = read(block, Field::CipherSuites, many0(be_u16))?;
    if !rest.is_empty() {
        if mode == DecodeMode::Strict {
            return Err(DecodeError::Malformed(Field::CipherSuites));
        }
        debug!(
            suites = suites.len(),
            trailing = rest.len(),
            "skipping malformed trailing cipher suite entry"
        );
    }
    Ok(suites)
}

fn extension_entry(input: &[u8]) -> IResult<&[u8], Extension> {
    let (input, ext_type) = be_u16(input)?;
    let (input, data) = length_data(be_u16)(input)?;
    Ok((
        input,
        Extension {
            ext_type,
            data: data.to_vec(),
        },
    ))
}

fn decode_extensions(block: &[u8], mode: DecodeMode) -> Result<Vec<Extension>, DecodeError> {
    // an entry whose payload overruns the block is Incomplete, not Error
    let (rest, extensions) =
        read(block, Field::ExtensionsBlock, many0(complete(extension_entry)))?;
    if !rest.is_empty() {
        if mode == DecodeMode::Strict {
            return Err(DecodeError::Malformed(Field::ExtensionsBlock));
        }
        debug!(
            extensions = extensions.len(),
            trailing = rest.len(),
            "malformed extension entry, ending enumeration"
        );
    }
    Ok(extensions)
}

impl ClientHello {
    /// Extension type codes in wire order.
    pub fn extension_types(&self) -> Vec<u16> {
        self.extensions.iter().map(|ext| ext.ext_type).collect()
    }

    /// Interpret the extensions of type `kind` in wire order and return the
    /// first one `pick` accepts.
    fn first_value<T>(
        &self,
        kind: TlsExtensionType,
        pick: impl Fn(ExtensionValue) -> Option<T>,
    ) -> Option<T> {
        self.extensions
            .iter()
            .filter(|ext| TlsExtensionType(ext.ext_type) == kind)
            .find_map(|ext| pick(ext.value()))
    }

    /// Supported groups (type 10).
    pub fn curves(&self) -> Vec<u16> {
        self.first_value(TlsExtensionType::SupportedGroups, |value| match value {
            ExtensionValue::SupportedCurves(curves) => Some(curves),
            _ => None,
        })
        .unwrap_or_default()
    }

    /// EC point formats (type 11).
    pub fn points(&self) -> Vec<u8> {
        self.first_value(TlsExtensionType::EcPointFormats, |value| match value {
            ExtensionValue::PointFormats(points) => Some(points),
            _ => None,
        })
        .unwrap_or_default()
    }

    /// Signature algorithms (type 13).
    pub fn algorithms(&self) -> Vec<u16> {
        self.first_value(TlsExtensionType::SignatureAlgorithms, |value| match value {
            ExtensionValue::SignatureAlgorithms(algorithms) => Some(algorithms),
            _ => None,
        })
        .unwrap_or_default()
    }

    /// ALPN protocols (type 16).
    pub fn protocols(&self) -> Vec<String> {
        self.first_value(
            TlsExtensionType::ApplicationLayerProtocolNegotiation,
            |value| match value {
                ExtensionValue::Alpn(protocols) => Some(protocols),
                _ => None,
            },
        )
        .unwrap_or_default()
    }

    /// Supported TLS versions (type 43).
    pub fn versions(&self) -> Vec<u16> {
        self.first_value(TlsExtensionType::SupportedVersions, |value| match value {
            ExtensionValue::SupportedVersions(versions) => Some(versions),
            _ => None,
        })
        .unwrap_or_default()
    }

    /// Raw payload of the first extension of type `kind`.
    pub fn extension_data(&self, kind: TlsExtensionType) -> Option<&[u8]> {
        self.extensions
            .iter()
            .find(|ext| TlsExtensionType(ext.ext_type) == kind)
            .map(|ext| ext.data.as_slice())
    }

    /// Project the record into the field set the fingerprint builders use.
    pub fn normalized(&self) -> NormalizedFields {
        NormalizedFields {
            ciphers: self.cipher_suites.clone(),
            curves: self.curves(),
            extensions: self.extension_types(),
            points: self.points().into_iter().map(u16::from).collect(),
            protocols: self.protocols(),
            versions: self.versions(),
            algorithms: self.algorithms(),
            random_time: render_timestamp(self.random_time),
            random_bytes: hex::encode(self.random_bytes),
            session_id: hex::encode(&self.session_id),
            compression_methods: hex::encode(&self.compression_methods),
        }
    }
}

fn render_timestamp(secs: u32) -> String {
    DateTime::from_timestamp(i64::from(secs), 0)
        .map(|ts| ts.to_string())
        .unwrap_or_else(|| secs.to_string())
}
