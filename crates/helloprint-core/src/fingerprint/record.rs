use serde::Serialize;
use tls_parser::nom::combinator::{complete, map_parser};
use tls_parser::nom::multi::{length_data, many0};
use tls_parser::nom::number::complete::{be_u16, be_u8};
use tls_parser::nom::sequence::pair;
use tls_parser::nom::IResult;
use tls_parser::TlsExtensionType;

use crate::fingerprint::clienthello::{
    decode_client_hello_with, ClientHello, DecodeError, DecodeMode,
};
use crate::fingerprint::grease::filter_grease_u16;
use crate::fingerprint::ja3::compute_ja3;
use crate::fingerprint::ja4::compute_ja4;
use crate::fingerprint::types::{Ja3Result, Ja4Result, NormalizedFields};
use crate::fingerprint::FingerprintError;

/// SNI name_type for a DNS host name.
const SNI_HOST_NAME: u8 = 0;

/// What the TLS stack knows about a connection once the handshake is done.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConnectionMeta {
    /// Negotiated protocol version, e.g. 0x0304. Zero when unknown.
    pub version: u16,
    pub server_name: Option<String>,
    /// Negotiated ALPN protocol
    pub negotiated_protocol: Option<String>,
}

impl ConnectionMeta {
    /// Empty strings count as absent.
    pub fn new(
        version: u16,
        server_name: Option<String>,
        negotiated_protocol: Option<String>,
    ) -> Self {
        Self {
            version,
            server_name: server_name.filter(|s| !s.is_empty()),
            negotiated_protocol: negotiated_protocol.filter(|s| !s.is_empty()),
        }
    }

    /// Approximate the negotiated values from the ClientHello alone, for
    /// observers that never see the rest of the handshake.
    ///
    /// Version: highest non-GREASE supported_versions entry, falling back to
    /// the handshake client version. Server name: first host name in the SNI
    /// extension. Protocol: first offered ALPN value.
    pub fn observed(hello: &ClientHello) -> Self {
        let version = filter_grease_u16(&hello.versions())
            .into_iter()
            .max()
            .unwrap_or(hello.handshake_version);

        let server_name = hello
            .extension_data(TlsExtensionType::ServerName)
            .and_then(parse_server_name);

        let negotiated_protocol = hello.protocols().into_iter().next();

        Self::new(version, server_name, negotiated_protocol)
    }
}

fn server_name_list(input: &[u8]) -> IResult<&[u8], Vec<(u8, &[u8])>> {
    map_parser(
        length_data(be_u16),
        many0(complete(pair(be_u8, length_data(be_u16)))),
    )(input)
}

fn parse_server_name(data: &[u8]) -> Option<String> {
    let (_, entries) = server_name_list(data).ok()?;
    entries
        .into_iter()
        .find(|(name_type, _)| *name_type == SNI_HOST_NAME)
        .and_then(|(_, name)| std::str::from_utf8(name).ok())
        .map(str::to_string)
}

/// The fingerprint inputs of one connection: the raw ClientHello record as
/// captured by the TLS layer plus the metadata of the finished handshake.
///
/// Built once when the handshake completes and handed to whatever needs it.
/// Every accessor decodes from the raw bytes again.
#[derive(Debug, Clone)]
pub struct FingerprintRecord {
    raw: Vec<u8>,
    meta: ConnectionMeta,
    mode: DecodeMode,
}

impl FingerprintRecord {
    pub fn new(raw: impl Into<Vec<u8>>, meta: ConnectionMeta) -> Self {
        Self {
            raw: raw.into(),
            meta,
            mode: DecodeMode::default(),
        }
    }

    /// Build a record for a connection whose handshake is never completed,
    /// with metadata taken from [`ConnectionMeta::observed`].
    pub fn observed(raw: impl Into<Vec<u8>>, mode: DecodeMode) -> Result<Self, DecodeError> {
        let raw = raw.into();
        let hello = decode_client_hello_with(&raw, mode)?;
        let meta = ConnectionMeta::observed(&hello);
        Ok(Self { raw, meta, mode })
    }

    pub fn with_mode(mut self, mode: DecodeMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn meta(&self) -> &ConnectionMeta {
        &self.meta
    }

    pub fn client_hello(&self) -> Result<ClientHello, DecodeError> {
        decode_client_hello_with(&self.raw, self.mode)
    }

    pub fn normalized(&self) -> Result<NormalizedFields, DecodeError> {
        Ok(self.client_hello()?.normalized())
    }

    pub fn ja3(&self) -> Result<Ja3Result, FingerprintError> {
        compute_ja3(&self.normalized()?)
    }

    pub fn ja4(&self) -> Result<Ja4Result, FingerprintError> {
        Ok(compute_ja4(&self.normalized()?, &self.meta))
    }
}
