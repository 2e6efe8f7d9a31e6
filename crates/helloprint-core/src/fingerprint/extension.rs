use tls_parser::nom::combinator::{all_consuming, map, map_parser, verify};
use tls_parser::nom::multi::{length_data, many1};
use tls_parser::nom::number::complete::{be_u16, be_u8};
use tls_parser::nom::IResult;
use tls_parser::TlsExtensionType;

/// Typed payload of a ClientHello extension.
///
/// Only the shapes that feed a fingerprint are decoded. Everything else,
/// including a known type whose payload does not parse, stays `Opaque` and
/// contributes nothing but its type code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionValue {
    /// supported_groups (10): named curve / group IDs
    SupportedCurves(Vec<u16>),
    /// ec_point_formats (11)
    PointFormats(Vec<u8>),
    /// signature_algorithms (13): signature scheme IDs in wire order
    SignatureAlgorithms(Vec<u16>),
    /// application_layer_protocol_negotiation (16)
    Alpn(Vec<String>),
    /// supported_versions (43)
    SupportedVersions(Vec<u16>),
    Opaque { ext_type: u16, data: Vec<u8> },
}

impl ExtensionValue {
    /// Whether the payload was decoded into one of the typed variants.
    pub fn is_opaque(&self) -> bool {
        matches!(self, ExtensionValue::Opaque { .. })
    }
}

/// Decode an extension payload according to its type code.
///
/// Never fails: unknown types and malformed payloads come back as
/// [`ExtensionValue::Opaque`].
pub fn interpret(ext_type: u16, data: &[u8]) -> ExtensionValue {
    let decoded = match TlsExtensionType(ext_type) {
        TlsExtensionType::SupportedGroups => {
            parse_u16_list(data).map(ExtensionValue::SupportedCurves)
        }
        TlsExtensionType::EcPointFormats => {
            parse_point_formats(data).map(ExtensionValue::PointFormats)
        }
        TlsExtensionType::SignatureAlgorithms => {
            parse_u16_list(data).map(ExtensionValue::SignatureAlgorithms)
        }
        TlsExtensionType::ApplicationLayerProtocolNegotiation => {
            parse_alpn(data).map(ExtensionValue::Alpn)
        }
        TlsExtensionType::SupportedVersions => {
            parse_supported_versions(data).map(ExtensionValue::SupportedVersions)
        }
        _ => None,
    };

    decoded.unwrap_or_else(|| ExtensionValue::Opaque {
        ext_type,
        data: data.to_vec(),
    })
}

/// Run a payload parser that must consume the whole extension body.
fn complete<'a, O>(
    data: &'a [u8],
    parser: impl FnMut(&'a [u8]) -> IResult<&'a [u8], O>,
) -> Option<O> {
    all_consuming(parser)(data).ok().map(|(_, out)| out)
}

fn u16_items(input: &[u8]) -> IResult<&[u8], Vec<u16>> {
    all_consuming(many1(be_u16))(input)
}

/// `u16` length prefix followed by a non-empty list of `u16` values
/// (supported_groups, signature_algorithms).
fn parse_u16_list(data: &[u8]) -> Option<Vec<u16>> {
    complete(data, map_parser(length_data(be_u16), u16_items))
}

/// `u8` length prefix followed by a non-empty list of `u16` versions.
fn parse_supported_versions(data: &[u8]) -> Option<Vec<u16>> {
    complete(data, map_parser(length_data(be_u8), u16_items))
}

fn parse_point_formats(data: &[u8]) -> Option<Vec<u8>> {
    complete(
        data,
        map(
            verify(length_data(be_u8), |formats: &[u8]| !formats.is_empty()),
            |formats: &[u8]| formats.to_vec(),
        ),
    )
}

fn protocol_name(input: &[u8]) -> IResult<&[u8], String> {
    map(
        verify(length_data(be_u8), |name: &[u8]| !name.is_empty()),
        |name: &[u8]| String::from_utf8_lossy(name).into_owned(),
    )(input)
}

fn protocol_names(input: &[u8]) -> IResult<&[u8], Vec<String>> {
    all_consuming(many1(protocol_name))(input)
}

/// `u16` length prefix followed by a non-empty list of `u8`-prefixed,
/// non-empty protocol names.
fn parse_alpn(data: &[u8]) -> Option<Vec<String>> {
    complete(data, map_parser(length_data(be_u16), protocol_names))
}
