use serde::Serialize;

/// Flat field view of a decoded ClientHello, as consumed by the JA3 and JA4
/// builders. Lists are in wire order and still contain GREASE values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizedFields {
    /// Cipher suite values
    pub ciphers: Vec<u16>,
    /// Supported groups / named curves (from extension 0x000a)
    pub curves: Vec<u16>,
    /// Extension type codes
    pub extensions: Vec<u16>,
    /// EC point format values (from extension 0x000b), widened to u16
    pub points: Vec<u16>,
    /// ALPN protocol values (from extension 0x0010)
    pub protocols: Vec<String>,
    /// Supported TLS versions (from extension 0x002b)
    pub versions: Vec<u16>,
    /// Signature algorithms (from extension 0x000d)
    pub algorithms: Vec<u16>,
    /// Random timestamp rendered as a UTC date
    pub random_time: String,
    /// Lowercase hex of the 28 random bytes
    pub random_bytes: String,
    /// Lowercase hex of the session id
    pub session_id: String,
    /// Lowercase hex of the compression methods block
    pub compression_methods: String,
}

/// Result of a JA3 computation: the two canonical pre-hash strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ja3Result {
    /// `version,ciphers,extensions,curves,points`
    pub ja3: String,
    /// Same as `ja3` with the extensions field left blank
    pub ja3n: String,
}

/// Result of a JA4 fingerprint computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ja4Result {
    /// Full JA4 fingerprint: part_a + "_" + part_b + "_" + part_c
    pub hash: String,
    /// JA4_r: part_a followed by the un-hashed inputs of part_b and part_c
    pub raw: String,
}
