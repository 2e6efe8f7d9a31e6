use std::net::IpAddr;

use sha2::{Digest, Sha256};
use tls_parser::TlsVersion;

use crate::fingerprint::grease::filter_grease_u16;
use crate::fingerprint::join_decimal;
use crate::fingerprint::record::ConnectionMeta;
use crate::fingerprint::types::{Ja4Result, NormalizedFields};

/// Compute the JA4 fingerprint from a normalized ClientHello and the
/// negotiated connection metadata.
///
/// JA4 format: `{part_a}_{part_b}_{part_c}`
///
/// Part A: `t{ver}{sni}{cipher_count:02}{ext_count:02}{alpn}`
/// Part B: sorted cipher suites as decimals → SHA256 truncated to 12 chars
/// Part C: sorted extensions + sig_algs (wire order) as decimals → SHA256
/// truncated to 12 chars
///
/// Counts and sorted lists are GREASE-filtered. Decimals are concatenated
/// without separators.
pub fn compute_ja4(fields: &NormalizedFields, meta: &ConnectionMeta) -> Ja4Result {
    let mut ciphers = filter_grease_u16(&fields.ciphers);
    let mut extensions = filter_grease_u16(&fields.extensions);

    let part_a = compute_part_a(meta, ciphers.len(), extensions.len());

    ciphers.sort_unstable();
    extensions.sort_unstable();

    let part_b_raw = join_decimal(&ciphers, "");
    let part_c_raw = format!(
        "{}{}",
        join_decimal(&extensions, ""),
        join_decimal(&fields.algorithms, "")
    );

    Ja4Result {
        hash: format!(
            "{}_{}_{}",
            part_a,
            truncated_sha256(&part_b_raw, 12),
            truncated_sha256(&part_c_raw, 12)
        ),
        raw: format!("{}_{}_{}", part_a, part_b_raw, part_c_raw),
    }
}

/// Part A: protocol + version + SNI + cipher count + extension count + ALPN code
fn compute_part_a(meta: &ConnectionMeta, cipher_count: usize, ext_count: usize) -> String {
    format!(
        "t{}{}{:02}{:02}{}",
        version_code(meta.version),
        sni_code(meta.server_name.as_deref()),
        cipher_count.min(99),
        ext_count.min(99),
        protocol_code(meta.negotiated_protocol.as_deref())
    )
}

fn version_code(version: u16) -> &'static str {
    match TlsVersion(version) {
        TlsVersion::Tls13 => "13",
        TlsVersion::Tls12 => "12",
        TlsVersion::Tls11 => "11",
        TlsVersion::Tls10 => "10",
        _ => "00",
    }
}

/// `d` for a host name, `i` for no SNI or an IP literal.
fn sni_code(server_name: Option<&str>) -> char {
    match server_name {
        Some(name) if !name.is_empty() && !is_ip_literal(name) => 'd',
        _ => 'i',
    }
}

fn is_ip_literal(host: &str) -> bool {
    let host = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    host.parse::<IpAddr>().is_ok()
}

/// Two-character code for the negotiated application protocol.
fn protocol_code(protocol: Option<&str>) -> String {
    let Some(protocol) = protocol else {
        return "00".to_string();
    };
    match protocol.chars().count() {
        0 => "00".to_string(),
        1 => format!("{}0", protocol),
        2 => protocol.to_string(),
        _ if protocol == "http/1.1" => "h1".to_string(),
        _ => protocol.chars().take(2).collect(),
    }
}

/// SHA256 hash, lowercase hex, truncated to `len` characters.
fn truncated_sha256(input: &str, len: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let mut full = hex::encode(hasher.finalize());
    full.truncate(len);
    full
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_fields() -> NormalizedFields {
        NormalizedFields {
            ciphers: vec![0x1301, 0x1302, 0x1303, 0xC02B, 0xC02F],
            extensions: vec![
                0x0000, // SNI
                0x0017, // extended_master_secret
                0x000a, // supported_groups
                0x000b, // ec_point_formats
                0x000d, // signature_algorithms
                0x0010, // ALPN
                0x002b, // supported_versions
                0x002d, // psk_key_exchange_modes
                0x0033, // key_share
            ],
            curves: vec![0x001d, 0x0017, 0x0018],
            points: vec![0x00],
            protocols: vec!["h2".to_string(), "http/1.1".to_string()],
            versions: vec![0x0304, 0x0303],
            algorithms: vec![0x0403, 0x0503, 0x0603],
            ..Default::default()
        }
    }

    fn sample_meta() -> ConnectionMeta {
        ConnectionMeta::new(0x0304, Some("example.com".into()), Some("h2".into()))
    }

    #[test]
    fn test_ja4_full() {
        let result = compute_ja4(&sample_fields(), &sample_meta());
        assert_eq!(result.hash, "t13d0509h2_65a38f3d48f6_27943bb50c19");
        assert_eq!(
            result.raw,
            "t13d0509h2_4865486648674919549199_01011131623434551102712831539"
        );
    }

    #[test]
    fn test_ja4_grease_and_ordering() {
        let fields = NormalizedFields {
            ciphers: vec![0x0A0A, 0x1301, 0x1302],
            extensions: vec![0x002b, 0x000a],
            ..Default::default()
        };
        let result = compute_ja4(&fields, &sample_meta());
        assert_eq!(result.hash, "t13d0202h2_7484f5988a7b_c0aa4a0be7ba");
    }

    #[test]
    fn test_ja4_permutation_invariant() {
        let mut shuffled = sample_fields();
        shuffled.ciphers.reverse();
        shuffled.extensions.rotate_left(4);
        shuffled.ciphers.insert(2, 0xDADA);

        let a = compute_ja4(&sample_fields(), &sample_meta());
        let b = compute_ja4(&shuffled, &sample_meta());
        assert_eq!(a.hash, b.hash);
    }

    #[test]
    fn test_ja4_sort_is_numeric() {
        // lexicographic order would put "49195" before "5"
        let fields = NormalizedFields {
            ciphers: vec![0xC02B, 0x0005],
            ..Default::default()
        };
        let result = compute_ja4(&fields, &sample_meta());
        assert!(result.raw.contains("_549195_"));
    }

    #[test]
    fn test_ja4_signature_algorithms_keep_wire_order() {
        let mut fields = sample_fields();
        fields.algorithms.reverse();
        let a = compute_ja4(&sample_fields(), &sample_meta());
        let b = compute_ja4(&fields, &sample_meta());
        assert_ne!(a.hash.split('_').nth(2), b.hash.split('_').nth(2));
        assert_eq!(a.hash.split('_').nth(1), b.hash.split('_').nth(1));
    }

    #[test]
    fn test_ja4_empty_lists_hash_empty_input() {
        let result = compute_ja4(&NormalizedFields::default(), &ConnectionMeta::default());
        assert_eq!(result.hash, "t00i000000_e3b0c44298fc_e3b0c44298fc");
    }

    #[test]
    fn test_ja4_segments_are_lowercase_hex() {
        let result = compute_ja4(&sample_fields(), &sample_meta());
        let parts: Vec<&str> = result.hash.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].len(), 10);
        for part in &parts[1..] {
            assert_eq!(part.len(), 12);
            assert!(part
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
        }
    }

    #[test]
    fn test_part_a_counts_are_padded_and_capped() {
        let meta = sample_meta();
        assert_eq!(compute_part_a(&meta, 3, 7), "t13d0307h2");
        assert_eq!(compute_part_a(&meta, 150, 0), "t13d9900h2");
    }

    #[test]
    fn test_version_code() {
        assert_eq!(version_code(0x0301), "10");
        assert_eq!(version_code(0x0302), "11");
        assert_eq!(version_code(0x0303), "12");
        assert_eq!(version_code(0x0304), "13");
        assert_eq!(version_code(0x0300), "00");
        assert_eq!(version_code(0), "00");
    }

    #[test]
    fn test_sni_code() {
        assert_eq!(sni_code(None), 'i');
        assert_eq!(sni_code(Some("")), 'i');
        assert_eq!(sni_code(Some("example.com")), 'd');
        assert_eq!(sni_code(Some("192.168.1.10")), 'i');
        assert_eq!(sni_code(Some("::1")), 'i');
        assert_eq!(sni_code(Some("[2001:db8::1]")), 'i');
        assert_eq!(sni_code(Some("1.2.3.4.nip.io")), 'd');
    }

    #[test]
    fn test_protocol_code() {
        assert_eq!(protocol_code(None), "00");
        assert_eq!(protocol_code(Some("")), "00");
        assert_eq!(protocol_code(Some("x")), "x0");
        assert_eq!(protocol_code(Some("h2")), "h2");
        assert_eq!(protocol_code(Some("http/1.1")), "h1");
        assert_eq!(protocol_code(Some("http/1.0")), "ht");
        assert_eq!(protocol_code(Some("spdy/3")), "sp");
    }
}
