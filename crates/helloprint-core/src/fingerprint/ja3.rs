use md5::{Digest, Md5};

use crate::fingerprint::grease::filter_grease_u16;
use crate::fingerprint::types::{Ja3Result, NormalizedFields};
use crate::fingerprint::{join_decimal, FingerprintError};

/// Compute the JA3 and JA3N strings from a normalized ClientHello.
///
/// JA3 format: `SSLVersion,Ciphers,Extensions,EllipticCurves,EcPointFormats`
///
/// - Fields separated by commas
/// - Values within each field separated by dashes, in wire order
/// - GREASE values filtered from all fields
/// - All values in decimal
/// - The version is the first entry of supported_versions
///
/// JA3N is the same string with the extensions field left empty. Neither is
/// hashed; see [`ja3_md5`].
pub fn compute_ja3(fields: &NormalizedFields) -> Result<Ja3Result, FingerprintError> {
    let version = filter_grease_u16(&fields.versions)
        .first()
        .copied()
        .ok_or(FingerprintError::MissingSupportedVersions)?
        .to_string();

    let ciphers = join_decimal(&filter_grease_u16(&fields.ciphers), "-");
    let extensions = join_decimal(&filter_grease_u16(&fields.extensions), "-");
    let curves = join_decimal(&filter_grease_u16(&fields.curves), "-");
    let points = join_decimal(&filter_grease_u16(&fields.points), "-");

    Ok(Ja3Result {
        ja3: [
            version.as_str(),
            ciphers.as_str(),
            extensions.as_str(),
            curves.as_str(),
            points.as_str(),
        ]
        .join(","),
        ja3n: [
            version.as_str(),
            ciphers.as_str(),
            "",
            curves.as_str(),
            points.as_str(),
        ]
        .join(","),
    })
}

/// MD5 of a JA3 / JA3N string as 32 lowercase hex characters.
pub fn ja3_md5(raw: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(raw.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_fields() -> NormalizedFields {
        NormalizedFields {
            ciphers: vec![0x1301, 0x1302, 0x1303, 0xC02B, 0xC02F],
            extensions: vec![0x0000, 0x0017, 0x000a, 0x000b, 0x000d],
            curves: vec![0x001d, 0x0017, 0x0018],
            points: vec![0x00],
            versions: vec![0x0303],
            ..Default::default()
        }
    }

    #[test]
    fn test_ja3_basic() {
        let result = compute_ja3(&sample_fields()).unwrap();

        assert_eq!(
            result.ja3,
            "771,4865-4866-4867-49195-49199,0-23-10-11-13,29-23-24,0"
        );
        assert_eq!(result.ja3n, "771,4865-4866-4867-49195-49199,,29-23-24,0");
    }

    #[test]
    fn test_ja3_grease_filtered() {
        let fields = NormalizedFields {
            ciphers: vec![0x0A0A, 0x1301, 0xFAFA, 0x1302],
            extensions: vec![0x2A2A, 0x0000, 0x000a],
            curves: vec![0x4A4A, 0x001d],
            points: vec![0x00],
            versions: vec![0x5A5A, 0x0304, 0x0303],
            ..Default::default()
        };

        let result = compute_ja3(&fields).unwrap();
        assert_eq!(result.ja3, "772,4865-4866,0-10,29,0");
    }

    #[test]
    fn test_ja3_keeps_wire_order() {
        let mut fields = sample_fields();
        fields.ciphers = vec![0xC02F, 0x1301];
        fields.extensions = vec![0x000d, 0x0000];

        let result = compute_ja3(&fields).unwrap();
        assert_eq!(result.ja3, "771,49199-4865,13-0,29-23-24,0");
    }

    #[test]
    fn test_ja3_empty_fields() {
        let fields = NormalizedFields {
            versions: vec![0x0303],
            ..Default::default()
        };

        let result = compute_ja3(&fields).unwrap();
        assert_eq!(result.ja3, "771,,,,");
        assert_eq!(result.ja3n, "771,,,,");
    }

    #[test]
    fn test_ja3_missing_versions() {
        let mut fields = sample_fields();
        fields.versions = vec![];
        assert_eq!(
            compute_ja3(&fields),
            Err(FingerprintError::MissingSupportedVersions)
        );

        // a list holding only GREASE is just as empty
        fields.versions = vec![0x1A1A];
        assert_eq!(
            compute_ja3(&fields),
            Err(FingerprintError::MissingSupportedVersions)
        );
    }

    #[test]
    fn test_ja3n_is_ja3_without_extensions() {
        let result = compute_ja3(&sample_fields()).unwrap();
        let mut fields: Vec<&str> = result.ja3.split(',').collect();
        fields[2] = "";
        assert_eq!(fields.join(","), result.ja3n);
    }

    #[test]
    fn test_ja3_md5() {
        assert_eq!(ja3_md5(""), "d41d8cd98f00b204e9800998ecf8427e");
        let hash = ja3_md5("771,4865,0,29,0");
        assert_eq!(hash.len(), 32);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}
