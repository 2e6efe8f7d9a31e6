use std::net::SocketAddr;

use serde::Serialize;
use tracing::{debug, error};

use helloprint_core::{
    compute_ja3, compute_ja4, ja3_md5, ClientHello, ConnectionMeta, FingerprintError,
    FingerprintRecord, Ja3Result, Ja4Result, NormalizedFields,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn parse(s: &str) -> anyhow::Result<Self> {
        match s {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => anyhow::bail!("Invalid output format '{}'. Expected 'text' or 'json'.", s),
        }
    }
}

/// Everything printed for one connection.
pub struct Report {
    pub peer: SocketAddr,
    pub hello: ClientHello,
    pub fields: NormalizedFields,
    pub meta: ConnectionMeta,
    /// `None` when the client sent no supported_versions extension
    pub ja3: Option<Ja3Result>,
    pub ja4: Ja4Result,
}

impl Report {
    pub fn collect(
        peer: SocketAddr,
        record: &FingerprintRecord,
    ) -> Result<Self, FingerprintError> {
        let hello = record.client_hello()?;
        let fields = hello.normalized();

        let ja3 = match compute_ja3(&fields) {
            Ok(ja3) => Some(ja3),
            Err(FingerprintError::MissingSupportedVersions) => {
                debug!("[{}] no supported_versions, skipping JA3", peer);
                None
            }
            Err(e) => return Err(e),
        };
        let ja4 = compute_ja4(&fields, record.meta());

        Ok(Self {
            peer,
            hello,
            fields,
            meta: record.meta().clone(),
            ja3,
            ja4,
        })
    }
}

#[derive(Serialize)]
struct JsonRecord<'a> {
    timestamp: String,
    src_ip: String,
    src_port: u16,
    sni: Option<&'a str>,
    tls_version: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    supported_versions: Vec<String>,
    cipher_suites: usize,
    extensions: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    alpn: &'a Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ja3: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ja3_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ja3n: Option<&'a str>,
    ja4: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    ja4_raw: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<&'a NormalizedFields>,
}

pub fn print_report(report: &Report, format: OutputFormat, verbose: bool) {
    match format {
        OutputFormat::Text => print_text(report, verbose),
        OutputFormat::Json => print_json(report, verbose),
    }
}

fn hex_versions(versions: &[u16]) -> Vec<String> {
    versions.iter().map(|v| format!("0x{:04x}", v)).collect()
}

fn print_text(report: &Report, verbose: bool) {
    let hello = &report.hello;
    let fields = &report.fields;

    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("  Client:     {}", report.peer);
    println!(
        "  SNI:        {}",
        report.meta.server_name.as_deref().unwrap_or("(none)")
    );
    println!("  TLS ver:    0x{:04x}", hello.handshake_version);
    if !fields.versions.is_empty() {
        println!("  Sup. vers:  {}", hex_versions(&fields.versions).join(", "));
    }
    println!("  Ciphers:    {} suites", hello.cipher_suites.len());
    println!("  Extensions: {} types", hello.extensions.len());
    if !fields.protocols.is_empty() {
        println!("  ALPN:       {}", fields.protocols.join(", "));
    }
    if verbose {
        println!("  Random:     {} {}", fields.random_time, fields.random_bytes);
        println!("  Session:    {}", fields.session_id);
        println!("  Compress:   {}", fields.compression_methods);
    }
    println!("  ──────────────────────────────────────────────────");
    match &report.ja3 {
        Some(ja3) => {
            println!("  JA3:        {}", ja3.ja3);
            println!("  JA3 md5:    {}", ja3_md5(&ja3.ja3));
            println!("  JA3N:       {}", ja3.ja3n);
        }
        None => println!("  JA3:        (no supported_versions)"),
    }
    println!("  JA4:        {}", report.ja4.hash);
    if verbose {
        println!("  JA4 raw:    {}", report.ja4.raw);
    }
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
}

fn print_json(report: &Report, verbose: bool) {
    if let Some(line) = json_line(report, verbose) {
        println!("{}", line);
    }
}

fn json_line(report: &Report, verbose: bool) -> Option<String> {
    let record = JsonRecord {
        timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        src_ip: report.peer.ip().to_string(),
        src_port: report.peer.port(),
        sni: report.meta.server_name.as_deref(),
        tls_version: format!("0x{:04x}", report.hello.handshake_version),
        supported_versions: hex_versions(&report.fields.versions),
        cipher_suites: report.hello.cipher_suites.len(),
        extensions: report.hello.extensions.len(),
        alpn: &report.fields.protocols,
        ja3: report.ja3.as_ref().map(|r| r.ja3.as_str()),
        ja3_hash: report.ja3.as_ref().map(|r| ja3_md5(&r.ja3)),
        ja3n: report.ja3.as_ref().map(|r| r.ja3n.as_str()),
        ja4: &report.ja4.hash,
        ja4_raw: if verbose { Some(report.ja4.raw.as_str()) } else { None },
        fields: if verbose { Some(&report.fields) } else { None },
    };

    match serde_json::to_string(&record) {
        Ok(line) => Some(line),
        Err(e) => {
            error!("[{}] JSON encoding failed: {}", report.peer, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_output_formats() {
        assert_eq!(OutputFormat::parse("text").unwrap(), OutputFormat::Text);
        assert_eq!(OutputFormat::parse("json").unwrap(), OutputFormat::Json);
        assert!(OutputFormat::parse("xml").is_err());
    }

    /// TLS 1.2 ClientHello: one cipher, null compression, no extensions.
    fn minimal_hello() -> Vec<u8> {
        let mut raw = vec![0x16, 0x03, 0x01, 0x00, 0x2f, 0x01, 0x00, 0x00, 0x2b, 0x03, 0x03];
        raw.extend_from_slice(&[0u8; 32]);
        raw.extend_from_slice(&[0x00, 0x00, 0x02, 0xc0, 0x2f, 0x01, 0x00, 0x00, 0x00]);
        raw
    }

    #[test]
    fn collects_report_without_ja3() {
        let peer: SocketAddr = "127.0.0.1:40000".parse().unwrap();
        let record =
            FingerprintRecord::observed(minimal_hello(), helloprint_core::DecodeMode::Strict)
                .unwrap();
        let report = Report::collect(peer, &record).unwrap();

        assert!(report.ja3.is_none());
        assert_eq!(report.hello.cipher_suites, vec![0xc02f]);
        assert!(report.ja4.hash.starts_with("t12i010000_"));
        assert_eq!(report.meta.server_name, None);
    }

    #[test]
    fn json_line_is_one_object() {
        let peer: SocketAddr = "127.0.0.1:40000".parse().unwrap();
        let record =
            FingerprintRecord::observed(minimal_hello(), helloprint_core::DecodeMode::Lenient)
                .unwrap();
        let report = Report::collect(peer, &record).unwrap();

        let line = json_line(&report, true).unwrap();
        assert!(!line.contains('\n'));
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["src_port"], 40000);
        assert_eq!(value["ja4"], report.ja4.hash.as_str());
        assert_eq!(value["ja4_raw"], report.ja4.raw.as_str());
        assert!(value.get("ja3").is_none());

        let terse: serde_json::Value =
            serde_json::from_str(&json_line(&report, false).unwrap()).unwrap();
        assert!(terse.get("fields").is_none());
    }

    #[test]
    fn hex_versions_are_padded() {
        assert_eq!(hex_versions(&[0x0304, 0x0a0a]), vec!["0x0304", "0x0a0a"]);
    }
}
