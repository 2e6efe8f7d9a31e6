/// RFC 8701 reserves sixteen code points that clients sprinkle into their
/// lists: both bytes equal, each with a low nibble of 0xA (0x0A0A ... 0xFAFA).
pub fn is_grease_u16(val: u16) -> bool {
    match val.to_be_bytes() {
        [hi, lo] if hi == lo => hi & 0x0F == 0x0A,
        _ => false,
    }
}

/// Drop GREASE entries, keeping the order of everything else.
pub fn filter_grease_u16(values: &[u16]) -> Vec<u16> {
    values
        .iter()
        .filter(|&&v| !is_grease_u16(v))
        .copied()
        .collect()
}
