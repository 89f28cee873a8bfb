use chardetng::EncodingDetector;
use encoding_rs::Encoding;
use feedlens_logging::lens_warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedSnapshot {
    pub html: String,
    pub encoding_label: String,
}

/// Decode a saved page: BOM first, then the charset declared by the caller
/// (e.g. a `Content-Type` value), then detection. Malformed sequences are
/// replaced rather than rejected.
pub fn decode_snapshot(bytes: &[u8], declared_charset: Option<&str>) -> DecodedSnapshot {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return decode_with(bytes, encoding);
    }

    if let Some(encoding) = declared_charset.and_then(|label| Encoding::for_label(label.trim().as_bytes())) {
        return decode_with(bytes, encoding);
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    decode_with(bytes, detector.guess(None, true))
}

fn decode_with(bytes: &[u8], encoding: &'static Encoding) -> DecodedSnapshot {
    let (text, actual, had_errors) = encoding.decode(bytes);
    if had_errors {
        lens_warn!("Snapshot had invalid {} sequences; replaced", actual.name());
    }
    DecodedSnapshot {
        html: text.into_owned(),
        encoding_label: actual.name().to_string(),
    }
}
