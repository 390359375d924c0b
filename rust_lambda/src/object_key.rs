use std::borrow::Cow;

use percent_encoding::percent_decode_str;

use crate::error::HandlerError;

/// Unescapes an object key the way S3 writes keys into event payloads:
/// `+` stands for a space and `%XX` for a raw byte.
pub(crate) fn decode(encoded: &str) -> Result<String, HandlerError> {
    check_escapes(encoded)?;
    let spaced = encoded.replace('+', " ");
    percent_decode_str(&spaced)
        .decode_utf8()
        .map(Cow::into_owned)
        .map_err(|e| HandlerError::Decoding(e.to_string()))
}

// percent_decode_str passes malformed escapes through untouched, so reject them first.
fn check_escapes(encoded: &str) -> Result<(), HandlerError> {
    let bytes = encoded.as_bytes();
    let mut pos = 0;
    while pos < bytes.len() {
        if bytes[pos] != b'%' {
            pos += 1;
            continue;
        }
        let escape = &bytes[pos..bytes.len().min(pos + 3)];
        if escape.len() < 3 || !escape[1..].iter().all(u8::is_ascii_hexdigit) {
            return Err(HandlerError::Decoding(format!(
                "invalid URL escape {:?}",
                String::from_utf8_lossy(escape)
            )));
        }
        pos += 3;
    }
    Ok(())
}
