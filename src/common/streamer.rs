//! Wire codec for the entry stream
//!
//! One entry per line: `key` + `,` + base64(value) + `\n`. The format has no
//! escaping, so keys must never contain the separator; `validate_key` is
//! enforced on every set path to keep that invariant.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::common::{Entry, Error, Result};

/// Field separator between key and encoded value.
pub const SEPARATOR: char = ',';

/// Upper bound for a single stream line on the consumer side. A value large
/// enough to overflow this buffer is a fatal error for that stream.
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Encodes one entry as a stream line, including the trailing newline.
pub fn encode_entry(entry: &Entry) -> Result<String> {
    if entry.key.contains(SEPARATOR) {
        return Err(Error::Validation(format!(
            "key cannot contain '{}' character",
            SEPARATOR
        )));
    }
    Ok(format!(
        "{}{}{}\n",
        entry.key,
        SEPARATOR,
        STANDARD.encode(&entry.value)
    ))
}

/// Decodes one stream line (without its newline) back into an entry.
pub fn decode_entry(line: &str) -> Result<Entry> {
    let (key, encoded) = line
        .split_once(SEPARATOR)
        .ok_or_else(|| Error::Decode("line is missing the field separator".to_string()))?;
    let value = STANDARD
        .decode(encoded)
        .map_err(|e| Error::Decode(format!("invalid base64 value: {}", e)))?;
    Ok(Entry {
        key: key.to_string(),
        value,
    })
}

/// Checks that a key is storable: non-empty and free of the separator.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(Error::Validation("key cannot be empty".to_string()));
    }
    if key.contains(SEPARATOR) {
        return Err(Error::Validation(format!(
            "key cannot contain '{}' character",
            SEPARATOR
        )));
    }
    Ok(())
}
