//! Content fingerprints
//!
//! SHA-256 in lowercase hex, the same format `sha256sum` prints, so local
//! and remote fingerprints compare as plain strings.

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::{Error, Result};

/// Fingerprint an in-memory buffer
pub fn fingerprint_bytes(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Fingerprint a local file without loading it whole
pub fn fingerprint_file(path: &Path) -> Result<String> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let mut reader = BufReader::with_capacity(1024 * 1024, file);
    let mut hasher = Sha256::new();

    let mut buffer = [0u8; 65536];
    loop {
        let bytes_read = reader.read(&mut buffer).map_err(|e| Error::io(path, e))?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Parse one line of `sha256sum` output into `(path, fingerprint)`
///
/// GNU coreutils escapes names holding a backslash or a newline: the line
/// then starts with `\` and the name uses `\\`, `\n` and `\r`.
pub fn parse_sha256sum_line(line: &str) -> Option<(String, String)> {
    let (escaped, line) = match line.strip_prefix('\\') {
        Some(rest) => (true, rest),
        None => (false, line),
    };
    let (fingerprint, rest) = line.split_once(' ')?;
    // Second column is the mode marker: ' ' for text, '*' for binary
    let name = rest.strip_prefix([' ', '*']).unwrap_or(rest);
    let name = if escaped {
        unescape_name(name)
    } else {
        name.to_string()
    };
    Some((name, fingerprint.to_string()))
}

fn unescape_name(name: &str) -> String {
    let mut unescaped = String::with_capacity(name.len());
    let mut chars = name.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            unescaped.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => unescaped.push('\n'),
            Some('r') => unescaped.push('\r'),
            Some(other) => unescaped.push(other),
            None => unescaped.push('\\'),
        }
    }
    unescaped
}
