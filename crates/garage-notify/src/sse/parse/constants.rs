//! Common constants used across the frame decoder.

/// Newline byte
pub(crate) const LF: u8 = b'\n';
/// Carriage return byte
pub(crate) const CR: u8 = b'\r';

/// Byte Order Mark as char
const BOM_CHAR: char = '\u{FEFF}';
const BOM_LEN: usize = BOM_CHAR.len_utf8();
/// Byte representation of the BOM [`char`]
pub(crate) const BOM: &[u8; BOM_LEN] = &{
    let mut buf = [0u8; BOM_LEN];
    BOM_CHAR.encode_utf8(&mut buf);
    buf
};

/// Prefix that marks a data line.
pub(crate) const DATA_PREFIX: &[u8] = b"data:";

/// Payloads the server sends to keep the connection open.
pub(crate) const KEEP_ALIVE_PAYLOADS: &[&str] = &["ping", "heartbeat", ":"];
