//! Line splitting and payload classification.

use bytes::{Buf, Bytes, BytesMut};
use tracing::warn;

use super::constants::{CR, DATA_PREFIX, KEEP_ALIVE_PAYLOADS, LF};
use crate::{notification::Notification, sse::types::Frame};

/// Finds the next end-of-line in `bytes`.
///
/// Returns `(line_end, remainder_start)`: the non-inclusive end of the
/// line and the inclusive start of the remainder.  Returns `None` if
/// more data is needed (e.g. buffer ends with a lone CR that could be
/// part of a CRLF pair).
fn find_eol(bytes: &[u8]) -> Option<(usize, usize)> {
    let first_match = memchr::memchr2(CR, LF, bytes)?;

    match bytes[first_match] {
        LF => Some((first_match, first_match + 1)),
        CR => {
            if first_match + 1 >= bytes.len() {
                return None;
            }

            if bytes[first_match + 1] == LF {
                Some((first_match, first_match + 2))
            } else {
                Some((first_match, first_match + 1))
            }
        }
        _ => unreachable!(),
    }
}

/// Splits the next complete line off the front of `buffer`, without its
/// terminator.
///
/// Returns `None` if the buffer holds no complete line yet.
pub(crate) fn next_line(buffer: &mut BytesMut) -> Option<Bytes> {
    let (line_end, rem_start) = find_eol(buffer)?;

    let line = buffer.split_to(line_end).freeze();
    buffer.advance(rem_start - line_end);
    Some(line)
}

/// Returns the payload of a `data:` line, or `None` for any other line.
pub(crate) fn data_payload(line: &[u8]) -> Option<&[u8]> {
    line.strip_prefix(DATA_PREFIX).map(<[u8]>::trim_ascii)
}

fn is_keep_alive(payload: &str) -> bool {
    payload.is_empty()
        || KEEP_ALIVE_PAYLOADS
            .iter()
            .any(|sentinel| payload.eq_ignore_ascii_case(sentinel))
}

/// Turn one complete line into a frame.
///
/// Non-data lines yield `None`. Malformed payloads are logged and reported
/// as [`Frame::Malformed`] so the caller can keep reading.
pub(crate) fn frame_from_line(line: &[u8]) -> Option<Frame> {
    let payload = data_payload(line)?;

    let text = match std::str::from_utf8(payload) {
        Ok(text) => text,
        Err(e) => return Some(malformed(String::from_utf8_lossy(payload).into_owned(), e)),
    };

    if is_keep_alive(text) {
        return Some(Frame::KeepAlive);
    }

    match serde_json::from_str::<Notification>(text) {
        Ok(notification) => Some(Frame::Notification(notification)),
        Err(e) => Some(malformed(text.to_string(), e)),
    }
}

fn malformed(payload: String, reason: impl std::fmt::Display) -> Frame {
    let reason = reason.to_string();
    warn!(%payload, error = %reason, "Skipping malformed notification frame");
    Frame::Malformed { payload, reason }
}
