//! Binary-tail helpers
//!
//! Image and swarm messages carry a JSON header, a NUL separator, then raw
//! bytes. The cloud relay additionally needs to know whether a datagram is
//! binary at all, for which the legacy trailing-brace test is kept.

/// Split a message at the first NUL byte into JSON part and binary tail.
/// Without a NUL the whole message is the JSON part.
pub fn split_at_nul(message: &[u8]) -> (&[u8], Option<&[u8]>) {
    match message.iter().position(|&b| b == 0) {
        Some(pos) => (&message[..pos], Some(&message[pos + 1..])),
        None => (message, None),
    }
}

/// Legacy binary test: a pure-JSON datagram ends with `}`, possibly followed
/// by a single stray byte.
pub fn is_binary(message: &[u8]) -> bool {
    let ends_with_brace = matches!(message.last(), Some(b'}'))
        || matches!(message.len().checked_sub(2).map(|i| message[i]), Some(b'}'));
    !ends_with_brace
}
