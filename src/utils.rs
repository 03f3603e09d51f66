/// Renders wire bytes for logs: printable ASCII as-is, everything else as
/// `<XX>` uppercase hex.
pub(crate) fn format_wire(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        return "<empty>".to_string();
    }

    let mut rendered = String::with_capacity(bytes.len().saturating_mul(2));
    for byte in bytes {
        if byte.is_ascii_graphic() || *byte == b' ' {
            rendered.push(char::from(*byte));
        } else {
            rendered.push('<');
            rendered.push_str(&hex::encode_upper([*byte]));
            rendered.push('>');
        }
    }
    rendered
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn format_wire_handles_empty_payload() {
        assert_eq!("<empty>", format_wire(&[]));
    }

    #[test]
    fn format_wire_escapes_control_bytes() {
        assert_eq!(
            "<00><01>Z00<02>AA<1B>0o hi<04>",
            format_wire(b"\x00\x01Z00\x02AA\x1b0o hi\x04")
        );
    }
}
