const MAX_HOSTNAME_LEN: usize = 255;
const MAX_LABEL_LEN: usize = 63;

fn is_ascii_alphanumeric_or_dash(byte: u8) -> bool {
    matches!(byte, b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-')
}

fn is_valid_label(label: &[u8]) -> bool {
    match label {
        [] => false,
        [b'-', ..] | [.., b'-'] => false,
        _ => {
            label.len() <= MAX_LABEL_LEN
                && label.iter().copied().all(is_ascii_alphanumeric_or_dash)
        }
    }
}

/// Returns true if the input is a syntactically valid hostname: at most 255 bytes, no empty
/// labels, and every dot-separated label matches `^[a-zA-Z0-9]([-a-zA-Z0-9]{0,61}[a-zA-Z0-9])?$`.
/// A single trailing dot, as in a fully qualified name, is accepted.
pub fn is_valid_hostname(value: &(impl AsRef<[u8]> + ?Sized)) -> bool {
    fn inner(value: &[u8]) -> bool {
        if value.len() > MAX_HOSTNAME_LEN {
            return false;
        }

        let value = value.strip_suffix(b".").unwrap_or(value);
        !value.is_empty() && value.split(|&byte| byte == b'.').all(is_valid_label)
    }
    inner(value.as_ref())
}
