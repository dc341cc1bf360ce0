use std::borrow::Cow;

use log::warn;

pub const DEVELOP: &str = "develop";
pub const MASTER: &str = "master";

const FEATURE_PREFIX: &str = "feature/";
const RELEASE_PREFIX: &str = "release/";
const HOTFIX_PREFIX: &str = "hotfix/";

/// Maximum length of an image tag, see the `tag` production in
/// https://github.com/distribution/distribution/blob/v2.7.1/reference/reference.go.
const MAX_TAG_LEN: usize = 128;

/// Returns the tag of the base image that an image built from `branch` should derive from,
/// following the git-flow branching model.
pub fn parent_tag(branch: &str) -> &'static str {
    match branch {
        DEVELOP => DEVELOP,
        MASTER => MASTER,
        _ if branch.starts_with(FEATURE_PREFIX) => DEVELOP,
        _ if branch.starts_with(RELEASE_PREFIX) || branch.starts_with(HOTFIX_PREFIX) => MASTER,
        _ => {
            warn!("Unrecognized branch {branch:?}; can't figure out a parent tag. Assuming '{DEVELOP}'.");
            DEVELOP
        }
    }
}

fn is_tag_byte(byte: u8) -> bool {
    matches!(byte, b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_' | b'.' | b'-')
}

/// Returns true if the input matches the regex `^[\w][\w.-]{0,127}$`.
pub fn is_image_tag(value: &str) -> bool {
    match value.as_bytes() {
        [] => false,
        [b'.' | b'-', ..] => false,
        bytes => bytes.len() <= MAX_TAG_LEN && bytes.iter().copied().all(is_tag_byte),
    }
}

/// Lossily converts a branch name into an image tag. Every `/`, and every other byte outside of
/// `[A-Za-z0-9_.-]`, becomes `-`. A leading `.` or `-` becomes `_` and the result is truncated to
/// 128 bytes. Returns `None` for an empty branch name.
pub fn to_image_tag_lossy(branch: &str) -> Option<Cow<str>> {
    if branch.is_empty() {
        return None;
    }

    if is_image_tag(branch) {
        return Some(Cow::Borrowed(branch));
    }

    let mut output = String::with_capacity(branch.len().min(MAX_TAG_LEN));
    for (index, c) in branch.chars().enumerate() {
        if output.len() == MAX_TAG_LEN {
            break;
        }
        output.push(match c {
            '.' | '-' if index == 0 => '_',
            c if c.is_ascii() && is_tag_byte(c as u8) => c,
            _ => '-',
        });
    }

    debug_assert!(is_image_tag(&output));

    Some(Cow::Owned(output))
}
