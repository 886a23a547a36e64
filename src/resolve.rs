//! Identifier resolution: digging numeric identifiers out of opaque entry
//! IDs and link URLs. Posts are keyed by the decimal suffix after the
//! `post-` marker in their ID; comments locate their parent post through a
//! case-insensitive `related` link, falling back to the `thr:in-reply-to`
//! `source` attribute. Every resolution failure carries an explicit
//! [`Unresolved`] reason rather than a `0` sentinel, so an identifier that
//! legitimately parses to zero can never be mistaken for "unset".

use crate::entry::{Link, ReplyRef};
use std::fmt;
use url::Url;

/// The marker that precedes the numeric identifier inside an entry's opaque
/// ID string.
pub const POST_ID_MARKER: &str = "post-";

/// Why an identifier could not be resolved: the carrier (marker, link, or
/// reply source) was never present, or it was present but its value didn't
/// parse as a decimal number.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Unresolved {
    NotPresent,
    ParseFailed,
}

impl fmt::Display for Unresolved {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Unresolved::NotPresent => write!(f, "no parent reference present"),
            Unresolved::ParseFailed => write!(f, "parent reference did not parse as a number"),
        }
    }
}

/// Returns the portion of an opaque entry ID after the last `post-` marker,
/// or `None` when the marker is absent. The caller normalizes the entry's ID
/// to this suffix in place.
pub fn strip_post_marker(id: &str) -> Option<&str> {
    id.rfind(POST_ID_MARKER)
        .map(|index| &id[index + POST_ID_MARKER.len()..])
}

/// Extracts the numeric identifier of a normalized entry ID: the trailing
/// run of ASCII digits. A fully-numeric ID (`42`) resolves to itself; a
/// comment ID of the form `42.c5` resolves to `5`. IDs without a trailing
/// digit, or whose digits overflow, yield `None`.
pub fn numeric_id(id: &str) -> Option<u64> {
    let start = id
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()?
        .0;
    id[start..].parse().ok()
}

/// Resolves a comment's parent post identifier. The first parseable
/// case-insensitive `related` link wins; otherwise the `thr:in-reply-to`
/// `source` attribute is tried. When both carriers are present, `related`
/// deterministically takes precedence.
pub fn parent_ref(links: &[Link], source: Option<&ReplyRef>) -> Result<u64, Unresolved> {
    let mut reason = Unresolved::NotPresent;

    for link in links {
        if !link.rel.eq_ignore_ascii_case("related") {
            continue;
        }
        match trailing_segment(&link.href).and_then(|segment| segment.parse().ok()) {
            Some(id) => return Ok(id),
            None => reason = Unresolved::ParseFailed,
        }
    }

    if let Some(reply) = source {
        match trailing_segment(&reply.source).and_then(|segment| segment.parse().ok()) {
            Some(id) => return Ok(id),
            None => {
                if !reply.source.is_empty() {
                    reason = Unresolved::ParseFailed;
                }
            }
        }
    }

    Err(reason)
}

/// Derives a post's canonical slug from its case-insensitive `replies`
/// link: the trailing path segment with its file extension stripped. The
/// export carries more than one `replies` link per post; the last one wins.
pub fn slug_from_links(links: &[Link]) -> Option<String> {
    let mut slug = None;
    for link in links {
        if !link.rel.eq_ignore_ascii_case("replies") {
            continue;
        }
        if let Some(segment) = trailing_segment(&link.href) {
            slug = Some(match segment.rfind('.') {
                Some(index) => segment[..index].to_owned(),
                None => segment,
            });
        }
    }
    slug
}

/// The last non-empty path segment of an absolute URL, with query and
/// fragment excluded. `None` for unparseable or cannot-be-a-base URLs.
pub fn trailing_segment(href: &str) -> Option<String> {
    let url = Url::parse(href).ok()?;
    url.path_segments()?
        .filter(|segment| !segment.is_empty())
        .last()
        .map(str::to_owned)
}
