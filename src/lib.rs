//! The library code for the `blogport` Blogger-export converter. The
//! architecture can be generally broken down into three distinct steps:
//!
//! 1. Parsing entries from the export document ([`crate::entry`])
//! 2. Reconstructing the relationships between them ([`crate::resolve`] and
//!    [`crate::tree`])
//! 3. Rendering posts and comments as content files on disk
//!    ([`crate::render`])
//!
//! Of the three, the second step is the more involved, because the export
//! stores posts and comments as a flat, unordered sequence of entries that
//! are only weakly linked to their parents: a comment points at its post
//! through a numeric identifier buried in a link URL (or, failing that, in
//! its `in-reply-to` source), and posts are keyed by a numeric suffix dug
//! out of their opaque ID strings. The resolver extracts those identifiers,
//! the tree builder attaches every comment to its parent (counting the
//! orphans left behind by deleted posts), and the flattener linearizes each
//! post's comment tree into a chronological, pre-order depth-first sequence
//! so hierarchy is preserved by order alone.
//!
//! The third step is pretty straight-forward: for each post and comment,
//! apply the frontmatter template and write the result to disk. The
//! [`crate::convert`] module stitches the steps together.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod convert;
pub mod entry;
pub mod render;
pub mod resolve;
pub mod tree;
