//! Defines the data model for a Blogger export document: the [`Export`]
//! envelope, the [`Entry`] items it contains, and the supporting value types
//! ([`Date`], [`Tag`], [`Author`], [`Link`], [`ReplyRef`]). Also defines the
//! [`Kind`] classification which decides whether an entry is a post, a
//! comment, or something else entirely (e.g. a template), and the
//! [`parse_export`] entry point for deserializing the document.
//!
//! The export is an Atom feed, but it leans on Blogger extension elements
//! (`app:control` for the draft flag, `thr:in-reply-to` for the reply
//! target, `gd:image` for the author avatar) that generic Atom models drop,
//! so we deserialize the schema directly with [`quick_xml`].

use chrono::{DateTime, Utc};
use serde::de::Error as DeserializeError;
use serde::{Deserialize, Deserializer};
use std::fmt;

/// The category scheme that marks an entry's role in the export.
pub const KIND_SCHEME: &str = "http://schemas.google.com/g/2005#kind";

/// The kind term for post entries.
pub const KIND_POST: &str = "http://schemas.google.com/blogger/2008/kind#post";

/// The kind term for comment entries.
pub const KIND_COMMENT: &str = "http://schemas.google.com/blogger/2008/kind#comment";

/// The category scheme under which an entry's visible labels live, as
/// opposed to kind markers and other machine categories.
pub const LABEL_SCHEME: &str = "http://www.blogger.com/atom/ns#";

/// An entry's role in the export. Entries carrying a kind tag outside
/// post/comment (templates, settings) are [`Kind::Other`] and are never
/// indexed, attached to a tree, or rendered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kind {
    Post,
    Comment,
    Other,
}

/// The whole export document. Feed-level metadata (title, author, the feed's
/// own links) carries no information we need, so only the entries are
/// modeled.
#[derive(Debug, Deserialize)]
#[serde(rename = "feed")]
pub struct Export {
    #[serde(rename = "entry", default)]
    pub entries: Vec<Entry>,
}

/// One item from the export: a post, a comment, or an ignored entry.
#[derive(Debug, Deserialize)]
pub struct Entry {
    /// The opaque identifier from the feed, e.g.
    /// `tag:blogger.com,1999:blog-1.post-42`. Normalized in place to the
    /// decimal suffix once the `post-` marker has been located (see
    /// [`crate::resolve::strip_post_marker`]).
    pub id: String,

    pub published: Date,
    pub updated: Date,

    #[serde(rename = "app:control", alias = "control", default)]
    control: Option<Control>,

    #[serde(deserialize_with = "element_text", default)]
    pub title: String,

    #[serde(deserialize_with = "element_text", default)]
    pub content: String,

    #[serde(rename = "category", default)]
    pub tags: Vec<Tag>,

    #[serde(default)]
    pub author: Author,

    /// The `thr:in-reply-to` reply target, present on comments.
    #[serde(rename = "thr:in-reply-to", alias = "in-reply-to", default)]
    pub source: Option<ReplyRef>,

    #[serde(rename = "link", default)]
    pub links: Vec<Link>,

    /// The canonical slug derived from the post's `replies` link, populated
    /// during resolution.
    #[serde(skip)]
    pub slug: Option<String>,
}

impl Entry {
    /// Classifies the entry by its kind tag. The first tag under the kind
    /// scheme decides: post, comment, or [`Kind::Other`] for any other term.
    /// Entries without a kind tag return `None`; they take no part in tree
    /// building but are still scanned for links.
    pub fn kind(&self) -> Option<Kind> {
        for tag in &self.tags {
            if tag.scheme == KIND_SCHEME {
                return Some(match tag.name.as_str() {
                    KIND_POST => Kind::Post,
                    KIND_COMMENT => Kind::Comment,
                    _ => Kind::Other,
                });
            }
        }
        None
    }

    /// Whether the entry is marked as a draft. Entries without an
    /// `app:control` element are published.
    pub fn draft(&self) -> bool {
        match &self.control {
            Some(control) => control.draft.0,
            None => false,
        }
    }
}

/// A `(name, scheme)` category pair, in document order.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct Tag {
    #[serde(rename = "@term")]
    pub name: String,

    #[serde(rename = "@scheme", default)]
    pub scheme: String,
}

/// An entry's author, including the `gd:image` avatar.
#[derive(Debug, Default, Deserialize)]
pub struct Author {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub uri: String,

    #[serde(rename = "gd:image", alias = "image", default)]
    pub image: Image,
}

/// An author avatar: source URL plus pixel dimensions.
#[derive(Debug, Default, Deserialize)]
pub struct Image {
    #[serde(rename = "@src", default)]
    pub source: String,

    #[serde(rename = "@width", default)]
    pub width: u32,

    #[serde(rename = "@height", default)]
    pub height: u32,
}

/// An atom `link` element. Only `rel` and `href` matter to us: the
/// (case-insensitive) `related` relation carries a comment's parent post
/// reference and the `replies` relation carries a post's canonical slug.
#[derive(Clone, Debug, Deserialize)]
pub struct Link {
    #[serde(rename = "@rel", default)]
    pub rel: String,

    #[serde(rename = "@href", default)]
    pub href: String,
}

/// A comment's `thr:in-reply-to` target. The `source` attribute is the
/// fallback parent reference when no `related` link resolves.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ReplyRef {
    #[serde(rename = "@href", default)]
    pub href: String,

    #[serde(rename = "@source", default)]
    pub source: String,
}

/// A publication timestamp. The export writes a fixed format with exactly
/// three fractional-second digits and a timezone offset
/// (`2020-01-01T10:00:00.000-08:00`); anything else fails deserialization,
/// which aborts the run. Stored and displayed in UTC.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Date(DateTime<Utc>);

/// The format the export writes timestamps in.
const DATE_INPUT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%:z";

/// The format timestamps take in rendered frontmatter: an unquoted TOML
/// datetime, normalized to UTC.
const DATE_OUTPUT_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

impl Date {
    /// The UTC date portion (`YYYY-MM-DD`), used to prefix post file names.
    pub fn ymd(&self) -> String {
        self.0.format("%Y-%m-%d").to_string()
    }
}

impl std::str::FromStr for Date {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Date, Self::Err> {
        let parsed = DateTime::parse_from_str(s, DATE_INPUT_FORMAT)?;
        Ok(Date(parsed.with_timezone(&Utc)))
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.format(DATE_OUTPUT_FORMAT).fmt(f)
    }
}

impl<'de> Deserialize<'de> for Date {
    fn deserialize<D>(deserializer: D) -> Result<Date, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse::<Date>().map_err(|e| {
            D::Error::custom(format!("invalid timestamp `{}`: {}", raw, e))
        })
    }
}

/// The `app:control` wrapper around the draft flag.
#[derive(Debug, Default, Deserialize)]
struct Control {
    #[serde(rename = "app:draft", alias = "draft", default)]
    draft: Draft,
}

/// The draft flag, written as the literal strings `yes`/`no`. Any other
/// literal fails deserialization and aborts the run.
#[derive(Clone, Copy, Debug, Default)]
struct Draft(bool);

impl<'de> Deserialize<'de> for Draft {
    fn deserialize<D>(deserializer: D) -> Result<Draft, D::Error>
    where
        D: Deserializer<'de>,
    {
        match String::deserialize(deserializer)?.as_str() {
            "yes" => Ok(Draft(true)),
            "no" => Ok(Draft(false)),
            other => Err(D::Error::custom(format!(
                "unknown value for draft flag: `{}`",
                other
            ))),
        }
    }
}

/// Extracts the text content of an element that may also carry attributes
/// (`<title type='text'>…</title>`), discarding the attributes.
fn element_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Text {
        #[serde(rename = "$text", default)]
        value: String,
    }

    Ok(Text::deserialize(deserializer)?.value)
}

/// Parses a whole export document. A document that isn't well-formed XML, or
/// whose entries carry malformed timestamps or draft flags, fails here and
/// aborts the run.
pub fn parse_export(raw: &str) -> Result<Export, quick_xml::DeError> {
    quick_xml::de::from_str(raw)
}

#[cfg(test)]
mod test {
    use super::*;

    const EXPORT: &str = r#"<?xml version='1.0' encoding='UTF-8'?>
<feed xmlns='http://www.w3.org/2005/Atom' xmlns:app='http://purl.org/atom/app#' xmlns:thr='http://purl.org/syndication/thread/1.0' xmlns:gd='http://schemas.google.com/g/2005'>
 <id>tag:blogger.com,1999:blog-1</id>
 <title type='text'>Example Blog</title>
 <entry>
  <id>tag:blogger.com,1999:blog-1.post-42</id>
  <published>2020-01-01T10:00:00.000-08:00</published>
  <updated>2020-01-02T09:30:00.000-08:00</updated>
  <app:control><app:draft>no</app:draft></app:control>
  <category scheme='http://schemas.google.com/g/2005#kind' term='http://schemas.google.com/blogger/2008/kind#post'/>
  <category scheme='http://www.blogger.com/atom/ns#' term='rust'/>
  <title type='text'>Hello World</title>
  <content type='html'>&lt;p&gt;First post.&lt;/p&gt;</content>
  <link rel='replies' type='text/html' href='http://blog.example.com/2020/01/hello-world.html#comment-form' title='0 Comments'/>
  <author>
   <name>Ann Author</name>
   <uri>https://www.blogger.com/profile/123</uri>
   <email>noreply@blogger.com</email>
   <gd:image rel='http://schemas.google.com/g/2005#thumbnail' width='32' height='30' src='//img.example.com/avatar.png'/>
  </author>
 </entry>
 <entry>
  <id>tag:blogger.com,1999:blog-1.post-42.c5</id>
  <published>2020-01-03T12:00:00.000-08:00</published>
  <updated>2020-01-03T12:00:00.000-08:00</updated>
  <category scheme='http://schemas.google.com/g/2005#kind' term='http://schemas.google.com/blogger/2008/kind#comment'/>
  <title type='text'>Nice post</title>
  <content type='html'>Thanks!</content>
  <link rel='related' type='application/atom+xml' href='http://www.blogger.com/feeds/1/posts/default/42'/>
  <thr:in-reply-to href='http://blog.example.com/2020/01/hello-world.html' source='http://www.blogger.com/feeds/1/posts/default/42' type='text/html'/>
  <author><name>Carl Commenter</name><uri>https://www.blogger.com/profile/456</uri></author>
 </entry>
 <entry>
  <id>tag:blogger.com,1999:blog-1.template</id>
  <published>2019-12-01T00:00:00.000-08:00</published>
  <updated>2019-12-01T00:00:00.000-08:00</updated>
  <category scheme='http://schemas.google.com/g/2005#kind' term='http://schemas.google.com/blogger/2008/kind#template'/>
  <title type='text'>Template</title>
  <content type='html'>ignored</content>
  <author><name>Ann Author</name></author>
 </entry>
</feed>"#;

    #[test]
    fn test_parse_export() -> Result<(), quick_xml::DeError> {
        let export = parse_export(EXPORT)?;
        assert_eq!(export.entries.len(), 3);

        let post = &export.entries[0];
        assert_eq!(post.kind(), Some(Kind::Post));
        assert!(!post.draft());
        assert_eq!(post.title, "Hello World");
        assert_eq!(post.content, "<p>First post.</p>");
        assert_eq!(post.author.name, "Ann Author");
        assert_eq!(post.author.image.source, "//img.example.com/avatar.png");
        assert_eq!(post.author.image.width, 32);
        assert_eq!(post.author.image.height, 30);
        assert_eq!(
            post.tags,
            vec![
                Tag {
                    name: KIND_POST.to_owned(),
                    scheme: KIND_SCHEME.to_owned(),
                },
                Tag {
                    name: "rust".to_owned(),
                    scheme: LABEL_SCHEME.to_owned(),
                },
            ]
        );

        let comment = &export.entries[1];
        assert_eq!(comment.kind(), Some(Kind::Comment));
        assert_eq!(comment.links.len(), 1);
        assert_eq!(comment.links[0].rel, "related");
        let source = comment.source.as_ref().unwrap();
        assert_eq!(source.source, "http://www.blogger.com/feeds/1/posts/default/42");

        // a kind term outside post/comment always classifies as Other
        assert_eq!(export.entries[2].kind(), Some(Kind::Other));
        Ok(())
    }

    #[test]
    fn test_date_normalizes_to_utc() {
        let date: Date = "2020-01-01T10:00:00.000-08:00".parse().unwrap();
        assert_eq!(date.to_string(), "2020-01-01T18:00:00Z");
        assert_eq!(date.ymd(), "2020-01-01");
    }

    #[test]
    fn test_date_requires_fixed_format() {
        assert!("2020-01-01T10:00:00-08:00".parse::<Date>().is_err());
        assert!("2020-01-01".parse::<Date>().is_err());
    }

    #[test]
    fn test_no_kind_tag_classifies_as_none() {
        let export = parse_export(
            &EXPORT.replace("http://schemas.google.com/g/2005#kind", "http://example.com/other"),
        )
        .unwrap();
        assert_eq!(export.entries[0].kind(), None);
    }

    #[test]
    fn test_draft_yes() {
        let export =
            parse_export(&EXPORT.replace("<app:draft>no<", "<app:draft>yes<")).unwrap();
        assert!(export.entries[0].draft());
    }

    #[test]
    fn test_invalid_draft_literal_is_fatal() {
        assert!(parse_export(&EXPORT.replace("<app:draft>no<", "<app:draft>maybe<")).is_err());
    }

    #[test]
    fn test_malformed_timestamp_is_fatal() {
        assert!(parse_export(
            &EXPORT.replace("2020-01-01T10:00:00.000-08:00", "January 1st, 2020")
        )
        .is_err());
    }
}
