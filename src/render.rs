//! Responsible for templating resolved entries into frontmatter content
//! files and writing them to disk: one `.md` file per post, named by UTC
//! publication date and slugified title, and one `.toml` file per comment
//! under the `comments/` subdirectory. Posts and comments share a single
//! template; fields that don't apply to a record resolve to
//! [`Value::Nil`] and are omitted by the template's `with` blocks.

use crate::entry::{Entry, Tag, LABEL_SCHEME};
use gtmpl::{Template, Value};
use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

/// The frontmatter template. Mirrors the shape the downstream site expects:
/// a `+++`-fenced TOML block with the entry metadata, the `blogimport`
/// marker, and the author table, followed by the raw content body.
const FRONTMATTER_TEMPLATE: &str = "+++
title = \"{{.title}}\"{{with .slug}}
slug = \"{{.}}\"{{end}}
date = {{.date}}
updated = {{.updated}}{{with .tags}}
tags = [{{.}}]{{end}}{{if .draft}}
draft = true{{end}}{{with .comments}}
comments = [ {{.}} ]{{end}}
blogimport = true{{with .extra}}
{{.}}{{end}}
[author]
\tname = \"{{.author_name}}\"
\turi = \"{{.author_uri}}\"
[author.image]
\tsource = \"{{.image_source}}\"
\twidth = \"{{.image_width}}\"
\theight = \"{{.image_height}}\"

+++
{{.content}}
";

/// Templates resolved entries and writes them to disk.
pub struct Renderer {
    template: Template,

    /// Caller-supplied metadata appended verbatim to every rendered
    /// frontmatter block.
    extra: Option<String>,
}

impl Renderer {
    /// Constructs a [`Renderer`], parsing the frontmatter template. `extra`
    /// is the caller-supplied metadata string, if any.
    pub fn new(extra: Option<String>) -> Result<Renderer> {
        let mut template = Template::default();
        template.parse(FRONTMATTER_TEMPLATE)?;
        Ok(Renderer { template, extra })
    }

    /// Writes a post to `{dir}/{published-YYYY-MM-DD}-{slugified-title}.md`.
    /// `comments` is the post's flattened, chronologically-ordered list of
    /// numeric comment identifiers; when empty, the `comments` field is
    /// omitted from the frontmatter entirely.
    pub fn write_post(&self, dir: &Path, entry: &Entry, comments: &[u64]) -> Result<PathBuf> {
        let file_name = format!(
            "{}-{}.md",
            entry.published.ymd(),
            slug::slugify(&entry.title)
        );
        let path = dir.join(file_name);

        let mut record = self.record(entry, entry.title.clone());
        record.insert("slug".to_owned(), slug_value(entry));
        record.insert("comments".to_owned(), comments_value(comments));
        self.render(&path, Value::Object(record))?;
        Ok(path)
    }

    /// Writes a comment to `{dir}/comments/c{id}.toml`, where `id` is the
    /// comment's normalized identifier. The title has embedded line breaks
    /// stripped so it can't split its frontmatter field.
    pub fn write_comment(&self, dir: &Path, entry: &Entry) -> Result<PathBuf> {
        let path = dir
            .join("comments")
            .join(format!("c{}.toml", entry.id));

        let title = entry.title.replace('\n', "").replace('\r', "");
        let record = self.record(entry, title);
        self.render(&path, Value::Object(record))?;
        Ok(path)
    }

    /// The fields common to post and comment records. `slug` and `comments`
    /// default to nil and are only populated for posts.
    fn record(&self, entry: &Entry, title: String) -> HashMap<String, Value> {
        let mut record: HashMap<String, Value> = HashMap::new();
        record.insert("title".to_owned(), Value::String(title));
        record.insert("slug".to_owned(), Value::Nil);
        record.insert("date".to_owned(), Value::String(entry.published.to_string()));
        record.insert("updated".to_owned(), Value::String(entry.updated.to_string()));
        record.insert("tags".to_owned(), tags_value(&entry.tags));
        record.insert("draft".to_owned(), Value::Bool(entry.draft()));
        record.insert("comments".to_owned(), Value::Nil);
        record.insert(
            "extra".to_owned(),
            match &self.extra {
                Some(extra) if !extra.is_empty() => Value::String(extra.clone()),
                _ => Value::Nil,
            },
        );
        record.insert(
            "author_name".to_owned(),
            Value::String(entry.author.name.clone()),
        );
        record.insert(
            "author_uri".to_owned(),
            Value::String(entry.author.uri.clone()),
        );
        record.insert(
            "image_source".to_owned(),
            Value::String(entry.author.image.source.clone()),
        );
        record.insert(
            "image_width".to_owned(),
            Value::from(entry.author.image.width as u64),
        );
        record.insert(
            "image_height".to_owned(),
            Value::from(entry.author.image.height as u64),
        );
        record.insert("content".to_owned(), Value::String(entry.content.clone()));
        record
    }

    fn render(&self, path: &Path, record: Value) -> Result<()> {
        let context = gtmpl::Context::from(record)?;
        self.template.execute(&mut File::create(path)?, &context)?;
        Ok(())
    }
}

/// The post's slug override: emitted only when a slug was derived from the
/// `replies` link and it differs from the title.
fn slug_value(entry: &Entry) -> Value {
    match &entry.slug {
        Some(slug) if !slug.is_empty() && *slug != entry.title => Value::String(slug.clone()),
        _ => Value::Nil,
    }
}

/// The frontmatter tag list: only labels under the visible label scheme,
/// quoted and comma-joined. Nil when the entry carries no labels.
fn tags_value(tags: &[Tag]) -> Value {
    let labels: Vec<String> = tags
        .iter()
        .filter(|tag| tag.scheme == LABEL_SCHEME)
        .map(|tag| format!("{:?}", tag.name))
        .collect();
    match labels.is_empty() {
        true => Value::Nil,
        false => Value::String(labels.join(", ")),
    }
}

/// The flattened comment identifier list, comma-joined. Nil when the post
/// has no attached comments so the field is omitted rather than rendered as
/// empty brackets.
fn comments_value(comments: &[u64]) -> Value {
    match comments.is_empty() {
        true => Value::Nil,
        false => Value::String(
            comments
                .iter()
                .map(u64::to_string)
                .collect::<Vec<String>>()
                .join(", "),
        ),
    }
}

type Result<T> = std::result::Result<T, Error>;

/// Represents an error in a rendering operation.
#[derive(Debug)]
pub enum Error {
    /// An error during templating.
    Template(String),

    /// An error writing the output files.
    Io(io::Error),
}

impl From<io::Error> for Error {
    /// Converts an [`io::Error`] into an [`Error`]. This allows us to use
    /// the `?` operator for fallible I/O operations.
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<String> for Error {
    /// Converts a template error message ([`String`]) into an [`Error`].
    /// This allows us to use the `?` operator for fallible template
    /// operations.
    fn from(err: String) -> Error {
        Error::Template(err)
    }
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as presentable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Template(err) => err.fmt(f),
            Error::Io(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Template(_) => None,
            Error::Io(err) => Some(err),
        }
    }
}
