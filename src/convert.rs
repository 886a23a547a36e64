//! Exports the [`convert`] function which stitches together the high-level
//! steps of the conversion: parsing the export document ([`crate::entry`]),
//! classifying entries and indexing posts by numeric identifier
//! ([`crate::resolve`]), rebuilding and flattening the comment hierarchy
//! ([`crate::tree`]), and rendering every post and comment to disk
//! ([`crate::render`]).

use crate::entry::{parse_export, Date, Entry, Kind};
use crate::render::{Error as RenderError, Renderer};
use crate::resolve;
use crate::tree::{CommentTree, Error as TreeError};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Bundled configuration for a conversion run.
pub struct Config {
    /// The path of the export document.
    pub input: PathBuf,

    /// The directory into which post files (and the `comments/`
    /// subdirectory) are written.
    pub output_directory: PathBuf,

    /// Optional metadata appended verbatim to every rendered frontmatter
    /// block.
    pub extra: Option<String>,
}

/// What a completed run wrote and skipped.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Summary {
    /// Posts written that were not drafts.
    pub published: usize,

    /// Draft posts written.
    pub drafts: usize,

    /// Comment files written.
    pub comments: usize,

    /// Comments whose parent post could not be resolved.
    pub orphans: usize,
}

/// Runs the whole conversion: parse, classify, index, build the comment
/// tree, flatten, render. Resolution runs to completion over the full entry
/// collection before any rendering begins. There is no partial-success
/// state: an error aborts the run with no guarantee about which output
/// files were already written.
pub fn convert(config: &Config) -> Result<Summary> {
    let raw = fs::read_to_string(&config.input).map_err(|err| Error::ReadInput {
        path: config.input.clone(),
        err,
    })?;
    let mut export = parse_export(&raw)?;
    if export.entries.is_empty() {
        return Err(Error::NoEntries);
    }

    // Classify every entry, normalize IDs, register posts in the identifier
    // table, and derive slugs. Entries with a kind outside post/comment are
    // excluded entirely; entries with no kind tag are still scanned for
    // links.
    let mut index: HashMap<u64, usize> = HashMap::new();
    let mut posts = 0;
    for (k, entry) in export.entries.iter_mut().enumerate() {
        let kind = entry.kind();
        if kind == Some(Kind::Other) {
            continue;
        }
        if kind == Some(Kind::Post) {
            posts += 1;
        }

        match resolve::strip_post_marker(&entry.id) {
            Some(suffix) => {
                entry.id = suffix.to_owned();
                if kind == Some(Kind::Post) {
                    match entry.id.parse::<u64>() {
                        Ok(id) => {
                            index.insert(id, k);
                        }
                        Err(_) => warn!("can't parse post identifier {}", entry.id),
                    }
                }
            }
            None => {
                if kind == Some(Kind::Post) {
                    warn!("post id {} carries no `{}` marker", entry.id, resolve::POST_ID_MARKER);
                }
            }
        }

        entry.slug = resolve::slug_from_links(&entry.links);
    }
    if posts == 0 {
        return Err(Error::NoPosts);
    }

    prepare_output_directory(&config.output_directory)?;

    let renderer = Renderer::new(config.extra.clone())?;
    let published: Vec<Date> = export.entries.iter().map(|e| e.published).collect();
    let (tree, orphans) = CommentTree::build(&export.entries, &index)?;

    let mut summary = Summary {
        orphans,
        ..Summary::default()
    };

    // Comment records are rendered whether or not they attached to a post;
    // orphans still exist as files, they just aren't cross-referenced.
    for entry in &export.entries {
        if entry.kind() == Some(Kind::Comment) {
            renderer.write_comment(&config.output_directory, entry)?;
            summary.comments += 1;
        }
    }

    for (k, entry) in export.entries.iter().enumerate() {
        if entry.kind() != Some(Kind::Post) {
            continue;
        }
        let thread = tree.flatten(k, &published);
        let comment_ids = resolved_comment_ids(&thread, &export.entries);
        renderer
            .write_post(&config.output_directory, entry, &comment_ids)
            .map_err(|err| Error::WritePost {
                title: entry.title.clone(),
                err,
            })?;
        if entry.draft() {
            summary.drafts += 1;
        } else {
            summary.published += 1;
        }
    }

    Ok(summary)
}

/// Maps a flattened thread of entry indices to numeric comment identifiers.
/// Entries whose ID carries no numeric component are dropped from the
/// cross-reference (the comment file still exists on disk).
fn resolved_comment_ids(thread: &[usize], entries: &[Entry]) -> Vec<u64> {
    thread
        .iter()
        .filter_map(|&i| match resolve::numeric_id(&entries[i].id) {
            Some(id) => Some(id),
            None => {
                warn!("comment id {} is not numeric; dropping its cross-reference", entries[i].id);
                None
            }
        })
        .collect()
}

/// Creates the output directory and its nested `comments/` subdirectory
/// when absent. An existing path that is not a directory is fatal.
fn prepare_output_directory(dir: &Path) -> Result<()> {
    match fs::metadata(dir) {
        Ok(metadata) if !metadata.is_dir() => {
            return Err(Error::NotADirectory(dir.to_owned()));
        }
        _ => {}
    }
    fs::create_dir_all(dir.join("comments"))?;
    Ok(())
}

type Result<T> = std::result::Result<T, Error>;

/// The error type for a conversion run. Errors can be during reading or
/// parsing the export, preparing the output directory, rebuilding the
/// comment tree, and rendering.
#[derive(Debug)]
pub enum Error {
    /// Returned when the export document can't be read.
    ReadInput { path: PathBuf, err: std::io::Error },

    /// Returned when the export document doesn't parse.
    Parse(quick_xml::DeError),

    /// Returned when the export contains no entries at all.
    NoEntries,

    /// Returned when the export contains no post entries.
    NoPosts,

    /// Returned when the output path exists but is not a directory.
    NotADirectory(PathBuf),

    /// Returned when the comment tree is structurally inconsistent.
    Tree(TreeError),

    /// Returned for errors writing a post, annotated with its title.
    WritePost { title: String, err: RenderError },

    /// Returned for other rendering errors.
    Render(RenderError),

    /// Returned for other I/O errors.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::ReadInput { path, err } => {
                write!(f, "reading export file '{}': {}", path.display(), err)
            }
            Error::Parse(err) => err.fmt(f),
            Error::NoEntries => write!(f, "no blog entries found"),
            Error::NoPosts => write!(f, "no posts found in the export"),
            Error::NotADirectory(path) => {
                write!(f, "output path '{}' is not a directory", path.display())
            }
            Error::Tree(err) => err.fmt(f),
            Error::WritePost { title, err } => {
                write!(f, "failed writing post {:?} to disk: {}", title, err)
            }
            Error::Render(err) => err.fmt(f),
            Error::Io(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::ReadInput { path: _, err } => Some(err),
            Error::Parse(err) => Some(err),
            Error::NoEntries => None,
            Error::NoPosts => None,
            Error::NotADirectory(_) => None,
            Error::Tree(err) => Some(err),
            Error::WritePost { title: _, err } => Some(err),
            Error::Render(err) => Some(err),
            Error::Io(err) => Some(err),
        }
    }
}

impl From<quick_xml::DeError> for Error {
    /// Converts [`quick_xml::DeError`]s into [`Error`]. This allows us to
    /// use the `?` operator for deserialization.
    fn from(err: quick_xml::DeError) -> Error {
        Error::Parse(err)
    }
}

impl From<TreeError> for Error {
    /// Converts [`TreeError`]s into [`Error`]. This allows us to use the
    /// `?` operator for tree building.
    fn from(err: TreeError) -> Error {
        Error::Tree(err)
    }
}

impl From<RenderError> for Error {
    /// Converts [`RenderError`]s into [`Error`]. This allows us to use the
    /// `?` operator for rendering.
    fn from(err: RenderError) -> Error {
        Error::Render(err)
    }
}

impl From<std::io::Error> for Error {
    /// Converts [`std::io::Error`]s into [`Error`]. This allows us to use
    /// the `?` operator.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;

    const EXPORT: &str = r#"<?xml version='1.0' encoding='UTF-8'?>
<feed xmlns='http://www.w3.org/2005/Atom' xmlns:app='http://purl.org/atom/app#' xmlns:thr='http://purl.org/syndication/thread/1.0' xmlns:gd='http://schemas.google.com/g/2005'>
 <entry>
  <id>tag:blogger.com,1999:blog-1.post-42</id>
  <published>2020-01-01T10:00:00.000-08:00</published>
  <updated>2020-01-01T10:00:00.000-08:00</updated>
  <category scheme='http://schemas.google.com/g/2005#kind' term='http://schemas.google.com/blogger/2008/kind#post'/>
  <title type='text'>Hello World</title>
  <content type='html'>&lt;p&gt;First post.&lt;/p&gt;</content>
  <link rel='replies' type='text/html' href='http://blog.example.com/2020/01/hello-world.html#comment-form'/>
  <author><name>Ann Author</name><uri>https://www.blogger.com/profile/123</uri></author>
 </entry>
 <entry>
  <id>tag:blogger.com,1999:blog-1.post-42.c5</id>
  <published>2020-01-03T12:00:00.000-08:00</published>
  <updated>2020-01-03T12:00:00.000-08:00</updated>
  <category scheme='http://schemas.google.com/g/2005#kind' term='http://schemas.google.com/blogger/2008/kind#comment'/>
  <title type='text'>Nice post</title>
  <content type='html'>Thanks!</content>
  <link rel='related' type='application/atom+xml' href='http://www.blogger.com/feeds/1/posts/default/42'/>
  <author><name>Carl Commenter</name></author>
 </entry>
 <entry>
  <id>tag:blogger.com,1999:blog-1.post-77</id>
  <published>2020-02-01T10:00:00.000-08:00</published>
  <updated>2020-02-01T10:00:00.000-08:00</updated>
  <app:control><app:draft>yes</app:draft></app:control>
  <category scheme='http://schemas.google.com/g/2005#kind' term='http://schemas.google.com/blogger/2008/kind#post'/>
  <title type='text'>Unfinished</title>
  <content type='html'>Draft body.</content>
  <author><name>Ann Author</name></author>
 </entry>
 <entry>
  <id>tag:blogger.com,1999:blog-1.post-99.c9</id>
  <published>2020-01-04T12:00:00.000-08:00</published>
  <updated>2020-01-04T12:00:00.000-08:00</updated>
  <category scheme='http://schemas.google.com/g/2005#kind' term='http://schemas.google.com/blogger/2008/kind#comment'/>
  <title type='text'>Orphaned</title>
  <content type='html'>Where did the post go?</content>
  <author><name>Dana</name></author>
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

    fn write_export(dir: &Path, contents: &str) -> PathBuf {
        let path = dir.join("export.xml");
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_convert() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let output = dir.path().join("content");
        let config = Config {
            input: write_export(dir.path(), EXPORT),
            output_directory: output.clone(),
            extra: None,
        };

        let summary = convert(&config)?;
        assert_eq!(
            summary,
            Summary {
                published: 1,
                drafts: 1,
                comments: 2,
                orphans: 1,
            }
        );

        let post = fs::read_to_string(output.join("2020-01-01-hello-world.md"))?;
        assert!(post.contains("\ncomments = [ 5 ]\n"));
        assert!(post.contains("\nslug = \"hello-world\"\n"));

        let draft = fs::read_to_string(output.join("2020-02-01-unfinished.md"))?;
        assert!(draft.contains("\ndraft = true\n"));
        assert!(!draft.contains("comments = "));

        assert!(output.join("comments").join("c42.c5.toml").is_file());
        // the orphan is still rendered, it just isn't cross-referenced
        assert!(output.join("comments").join("c99.c9.toml").is_file());
        // the template entry is never rendered
        assert_eq!(fs::read_dir(&output)?.count(), 3);
        Ok(())
    }

    #[test]
    fn test_convert_without_posts_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let export = EXPORT.replace(
            "http://schemas.google.com/blogger/2008/kind#post",
            "http://schemas.google.com/blogger/2008/kind#page",
        );
        let config = Config {
            input: write_export(dir.path(), &export),
            output_directory: dir.path().join("content"),
            extra: None,
        };
        match convert(&config) {
            Err(Error::NoPosts) => {}
            other => panic!("expected NoPosts, got {:?}", other),
        }
    }

    #[test]
    fn test_convert_into_non_directory_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("content");
        fs::File::create(&output).unwrap();
        let config = Config {
            input: write_export(dir.path(), EXPORT),
            output_directory: output,
            extra: None,
        };
        match convert(&config) {
            Err(Error::NotADirectory(_)) => {}
            other => panic!("expected NotADirectory, got {:?}", other),
        }
    }

    #[test]
    fn test_convert_malformed_document_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            input: write_export(dir.path(), "<feed><entry>"),
            output_directory: dir.path().join("content"),
            extra: None,
        };
        assert!(matches!(convert(&config), Err(Error::Parse(_))));
    }
}
