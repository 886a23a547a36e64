//! Rebuilds the comment hierarchy from the flat entry collection and
//! flattens each post's tree into a single chronological, pre-order
//! depth-first sequence of entry indices. The builder borrows the entry
//! collection immutably and owns the resulting adjacency; flattening is a
//! pure function of that adjacency plus a timestamp slice, so the ordering
//! logic can be exercised with synthetic data.

use crate::entry::{Date, Entry, Kind};
use crate::resolve;
use std::collections::HashMap;
use std::fmt;
use tracing::info;

/// The comment adjacency for the whole entry collection: `children[i]`
/// holds the entry indices of the comments attached to entry `i`, in the
/// order they were encountered.
pub struct CommentTree {
    children: Vec<Vec<usize>>,
}

impl CommentTree {
    /// Attaches every comment entry to its parent post. Comments whose
    /// parent reference is absent or unparseable are orphans — expected for
    /// deleted parent posts — and are counted and skipped. A comment whose
    /// reference resolves to a number that was never registered as a post is
    /// a structural inconsistency in the export and aborts the run.
    ///
    /// Returns the adjacency and the orphan count.
    pub fn build(
        entries: &[Entry],
        index: &HashMap<u64, usize>,
    ) -> Result<(CommentTree, usize)> {
        let mut children = vec![Vec::new(); entries.len()];
        let mut orphans = 0;

        for (k, entry) in entries.iter().enumerate() {
            if entry.kind() != Some(Kind::Comment) {
                continue;
            }
            match resolve::parent_ref(&entry.links, entry.source.as_ref()) {
                Err(reason) => {
                    info!("skipping comment {} with deleted parent: {}", entry.id, reason);
                    orphans += 1;
                }
                Ok(parent) => match index.get(&parent) {
                    Some(&post) => children[post].push(k),
                    None => {
                        return Err(Error::UnknownParent {
                            id: entry.id.clone(),
                            parent,
                        })
                    }
                },
            }
        }

        Ok((CommentTree { children }, orphans))
    }

    /// Flattens the comment tree rooted at `root` into a pre-order
    /// depth-first sequence of entry indices, with siblings in ascending
    /// publication order. `published` is the timestamp for each entry index;
    /// the sort is stable, so equal timestamps keep their insertion order.
    /// The result is newly allocated and the adjacency is untouched, so
    /// flattening the same root twice yields the same sequence.
    pub fn flatten(&self, root: usize, published: &[Date]) -> Vec<usize> {
        let mut flattened = Vec::new();
        self.walk(root, published, &mut flattened);
        flattened
    }

    fn walk(&self, node: usize, published: &[Date], out: &mut Vec<usize>) {
        let mut siblings = self.children[node].clone();
        siblings.sort_by_key(|&child| published[child]);
        for child in siblings {
            out.push(child);
            self.walk(child, published, out);
        }
    }
}

type Result<T> = std::result::Result<T, Error>;

/// Represents a structural inconsistency found while building the comment
/// tree.
#[derive(Debug)]
pub enum Error {
    /// Returned when a comment's parent reference resolved to an identifier
    /// that was never registered as a post.
    UnknownParent { id: String, parent: u64 },
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::UnknownParent { id, parent } => write!(
                f,
                "comment {} refers to parent {} which was never seen as a post",
                id, parent
            ),
        }
    }
}

impl std::error::Error for Error {}
