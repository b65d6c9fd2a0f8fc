//! Key-path inventory and structural templates.
//!
//! A key path addresses one location in a tree: mapping keys and sequence
//! indices joined with `.`, for example `pages.0.tags.imageWidth`. The
//! structural template of a path replaces every all-digit segment with
//! [`WILDCARD`], so `pages.0.tags` and `pages.1.tags` both become
//! `pages.[].tags`.
//!
//! A mapping key made only of digits cannot be told apart from a sequence
//! index and is collapsed as well.

use std::collections::BTreeSet;

use crate::tree::MetadataTree;

/// Segment that stands in for any sequence index.
pub const WILDCARD: &str = "[]";

fn join(parent: &str, segment: &str) -> String {
    if parent.is_empty() {
        segment.to_string()
    } else {
        format!("{}.{}", parent, segment)
    }
}

fn collect_paths(node: &MetadataTree, parent: &str, out: &mut Vec<String>) {
    match node {
        MetadataTree::Mapping(map) => {
            for (key, value) in map {
                let path = join(parent, key);
                out.push(path.clone());
                collect_paths(value, &path, out);
            }
        }
        MetadataTree::Sequence(items) => {
            for (index, item) in items.iter().enumerate() {
                let path = join(parent, &index.to_string());
                out.push(path.clone());
                collect_paths(item, &path, out);
            }
        }
        MetadataTree::Scalar(_) => {}
    }
}

/// Every path in `tree`, in pre-order: a path comes before the paths below it.
///
/// The root itself has no path; a scalar root yields nothing.
pub fn key_paths(tree: &MetadataTree) -> Vec<String> {
    let mut out = Vec::new();
    collect_paths(tree, "", &mut out);
    out
}

/// Sorted, de-duplicated key paths, as written to `_key_paths.txt`.
pub fn sorted_key_paths(tree: &MetadataTree) -> Vec<String> {
    key_paths(tree)
        .into_iter()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn is_index_segment(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}

/// Template of one path: all-digit segments become [`WILDCARD`].
pub fn template_path(path: &str) -> String {
    path.split('.')
        .map(|segment| {
            if is_index_segment(segment) {
                WILDCARD
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}

/// Sorted, de-duplicated structural templates of `paths`. Empty paths are
/// skipped. Applying this to its own output changes nothing.
pub fn structure_template<I, S>(paths: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    paths
        .into_iter()
        .filter(|p| !p.as_ref().is_empty())
        .map(|p| template_path(p.as_ref()))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Lines joined with a trailing newline after each, the text-file format of
/// both inventories.
pub fn to_lines(paths: &[String]) -> String {
    let mut out = String::with_capacity(paths.iter().map(|p| p.len() + 1).sum());
    for path in paths {
        out.push_str(path);
        out.push('\n');
    }
    out
}
