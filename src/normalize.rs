//! Key normalization, numeric coercion and page-tag promotion.
//!
//! The normalizer turns a raw extractor tree into the processed tree that
//! reports and key-path inventories are built from:
//!
//! 1. every mapping key, at every depth, is rewritten to camel case
//! 2. string leaves that look like integers or decimals become numbers
//! 3. a fixed set of common tags is promoted from `pages[*].tags` onto the
//!    page itself
//!
//! The input tree is never modified; a new tree is returned.

use tracing::{debug, info};

use crate::tree::{Mapping, MetadataTree, Scalar};

/// Tags lifted from `pages[*].tags` onto the page, by normalized name.
pub const PROMOTED_TAGS: [&str; 11] = [
    "imageWidth",
    "imageLength",
    "bitsPerSample",
    "dateTime",
    "software",
    "compression",
    "photometricInterpretation",
    "xResolution",
    "yResolution",
    "resolutionUnit",
    "sampleFormat",
];

// =============================================================================
// Key casing
// =============================================================================

fn lower_first(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn upper_first(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Convert a snake, kebab, space separated or Pascal case key to camel case.
///
/// Hyphens and underscores count as spaces. A single word only has its first
/// character lower-cased (`ImageWidth` -> `imageWidth`). With several words
/// the first is lower-cased and every later word gets an upper-case first
/// character with the rest left as is, so `BITS_PER_SAMPLE` becomes
/// `bitsPERSAMPLE`. Separator-only input gives an empty key.
pub fn to_camel_case(text: &str) -> String {
    let spaced = text.replace(['-', '_'], " ");
    let words: Vec<&str> = spaced.split_whitespace().collect();

    match words.as_slice() {
        [] => String::new(),
        [single] => lower_first(single),
        [first, rest @ ..] => {
            let mut out = first.to_lowercase();
            for word in rest {
                out.push_str(&upper_first(word));
            }
            out
        }
    }
}

// =============================================================================
// Numeric coercion
// =============================================================================

fn all_digits(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
}

/// `-?\d+`
fn is_integer_text(text: &str) -> bool {
    all_digits(text.strip_prefix('-').unwrap_or(text))
}

/// `-?\d*\.\d+` or `-?\d+\.\d*`
fn is_decimal_text(text: &str) -> bool {
    let unsigned = text.strip_prefix('-').unwrap_or(text);
    let Some((whole, fraction)) = unsigned.split_once('.') else {
        return false;
    };
    let whole_ok = whole.is_empty() || all_digits(whole);
    let fraction_ok = fraction.is_empty() || all_digits(fraction);
    whole_ok && fraction_ok && !(whole.is_empty() && fraction.is_empty())
}

/// Coerce a string leaf to a number when it is written as one.
///
/// Booleans are left alone. Text that matches a numeric pattern but does not
/// fit the target type (an integer beyond `i64`) stays a string.
pub fn coerce_numeric(text: &str) -> Scalar {
    if is_integer_text(text) {
        if let Ok(value) = text.parse::<i64>() {
            return Scalar::Int(value);
        }
    } else if is_decimal_text(text) {
        if let Ok(value) = text.parse::<f64>() {
            return Scalar::Float(value);
        }
    }
    Scalar::Str(text.to_string())
}

// =============================================================================
// Normalization
// =============================================================================

/// Rewrite keys and coerce string leaves throughout the tree.
///
/// When two keys normalize to the same name the one visited last (in key
/// order) wins.
pub fn normalize_recursively(tree: &MetadataTree) -> MetadataTree {
    match tree {
        MetadataTree::Mapping(map) => MetadataTree::Mapping(
            map.iter()
                .map(|(key, value)| (to_camel_case(key), normalize_recursively(value)))
                .collect(),
        ),
        MetadataTree::Sequence(items) => {
            MetadataTree::Sequence(items.iter().map(normalize_recursively).collect())
        }
        MetadataTree::Scalar(Scalar::Str(text)) => MetadataTree::Scalar(coerce_numeric(text)),
        MetadataTree::Scalar(other) => MetadataTree::Scalar(other.clone()),
    }
}

/// Move [`PROMOTED_TAGS`] out of the page's `tags` mapping. An empty `tags`
/// mapping is removed afterwards.
fn promote_page_tags(page: &mut Mapping) {
    let Some(MetadataTree::Mapping(tags)) = page.get_mut("tags") else {
        debug!("Skipping page for promotion: no 'tags' mapping");
        return;
    };

    let mut promoted = Vec::new();
    for key in PROMOTED_TAGS {
        if let Some(value) = tags.remove(key) {
            promoted.push((key, value));
        }
    }
    let now_empty = tags.is_empty();

    for (key, value) in promoted {
        debug!("Promoted key '{}' to page level", key);
        page.insert(key.to_string(), value);
    }

    if now_empty {
        page.remove("tags");
        debug!("Removed empty 'tags' mapping after promotion");
    }
}

/// Produce the processed tree: normalized keys and values, with common page
/// tags promoted.
pub fn normalize(raw: &MetadataTree) -> MetadataTree {
    info!("Processing raw metadata for key cleaning and field promotion");

    let mut processed = normalize_recursively(raw);

    if let Some(MetadataTree::Sequence(pages)) = processed
        .as_mapping_mut()
        .and_then(|root| root.get_mut("pages"))
    {
        for page in pages.iter_mut() {
            if let MetadataTree::Mapping(page) = page {
                promote_page_tags(page);
            }
        }
    }

    processed
}
