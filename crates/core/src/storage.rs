//! Object storage path conventions.
//!
//! Uploaded files are organized by path prefix only; nothing in the
//! database tracks them, so these helpers are the single source of truth
//! for where each kind of asset lands.

use std::cmp::Ordering;

use crate::types::{CategoryId, LayoutKind};

/// Root folder for product images.
pub const PRODUCTS_PREFIX: &str = "produtos";

/// Root folder for homepage layout assets.
pub const LAYOUT_PREFIX: &str = "assets/layout";

/// Strip leading and trailing slashes from a user-supplied folder.
fn clean_folder(folder: &str) -> &str {
    folder.trim_matches('/')
}

/// Keep only the last path component of an uploaded file name.
fn clean_file_name(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name)
}

/// Path for an uploaded product image: `produtos[/<subfolder>]/<millis>_<name>`.
#[must_use]
pub fn product_image_path(subfolder: Option<&str>, file_name: &str, millis: i64) -> String {
    let name = clean_file_name(file_name);
    match subfolder.map(clean_folder).filter(|s| !s.is_empty()) {
        Some(sub) => format!("{PRODUCTS_PREFIX}/{sub}/{millis}_{name}"),
        None => format!("{PRODUCTS_PREFIX}/{millis}_{name}"),
    }
}

/// Path for the thumbnail generated alongside a product image.
#[must_use]
pub fn product_thumb_path(file_name: &str, millis: i64) -> String {
    let name = clean_file_name(file_name);
    let stem = name.rsplit_once('.').map_or(name, |(stem, _)| stem);
    format!("{PRODUCTS_PREFIX}/thumbs/{millis}_{stem}.webp")
}

/// Path for a category image.
#[must_use]
pub fn category_image_path(id: &CategoryId, millis: i64) -> String {
    format!("{LAYOUT_PREFIX}/categories/{id}/{millis}.webp")
}

/// Path for the site logo.
#[must_use]
pub fn logo_path(millis: i64) -> String {
    format!("{LAYOUT_PREFIX}/logo/{millis}.webp")
}

/// Path for the `index`-th file of a multi-file layout upload.
#[must_use]
pub fn layout_asset_path(kind: LayoutKind, millis: i64, index: usize) -> String {
    format!("{LAYOUT_PREFIX}/{}/{millis}_{index}.webp", kind.as_str())
}

/// Normalize a folder for listing: no leading slash, exactly one trailing.
#[must_use]
pub fn listing_prefix(folder: &str) -> String {
    let folder = clean_folder(folder);
    if folder.is_empty() {
        String::new()
    } else {
        format!("{folder}/")
    }
}

/// Last component of an object path.
#[must_use]
pub fn base_name(path: &str) -> &str {
    path.trim_end_matches('/').rsplit('/').next().unwrap_or(path)
}

/// Compare names the way people sort files: digit runs by numeric value,
/// everything else case-insensitively. `img2` sorts before `img10`.
#[must_use]
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();

    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) if l.is_ascii_digit() && r.is_ascii_digit() => {
                let ln = take_digits(&mut left);
                let rn = take_digits(&mut right);
                let ord = compare_digit_runs(&ln, &rn);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(l), Some(r)) => {
                let ord = l.to_lowercase().cmp(r.to_lowercase());
                if ord != Ordering::Equal {
                    return ord;
                }
                left.next();
                right.next();
            }
        }
    }
}

fn take_digits(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut run = String::new();
    while let Some(c) = chars.peek().copied().filter(char::is_ascii_digit) {
        run.push(c);
        chars.next();
    }
    run
}

fn compare_digit_runs(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}
