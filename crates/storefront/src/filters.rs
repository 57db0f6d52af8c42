//! Custom Askama template filters.

use std::fmt::Display;

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// Formats a cart count for the header badge, capping at "99+".
///
/// Usage in templates: `{{ count|badge }}`
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn badge(count: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    let text = count.to_string();
    Ok(match text.parse::<u32>() {
        Ok(n) if n > 99 => "99+".to_string(),
        _ => text,
    })
}
