//! Outbound link options.
//!
//! Links generated while handling a request must keep the caller inside
//! the same subsession, so the current subsession id is merged into
//! whatever default options the application already produces.

use std::collections::BTreeMap;

use ms_sessions::RequestContext;

/// Query options attached to generated URLs.
pub type UrlOptions = BTreeMap<String, String>;

/// Merge the request's subsession id (if any) into `base`.
///
/// Existing options are kept; an existing entry named `param_name` is
/// replaced by the current request's id.
pub fn merge_url_options(base: Option<UrlOptions>, ctx: &RequestContext, param_name: &str) -> UrlOptions {
    let mut options = base.unwrap_or_default();
    if let Some(subsession_id) = ctx.param(param_name) {
        options.insert(param_name.to_owned(), subsession_id.to_owned());
    }
    options
}

/// Render options as an `application/x-www-form-urlencoded` query string
/// (without the leading `?`).
pub fn to_query(options: &UrlOptions) -> String {
    // A flat string map always serializes.
    serde_urlencoded::to_string(options).unwrap_or_default()
}

/// Append `options` to `path`, respecting any query it already has.
pub fn link_to(path: &str, options: &UrlOptions) -> String {
    if options.is_empty() {
        return path.to_owned();
    }
    let sep = if path.contains('?') { '&' } else { '?' };
    format!("{path}{sep}{}", to_query(options))
}
