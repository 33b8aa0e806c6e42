//! URL composition: base + endpoint template + path placeholders + query.
//!
//! Placeholders are written `{name}`. A placeholder with no matching key, or
//! whose value is null, is left in the URL verbatim, braces included.
//! Callers that log composed URLs rely on seeing the unfilled name, so this
//! is not treated as an error.

use url::Url;

use crate::error::Error;
use crate::http::Params;

/// Build the final request URL.
///
/// The result is returned as the composed string (not a normalized [`Url`])
/// so that it is exactly `base + endpoint [+ query]`. It is still required to
/// parse as a URL.
pub fn compose(base: &str, endpoint: &str, path_params: &Params, query_params: &Params) -> Result<String, Error> {
    let mut composed = fill_placeholders(&format!("{base}{endpoint}"), path_params);
    append_query(&mut composed, query_params);
    Url::parse(&composed).map_err(|e| Error::InvalidUrl {
        url: composed.clone(),
        reason: e.to_string(),
    })?;
    Ok(composed)
}

/// Replace every `{key}` whose key has a non-null value.
pub fn fill_placeholders(template: &str, params: &Params) -> String {
    params.present().fold(template.to_string(), |acc, (key, value)| {
        acc.replace(&format!("{{{key}}}"), value)
    })
}

/// Append non-null `params` as a query string. Nothing is appended (not even
/// `?`) when no parameter has a value.
fn append_query(target: &mut String, params: &Params) {
    let mut pairs = params.present().peekable();
    if pairs.peek().is_none() {
        return;
    }
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (name, value) in pairs {
        serializer.append_pair(name, value);
    }
    let query = serializer.finish();
    target.push(if target.contains('?') { '&' } else { '?' });
    target.push_str(&query);
}
