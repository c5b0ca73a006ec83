//! Request target parsing.
//!
//! # Responsibilities
//! - Split a raw request target into path and query
//! - Drop the fragment
//! - Decode query pairs into a flat mapping
//!
//! # Design Decisions
//! - Never fails: malformed targets degrade to a best-effort path and an
//!   empty query rather than an error
//! - Repeated query keys keep the last value
//! - Dot segments are resolved against a fixed origin, so `/a/../b` is `/b`

use std::collections::HashMap;
use url::{form_urlencoded, Url};

const ORIGIN: &str = "http://localhost";

/// Path and query of a request target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestTarget {
    /// Normalized path, always starting with `/`.
    pub path: String,
    /// Decoded query pairs.
    pub query: HashMap<String, String>,
}

/// Extract the path and query mapping from a request target.
///
/// Accepts origin-form (`/tasks?x=1`) as well as absolute-form
/// (`http://host/tasks?x=1`) targets.
pub fn extract(target: &str) -> RequestTarget {
    match resolve(target) {
        Some(url) => RequestTarget {
            path: url.path().to_string(),
            query: url.query_pairs().into_owned().collect(),
        },
        None => extract_lossy(target),
    }
}

/// Convenience wrapper returning only the path.
pub fn pathname(target: &str) -> String {
    extract(target).path
}

/// Origin-form targets are appended to the fixed origin verbatim, so a
/// leading `//` stays part of the path instead of naming an authority.
fn resolve(target: &str) -> Option<Url> {
    if target.starts_with('/') {
        return Url::parse(&format!("{ORIGIN}{target}")).ok();
    }
    let origin = Url::parse(ORIGIN).ok()?;
    origin.join(target).ok()
}

fn extract_lossy(target: &str) -> RequestTarget {
    let without_fragment = target.split('#').next().unwrap_or_default();
    let (path, query) = match without_fragment.split_once('?') {
        Some((path, query)) => (path, query),
        None => (without_fragment, ""),
    };

    let path = if path.is_empty() {
        "/".to_string()
    } else {
        path.to_string()
    };

    RequestTarget {
        path,
        query: form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect(),
    }
}
