// authflow_rewriter::url
//
// URL classification and joining for the rewriter.  Every attribute value
// that flows through a rewrite rule is classified here first: absolute
// values keep their decomposition, relative values get promoted against the
// proxy's base URL.
//
// Classification:
//   absolute        https://example.com/path      (scheme + host)
//   relative        /path  or  ../path  or  ""    (no scheme or no host)
//   opaque          mailto:…  data:…              (scheme, no host – treated
//                                                  as relative)
//
// Unparsable strings are never an error; they classify as relative and the
// rewrite rules leave them alone.

use url::Url;

/// True iff `raw` parses to a URL carrying both a scheme and a host.
pub fn is_absolute(raw: &str) -> bool {
    match Url::parse(raw.trim()) {
        Ok(u) => u.host_str().is_some(),
        Err(_) => false,
    }
}

/// The `scheme://host[:port]` triple, with the port omitted when it is the
/// scheme default.  `None` for host-less URLs (`data:`, `mailto:`, …).
pub fn origin(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    match url.port() {
        Some(port) => Some(format!("{}://{}:{}", url.scheme(), host, port)),
        None => Some(format!("{}://{}", url.scheme(), host)),
    }
}

/// Copy of `url` with the query component removed.
pub fn without_query(url: &Url) -> Url {
    let mut out = url.clone();
    out.set_query(None);
    out
}

/// Join a relative reference onto `base`.
///
/// An empty reference resolves to `base` stripped of its query.  Otherwise
/// the result keeps `base`'s scheme, host and port, the reference's query
/// and fragment, and a path made of `base`'s path with the reference's path
/// appended (doubled slashes collapsed).  The base path stays a prefix of
/// the joined path so the promoted URL still lands inside the proxy's own
/// path namespace.
pub fn join(base: &Url, relative: &str) -> Url {
    let mut out = without_query(base);
    let relative = relative.trim();
    if relative.is_empty() {
        return out;
    }

    let (rest, fragment) = match relative.split_once('#') {
        Some((r, f)) => (r, Some(f)),
        None => (relative, None),
    };
    let (path, query) = match rest.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (rest, None),
    };

    let joined = format!("{}{}", base.path(), path).replace("//", "/");
    out.set_path(&joined);
    out.set_query(query);
    out.set_fragment(fragment);
    out
}
