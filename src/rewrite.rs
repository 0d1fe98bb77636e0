// authflow_rewriter::rewrite
//
// URL rewrite rules.  Three independent passes over the known URL-bearing
// attributes; the proxy's page-fetch path composes them in whatever order
// it needs:
//
//   replace_matching_urls     origin swap – traffic aimed at the captured
//                             host is redirected at the proxy
//   replace_empty_action_urls action="" becomes the page's own URL, the
//                             submit target a browser would use
//   prepend_relative_urls     relative references are promoted to absolute
//                             URLs under the proxy's base
//
// Malformed attribute values are left unchanged; none of these passes
// fails a page.

use log::debug;
use url::Url;

use crate::html::{self, AttrsExt};
use crate::url::{is_absolute, join, origin};

/// Swap the origin of every candidate attribute value that points at
/// `target_url` (same origin, or a textual prefix match) so it points at
/// `replacement_base_url`'s origin instead.  Path, query and fragment are
/// preserved.
pub fn replace_matching_urls(
    target_url: &str,
    replacement_base_url: &str,
    html_in: &str,
) -> String {
    if html_in.is_empty() {
        return String::new();
    }
    let target = match Url::parse(target_url) {
        Ok(u) => u,
        Err(_) => {
            debug!("replace_matching_urls: unparsable target {:?}", target_url);
            return html_in.to_string();
        }
    };
    let replacement = match Url::parse(replacement_base_url) {
        Ok(u) => u,
        Err(_) => {
            debug!(
                "replace_matching_urls: unparsable replacement {:?}",
                replacement_base_url
            );
            return html_in.to_string();
        }
    };

    let doc = html::parse(html_in);
    let mut swapped = 0usize;
    html::for_each_element(
        &doc,
        |tag| html::url_attribute(tag).is_some(),
        |tag, attrs| {
            if let Some(attr) = html::url_attribute(tag) {
                if let Some(value) = attrs.get(attr).map(|s| s.to_string()) {
                    if let Some(new_value) =
                        swap_origin(&target, target_url, &replacement, &value)
                    {
                        attrs.set(attr, new_value);
                        swapped += 1;
                    }
                }
            }
        },
    );
    debug!("replace_matching_urls: swapped {} attribute(s)", swapped);

    html::serialize(&doc)
}

/// Set the `action` of every <form> whose `action` attribute exists and is
/// the empty string to `current_page_url`, the URL the page was fetched
/// from.  Forms with a non-empty action, or no action at all, are left
/// untouched.
pub fn replace_empty_action_urls(current_page_url: &str, html_in: &str) -> String {
    if html_in.is_empty() {
        return String::new();
    }

    let doc = html::parse(html_in);
    let mut resolved = 0usize;
    html::for_each_element(
        &doc,
        |tag| tag == "form",
        |_, attrs| {
            if let Some(action) = attrs.get("action").map(|s| s.to_string()) {
                if action.is_empty() {
                    attrs.set("action", current_page_url.to_string());
                    resolved += 1;
                }
            }
        },
    );
    debug!("replace_empty_action_urls: resolved {} form(s)", resolved);

    html::serialize(&doc)
}

/// Promote every candidate attribute value that is not absolute (the empty
/// string included) to `join(base_url, value)`.  Already-absolute values
/// are left unchanged, so running the pass twice changes nothing further.
pub fn prepend_relative_urls(base_url: &str, html_in: &str) -> String {
    if html_in.is_empty() {
        return String::new();
    }
    let base = match Url::parse(base_url) {
        Ok(u) => u,
        Err(_) => {
            debug!("prepend_relative_urls: unparsable base {:?}", base_url);
            return html_in.to_string();
        }
    };

    let doc = html::parse(html_in);
    let mut promoted = 0usize;
    html::for_each_element(
        &doc,
        |tag| html::url_attribute(tag).is_some(),
        |tag, attrs| {
            if let Some(attr) = html::url_attribute(tag) {
                if let Some(value) = attrs.get(attr).map(|s| s.to_string()) {
                    if !is_absolute(&value) {
                        attrs.set(attr, join(&base, &value).to_string());
                        promoted += 1;
                    }
                }
            }
        },
    );
    debug!("prepend_relative_urls: promoted {} attribute(s)", promoted);

    html::serialize(&doc)
}

fn swap_origin(
    target: &Url,
    target_raw: &str,
    replacement: &Url,
    value: &str,
) -> Option<String> {
    let trimmed = value.trim();
    let parsed = Url::parse(trimmed).ok()?;
    parsed.host_str()?;

    let same_origin = match (origin(&parsed), origin(target)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    };
    if !same_origin && !trimmed.starts_with(target_raw) {
        return None;
    }

    let mut out = replacement.clone();
    out.set_path(parsed.path());
    out.set_query(parsed.query());
    out.set_fragment(parsed.fragment());
    Some(out.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const HOST_URL: &str = "https://www.host.com";
    const HOST_URL_WITH_PATH: &str = "https://www.host.com/auth/path/test?attr=asdf";
    const PROXY_URL: &str = "https://www.proxy.com";
    const PROXY_URL_WITH_PATH: &str = "https://www.proxy.com/oauth/path";

    #[test]
    fn matching_urls_move_to_replacement_origin() {
        let html = format!(r#"<a href="{}">login</a>"#, HOST_URL_WITH_PATH);
        let result = replace_matching_urls(HOST_URL, PROXY_URL, &html);
        assert!(!result.contains(HOST_URL));
        assert!(result.contains("https://www.proxy.com/auth/path/test?attr=asdf"));
    }

    #[test]
    fn fragment_survives_origin_swap() {
        let html = r#"<a href="https://www.host.com/page#section">x</a>"#;
        let result = replace_matching_urls(HOST_URL, PROXY_URL, html);
        assert!(result.contains("https://www.proxy.com/page#section"));
    }

    #[test]
    fn other_origins_are_untouched() {
        let html = r#"<img src="https://cdn.example.com/logo.png">"#;
        let result = replace_matching_urls(HOST_URL, PROXY_URL, html);
        assert_eq!(result, html);
    }

    #[test]
    fn relative_urls_are_not_swapped() {
        let html = r#"<a href="/test/asdf">x</a>"#;
        let result = replace_matching_urls(HOST_URL, PROXY_URL, html);
        assert_eq!(result, html);
    }

    #[test]
    fn replacement_origin_only_is_used() {
        let html = format!(r#"<script src="{}/app.js"></script>"#, HOST_URL);
        let result = replace_matching_urls(HOST_URL, PROXY_URL_WITH_PATH, &html);
        assert!(result.contains(r#"src="https://www.proxy.com/app.js""#));
    }

    #[test]
    fn unparsable_target_is_a_no_op() {
        let html = r#"<a href="https://www.host.com/x">x</a>"#;
        let result = replace_matching_urls("not a url", PROXY_URL, html);
        assert_eq!(result, html);
    }

    #[test]
    fn empty_action_becomes_page_url() {
        let html = r#"<form action=""><input name="username"></form>"#;
        let result = replace_empty_action_urls(HOST_URL_WITH_PATH, html);
        assert!(!result.contains(r#"action="""#));
        assert!(result.contains(&format!(r#"action="{}""#, HOST_URL_WITH_PATH)));
    }

    #[test]
    fn nonempty_action_is_untouched() {
        let html = r#"<form action="/login"></form>"#;
        let result = replace_empty_action_urls(HOST_URL, html);
        assert_eq!(result, html);
    }

    #[test]
    fn missing_action_is_untouched() {
        let html = r#"<form><input name="username"></form>"#;
        let result = replace_empty_action_urls(HOST_URL, html);
        assert!(!result.contains("action"));
    }

    #[test]
    fn relative_urls_are_promoted() {
        let html = r#"<a href="/test/asdf">x</a>"#;
        let result = prepend_relative_urls(PROXY_URL_WITH_PATH, html);
        assert!(result.contains(r#"href="https://www.proxy.com/oauth/path/test/asdf""#));
    }

    #[test]
    fn promoted_urls_drop_the_base_query() {
        let html = r#"<img src="asdf/asbklahef">"#;
        let result = prepend_relative_urls(HOST_URL_WITH_PATH, html);
        assert!(!result.contains("attr=asdf"));
        assert!(result.contains("https://www.host.com/auth/path/test"));
        assert!(result.contains("asdf/asbklahef"));
    }

    #[test]
    fn absolute_urls_are_left_alone() {
        let html = format!(r#"<link href="{}">"#, HOST_URL_WITH_PATH);
        let result = prepend_relative_urls(PROXY_URL, &html);
        assert!(result.contains(HOST_URL_WITH_PATH.split('?').next().unwrap()));
        assert!(result.contains("attr=asdf"));
        assert!(!result.contains(PROXY_URL));
    }

    #[test]
    fn empty_value_resolves_to_stripped_base() {
        let html = r#"<form action=""></form>"#;
        let result = prepend_relative_urls(HOST_URL_WITH_PATH, html);
        assert!(result.contains(r#"action="https://www.host.com/auth/path/test""#));
    }

    #[test]
    fn elements_without_the_attribute_are_skipped() {
        let html = "<a>anchor</a>";
        let result = prepend_relative_urls(PROXY_URL, html);
        assert!(!result.contains("href"));
    }

    #[test]
    fn prepend_is_idempotent() {
        let html = r#"<a href="/test/asdf">x</a><img src="img/logo.png"><form action=""></form>"#;
        let once = prepend_relative_urls(PROXY_URL_WITH_PATH, html);
        let twice = prepend_relative_urls(PROXY_URL_WITH_PATH, &once);
        assert_eq!(once, twice);
    }

    #[test]
    fn empty_html_is_empty_for_every_rule() {
        assert_eq!(replace_matching_urls(HOST_URL, PROXY_URL, ""), "");
        assert_eq!(replace_empty_action_urls(HOST_URL, ""), "");
        assert_eq!(prepend_relative_urls(HOST_URL, ""), "");
    }

    #[test]
    fn autofill_then_empty_action_resolution() {
        let html = r#"<form action=""><input name="username"></form>"#;
        let mut creds = HashMap::new();
        creds.insert("username".to_string(), "bob".to_string());
        let filled = crate::autofill::autofill(&creds, html);
        let result = replace_empty_action_urls("https://host.example/login", &filled);
        assert!(result.contains(r#"value="bob""#));
        assert!(result.contains(r#"action="https://host.example/login""#));
    }
}
