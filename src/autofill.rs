// authflow_rewriter::autofill
//
// Form autofill.  Injects known values into <input> elements so a captured
// login page arrives at the device with its credential fields already
// populated.  Fields are addressed by identity: an input matches when its
// `name` or `id` attribute is a key of the supplied map.

use std::collections::HashMap;

use log::debug;

use crate::html::{self, AttrsExt};

/// Set the `value` attribute of every <input> whose `name` or `id` is a key
/// of `values`.  A `name` match wins over an `id` match when both are
/// present.  The attribute is created when the input has none.
///
/// Empty `html` returns the empty string without parsing; an empty map
/// returns `html` unchanged, byte for byte.
pub fn autofill(values: &HashMap<String, String>, html_in: &str) -> String {
    if html_in.is_empty() {
        return String::new();
    }
    if values.is_empty() {
        return html_in.to_string();
    }

    let doc = html::parse(html_in);
    let mut filled = 0usize;
    html::for_each_element(
        &doc,
        |tag| tag == "input",
        |_, attrs| {
            let matched = attrs
                .get("name")
                .and_then(|name| values.get(name))
                .or_else(|| attrs.get("id").and_then(|id| values.get(id)))
                .cloned();
            if let Some(value) = matched {
                attrs.set("value", value);
                filled += 1;
            }
        },
    );
    debug!("autofill: populated {} input field(s)", filled);

    html::serialize(&doc)
}
