// authflow_rewriter
//
// HTML content-rewriting core for an auth-capture proxy.  The proxy fetches
// a login page from the real origin, hands the body to this crate, and
// returns the rewritten markup to the client so every follow-up request
// keeps flowing through the proxy.  Known credentials can be injected into
// the login form on the way.
//
// The crate is compiled as a `cdylib` so the host proxy server can call
// into it via FFI.  Exposed functions:
//   autofill(input: *const c_char) -> *mut c_char
//   replace_matching_urls(input: *const c_char) -> *mut c_char
//   replace_empty_action_urls(input: *const c_char) -> *mut c_char
//   prepend_relative_urls(input: *const c_char) -> *mut c_char
//
// Input is a JSON-encoded object per function (see each export below).
// Return value is a NUL-terminated C string allocated with CString.
// The caller MUST free it by calling `free_string`.
//
// The three URL rewrite rules are independent and composable; the caller
// sequences them.  Rust callers link the `rlib` and use the module
// functions directly.

pub mod autofill;
pub mod html;
pub mod rewrite;
pub mod url;

use std::collections::HashMap;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use serde_json::Value;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Pull a required string field out of the JSON envelope.
fn field(envelope: &Value, name: &str) -> Option<String> {
    Some(envelope.get(name)?.as_str()?.to_string())
}

/// Pull the `values` object (field name → value) out of the envelope.
fn fields_map(envelope: &Value) -> Option<HashMap<String, String>> {
    let obj = envelope.get("values")?.as_object()?;
    let mut map = HashMap::new();
    for (key, value) in obj {
        map.insert(key.clone(), value.as_str()?.to_string());
    }
    Some(map)
}

/// Convert a Rust String into a heap-allocated C string.
fn to_c_string(s: String) -> *mut c_char {
    match CString::new(s) {
        Ok(cs) => cs.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Read a `*const c_char` into a parsed JSON envelope.  Returns `None` on
/// null, invalid UTF-8, or malformed JSON.
unsafe fn read_envelope(ptr: *const c_char) -> Option<Value> {
    if ptr.is_null() {
        return None;
    }
    let json = CStr::from_ptr(ptr).to_str().ok()?;
    serde_json::from_str(json).ok()
}

// ---------------------------------------------------------------------------
// C ABI exports
// ---------------------------------------------------------------------------

/// Populate login form fields with known values.
///
/// Input: JSON `{ "values": { "<name-or-id>": "<value>", … }, "content": "…" }`
/// Returns: rewritten HTML as a NUL-terminated C string, or null on a
/// malformed envelope.
#[no_mangle]
pub unsafe extern "C" fn autofill(input: *const c_char) -> *mut c_char {
    let envelope = match read_envelope(input) {
        Some(v) => v,
        None => return ptr::null_mut(),
    };
    let (values, content) = match (fields_map(&envelope), field(&envelope, "content")) {
        (Some(v), Some(c)) => (v, c),
        _ => return ptr::null_mut(),
    };

    let result = autofill::autofill(&values, &content);
    to_c_string(result)
}

/// Swap every URL aimed at the captured host so it points at the proxy.
///
/// Input: JSON `{ "target_url": "…", "replacement_url": "…", "content": "…" }`
/// Returns: rewritten HTML, or null on a malformed envelope.
#[no_mangle]
pub unsafe extern "C" fn replace_matching_urls(input: *const c_char) -> *mut c_char {
    let envelope = match read_envelope(input) {
        Some(v) => v,
        None => return ptr::null_mut(),
    };
    let (target, replacement, content) = match (
        field(&envelope, "target_url"),
        field(&envelope, "replacement_url"),
        field(&envelope, "content"),
    ) {
        (Some(t), Some(r), Some(c)) => (t, r, c),
        _ => return ptr::null_mut(),
    };

    let result = rewrite::replace_matching_urls(&target, &replacement, &content);
    to_c_string(result)
}

/// Resolve empty form actions to the page's own URL.
///
/// Input: JSON `{ "page_url": "…", "content": "…" }`
/// Returns: rewritten HTML, or null on a malformed envelope.
#[no_mangle]
pub unsafe extern "C" fn replace_empty_action_urls(input: *const c_char) -> *mut c_char {
    let envelope = match read_envelope(input) {
        Some(v) => v,
        None => return ptr::null_mut(),
    };
    let (page_url, content) = match (field(&envelope, "page_url"), field(&envelope, "content")) {
        (Some(u), Some(c)) => (u, c),
        _ => return ptr::null_mut(),
    };

    let result = rewrite::replace_empty_action_urls(&page_url, &content);
    to_c_string(result)
}

/// Promote relative URLs to absolute URLs under the proxy's base.
///
/// Input: JSON `{ "base_url": "…", "content": "…" }`
/// Returns: rewritten HTML, or null on a malformed envelope.
#[no_mangle]
pub unsafe extern "C" fn prepend_relative_urls(input: *const c_char) -> *mut c_char {
    let envelope = match read_envelope(input) {
        Some(v) => v,
        None => return ptr::null_mut(),
    };
    let (base_url, content) = match (field(&envelope, "base_url"), field(&envelope, "content")) {
        (Some(u), Some(c)) => (u, c),
        _ => return ptr::null_mut(),
    };

    let result = rewrite::prepend_relative_urls(&base_url, &content);
    to_c_string(result)
}

/// Free a C string previously returned by one of the exports above.
///
/// The host MUST call this to avoid memory leaks.
#[no_mangle]
pub unsafe extern "C" fn free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        let _ = CString::from_raw(ptr);
    }
}
