//! Injected-script bridge to the hosted Control Deck page.
//!
//! The hosted web application is opaque to this shell; the only contract
//! is a pair of script snippets the platform WebView injects. Values are
//! embedded via JSON string rendering, which is also valid JavaScript
//! string syntax, so any token or transcript is escaped correctly.

/// localStorage key the Control Deck page reads its bearer token from.
pub const TOKEN_STORAGE_KEY: &str = "galactic_token";
/// localStorage flag telling the page it runs embedded in the shell, so
/// it can hide controls that need secure-context-only browser APIs.
pub const EMBEDDED_FLAG_KEY: &str = "galactic_embedded";

fn js_string(value: &str) -> String {
    // serde_json string rendering escapes quotes, backslashes, and control
    // characters; the result is a quoted literal.
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

/// Script injected on entering the authenticated state: hands the bearer
/// token to the page and marks the embedded capability profile.
pub fn bootstrap_script(token: &str) -> String {
    format!(
        "(function(){{try{{\
         localStorage.setItem({key},{token});\
         localStorage.setItem({flag},\"1\");\
         window.dispatchEvent(new Event(\"galacticbridge\"));\
         }}catch(e){{}}}})();",
        key = js_string(TOKEN_STORAGE_KEY),
        flag = js_string(EMBEDDED_FLAG_KEY),
        token = js_string(token),
    )
}

/// Script forwarding a recognized speech transcript into the page.
pub fn transcript_script(transcript: &str) -> String {
    format!(
        "window.dispatchEvent(new CustomEvent(\"galactictranscript\",{{detail:{}}}));",
        js_string(transcript),
    )
}
