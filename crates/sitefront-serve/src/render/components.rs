//! Shared HTML components used across all pages.
//!
//! These are maud functions that return `Markup` fragments for composition
//! into full pages.

use maud::{Markup, PreEscaped, html};
use sitefront_core::CacheSnapshot;
use sitefront_core::model::PageContent;

/// Inline CSS for all pages.
pub const PAGE_CSS: &str = r#"
*{margin:0;padding:0;box-sizing:border-box}
:root{--bg:#fafafa;--fg:#111;--fg2:#555;--fg3:#999;--accent:#0b6bcb;--border:rgba(11,107,203,.15)}
body{font-family:Inter,-apple-system,BlinkMacSystemFont,"Segoe UI",Roboto,sans-serif;line-height:1.6;color:var(--fg);background:var(--bg);min-height:100vh;display:flex;flex-direction:column;align-items:center;padding:1.5rem 1rem}
main{max-width:680px;width:100%;flex:1}
a{color:var(--accent);text-decoration:none}
a:hover{text-decoration:underline}

.index-page{font-size:1.5rem;font-weight:700;margin-bottom:1rem}
.block{padding:1.25rem 0;border-bottom:1px solid var(--border)}
.block:last-child{border-bottom:none}
.block-title{font-size:1.25rem;font-weight:700;margin-bottom:.5rem;letter-spacing:-.01em}
.block-body{white-space:pre-wrap;word-break:break-word;font-size:1.05rem;line-height:1.75;color:var(--fg2)}

.preview-banner{position:sticky;top:0;width:100%;max-width:680px;margin-bottom:1rem;padding:.5rem .75rem;border-radius:6px;background:#fff3cd;color:#664d03;font-size:.85rem;display:flex;justify-content:space-between}

@media(prefers-color-scheme:dark){
:root{--bg:#0a0a0f;--fg:#e5e5e5;--fg2:#a0a0a0;--fg3:#666;--accent:#4da3ff;--border:rgba(77,163,255,.2)}
.preview-banner{background:#332701;color:#ffda6a}
}
"#;

/// Inline CSS for error pages.
pub const ERROR_CSS: &str = r#"
*{margin:0;padding:0;box-sizing:border-box}
body{font-family:-apple-system,BlinkMacSystemFont,"Segoe UI",Roboto,sans-serif;display:flex;justify-content:center;align-items:center;min-height:100vh;background:#fafafa;color:#1a1a2e;padding:1rem}
.error-page{text-align:center;max-width:400px}
.error-page h1{font-size:1.5rem;margin-bottom:.75rem}
.error-page p{color:#666;margin-bottom:1rem;line-height:1.5}
.error-page a{color:#0b6bcb}
@media(prefers-color-scheme:dark){
body{background:#0f0f17;color:#e0e0e8}
.error-page p{color:#aaa}
.error-page a{color:#4da3ff}
}
"#;

/// Content-Security-Policy header value.
///
/// Inline styles only. The embedded cache state is a JSON data block, which
/// browsers never execute.
pub const CSP_HEADER: &str = "default-src 'self'; style-src 'unsafe-inline'; script-src 'self'; img-src 'self' https: data:; frame-ancestors 'none'";

/// Element ID of the embedded cache state.
pub const STATE_SCRIPT_ID: &str = "__SITEFRONT_STATE__";

/// Render the full HTML page shell.
pub fn page_shell(
    head: Markup,
    body_content: Markup,
    state: Option<&CacheSnapshot>,
    preview: bool,
) -> Markup {
    html! {
        (maud::DOCTYPE)
        html lang="en" {
            head {
                (head)
                meta name="viewport" content="width=device-width, initial-scale=1";
                style { (PreEscaped(PAGE_CSS)) }
            }
            body {
                @if preview {
                    div class="preview-banner" {
                        span { "Preview mode" }
                        a href="/api/exit-preview" { "Exit preview" }
                    }
                }
                main { (body_content) }
                @if let Some(state) = state {
                    script id=(STATE_SCRIPT_ID) type="application/json" {
                        (PreEscaped(state_json(state)))
                    }
                }
            }
        }
    }
}

/// Serialize cache state for embedding inside a `<script>` element.
///
/// `<` is escaped so the payload can never close the element early.
pub fn state_json(state: &CacheSnapshot) -> String {
    serde_json::to_string(state)
        .unwrap_or_else(|_| "{}".to_string())
        .replace('<', "\\u003c")
}

/// Render one content block of a page.
pub fn content_block(block: &PageContent) -> Markup {
    let id = block.sys.as_ref().map(|sys| sys.id.as_str());
    html! {
        section class="block" id=[id] {
            @if let Some(title) = block.title.as_deref().filter(|t| !t.is_empty()) {
                h2 class="block-title" { (title) }
            }
            @if let Some(body) = block.body.as_deref() {
                div class="block-body" { (body) }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitefront_core::model::Sys;

    #[test]
    fn state_json_escapes_script_close() {
        let mut state = CacheSnapshot::default();
        state
            .queries
            .insert("1".to_string(), serde_json::json!("</script><b>"));
        let json = state_json(&state);
        assert!(!json.contains("</script>"));
        assert!(json.contains("\\u003c/script>"));

        let back: CacheSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.queries["1"], serde_json::json!("</script><b>"));
    }

    #[test]
    fn content_block_escapes_text() {
        let block = PageContent {
            sys: Some(Sys {
                id: "c1".to_string(),
            }),
            title: Some("Hello <world>".to_string()),
            body: Some("a & b".to_string()),
        };
        let html = content_block(&block).into_string();
        assert!(html.contains(r#"id="c1""#));
        assert!(html.contains("Hello &lt;world&gt;"));
        assert!(html.contains("a &amp; b"));
    }

    #[test]
    fn content_block_without_title() {
        let html = content_block(&PageContent::default()).into_string();
        assert!(!html.contains("block-title"));
        assert!(!html.contains("id="));
    }

    #[test]
    fn shell_embeds_state_and_banner() {
        let state = CacheSnapshot::default();
        let html = page_shell(html! {}, html! { "body" }, Some(&state), true).into_string();
        assert!(html.contains(STATE_SCRIPT_ID));
        assert!(html.contains("Exit preview"));

        let html = page_shell(html! {}, html! { "body" }, None, false).into_string();
        assert!(!html.contains(STATE_SCRIPT_ID));
        assert!(!html.contains("preview-banner"));
    }
}
