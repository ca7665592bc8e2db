// src/utils/html.rs

use crate::models::blog::{BlockKind, ContentBlock};

/// Whitelist sanitization with ammonia: safe tags (`<b>`, `<p>`, `<a>`) stay,
/// `<script>`/`<iframe>` and event-handler attributes go.
///
/// Blog content is author-controlled and ends up in someone else's renderer.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

/// A copy of the block that is safe to hand to an HTML renderer.
///
/// Code blocks are shown verbatim by the renderer, so their text is escaped
/// rather than sanitized (sanitizing would eat `<T>` generics).
pub fn render_safe(block: &ContentBlock) -> ContentBlock {
    let content = match block.kind {
        BlockKind::Code => ammonia::clean_text(&block.content),
        _ => clean_html(&block.content),
    };
    ContentBlock {
        content,
        ..block.clone()
    }
}
