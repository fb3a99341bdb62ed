use axum::extract::State;
use axum::response::Html;

use crate::context::AppContext;

/// `GET /ui` -- a minimal, server-rendered catalog browser: no JavaScript
/// framework, just the root children as a plain list linking into
/// `/describe`. Deliberately not a "real" browser UI (excluded by
/// Non-goals); this is the trivial static page that exclusion leaves room
/// for.
pub async fn show(State(ctx): State<AppContext>) -> Html<String> {
    let children = ctx.registry().children_of("");
    let items: String = children
        .iter()
        .map(|path| format!(r#"<li><a href="/describe/{path}">{path}</a></li>"#))
        .collect();

    let body = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>Catalog</title></head>
<body>
<h1>Catalog</h1>
<p>{count} node(s) at the root.</p>
<ul>{items}</ul>
</body>
</html>"#,
        count = children.len(),
    );

    Html(body)
}
