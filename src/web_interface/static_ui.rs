//! Control-UI asset serving.
//!
//! Real assets live under `webui/dist` next to the binary; when they are
//! missing the built-in stub keeps the surface plausible. Asset paths are
//! confined to the dist directory.

use std::path::{Component, Path, PathBuf};

const DIST_DIR: &str = "webui/dist";

/// Built-in fallback for the control-UI page.
pub fn control_ui_html() -> String {
    r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>OpenClaw Control</title>
<style>
  body { font-family: -apple-system, "Segoe UI", sans-serif; background: #0d1117; color: #e6edf3; margin: 0; }
  .shell { max-width: 720px; margin: 12vh auto; padding: 0 24px; }
  .badge { color: #7ee787; font-size: 13px; }
  input, button { font-size: 15px; padding: 8px 12px; border-radius: 6px; border: 1px solid #30363d; }
  input { background: #161b22; color: #e6edf3; width: 260px; }
  button { background: #238636; color: #fff; border: 0; cursor: pointer; }
</style>
</head>
<body>
<div class="shell">
  <h1>OpenClaw Gateway</h1>
  <p class="badge" id="state">connecting&hellip;</p>
  <p>Sign in with your gateway token to manage channels, agents and devices.</p>
  <form id="login"><input id="token" type="password" placeholder="gateway token" autocomplete="off">
  <button type="submit">Connect</button></form>
</div>
<script>
  var proto = location.protocol === "https:" ? "wss://" : "ws://";
  var sock = new WebSocket(proto + location.host + "/");
  sock.onopen = function () { document.getElementById("state").textContent = "gateway reachable"; };
  sock.onclose = function () { document.getElementById("state").textContent = "disconnected"; };
  document.getElementById("login").addEventListener("submit", function (ev) {
    ev.preventDefault();
    sock.send(JSON.stringify({
      minProtocol: 1, maxProtocol: 1,
      client: { id: "webui", version: "1.4.2", platform: "web", mode: "ui" },
      auth: { token: document.getElementById("token").value },
    }));
  });
</script>
</body>
</html>
"#
    .to_string()
}

/// Read one asset below the dist directory. `None` when the path escapes
/// the directory, the file is absent, or the read fails.
pub async fn serve_asset(rel_path: &str) -> Option<(Vec<u8>, &'static str)> {
    let rel = sanitize(rel_path)?;
    let full = Path::new(DIST_DIR).join(&rel);
    let bytes = tokio::fs::read(&full).await.ok()?;
    Some((bytes, content_type_for(&rel)))
}

/// Index page: the shipped dist index if present, the stub otherwise.
pub async fn index_html() -> String {
    match tokio::fs::read_to_string(Path::new(DIST_DIR).join("index.html")).await {
        Ok(html) => html,
        Err(_) => control_ui_html(),
    }
}

fn sanitize(rel_path: &str) -> Option<PathBuf> {
    if rel_path.is_empty() {
        return None;
    }
    let path = Path::new(rel_path);
    // only plain file-name components survive; anything that could climb
    // out of the dist directory is refused
    let mut clean = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            _ => return None,
        }
    }
    Some(clean)
}

fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("html") => "text/html; charset=utf-8",
        Some("js") => "application/javascript",
        Some("css") => "text/css",
        Some("json") => "application/json",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("ico") => "image/x-icon",
        Some("woff2") => "font/woff2",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stub_mentions_product() {
        let html = control_ui_html();
        assert!(html.contains("OpenClaw"));
        assert!(html.contains("WebSocket"));
    }

    #[test]
    fn test_sanitize_rejects_traversal() {
        assert!(sanitize("../secret").is_none());
        assert!(sanitize("a/../../b").is_none());
        assert!(sanitize("/etc/passwd").is_none());
        assert_eq!(sanitize("app/main.js").unwrap(), PathBuf::from("app/main.js"));
    }

    #[tokio::test]
    async fn test_missing_asset_is_none() {
        assert!(serve_asset("definitely/not/here.js").await.is_none());
    }

    #[test]
    fn test_content_types() {
        assert_eq!(content_type_for(Path::new("a.js")), "application/javascript");
        assert_eq!(content_type_for(Path::new("a.bin")), "application/octet-stream");
    }
}
