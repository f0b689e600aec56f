//! Home page. The download UI talks to the JSON endpoints; this page only
//! needs to surface flash messages left by redirects.

use super::session::FlashMessage;

pub fn render_index(flashes: &[FlashMessage]) -> String {
    let mut flash_html = String::new();
    for flash in flashes {
        flash_html.push_str(&format!(
            "    <div class=\"alert alert-{}\">{}</div>\n",
            flash.level.as_str(),
            escape_html(&flash.message)
        ));
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>YouTube Downloader</title>
</head>
<body>
  <main>
    <h1>YouTube Downloader</h1>
{flash_html}    <form id="downloadForm">
      <input id="videoUrl" name="video_url" type="url" placeholder="https://www.youtube.com/watch?v=...">
      <button id="fetchBtn" type="submit">Fetch</button>
    </form>
  </main>
</body>
</html>
"#
    )
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}
