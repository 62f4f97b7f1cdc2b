use crate::ai::CorrectionResult;

/// Escape text for inclusion in HTML element content or attribute values
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Render the correction page
///
/// The textarea is pre-filled with the original text; the result block only
/// appears once there is something to show.
pub fn render_page(result: &CorrectionResult) -> String {
    let corrected = if result.corrected_text.is_empty() {
        String::new()
    } else {
        format!(
            r#"
    <section class="result">
      <h2>Corrected text</h2>
      <p>{}</p>
    </section>"#,
            escape_html(&result.corrected_text)
        )
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>Text Corrector</title>
    <style>
      body {{ font-family: system-ui, sans-serif; max-width: 40rem; margin: 2rem auto; padding: 0 1rem; }}
      textarea {{ width: 100%; min-height: 8rem; font: inherit; }}
      .result {{ margin-top: 1.5rem; padding: 1rem; background: #f4f6f8; border-radius: 6px; }}
      .result p {{ white-space: pre-wrap; }}
    </style>
  </head>
  <body>
    <h1>Text Corrector</h1>
    <form method="post" action="/">
      <textarea name="text" placeholder="Enter text to correct">{}</textarea>
      <button type="submit">Correct</button>
    </form>{}
  </body>
</html>
"#,
        escape_html(&result.original_text),
        corrected
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<script>alert("x") & 'y'</script>"#),
            "&lt;script&gt;alert(&quot;x&quot;) &amp; &#39;y&#39;&lt;/script&gt;"
        );
        assert_eq!(escape_html("plain text"), "plain text");
    }

    #[test]
    fn test_idle_page_has_no_result_block() {
        let html = render_page(&CorrectionResult::empty());
        assert!(html.contains(r#"<textarea name="text""#));
        assert!(html.contains("></textarea>"));
        assert!(!html.contains("Corrected text"));
    }

    #[test]
    fn test_page_shows_both_values() {
        let html = render_page(&CorrectionResult::new("helo", "Hello."));
        assert!(html.contains(">helo</textarea>"));
        assert!(html.contains("<p>Hello.</p>"));
    }

    #[test]
    fn test_page_escapes_user_text() {
        let html = render_page(&CorrectionResult::new(
            "</textarea><script>x</script>",
            "<b>bold</b>",
        ));
        assert!(!html.contains("<script>"));
        assert!(!html.contains("<b>bold</b>"));
        assert!(html.contains("&lt;b&gt;bold&lt;/b&gt;"));
    }
}
