//! Turns Reddit Markdown into plain narration text.

use std::sync::LazyLock;

use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};
use regex::Regex;

static HTML_TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());

static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)https?\S*|www\.\S+|\b[a-z0-9\-]+(?:\.[a-z0-9\-]+)*\.[a-z]{2,6}\b(?:[/?#]\S*)?",
    )
    .unwrap()
});

static AGE_GENDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(\d{1,3}\s?[MFmf]\)|\b\d{1,3}\s?[MFmf]\b").unwrap());

static PUNCT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[\^_~@!;#:\-%—“”‘"*{}\[\]()\\|<>=`]"#).unwrap());

/// Sanitizes raw post or comment text for TTS.
///
/// Every rule either deletes characters or replaces them with whitespace once
/// the `/`, `+` and `&` substitutions have happened, so repeating the pass
/// reaches a fixpoint. Returning that fixpoint makes the function idempotent.
pub fn sanitize_text(text: &str) -> String {
    let mut current = sanitize_pass(text);
    loop {
        let next = sanitize_pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn sanitize_pass(text: &str) -> String {
    let text = strip_emoji(text);
    let text = markdown_to_text(&text);
    let text = URL_RE.replace_all(&text, " ");
    let text = AGE_GENDER_RE.replace_all(&text, " ");
    let text = text
        .replace('/', " or ")
        .replace('+', " plus ")
        .replace('&', " and ");
    let text = strip_quotes(&text);
    let text = PUNCT_RE.replace_all(&text, " ");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn markdown_to_text(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut code_depth = 0usize;
    let mut image_depth = 0usize;

    let options = Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TABLES;
    for event in Parser::new_ext(input, options) {
        match event {
            Event::Start(Tag::CodeBlock(_)) => code_depth += 1,
            Event::End(TagEnd::CodeBlock) => {
                code_depth = code_depth.saturating_sub(1);
                out.push(' ');
            }
            Event::Start(Tag::Image { .. }) => image_depth += 1,
            Event::End(TagEnd::Image) => image_depth = image_depth.saturating_sub(1),
            Event::Text(text) if code_depth == 0 && image_depth == 0 => out.push_str(&text),
            Event::Code(_) => out.push(' '),
            Event::Html(html) | Event::InlineHtml(html) => {
                out.push_str(&HTML_TAG_RE.replace_all(&html, " "));
            }
            Event::SoftBreak | Event::HardBreak | Event::Rule => out.push(' '),
            Event::End(end) if ends_block(&end) => out.push(' '),
            _ => {}
        }
    }
    out
}

fn ends_block(end: &TagEnd) -> bool {
    matches!(
        end,
        TagEnd::Paragraph
            | TagEnd::Heading(_)
            | TagEnd::Item
            | TagEnd::List(_)
            | TagEnd::TableCell
            | TagEnd::TableRow
            | TagEnd::TableHead
    )
}

// Apostrophes survive only inside words ("don't"); quoting marks become spaces.
fn strip_quotes(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    for (i, &c) in chars.iter().enumerate() {
        if c == '\'' || c == '’' {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let inner = prev.is_some_and(char::is_alphanumeric)
                && next.is_some_and(char::is_alphanumeric);
            out.push(if inner { c } else { ' ' });
        } else {
            out.push(c);
        }
    }
    out
}

fn strip_emoji(text: &str) -> String {
    text.chars()
        .map(|c| if is_emoji(c) { ' ' } else { c })
        .collect()
}

fn is_emoji(c: char) -> bool {
    matches!(c as u32,
        0x1F000..=0x1FAFF
            | 0x2600..=0x27BF
            | 0x2B00..=0x2BFF
            | 0x2300..=0x23FF
            | 0xFE00..=0xFE0F
            | 0x200D
            | 0x20E3
            | 0xE0020..=0xE007F
            | 0x00A9
            | 0x00AE
            | 0x2122
            | 0x3030
            | 0x303D
            | 0x3297
            | 0x3299
    )
}
