use tracing::warn;

/// Packs whitespace-separated words into chunks of at most `max_chars` characters.
///
/// Chunk boundaries always fall between words. A single word longer than
/// `max_chars` cannot satisfy both rules and is cut into `max_chars` pieces.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        if word_len > max_chars {
            warn!(
                "Word of {} chars exceeds chunk limit {}; cutting it",
                word_len, max_chars
            );
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let chars: Vec<char> = word.chars().collect();
            for piece in chars.chunks(max_chars) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }

        if current.is_empty() {
            current.push_str(word);
            current_len = word_len;
        } else if current_len + 1 + word_len <= max_chars {
            current.push(' ');
            current.push_str(word);
            current_len += 1 + word_len;
        } else {
            chunks.push(std::mem::take(&mut current));
            current.push_str(word);
            current_len = word_len;
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

pub fn wrap_text(s: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;
    for word in s.split_whitespace() {
        let word_len = word.chars().count();
        if current_len + word_len + 1 > width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
            current_len = word_len;
        } else {
            if !current.is_empty() {
                current.push(' ');
                current_len += 1;
            }
            current.push_str(word);
            current_len += word_len;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Strips characters that are unsafe or awkward in file names.
pub fn file_safe_title(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .filter(|c| {
            !matches!(c, '?' | '/' | '\\' | ':' | '*' | '"' | '<' | '>' | '|') && !c.is_control()
        })
        .collect();
    let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    // "." and ".." would resolve outside the results folder
    if cleaned.chars().all(|c| c == '.' || c == ' ') {
        "untitled".to_string()
    } else {
        cleaned
    }
}
