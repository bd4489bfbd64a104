//! Row rendering.
//!
//! Trims a candidate line to a column budget without splitting a
//! double-width rune, then splits it into alternating plain/highlighted
//! tokens along the match offsets.

use crate::item::Offset;
use crate::util::{char_display_width, display_width};

/// One piece of a rendered row: either plain text or a highlighted match
/// span, in left-to-right display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Plain(String),
    Highlight(String),
}

/// Trims `line` to `width` display columns, shifting `offsets` to stay
/// valid against the trimmed text. Returns the trimmed text and the
/// (possibly shifted) offsets.
pub fn trim_line(line: &str, offsets: &[Offset], width: usize) -> (String, Vec<Offset>) {
    if display_width(line) <= width || width < 2 {
        return (line.to_string(), offsets.to_vec());
    }

    let rightmost_end = offsets.iter().map(|&(_, e)| e).max().unwrap_or(0);
    let rightmost_display_end = display_width(&line[..rightmost_end]);

    if rightmost_display_end <= width.saturating_sub(2) {
        // Keep the left, truncate right, append "..".
        let mut w = 0;
        let mut cut = line.len();
        for (idx, c) in line.char_indices() {
            let cw = char_display_width(c);
            if w + cw > width - 2 {
                cut = idx;
                break;
            }
            w += cw;
        }
        let mut trimmed = line[..cut].to_string();
        trimmed.push_str("..");
        (trimmed, offsets.to_vec())
    } else {
        // Truncate the left, prepend "..", shift offsets.
        let budget = width - 2;
        let mut w = 0;
        let mut start = line.len();
        for (idx, c) in line.char_indices().rev() {
            let cw = char_display_width(c);
            if w + cw > budget {
                start = idx + c.len_utf8();
                break;
            }
            w += cw;
        }
        let trimmed_chars = start;
        let mut out = String::from("..");
        out.push_str(&line[start..]);
        let shifted: Vec<Offset> = offsets
            .iter()
            .map(|&(b, e)| {
                let nb = (b.saturating_sub(trimmed_chars) + 2).max(2);
                let ne = (e.saturating_sub(trimmed_chars) + 2).max(nb);
                (nb, ne)
            })
            .collect();
        (out, shifted)
    }
}

/// Splits `line` into alternating plain/highlighted tokens along the sorted,
/// deduplicated offset list, dropping empty segments.
pub fn tokenize_row(line: &str, offsets: &[Offset]) -> Vec<Token> {
    let mut sorted: Vec<Offset> = offsets.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let mut tokens = Vec::new();
    let mut cursor = 0usize;
    for &(b, e) in &sorted {
        let b = b.min(line.len());
        let e = e.min(line.len()).max(b);
        if b > cursor {
            tokens.push(Token::Plain(line[cursor..b].to_string()));
        }
        if e > b {
            tokens.push(Token::Highlight(line[b..e].to_string()));
        }
        cursor = cursor.max(e);
    }
    if cursor < line.len() {
        tokens.push(Token::Plain(line[cursor..].to_string()));
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_line_is_unchanged() {
        let (text, offsets) = trim_line("short", &[(0, 2)], 80);
        assert_eq!(text, "short");
        assert_eq!(offsets, vec![(0, 2)]);
    }

    #[test]
    fn trims_right_when_match_is_near_the_start() {
        let (text, _) = trim_line("abcdefghij", &[(0, 2)], 6);
        assert_eq!(text, "abcd..");
    }

    #[test]
    fn trims_left_when_match_is_near_the_end() {
        let (text, offsets) = trim_line("abcdefghij", &[(8, 10)], 6);
        assert!(text.starts_with(".."));
        assert!(offsets.iter().all(|&(b, _)| b >= 2));
    }

    #[test]
    fn tokenize_splits_plain_and_highlighted_alternating() {
        let tokens = tokenize_row("xaxxbxxc", &[(1, 8)]);
        assert_eq!(tokens, vec![Token::Plain("x".into()), Token::Highlight("axxbxxc".into())]);
    }

    #[test]
    fn tokenize_drops_empty_segments() {
        let tokens = tokenize_row("abc", &[(0, 0), (0, 3)]);
        assert_eq!(tokens, vec![Token::Highlight("abc".into())]);
    }
}
