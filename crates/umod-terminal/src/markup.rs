//! Inline colour markup for console text.
//!
//! `$red`, `$white`, ... switch the foreground colour for the text that
//! follows. `$$` is a literal dollar sign; any other `$` is kept as is.

/// The sixteen console foreground colours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleColor {
    Black,
    DarkBlue,
    DarkGreen,
    DarkCyan,
    DarkRed,
    DarkMagenta,
    DarkYellow,
    Gray,
    DarkGray,
    Blue,
    Green,
    Cyan,
    Red,
    Magenta,
    Yellow,
    White,
}

/// Directive names. Longer names sharing a prefix come first so that
/// `$darkgray` is not read as `$dark` + `gray`.
const COLOR_NAMES: &[(&str, ConsoleColor)] = &[
    ("darkmagenta", ConsoleColor::DarkMagenta),
    ("darkyellow", ConsoleColor::DarkYellow),
    ("darkgreen", ConsoleColor::DarkGreen),
    ("darkblue", ConsoleColor::DarkBlue),
    ("darkcyan", ConsoleColor::DarkCyan),
    ("darkgray", ConsoleColor::DarkGray),
    ("darkred", ConsoleColor::DarkRed),
    ("magenta", ConsoleColor::Magenta),
    ("yellow", ConsoleColor::Yellow),
    ("black", ConsoleColor::Black),
    ("green", ConsoleColor::Green),
    ("white", ConsoleColor::White),
    ("gray", ConsoleColor::Gray),
    ("blue", ConsoleColor::Blue),
    ("cyan", ConsoleColor::Cyan),
    ("red", ConsoleColor::Red),
];

/// A run of text drawn in one colour. `None` means the console default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub color: Option<ConsoleColor>,
    pub text: String,
}

impl Span {
    pub fn new(color: Option<ConsoleColor>, text: impl Into<String>) -> Self {
        Self {
            color,
            text: text.into(),
        }
    }
}

/// Split marked-up text into coloured spans. Empty spans are dropped.
pub fn parse(text: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut color = None;
    let mut current = String::new();
    let mut rest = text;

    while let Some(pos) = rest.find('$') {
        current.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        if let Some(stripped) = after.strip_prefix('$') {
            current.push('$');
            rest = stripped;
            continue;
        }

        match COLOR_NAMES
            .iter()
            .find(|(name, _)| after.starts_with(name))
        {
            Some((name, c)) => {
                if !current.is_empty() {
                    spans.push(Span::new(color, std::mem::take(&mut current)));
                }
                color = Some(*c);
                rest = &after[name.len()..];
            },
            None => {
                current.push('$');
                rest = after;
            },
        }
    }
    current.push_str(rest);
    if !current.is_empty() {
        spans.push(Span::new(color, current));
    }
    spans
}

/// Escape `text` so it renders literally.
pub fn escape(text: &str) -> String {
    text.replace('$', "$$")
}

/// Number of visible characters.
pub fn visible_len(spans: &[Span]) -> usize {
    spans.iter().map(|s| s.text.chars().count()).sum()
}

/// Plain text with all colour information removed.
pub fn plain(spans: &[Span]) -> String {
    spans.iter().map(|s| s.text.as_str()).collect()
}

/// Cut spans down to at most `width` visible characters.
pub fn truncate(spans: &[Span], width: usize) -> Vec<Span> {
    let mut out = Vec::new();
    let mut left = width;
    for span in spans {
        if left == 0 {
            break;
        }
        let taken: String = span.text.chars().take(left).collect();
        left -= taken.chars().count();
        out.push(Span::new(span.color, taken));
    }
    out
}

/// Break spans into rows of at most `width` visible characters.
///
/// `\n` starts a new row. Always returns at least one (possibly empty) row.
pub fn wrap(spans: &[Span], width: usize) -> Vec<Vec<Span>> {
    let width = width.max(1);
    let mut rows: Vec<Vec<Span>> = vec![Vec::new()];
    let mut used = 0;

    for span in spans {
        let mut chunk = String::new();
        for ch in span.text.chars() {
            if ch == '\r' {
                continue;
            }
            if ch == '\n' {
                push_chunk(&mut rows, span.color, &mut chunk);
                rows.push(Vec::new());
                used = 0;
                continue;
            }
            if used == width {
                push_chunk(&mut rows, span.color, &mut chunk);
                rows.push(Vec::new());
                used = 0;
            }
            chunk.push(ch);
            used += 1;
        }
        push_chunk(&mut rows, span.color, &mut chunk);
    }
    rows
}

fn push_chunk(rows: &mut [Vec<Span>], color: Option<ConsoleColor>, chunk: &mut String) {
    if chunk.is_empty() {
        return;
    }
    if let Some(row) = rows.last_mut() {
        row.push(Span::new(color, std::mem::take(chunk)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_has_default_color() {
        assert_eq!(parse("hello"), vec![Span::new(None, "hello")]);
    }

    #[test]
    fn color_directives_split_spans() {
        let spans = parse("$whiteModule $greenFileSystem");
        assert_eq!(
            spans,
            vec![
                Span::new(Some(ConsoleColor::White), "Module "),
                Span::new(Some(ConsoleColor::Green), "FileSystem"),
            ]
        );
    }

    #[test]
    fn longest_name_wins() {
        let spans = parse("$darkgrayx");
        assert_eq!(spans, vec![Span::new(Some(ConsoleColor::DarkGray), "x")]);
    }

    #[test]
    fn unknown_directive_is_literal() {
        assert_eq!(plain(&parse("cost $5")), "cost $5");
        assert_eq!(plain(&parse("$rust")), "$rust");
    }

    #[test]
    fn double_dollar_is_literal() {
        let spans = parse("$cyan$$red/");
        assert_eq!(spans, vec![Span::new(Some(ConsoleColor::Cyan), "$red/")]);
    }

    #[test]
    fn escape_round_trips_through_parse() {
        let text = "$redfolder";
        assert_eq!(plain(&parse(&escape(text))), text);
    }

    #[test]
    fn trailing_dollar_kept() {
        assert_eq!(plain(&parse("a$")), "a$");
    }

    #[test]
    fn directive_only_yields_no_spans() {
        assert!(parse("$red").is_empty());
        assert_eq!(visible_len(&parse("$red")), 0);
    }

    #[test]
    fn visible_len_ignores_directives() {
        assert_eq!(visible_len(&parse("$redab$whitecd")), 4);
    }

    #[test]
    fn truncate_across_spans() {
        let t = truncate(&parse("$redabc$whitedef"), 4);
        assert_eq!(plain(&t), "abcd");
        assert_eq!(t[1].color, Some(ConsoleColor::White));
    }

    #[test]
    fn wrap_splits_at_width() {
        let rows = wrap(&parse("abcdefg"), 3);
        let texts: Vec<String> = rows.iter().map(|r| plain(r)).collect();
        assert_eq!(texts, vec!["abc", "def", "g"]);
    }

    #[test]
    fn wrap_exact_width_has_no_empty_tail() {
        let rows = wrap(&parse("abcdef"), 3);
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn wrap_honours_newlines_and_colors() {
        let rows = wrap(&parse("$redab\ncd"), 10);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], vec![Span::new(Some(ConsoleColor::Red), "cd")]);
    }

    #[test]
    fn wrap_empty_is_one_row() {
        assert_eq!(wrap(&[], 10).len(), 1);
    }
}
