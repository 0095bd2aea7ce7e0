//! Terminal rendering for research reports.
//!
//! Reports come back as markdown. This turns a complete report into ANSI
//! text: headings, emphasis, inline code, fenced blocks, lists, quotes,
//! tables and links. Anything unrecognized is printed as-is.

/// ANSI escape codes for terminal formatting.
mod ansi {
    pub const BOLD_ON: &str = "\x1b[1m";
    pub const BOLD_OFF: &str = "\x1b[22m";
    pub const ITALIC_ON: &str = "\x1b[3m";
    pub const ITALIC_OFF: &str = "\x1b[23m";
    pub const DIM_ON: &str = "\x1b[2m";
    pub const DIM_OFF: &str = "\x1b[22m";
    pub const UNDERLINE_ON: &str = "\x1b[4m";
    pub const UNDERLINE_OFF: &str = "\x1b[24m";
    pub const CYAN: &str = "\x1b[36m";
    pub const BLUE: &str = "\x1b[34m";
    pub const RESET: &str = "\x1b[0m";
}

/// Line-oriented report renderer. Tracks fenced-code state across lines.
#[derive(Debug, Default)]
pub struct ReportRenderer {
    in_code_block: bool,
}

impl ReportRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render a whole report. Line structure is preserved.
    pub fn render(&mut self, report: &str) -> String {
        let mut out = String::with_capacity(report.len() + report.len() / 4);
        for (i, line) in report.lines().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            out.push_str(&self.render_line(line));
        }
        out
    }

    fn render_line(&mut self, line: &str) -> String {
        let trimmed = line.trim_start();
        let indent = &line[..line.len() - trimmed.len()];

        if trimmed.starts_with("```") {
            self.in_code_block = !self.in_code_block;
            return format!("{}{line}{}", ansi::DIM_ON, ansi::DIM_OFF);
        }
        if self.in_code_block {
            return format!("{}{line}{}", ansi::CYAN, ansi::RESET);
        }

        if let Some((level, heading)) = parse_heading(trimmed) {
            let style = if level <= 2 {
                format!("{}{}", ansi::BOLD_ON, ansi::UNDERLINE_ON)
            } else {
                ansi::BOLD_ON.to_string()
            };
            return format!("{indent}{style}{}{}", render_inline(heading), ansi::RESET);
        }

        if matches!(trimmed, "---" | "***" | "___") {
            return format!("{}{}{}", ansi::DIM_ON, "\u{2500}".repeat(40), ansi::DIM_OFF);
        }

        if let Some(rest) = trimmed.strip_prefix("> ") {
            return format!("{indent}{}\u{2502}{} {}", ansi::DIM_ON, ansi::DIM_OFF, render_inline(rest));
        }

        if let Some(rest) = trimmed
            .strip_prefix("- ")
            .or_else(|| trimmed.strip_prefix("* ").filter(|_| !trimmed.starts_with("**")))
        {
            return format!("{indent}  \u{2022} {}", render_inline(rest));
        }

        if let Some((marker, rest)) = split_ordered_item(trimmed) {
            return format!("{indent}  {marker} {}", render_inline(rest));
        }

        if trimmed.starts_with('|') {
            return render_table_row(indent, trimmed);
        }

        render_inline(line)
    }
}

/// Render a complete report with the default renderer.
pub fn render_report(report: &str) -> String {
    ReportRenderer::new().render(report)
}

/// ATX heading level and text, `#` through `######`.
fn parse_heading(line: &str) -> Option<(usize, &str)> {
    let level = line.chars().take_while(|&c| c == '#').count();
    if level == 0 || level > 6 {
        return None;
    }
    line[level..].strip_prefix(' ').map(|text| (level, text.trim()))
}

/// `1. text` or `12) text`.
fn split_ordered_item(line: &str) -> Option<(&str, &str)> {
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }
    let after = &line[digits..];
    let rest = after
        .strip_prefix(". ")
        .or_else(|| after.strip_prefix(") "))?;
    Some((&line[..digits + 1], rest))
}

/// Dim the pipes of a table row; separator rows are dimmed entirely.
fn render_table_row(indent: &str, row: &str) -> String {
    let is_separator = row
        .chars()
        .all(|c| matches!(c, '|' | '-' | ':' | ' '));
    if is_separator {
        return format!("{indent}{}{row}{}", ansi::DIM_ON, ansi::DIM_OFF);
    }
    let pipe = format!("{}|{}", ansi::DIM_ON, ansi::DIM_OFF);
    let cells: Vec<String> = row.split('|').map(render_inline).collect();
    format!("{indent}{}", cells.join(&pipe))
}

/// Inline spans: `**bold**`, `*italic*`, `` `code` `` and `[text](url)`.
fn render_inline(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    let mut out = String::with_capacity(text.len() + 32);
    let mut i = 0;

    while i < len {
        match chars[i] {
            '*' if i + 1 < len && chars[i + 1] == '*' => {
                if let Some(end) = find_double_star(&chars, i + 2) {
                    let inner: String = chars[i + 2..end].iter().collect();
                    out.push_str(ansi::BOLD_ON);
                    out.push_str(&render_inline(&inner));
                    out.push_str(ansi::BOLD_OFF);
                    i = end + 2;
                    continue;
                }
            }
            '*' if i + 1 < len && chars[i + 1] != ' ' => {
                if let Some(end) = find_single_star(&chars, i + 1) {
                    let inner: String = chars[i + 1..end].iter().collect();
                    out.push_str(ansi::ITALIC_ON);
                    out.push_str(&inner);
                    out.push_str(ansi::ITALIC_OFF);
                    i = end + 1;
                    continue;
                }
            }
            '`' => {
                if let Some(end) = find_char(&chars, i + 1, '`') {
                    out.push_str(ansi::CYAN);
                    out.extend(&chars[i + 1..end]);
                    out.push_str(ansi::RESET);
                    i = end + 1;
                    continue;
                }
            }
            '[' => {
                if let Some((label, url, next)) = parse_link(&chars, i) {
                    out.push_str(ansi::UNDERLINE_ON);
                    out.push_str(&label);
                    out.push_str(ansi::UNDERLINE_OFF);
                    out.push_str(&format!(" {}({url}){}", ansi::BLUE, ansi::RESET));
                    i = next;
                    continue;
                }
            }
            _ => {}
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

fn find_char(chars: &[char], start: usize, target: char) -> Option<usize> {
    (start..chars.len()).find(|&i| chars[i] == target)
}

fn find_double_star(chars: &[char], start: usize) -> Option<usize> {
    (start..chars.len().saturating_sub(1)).find(|&i| chars[i] == '*' && chars[i + 1] == '*')
}

/// Closing `*` for italics: not doubled, not preceded by a space.
fn find_single_star(chars: &[char], start: usize) -> Option<usize> {
    (start + 1..chars.len()).find(|&i| {
        chars[i] == '*' && chars[i - 1] != ' ' && chars.get(i + 1) != Some(&'*')
    })
}

/// `[label](url)` starting at `open`; returns label, url and the index after `)`.
fn parse_link(chars: &[char], open: usize) -> Option<(String, String, usize)> {
    let close = find_char(chars, open + 1, ']')?;
    if chars.get(close + 1) != Some(&'(') {
        return None;
    }
    let end = find_char(chars, close + 2, ')')?;
    let label: String = chars[open + 1..close].iter().collect();
    let url: String = chars[close + 2..end].iter().collect();
    if url.is_empty() {
        return None;
    }
    Some((label, url, end + 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_headings() {
        let out = render_report("# Title\n#### Minor\n#hashtag");
        let lines: Vec<&str> = out.lines().collect();
        assert!(lines[0].contains(ansi::UNDERLINE_ON));
        assert!(lines[0].contains("Title") && !lines[0].contains('#'));
        assert!(lines[1].starts_with(ansi::BOLD_ON));
        assert!(!lines[1].contains(ansi::UNDERLINE_ON));
        assert_eq!(lines[2], "#hashtag");
    }

    #[test]
    fn test_emphasis_and_code() {
        let out = render_report("Use **bold** and *soft* with `code`");
        assert!(out.contains(&format!("{}bold{}", ansi::BOLD_ON, ansi::BOLD_OFF)));
        assert!(out.contains(&format!("{}soft{}", ansi::ITALIC_ON, ansi::ITALIC_OFF)));
        assert!(out.contains(&format!("{}code{}", ansi::CYAN, ansi::RESET)));
        assert!(!out.contains('*'));
    }

    #[test]
    fn test_unmatched_markers_stay_literal() {
        assert_eq!(render_report("2 * 3 = 6"), "2 * 3 = 6");
        assert_eq!(render_report("a ** b"), "a ** b");
        assert_eq!(render_report("[not a link]"), "[not a link]");
    }

    #[test]
    fn test_links_show_url() {
        let out = render_report("See [Source A](https://a.example).");
        assert!(out.contains("Source A"));
        assert!(out.contains("(https://a.example)"));
        assert!(!out.contains("]("));
        assert!(out.ends_with('.'));
    }

    #[test]
    fn test_lists() {
        let out = render_report("- one\n* two\n3. three\n10) ten");
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "  \u{2022} one");
        assert_eq!(lines[1], "  \u{2022} two");
        assert_eq!(lines[2], "  3. three");
        assert_eq!(lines[3], "  10) ten");
    }

    #[test]
    fn test_code_block_is_not_formatted() {
        let out = render_report("```\n**raw**\n```\nafter **bold**");
        let lines: Vec<&str> = out.lines().collect();
        assert!(lines[1].contains("**raw**"));
        assert!(lines[3].contains(ansi::BOLD_ON));
    }

    #[test]
    fn test_table_rows() {
        let out = render_report("| Year | Share |\n|---|---|\n| 2024 | **41%** |");
        let lines: Vec<&str> = out.lines().collect();
        assert!(lines[0].contains("Year"));
        assert_eq!(lines[1], format!("{}|---|---|{}", ansi::DIM_ON, ansi::DIM_OFF));
        assert!(lines[2].contains(ansi::BOLD_ON));
    }

    #[test]
    fn test_quote_and_rule() {
        let out = render_report("> quoted\n---");
        assert!(out.contains('\u{2502}'));
        assert!(out.contains(&"\u{2500}".repeat(40)));
    }

    #[test]
    fn test_line_count_preserved() {
        let report = "# A\n\nbody\n\n- x\n";
        assert_eq!(render_report(report).lines().count(), report.lines().count());
    }
}
