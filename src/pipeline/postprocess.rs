//! Post-processing: deterministic cleanup of the model's markdown report.
//!
//! The prompt asks for a bare markdown body, but models still occasionally
//! wrap the report in a ```` ```markdown ```` fence, emit CRLF line endings or
//! sprinkle zero-width characters copied from the contract. These rules fix
//! such quirks without touching content. Each rule is a pure `&str → String`
//! function and runs in the order listed in [`clean_report`].

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply every cleanup rule to the raw model output.
///
/// Rules (applied in order):
/// 1. Normalise line endings (CRLF → LF)
/// 2. Strip an outer markdown fence
/// 3. Trim trailing whitespace per line (hard line breaks kept)
/// 4. Collapse 3+ consecutive blank lines down to 2
/// 5. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 6. Trim the whole report
///
/// An empty result means the model produced no usable report.
pub fn clean_report(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = strip_markdown_fences(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    let s = remove_invisible_chars(&s);
    s.trim().to_string()
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Strip outer markdown fences ──────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:markdown|md)?[ \t]*\n(.*)\n```\s*$").unwrap());

/// Only a fence that wraps the whole report is stripped. A report that
/// merely starts and ends with separate code blocks has fence lines inside
/// the captured body and is left alone.
fn strip_markdown_fences(input: &str) -> String {
    match RE_OUTER_FENCES.captures(input.trim()) {
        Some(caps) if !caps[1].lines().any(|l| l.trim_start().starts_with("```")) => {
            caps[1].to_string()
        }
        _ => input.to_string(),
    }
}

// ── Rule 3: Trim trailing whitespace per line ────────────────────────────────

/// Two or more trailing spaces on a non-blank line are a markdown hard line
/// break and are kept as exactly two.
fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| {
            let trimmed = line.trim_end();
            if !trimmed.is_empty() && line.ends_with("  ") {
                format!("{trimmed}  ")
            } else {
                trimmed.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 4: Collapse excessive blank lines ───────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{4,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n\n").to_string()
}

// ── Rule 5: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_fences() {
        let input = "```markdown\n# Summary\n\nRisky.\n```";
        assert_eq!(clean_report(input), "# Summary\n\nRisky.");
    }

    #[test]
    fn test_strip_fences_no_lang() {
        let input = "```\n# Summary\n```\n";
        assert_eq!(clean_report(input), "# Summary");
    }

    #[test]
    fn test_inner_code_block_kept() {
        let input = "# Email\n\n```\nDear client,\n```\n\nThanks";
        assert_eq!(clean_report(input), input);
    }

    #[test]
    fn test_report_bracketed_by_code_blocks_kept() {
        let input = "```\nclause 1\n```\n\n# Report body\n\n```\nDear client\n```";
        assert_eq!(clean_report(input), input);
    }

    #[test]
    fn test_hard_line_break_kept() {
        assert_eq!(clean_report("Line one  \nLine two"), "Line one  \nLine two");
        assert_eq!(clean_report("Line one\t \t\nLine two"), "Line one\nLine two");
        assert_eq!(clean_report("Line one     \nLine two"), "Line one  \nLine two");
    }

    #[test]
    fn test_crlf_fenced_report() {
        let input = "```markdown\r\n# Summary\r\n```\r\n";
        assert_eq!(clean_report(input), "# Summary");
    }

    #[test]
    fn test_collapse_blank_lines() {
        assert_eq!(clean_report("a\n\n\n\n\n\nb"), "a\n\n\nb");
    }

    #[test]
    fn test_remove_invisible() {
        assert_eq!(clean_report("\u{FEFF}# Re\u{200B}port"), "# Report");
    }

    #[test]
    fn test_whitespace_only_becomes_empty() {
        assert_eq!(clean_report("  \n\t\n "), "");
        assert_eq!(clean_report("```markdown\n\n```"), "");
    }
}
