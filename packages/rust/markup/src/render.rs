//! Markup-to-Markdown rendering for terminal display.
//!
//! Each pass is a function `&str -> String` applied in sequence. Math
//! (`$..$`, `equation`) passes through untouched.

use std::sync::LazyLock;

use regex::Regex;

use crate::parser::split_braced;

/// Run the full display pipeline on a section body.
pub fn render_markdown(content: &str) -> String {
    let mut result = strip_preamble(content);

    result = convert_tables(&result);
    result = convert_headings(&result);
    result = convert_lists(&result);
    result = strip_center(&result);
    result = convert_emphasis(&result);
    result = clean_blank_lines(&result);
    result = normalize_whitespace(&result);
    result = ensure_trailing_newline(&result);

    result
}

/// Split a body into non-empty paragraphs on blank lines.
pub fn paragraphs(content: &str) -> Vec<&str> {
    static PARA_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n\s*\n").expect("paragraph regex"));

    PARA_RE
        .split(content)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

// ---------------------------------------------------------------------------
// Command rewriting
// ---------------------------------------------------------------------------

/// Replace every `command{arg}` (with a balanced `arg`) by `f(arg)`.
/// `command` must include the opening brace, e.g. `\textbf{`.
fn rewrite_command(text: &str, command: &str, f: impl Fn(&str) -> String) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(pos) = rest.find(command) {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + command.len()..];
        match split_braced(after) {
            Some((arg, tail)) => {
                out.push_str(&f(arg));
                rest = tail;
            }
            None => {
                // Unbalanced: keep the remainder verbatim.
                out.push_str(&rest[pos..]);
                return out;
            }
        }
    }

    out.push_str(rest);
    out
}

// ---------------------------------------------------------------------------
// Pass 1: Strip document preamble
// ---------------------------------------------------------------------------

fn strip_preamble(text: &str) -> String {
    static PREAMBLE_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(
            r"(?m)^[ \t]*\\(?:documentclass|usepackage)(?:\[[^\]]*\])?\{[^}]*\}[ \t]*$|\\(?:geometry|linespread|date)\{[^}]*\}|\\setlength\{[^}]*\}\{[^}]*\}|\\maketitle|\\(?:begin|end)\{document\}",
        )
        .expect("valid regex")
    });

    let result = PREAMBLE_RE.replace_all(text, "").to_string();
    let result = rewrite_command(&result, "\\title{", |_| String::new());
    rewrite_command(&result, "\\author{", |_| String::new())
}

// ---------------------------------------------------------------------------
// Pass 2: Tables
// ---------------------------------------------------------------------------

/// Convert `tabular` environments framed by `\hline` into Markdown tables.
fn convert_tables(text: &str) -> String {
    static TABLE_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?s)\\begin\{tabular\}\{[^}]*\}\s*\\hline(.*?)\\hline\s*\\end\{tabular\}")
            .expect("valid regex")
    });

    TABLE_RE
        .replace_all(text, |caps: &regex::Captures| tabular_to_markdown(&caps[1]))
        .to_string()
}

fn tabular_to_markdown(body: &str) -> String {
    let rows: Vec<Vec<String>> = body
        .split("\\\\")
        .map(|row| row.replace("\\hline", ""))
        .map(|row| row.trim().to_string())
        .filter(|row| !row.is_empty())
        .map(|row| row.split('&').map(|cell| cell.trim().to_string()).collect())
        .collect();

    let Some((header, body_rows)) = rows.split_first() else {
        return String::new();
    };

    let header: Vec<String> = header
        .iter()
        .map(|cell| rewrite_command(cell, "\\textbf{", |arg| arg.to_string()))
        .collect();

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(format!("| {} |", header.join(" | ")));
    lines.push(format!("|{}|", vec![" --- "; header.len()].join("|")));
    for row in body_rows {
        lines.push(format!("| {} |", row.join(" | ")));
    }

    format!("\n{}\n", lines.join("\n"))
}

// ---------------------------------------------------------------------------
// Pass 3: Headings
// ---------------------------------------------------------------------------

fn convert_headings(text: &str) -> String {
    let result = rewrite_command(text, "\\subsubsection*{", |t| format!("#### {}", t.trim()));
    let result = rewrite_command(&result, "\\subsubsection{", |t| format!("#### {}", t.trim()));
    let result = rewrite_command(&result, "\\subsection{", |t| format!("### {}", t.trim()));
    rewrite_command(&result, "\\section{", |t| format!("## {}", t.trim()))
}

// ---------------------------------------------------------------------------
// Pass 4: Lists
// ---------------------------------------------------------------------------

fn convert_lists(text: &str) -> String {
    static ENV_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"\\(?:begin|end)\{(?:itemize|enumerate)\}").expect("valid regex")
    });
    static ITEM_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\s*\\item\s*").expect("valid regex"));

    let result = ENV_RE.replace_all(text, "");
    ITEM_RE.replace_all(&result, "\n- ").to_string()
}

// ---------------------------------------------------------------------------
// Pass 5: Centering
// ---------------------------------------------------------------------------

fn strip_center(text: &str) -> String {
    static CENTER_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\\(?:begin|end)\{center\}").expect("valid regex"));

    CENTER_RE.replace_all(text, "").to_string()
}

// ---------------------------------------------------------------------------
// Pass 6: Emphasis
// ---------------------------------------------------------------------------

fn convert_emphasis(text: &str) -> String {
    let result = rewrite_command(text, "\\textbf{", |t| format!("**{t}**"));
    let result = rewrite_command(&result, "\\textit{", |t| format!("*{t}*"));
    rewrite_command(&result, "\\emph{", |t| format!("*{t}*"))
}

// ---------------------------------------------------------------------------
// Pass 7-9: Whitespace
// ---------------------------------------------------------------------------

/// Collapse runs of blank lines into a single blank line.
fn clean_blank_lines(text: &str) -> String {
    static MULTI_BLANK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n[ \t]*(?:\n[ \t]*){2,}").expect("valid regex"));

    MULTI_BLANK_RE.replace_all(text, "\n\n").to_string()
}

/// Trim trailing whitespace on every line.
fn normalize_whitespace(text: &str) -> String {
    text.lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Ensure the output starts clean and ends with exactly one newline.
fn ensure_trailing_newline(text: &str) -> String {
    let trimmed = text.trim_start_matches('\n').trim_end_matches('\n');
    format!("{trimmed}\n")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrite_command_handles_nested_braces() {
        let input = r"a \textbf{b {c} d} e";
        let result = rewrite_command(input, "\\textbf{", |t| format!("<{t}>"));
        assert_eq!(result, "a <b {c} d> e");
    }

    #[test]
    fn rewrite_command_keeps_unbalanced_tail() {
        let input = r"x \textbf{never closed";
        let result = rewrite_command(input, "\\textbf{", |t| format!("<{t}>"));
        assert_eq!(result, input);
    }

    #[test]
    fn strip_preamble_removes_setup_commands() {
        let input = "\\documentclass{article}\n\\usepackage[utf8]{inputenc}\n\\geometry{a4paper, margin=1in}\n\\setlength{\\parindent}{0pt}\n\\title{\\textbf{Big Title}}\n\\author{Someone}\n\\date{\\today}\n\\begin{document}\n\\maketitle\nBody\n\\end{document}";
        let result = strip_preamble(input);
        assert!(!result.contains("documentclass"));
        assert!(!result.contains("usepackage"));
        assert!(!result.contains("Big Title"));
        assert!(!result.contains("Someone"));
        assert!(!result.contains("maketitle"));
        assert!(result.contains("Body"));
    }

    #[test]
    fn headings_become_markdown() {
        let input = "\\subsection{Metric $g_{ij}$}\ntext\n\\subsubsection*{Detail}";
        let result = convert_headings(input);
        assert_eq!(result, "### Metric $g_{ij}$\ntext\n#### Detail");
    }

    #[test]
    fn itemize_becomes_bullets() {
        let input = "\\begin{itemize}\n  \\item First\n  \\item Second\n\\end{itemize}";
        let result = render_markdown(input);
        assert_eq!(result, "- First\n- Second\n");
    }

    #[test]
    fn tabular_becomes_markdown_table() {
        let input = "\\begin{center}\n\\begin{tabular}{|l|c|}\n\\hline\n\\textbf{Name} & \\textbf{Cost} \\\\\n\\hline\nFACE & high \\\\\nPotential & low \\\\\n\\hline\n\\end{tabular}\n\\end{center}";
        let result = render_markdown(input);
        assert!(result.contains("| Name | Cost |"));
        assert!(result.contains("| --- | --- |"));
        assert!(result.contains("| FACE | high |"));
        assert!(result.contains("| Potential | low |"));
        assert!(!result.contains("tabular"));
        assert!(!result.contains("center"));
    }

    #[test]
    fn emphasis_is_converted() {
        let input = r"We keep the \textbf{Fisher-Rao metric} and \emph{only} \textit{that}.";
        let result = render_markdown(input);
        assert_eq!(result, "We keep the **Fisher-Rao metric** and *only* *that*.\n");
    }

    #[test]
    fn math_is_untouched() {
        let input = "\\begin{equation}\ng_{ij}(\\Theta) = 0\n\\end{equation}\nwhere $\\mu$ is fixed.";
        let result = render_markdown(input);
        assert!(result.contains("\\begin{equation}\ng_{ij}(\\Theta) = 0\n\\end{equation}"));
        assert!(result.contains("$\\mu$"));
    }

    #[test]
    fn blank_lines_collapse_and_trailing_newline() {
        let input = "One   \n\n\n\n\nTwo\n\n\n";
        let result = render_markdown(input);
        assert_eq!(result, "One\n\nTwo\n");
    }

    #[test]
    fn paragraphs_split_on_blank_lines() {
        let input = "First line\nstill first\n\n  \nSecond\n\n\nThird\n";
        assert_eq!(paragraphs(input), ["First line\nstill first", "Second", "Third"]);
        assert!(paragraphs("  \n\n ").is_empty());
    }
}
