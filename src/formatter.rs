use regex::{Captures, Regex};
use std::sync::OnceLock;

static RE_KEYWORD: OnceLock<Regex> = OnceLock::new();
static RE_EDGE_BREAKS: OnceLock<Regex> = OnceLock::new();

/// Keywords highlighted where they stand.
const INLINE_KEYWORDS: &[&str] = &[
    "SELECT", "UPDATE", "INSERT", "ALTER", "DELETE", "AS", "JOIN", "COMMIT", "USE", "BY", "ASC", "DESC", "ON", "IN",
];

/// Keywords that open a clause and start an indented line.
const CLAUSE_KEYWORDS: &[&str] = &["FROM", "WHERE", "AND", "OR", "INNER", "LEFT", "ORDER", "GROUP", "LIMIT", "SET"];

const HTML_BREAK: &str = "<br/>";
const INDENT: &str = "    ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatStyle {
    /// Escaped text, `<br/>` line breaks, `sql_keyword` spans.
    Html,
    /// Plain text with clause keywords moved to indented lines.
    Text,
}

/// Decorates a statement for display.
///
/// Keywords match as whole words regardless of case and keep the case they
/// were written in. Breaks at the very start or end of the result are removed.
pub fn format_query(sql: &str, style: FormatStyle) -> String {
    let re_keyword = RE_KEYWORD.get_or_init(|| {
        let words: Vec<&str> = INLINE_KEYWORDS.iter().chain(CLAUSE_KEYWORDS).copied().collect();
        Regex::new(&format!(r"(?i)\b(?:{})\b", words.join("|"))).unwrap()
    });

    match style {
        FormatStyle::Html => {
            let escaped = html_escape(sql).replace('\n', HTML_BREAK);
            let marked = re_keyword.replace_all(&escaped, |caps: &Captures| {
                let word = &caps[0];
                let span = format!("<span class=\"sql_keyword\">{word}</span>");
                if is_clause(word) {
                    format!("{HTML_BREAK}&nbsp;&nbsp;&nbsp;&nbsp;{span}")
                } else {
                    span
                }
            });
            let re_edges = RE_EDGE_BREAKS.get_or_init(|| Regex::new(r"^(?:<br/>)+|(?:<br/>)+$").unwrap());
            re_edges.replace_all(&marked, "").into_owned()
        }
        FormatStyle::Text => {
            let marked = re_keyword.replace_all(sql, |caps: &Captures| {
                let word = &caps[0];
                if is_clause(word) {
                    format!("\n{INDENT}{word}")
                } else {
                    word.to_string()
                }
            });
            let lines: Vec<&str> = marked.lines().map(str::trim_end).collect();
            lines.join("\n").trim_matches('\n').to_string()
        }
    }
}

fn is_clause(word: &str) -> bool {
    CLAUSE_KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(word))
}

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_text_indents_clauses() {
        let sql = "SELECT id FROM orders WHERE status = 1 AND total > 10 ORDER BY id";
        assert_eq!(
            format_query(sql, FormatStyle::Text),
            "SELECT id\n    FROM orders\n    WHERE status = 1\n    AND total > 10\n    ORDER BY id"
        );
    }

    #[test]
    fn test_format_text_whole_words_only() {
        let sql = "SELECT fromage, orders_in FROM inventory";
        assert_eq!(format_query(sql, FormatStyle::Text), "SELECT fromage, orders_in\n    FROM inventory");
    }

    #[test]
    fn test_format_text_strips_leading_break() {
        assert_eq!(format_query("SET autocommit=0;", FormatStyle::Text), "    SET autocommit=0;");
        assert_eq!(format_query("from t", FormatStyle::Text), "    from t");
    }

    #[test]
    fn test_format_html_markup() {
        assert_eq!(
            format_query("use db;\nCOMMIT;", FormatStyle::Html),
            "<span class=\"sql_keyword\">use</span> db;<br/><span class=\"sql_keyword\">COMMIT</span>;"
        );
        assert_eq!(
            format_query("SELECT a FROM t", FormatStyle::Html),
            "<span class=\"sql_keyword\">SELECT</span> a \
             <br/>&nbsp;&nbsp;&nbsp;&nbsp;<span class=\"sql_keyword\">FROM</span> t"
        );
    }

    #[test]
    fn test_format_html_escapes_and_trims() {
        assert_eq!(
            format_query("WHERE a < 'x'\n\n", FormatStyle::Html),
            "&nbsp;&nbsp;&nbsp;&nbsp;<span class=\"sql_keyword\">WHERE</span> a &lt; &#39;x&#39;"
        );
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("<a href=\"x\">&</a>"), "&lt;a href=&quot;x&quot;&gt;&amp;&lt;/a&gt;");
    }
}
