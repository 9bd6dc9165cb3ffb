//! helpers for treating sql text lexically without touching string literals

use once_cell::sync::Lazy;
use regex::Regex;

static STRING_LITERAL_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"'(?:[^']|'')*'").unwrap());

/// apply `f` to every stretch of text outside single-quoted literals; the
/// literals themselves are copied through untouched
pub(crate) fn map_outside_literals(text: &str, mut f: impl FnMut(&str) -> String) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for literal in STRING_LITERAL_REGEX.find_iter(text) {
        out.push_str(&f(&text[last..literal.start()]));
        out.push_str(literal.as_str());
        last = literal.end();
    }
    out.push_str(&f(&text[last..]));

    out
}

/// empty every single-quoted literal, keeping the quotes
pub(crate) fn mask_literals(text: &str) -> String {
    STRING_LITERAL_REGEX.replace_all(text, "''").into_owned()
}

static TABLE_LIST_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(?:from|join)\b").unwrap());

static SUBQUERY_START_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:select|with|values)\b").unwrap());

/// words that end a table reference instead of aliasing it
const CLAUSE_KEYWORDS: &[&str] = &[
    "where", "join", "inner", "left", "right", "full", "outer", "cross", "natural", "on",
    "using", "group", "order", "limit", "offset", "having", "union", "intersect", "except",
    "window", "fetch", "for", "tablesample", "returning",
];

#[derive(Clone, Copy)]
struct Cursor<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn skip_whitespace(&mut self) {
        self.pos = self.text.len() - self.rest().trim_start().len();
    }

    fn eat(&mut self, c: char) -> bool {
        self.skip_whitespace();
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    /// quoted names keep their case, bare ones fold to lower case
    fn identifier(&mut self) -> Option<String> {
        self.skip_whitespace();
        let rest = self.rest();

        if let Some(quoted) = rest.strip_prefix('"') {
            let end = quoted.find('"')?;
            self.pos += end + 2;
            return Some(quoted[..end].to_string());
        }

        if rest.starts_with(|c: char| c.is_ascii_digit()) {
            return None;
        }
        let len = rest
            .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '$'))
            .unwrap_or(rest.len());
        if len == 0 {
            return None;
        }
        self.pos += len;
        Some(rest[..len].to_lowercase())
    }

    /// next bare word, without consuming it
    fn peek_word(&self) -> Option<String> {
        let mut ahead = *self;
        ahead.skip_whitespace();
        if ahead.peek() == Some('"') {
            return None;
        }
        ahead.identifier()
    }

    /// skip a balanced parenthesized group starting at the cursor
    fn skip_group(&mut self) {
        self.skip_whitespace();
        let mut depth = 0usize;
        for (idx, c) in self.rest().char_indices() {
            match c {
                '(' => depth += 1,
                ')' => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        self.pos += idx + 1;
                        return;
                    }
                }
                _ => {}
            }
        }
        self.pos = self.text.len();
    }

    fn skip_alias(&mut self) {
        if self.peek_word().as_deref() == Some("as") {
            self.identifier();
        }
        self.skip_whitespace();
        match self.peek() {
            Some('"') => {
                self.identifier();
            }
            _ => {
                if let Some(word) = self.peek_word() {
                    if !CLAUSE_KEYWORDS.contains(&word.as_str()) {
                        self.identifier();
                    }
                }
            }
        }
        // column alias list
        self.skip_whitespace();
        if self.peek() == Some('(') {
            self.skip_group();
        }
    }
}

/// whether `at` sits inside a function call's parentheses (as opposed to a
/// subquery's or none at all)
fn inside_call(text: &str, at: usize) -> bool {
    let mut stack: Vec<bool> = Vec::new();
    for (idx, c) in text[..at].char_indices() {
        match c {
            '(' => {
                let inner = text[idx + 1..].trim_start();
                stack.push(!SUBQUERY_START_REGEX.is_match(inner));
            }
            ')' => {
                stack.pop();
            }
            _ => {}
        }
    }
    stack.last().copied().unwrap_or(false)
}

/// the table list following one FROM or JOIN keyword
fn table_list(text: &str, start: usize) -> Vec<Vec<String>> {
    let mut cursor = Cursor { text, pos: start };
    let mut targets = Vec::new();

    loop {
        while matches!(cursor.peek_word().as_deref(), Some("only") | Some("lateral")) {
            cursor.identifier();
        }

        cursor.skip_whitespace();
        if cursor.peek() == Some('(') {
            // derived table; its own FROM is found by the outer scan
            cursor.skip_group();
        } else {
            let Some(first) = cursor.identifier() else {
                break;
            };
            let mut parts = vec![first];
            while cursor.eat('.') {
                match cursor.identifier() {
                    Some(part) => parts.push(part),
                    None => break,
                }
            }
            targets.push(parts);

            // table function arguments
            cursor.skip_whitespace();
            if cursor.peek() == Some('(') {
                cursor.skip_group();
            }
        }

        cursor.skip_alias();
        if !cursor.eat(',') {
            break;
        }
    }

    targets
}

/// every table reference in FROM lists and JOINs, as dotted name parts.
///
/// FROM inside function calls (`EXTRACT(MONTH FROM ...)`, `SUBSTRING(...)`)
/// and in `IS DISTINCT FROM` is not a table list and is skipped. `text`
/// should already have its literals masked.
pub(crate) fn table_targets(text: &str) -> Vec<Vec<String>> {
    TABLE_LIST_REGEX
        .find_iter(text)
        .filter(|m| !inside_call(text, m.start()))
        .filter(|m| !text[..m.start()].trim_end().to_lowercase().ends_with("distinct"))
        .flat_map(|m| table_list(text, m.end()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn targets(sql: &str) -> Vec<String> {
        table_targets(sql).iter().map(|parts| parts.join(".")).collect()
    }

    #[test]
    fn test_from_and_join_targets() {
        assert_eq!(
            targets("SELECT * FROM \"ortocenter\".\"agenda\" a JOIN public.usuarios u ON true"),
            vec!["ortocenter.agenda", "public.usuarios"]
        );
        assert_eq!(
            targets("SELECT * FROM \"ortocenter\" . \"Agenda\" AS a LEFT JOIN xyz ON true"),
            vec!["ortocenter.Agenda", "xyz"]
        );
    }

    #[test]
    fn test_comma_list_targets() {
        assert_eq!(
            targets("SELECT * FROM ortocenter.agenda a, pg_catalog.pg_authid, \"ortocenter\".\"pacientes\" AS p WHERE 1 = 1"),
            vec!["ortocenter.agenda", "pg_catalog.pg_authid", "ortocenter.pacientes"]
        );
    }

    #[test]
    fn test_subqueries_are_scanned() {
        assert_eq!(
            targets("SELECT * FROM (SELECT id FROM public.x) s, ortocenter.agenda WHERE id IN (SELECT id FROM y)"),
            vec!["ortocenter.agenda", "public.x", "y"]
        );
    }

    #[test]
    fn test_from_inside_calls_is_ignored() {
        assert_eq!(
            targets(
                "SELECT EXTRACT(MONTH FROM data_agendamento), SUBSTRING(nome FROM 1 FOR 3) \
                 FROM ortocenter.agenda WHERE a IS DISTINCT FROM b"
            ),
            vec!["ortocenter.agenda"]
        );
    }

    #[test]
    fn test_map_skips_literals() {
        let out = map_outside_literals("a 'a' a 'it''s a' a", |code| code.replace('a', "b"));
        assert_eq!(out, "b 'a' b 'it''s a' b");
    }

    #[test]
    fn test_mask_literals() {
        assert_eq!(
            mask_literals("WHERE nome = 'ortocenter.xyz' AND x = 'a;b'"),
            "WHERE nome = '' AND x = ''"
        );
        // unterminated quote is left alone
        assert_eq!(mask_literals("WHERE nome = 'abc"), "WHERE nome = 'abc");
    }
}
