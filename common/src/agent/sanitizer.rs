use crate::agent::lexical::map_outside_literals;
use crate::agent::query::CandidateQuery;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static FENCE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)```(?:postgresql|postgres|sql)?").unwrap()
});

static ESCAPED_QUOTE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\\+(["'])"#).unwrap()
});

/// deterministic repairs for artifacts models leave around sql.
///
/// never rejects anything and is idempotent; deciding whether the result is
/// acceptable is the validator's job.
pub struct Sanitizer {
    namespace: String,
    doubled_qualifier: Regex,
    doubled_from: Regex,
    qualified_identifier: Regex,
}

impl Sanitizer {
    /// `namespace` must be a plain identifier (see `PipelineConfig::validate`)
    pub fn new(namespace: &str) -> Self {
        let ns = regex::escape(namespace);

        Self {
            namespace: namespace.to_string(),
            doubled_qualifier: Regex::new(&format!(r"(?i)\b(?:{ns}\.){{2,}}", ns = ns))
                .expect("doubled qualifier pattern must compile"),
            doubled_from: Regex::new(&format!(
                r#"(?i)\b(FROM|JOIN)\s+(?:"?{ns}"?\s*\.\s*){{2,}}"#,
                ns = ns
            ))
            .expect("doubled from pattern must compile"),
            qualified_identifier: qualified_identifier_regex(namespace),
        }
    }

    #[tracing::instrument(skip(self, query), fields(input_len = query.as_str().len()))]
    pub fn sanitize(&self, query: CandidateQuery) -> CandidateQuery {
        let text = strip_wrapping(query.as_str());
        let text = map_outside_literals(&text, |code| self.repair_qualifiers(code));

        let sanitized = text.trim().to_string();
        if sanitized != query.as_str() {
            tracing::debug!(output_len = sanitized.len(), "candidate query repaired");
        }

        CandidateQuery::new(sanitized)
    }

    fn repair_qualifiers(&self, code: &str) -> String {
        let code = self
            .doubled_qualifier
            .replace_all(code, format!("{}.", self.namespace).as_str());

        let code = self
            .doubled_from
            .replace_all(&code, format!("${{1}} \"{}\".", self.namespace).as_str());

        self.qualified_identifier
            .replace_all(&code, |caps: &Captures| {
                let name = match (caps.get(1), caps.get(2)) {
                    (Some(quoted), _) => quoted.as_str().to_string(),
                    // unquoted names fold to lower case in postgres
                    (None, Some(bare)) => bare.as_str().to_lowercase(),
                    (None, None) => String::new(),
                };
                format!("\"{}\".\"{}\"", self.namespace, name)
            })
            .into_owned()
    }
}

/// unescape quotes and drop fences until neither changes anything; removing a
/// fence can leave a backslash right before a quote
fn strip_wrapping(text: &str) -> String {
    let mut current = text.trim().to_string();
    loop {
        let unescaped = ESCAPED_QUOTE_REGEX.replace_all(&current, "$1");
        let next = FENCE_REGEX.replace_all(&unescaped, "").trim().to_string();
        if next == current {
            return next;
        }
        current = next;
    }
}

/// `ns.name`, `"ns"."name"` and mixed forms, plus any backslashes in front.
/// group 1 holds a quoted name, group 2 a bare one.
pub(crate) fn qualified_identifier_regex(namespace: &str) -> Regex {
    Regex::new(&format!(
        r#"(?i)\\*"?\b{ns}\b"?\s*\.\s*(?:"([^"]+)"|([A-Za-z_][A-Za-z0-9_]*))"#,
        ns = regex::escape(namespace)
    ))
    .expect("qualified identifier pattern must compile")
}
