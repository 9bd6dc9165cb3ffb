//! lexical acceptance check for synthesized statements.
//!
//! this scans identifiers with patterns; it is not a sql parser. a `Valid`
//! outcome means "safe to attempt", not "will execute": malformed expressions
//! inside an otherwise plausible select still reach the database and come
//! back as an execution failure.

use crate::agent::lexical::{mask_literals, table_targets};
use crate::agent::query::CandidateQuery;
use crate::agent::sanitizer::qualified_identifier_regex;
use crate::error::{Nl2SqlError, Result};
use crate::schema::SchemaDescriptor;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

static SELECT_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bselect\b").unwrap());

static LITERAL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"'(?:[^']|'')*'|"[^"]*""#).unwrap()
});

static WRITE_KEYWORD_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(insert|update|delete|drop|alter|truncate|create|grant|revoke)\b").unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionReason {
    EmptyQuery,
    NotASelect,
    WrongSchema,
    UnknownTable,
    NotReadOnly,
    MultipleStatements,
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RejectionReason::EmptyQuery => "empty query",
            RejectionReason::NotASelect => "not a select statement",
            RejectionReason::WrongSchema => "does not read from the configured schema",
            RejectionReason::UnknownTable => "unknown table",
            RejectionReason::NotReadOnly => "statement modifies data",
            RejectionReason::MultipleStatements => "more than one statement",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Valid,
    Invalid {
        reason: RejectionReason,
        offending_identifier: Option<String>,
    },
}

impl ValidationOutcome {
    fn invalid(reason: RejectionReason) -> Self {
        ValidationOutcome::Invalid {
            reason,
            offending_identifier: None,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationOutcome::Valid)
    }
}

/// a statement that passed validation. only a validator can build one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutableQuery(String);

impl ExecutableQuery {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    #[cfg(test)]
    pub(crate) fn new_unchecked(sql: &str) -> Self {
        Self(sql.to_string())
    }
}

pub trait QueryValidator: Send + Sync {
    fn validate(&self, query: &CandidateQuery, schema: &SchemaDescriptor) -> ValidationOutcome;

    /// turn a candidate into an executable query, or reject it
    fn promote(&self, query: CandidateQuery, schema: &SchemaDescriptor) -> Result<ExecutableQuery> {
        match self.validate(&query, schema) {
            ValidationOutcome::Valid => Ok(ExecutableQuery(query.into_inner())),
            ValidationOutcome::Invalid {
                reason,
                offending_identifier,
            } => {
                tracing::warn!(%reason, identifier = ?offending_identifier, sql = %query, "candidate query rejected");
                Err(Nl2SqlError::ValidationRejected {
                    reason,
                    identifier: offending_identifier,
                    query: query.into_inner(),
                })
            }
        }
    }
}

/// pattern-based validator for a single namespace
pub struct LexicalValidator {
    namespace: String,
    from_namespace: Regex,
    qualified_identifier: Regex,
}

impl LexicalValidator {
    pub fn new(namespace: &str) -> Self {
        let ns = regex::escape(namespace);
        Self {
            namespace: namespace.to_string(),
            from_namespace: Regex::new(&format!(r#"(?i)\bFROM\s+"?{}"?\s*\."#, ns))
                .expect("from namespace pattern must compile"),
            qualified_identifier: qualified_identifier_regex(namespace),
        }
    }

    /// every FROM/JOIN target must be `ns.<known table>`
    fn check_targets(&self, text: &str, schema: &SchemaDescriptor) -> Option<ValidationOutcome> {
        table_targets(text).into_iter().find_map(|parts| {
            let (table, qualifier) = parts.split_last()?;
            let in_namespace = matches!(qualifier, [ns] if ns.eq_ignore_ascii_case(&self.namespace));

            if !in_namespace {
                Some(ValidationOutcome::Invalid {
                    reason: RejectionReason::WrongSchema,
                    offending_identifier: Some(parts.join(".")),
                })
            } else if !schema.contains_table(table) {
                Some(ValidationOutcome::Invalid {
                    reason: RejectionReason::UnknownTable,
                    offending_identifier: Some(table.clone()),
                })
            } else {
                None
            }
        })
    }

    /// qualified names anywhere else, e.g. `"ns"."t"."col"` in a where clause
    fn unknown_table(&self, text: &str, schema: &SchemaDescriptor) -> Option<String> {
        self.qualified_identifier.captures_iter(text).find_map(|caps| {
            let name = match (caps.get(1), caps.get(2)) {
                (Some(quoted), _) => quoted.as_str().to_string(),
                (None, Some(bare)) => bare.as_str().to_lowercase(),
                (None, None) => return None,
            };
            (!schema.contains_table(&name)).then_some(name)
        })
    }
}

impl QueryValidator for LexicalValidator {
    fn validate(&self, query: &CandidateQuery, schema: &SchemaDescriptor) -> ValidationOutcome {
        let text = query.as_str();

        if text.trim().is_empty() {
            return ValidationOutcome::invalid(RejectionReason::EmptyQuery);
        }

        // names inside string literals are data, not references
        let code = mask_literals(text);

        if !SELECT_REGEX.is_match(&code) {
            return ValidationOutcome::invalid(RejectionReason::NotASelect);
        }

        if !self.from_namespace.is_match(&code) {
            return ValidationOutcome::invalid(RejectionReason::WrongSchema);
        }

        if let Some(outcome) = self.check_targets(&code, schema) {
            return outcome;
        }

        if let Some(table) = self.unknown_table(&code, schema) {
            return ValidationOutcome::Invalid {
                reason: RejectionReason::UnknownTable,
                offending_identifier: Some(table),
            };
        }

        // keywords inside string literals or quoted identifiers don't count
        let bare = LITERAL_REGEX.replace_all(text, " ");
        if let Some(keyword) = WRITE_KEYWORD_REGEX.find(&bare) {
            return ValidationOutcome::Invalid {
                reason: RejectionReason::NotReadOnly,
                offending_identifier: Some(keyword.as_str().to_uppercase()),
            };
        }

        // a single trailing semicolon is fine
        if code.trim_end().trim_end_matches(';').contains(';') {
            return ValidationOutcome::invalid(RejectionReason::MultipleStatements);
        }

        ValidationOutcome::Valid
    }
}
