use std::fmt;

/// sql text produced by synthesis, not yet validated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateQuery(String);

impl CandidateQuery {
    pub fn new(sql: impl Into<String>) -> Self {
        Self(sql.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for CandidateQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
