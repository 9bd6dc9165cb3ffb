mod lexical;
pub mod prompt;
pub mod query;
pub mod renderer;
pub mod sanitizer;
pub mod synthesizer;
pub mod validator;

pub use query::CandidateQuery;
pub use renderer::{ResponseRenderer, EMPTY_RESULT_APOLOGY};
pub use sanitizer::Sanitizer;
pub use synthesizer::QuerySynthesizer;
pub use validator::{
    ExecutableQuery, LexicalValidator, QueryValidator, RejectionReason, ValidationOutcome,
};
