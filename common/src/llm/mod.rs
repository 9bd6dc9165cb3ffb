pub mod model;
pub mod openai;

pub use model::{LanguageModel, Message, MessageRole};
pub use openai::OpenAiModel;
