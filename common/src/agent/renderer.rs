use crate::agent::prompt::{build_list_render_prompt, build_scalar_render_prompt, RENDER_SYSTEM_PROMPT};
use crate::db::executor::ExecutionResult;
use crate::db::store::Row;
use crate::error::Result;
use crate::llm::model::{LanguageModel, Message};
use std::sync::Arc;

pub const EMPTY_RESULT_APOLOGY: &str =
    "Desculpe, não encontrei nenhum resultado para a sua pergunta.";

const NULL_TEXT: &str = "nulo";

fn cell_text(cell: &Option<String>) -> &str {
    cell.as_deref().unwrap_or(NULL_TEXT)
}

pub fn scalar_sentence(literal: &str) -> String {
    format!("A resposta para a sua pergunta é: {}.", literal)
}

pub struct ResponseRenderer {
    model: Arc<dyn LanguageModel>,
    phrase_scalar_with_model: bool,
}

impl ResponseRenderer {
    pub fn new(model: Arc<dyn LanguageModel>, phrase_scalar_with_model: bool) -> Self {
        Self {
            model,
            phrase_scalar_with_model,
        }
    }

    /// execution failures come back as `Err` for the caller to report
    #[tracing::instrument(skip(self, result, question), fields(llm.model = %self.model.name()))]
    pub async fn render(&self, result: ExecutionResult, question: &str) -> Result<String> {
        let rows = result.into_rows()?;

        match rows.as_slice() {
            [] => {
                tracing::info!("empty result, returning apology");
                Ok(EMPTY_RESULT_APOLOGY.to_string())
            }
            [row] if row.len() == 1 => self.render_scalar(cell_text(&row[0]), question).await,
            _ => self.render_list(&rows, question).await,
        }
    }

    async fn render_scalar(&self, literal: &str, question: &str) -> Result<String> {
        if !self.phrase_scalar_with_model {
            return Ok(scalar_sentence(literal));
        }

        let messages = vec![
            Message::system(RENDER_SYSTEM_PROMPT),
            Message::user(build_scalar_render_prompt(question, literal)),
        ];
        let phrased = self.model.complete(messages).await?;

        // the literal is the answer; a sentence that lost it is useless
        if phrased.contains(literal) {
            Ok(phrased)
        } else {
            tracing::warn!("model phrasing dropped the value, using fixed sentence");
            Ok(scalar_sentence(literal))
        }
    }

    async fn render_list(&self, rows: &[Row], question: &str) -> Result<String> {
        let values = rows
            .iter()
            .filter_map(|row| row.first())
            .map(cell_text)
            .collect::<Vec<_>>()
            .join(", ");

        tracing::info!(row_count = rows.len(), "asking model to phrase result list");

        let messages = vec![
            Message::system(RENDER_SYSTEM_PROMPT),
            Message::user(build_list_render_prompt(question, &values)),
        ];
        self.model.complete(messages).await
    }
}
