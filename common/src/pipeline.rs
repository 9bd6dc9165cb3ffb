use crate::agent::{LexicalValidator, QuerySynthesizer, QueryValidator, ResponseRenderer, Sanitizer};
use crate::config::PipelineConfig;
use crate::db::{QueryExecutor, RelationalStore};
use crate::entities::{DateExtractor, DateRange};
use crate::error::{Nl2SqlError, Result};
use crate::llm::LanguageModel;
use crate::locale::LocaleGate;
use crate::schema::SchemaCache;
use chrono::{Local, NaiveDate};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// the answer to one question, with the statement that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub text: String,
    pub sql: String,
    pub dates: Option<DateRange>,
    /// the locale gate let the question through with a warning
    pub locale_flagged: bool,
}

/// top-level context: owns the schema cache and every stage.
///
/// one call to `answer` runs the stages strictly in order; the only state
/// shared between concurrent calls is the schema cache.
pub struct Pipeline {
    cache: SchemaCache,
    locale: LocaleGate,
    extractor: DateExtractor,
    synthesizer: QuerySynthesizer,
    sanitizer: Sanitizer,
    validator: Box<dyn QueryValidator>,
    executor: QueryExecutor,
    renderer: ResponseRenderer,
}

impl Pipeline {
    pub fn new(
        config: &PipelineConfig,
        store: Arc<dyn RelationalStore>,
        synthesis_model: Arc<dyn LanguageModel>,
        rendering_model: Arc<dyn LanguageModel>,
        db_timeout: Duration,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            cache: SchemaCache::new(Arc::clone(&store), &config.namespace, db_timeout),
            locale: LocaleGate::new(config.locale_policy),
            extractor: DateExtractor::new(),
            synthesizer: QuerySynthesizer::new(synthesis_model, config),
            sanitizer: Sanitizer::new(&config.namespace),
            validator: Box::new(LexicalValidator::new(&config.namespace)),
            executor: QueryExecutor::new(store, db_timeout),
            renderer: ResponseRenderer::new(rendering_model, config.phrase_scalar_with_model),
        })
    }

    /// swap the lexical validator for another implementation
    pub fn with_validator(mut self, validator: Box<dyn QueryValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn schema_cache(&self) -> &SchemaCache {
        &self.cache
    }

    pub async fn answer(&self, question: &str) -> Result<Answer> {
        self.answer_on(question, Local::now().date_naive()).await
    }

    #[tracing::instrument(skip(self, question), fields(question_len = question.len()))]
    pub async fn answer_on(&self, question: &str, today: NaiveDate) -> Result<Answer> {
        let start = Instant::now();

        let question = question.trim();
        if question.is_empty() {
            return Err(Nl2SqlError::EmptyQuestion);
        }

        let locale_flagged = self.locale.check(question)?;

        let dates = self.extractor.extract_dates_on(question, today);
        if let Some(range) = &dates {
            tracing::info!(%range, "question mentions a date range");
        }

        let schema = self.cache.get_schema().await?;

        let candidate = self
            .synthesizer
            .synthesize_on(question, &schema, dates.as_ref(), today)
            .await?;
        let candidate = self.sanitizer.sanitize(candidate);
        let executable = self.validator.promote(candidate, &schema)?;

        let result = self.executor.execute(&executable).await;
        let text = self.renderer.render(result, question).await?;

        tracing::info!(
            duration_ms = start.elapsed().as_millis() as u64,
            "question answered"
        );

        Ok(Answer {
            text,
            sql: executable.into_inner(),
            dates,
            locale_flagged,
        })
    }
}
