use crate::agent::prompt::{build_synthesis_prompt, synthesis_system_prompt};
use crate::agent::query::CandidateQuery;
use crate::config::{MonthEnd, PipelineConfig};
use crate::entities::dates::DateRange;
use crate::entities::months::{last_day_of_month, month_alternation, month_number};
use crate::error::Result;
use crate::llm::model::{LanguageModel, Message};
use crate::schema::SchemaDescriptor;
use chrono::{Datelike, Local, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

static NAMED_MONTH_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\bm[êe]s\s+de\s+({})(?:\s+de\s+(\d{{4}}))?\b",
        month_alternation()
    ))
    .unwrap()
});

static LAST_MONTH_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bm[êe]s\s+passado\b|\b[úu]ltimo\s+m[êe]s\b").unwrap()
});

pub struct QuerySynthesizer {
    model: Arc<dyn LanguageModel>,
    namespace: String,
    shortcut_table: String,
    shortcut_date_column: String,
    month_end: MonthEnd,
}

impl QuerySynthesizer {
    pub fn new(model: Arc<dyn LanguageModel>, config: &PipelineConfig) -> Self {
        Self {
            model,
            namespace: config.namespace.clone(),
            shortcut_table: config.shortcut_table.clone(),
            shortcut_date_column: config.shortcut_date_column.clone(),
            month_end: config.month_end,
        }
    }

    pub async fn synthesize(
        &self,
        question: &str,
        schema: &SchemaDescriptor,
        dates: Option<&DateRange>,
    ) -> Result<CandidateQuery> {
        self.synthesize_on(question, schema, dates, Local::now().date_naive())
            .await
    }

    /// raw model output, unsanitized, unless a shortcut pattern matches
    #[tracing::instrument(skip(self, question, schema, dates), fields(llm.model = %self.model.name()))]
    pub async fn synthesize_on(
        &self,
        question: &str,
        schema: &SchemaDescriptor,
        dates: Option<&DateRange>,
        today: NaiveDate,
    ) -> Result<CandidateQuery> {
        if let Some(query) = self.shortcut(question, today) {
            tracing::info!("answered by counting shortcut, skipping model");
            return Ok(query);
        }

        let messages = vec![
            Message::system(synthesis_system_prompt(&self.namespace)),
            Message::user(build_synthesis_prompt(question, schema, dates)),
        ];

        let output = self.model.complete(messages).await?;
        tracing::info!(output_len = output.len(), "model produced candidate query");

        Ok(CandidateQuery::new(output))
    }

    /// counting query for "mês de <mês> [de <ano>]" and "mês passado"
    pub fn shortcut(&self, question: &str, today: NaiveDate) -> Option<CandidateQuery> {
        if let Some(caps) = NAMED_MONTH_REGEX.captures(question) {
            let month = month_number(caps.get(1)?.as_str())?;
            let year = match caps.get(2) {
                Some(y) => y.as_str().parse().ok()?,
                None => today.year(),
            };
            return self.month_range(year, month).map(|r| self.counting_query(&r));
        }

        if LAST_MONTH_REGEX.is_match(question) {
            let previous = today.with_day(1)?.pred_opt()?;
            return self
                .month_range(previous.year(), previous.month())
                .map(|r| self.counting_query(&r));
        }

        None
    }

    fn month_range(&self, year: i32, month: u32) -> Option<DateRange> {
        let start = NaiveDate::from_ymd_opt(year, month, 1)?;
        let end = match self.month_end {
            MonthEnd::TwentyEighth => NaiveDate::from_ymd_opt(year, month, 28)?,
            MonthEnd::Calendar => last_day_of_month(year, month)?,
        };
        Some(DateRange::new(start, end))
    }

    fn counting_query(&self, range: &DateRange) -> CandidateQuery {
        let (start, end) = range.sql_bounds();
        CandidateQuery::new(format!(
            "SELECT COUNT(*) FROM \"{}\".\"{}\" WHERE \"{}\" BETWEEN {} AND {};",
            self.namespace, self.shortcut_table, self.shortcut_date_column, start, end
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::months::MONTH_NAMES;
    use crate::llm::model::MessageRole;
    use crate::test_support::{catalog, ScriptedModel};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    fn synthesizer(model: Arc<ScriptedModel>, month_end: MonthEnd) -> QuerySynthesizer {
        let config = PipelineConfig {
            month_end,
            ..PipelineConfig::default()
        };
        QuerySynthesizer::new(model, &config)
    }

    #[tokio::test]
    async fn test_named_month_shortcut_skips_model() {
        let model = Arc::new(ScriptedModel::new(&[]));
        let synth = synthesizer(model.clone(), MonthEnd::TwentyEighth);
        let schema = SchemaDescriptor::from_catalog("ortocenter", catalog());

        let query = synth
            .synthesize_on("quantos pacientes foram agendados no mês de março", &schema, None, today())
            .await
            .unwrap();

        assert_eq!(
            query.as_str(),
            "SELECT COUNT(*) FROM \"ortocenter\".\"agenda\" WHERE \"data_agendamento\" \
             BETWEEN '2026-03-01 00:00:00' AND '2026-03-28 23:59:59';"
        );
        assert_eq!(model.call_count(), 0);
    }

    #[test]
    fn test_every_month_spans_first_to_28th() {
        let synth = synthesizer(Arc::new(ScriptedModel::new(&[])), MonthEnd::TwentyEighth);

        for (idx, name) in MONTH_NAMES.iter().enumerate() {
            for year in [1999, 2024, 2026] {
                let question = format!("consultas no mês de {} de {}", name.to_uppercase(), year);
                let query = synth.shortcut(&question, today()).unwrap();
                let month = idx + 1;
                assert!(query.as_str().contains("COUNT(*)"));
                assert!(
                    query.as_str().contains(&format!(
                        "BETWEEN '{:04}-{:02}-01 00:00:00' AND '{:04}-{:02}-28 23:59:59'",
                        year, month, year, month
                    )),
                    "{}",
                    query
                );
            }
        }
    }

    #[test]
    fn test_calendar_month_end() {
        let synth = synthesizer(Arc::new(ScriptedModel::new(&[])), MonthEnd::Calendar);
        let query = synth.shortcut("agendamentos do mês de fevereiro de 2024", today()).unwrap();
        assert!(query.as_str().contains("'2024-02-29 23:59:59'"));
    }

    #[test]
    fn test_last_month_shortcut() {
        let synth = synthesizer(Arc::new(ScriptedModel::new(&[])), MonthEnd::TwentyEighth);
        let january = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();

        let query = synth.shortcut("quantos agendamentos no mês passado?", january).unwrap();
        assert!(query.as_str().contains("BETWEEN '2025-12-01 00:00:00' AND '2025-12-28 23:59:59'"));

        assert!(synth.shortcut("total do último mês", january).is_some());
    }

    #[test]
    fn test_shortcut_patterns_ignore_case() {
        let synth = synthesizer(Arc::new(ScriptedModel::new(&[])), MonthEnd::TwentyEighth);
        let other = synthesizer(Arc::new(ScriptedModel::new(&[])), MonthEnd::Calendar);

        assert!(synth.shortcut("TOTAL DO ÚLTIMO MÊS", today()).is_some());
        assert!(other.shortcut("Agendamentos no Mes Passado", today()).is_some());
    }

    #[test]
    fn test_day_mention_is_not_a_shortcut() {
        let synth = synthesizer(Arc::new(ScriptedModel::new(&[])), MonthEnd::TwentyEighth);
        assert!(synth.shortcut("consultas em 5 de março", today()).is_none());
        assert!(synth.shortcut("quantos pacientes temos", today()).is_none());
    }

    #[tokio::test]
    async fn test_model_prompt_embeds_schema_question_and_dates() {
        let model = Arc::new(ScriptedModel::new(&["SELECT nome FROM ortocenter.pacientes;"]));
        let synth = synthesizer(model.clone(), MonthEnd::TwentyEighth);
        let schema = SchemaDescriptor::from_catalog("ortocenter", catalog());
        let range = DateRange::single(NaiveDate::from_ymd_opt(2026, 5, 2).unwrap());

        let query = synth
            .synthesize_on("quem foi atendido em 2 de maio?", &schema, Some(&range), today())
            .await
            .unwrap();

        // returned as-is, sanitization happens later
        assert_eq!(query.as_str(), "SELECT nome FROM ortocenter.pacientes;");

        let requests = model.requests();
        assert_eq!(requests.len(), 1);
        let messages = &requests[0];
        assert_eq!(messages[0].role, MessageRole::System);
        assert!(messages[0].content.contains("\"ortocenter\""));
        assert_eq!(messages[1].role, MessageRole::User);
        assert!(messages[1].content.contains("Tabela: ortocenter.agenda"));
        assert!(messages[1].content.contains("quem foi atendido em 2 de maio?"));
        assert!(messages[1].content.contains("'2026-05-02 00:00:00' e '2026-05-02 23:59:59'"));
    }

    #[tokio::test]
    async fn test_model_failure_propagates() {
        let model = Arc::new(ScriptedModel::failing("rate limited"));
        let synth = synthesizer(model, MonthEnd::TwentyEighth);
        let schema = SchemaDescriptor::from_catalog("ortocenter", catalog());

        let err = synth
            .synthesize_on("quais pacientes temos", &schema, None, today())
            .await
            .unwrap_err();
        assert!(matches!(err, crate::error::Nl2SqlError::LanguageModel(_)));
    }
}
