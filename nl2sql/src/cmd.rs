use crate::server::{self, ServerConfig};
use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use common::config::{
    DatabaseConfig, LlmConfig, LocalePolicy, MonthEnd, PipelineConfig, DEFAULT_LLM_BASE_URL,
    DEFAULT_NAMESPACE, DEFAULT_RENDERING_MODEL, DEFAULT_SHORTCUT_DATE_COLUMN,
    DEFAULT_SHORTCUT_TABLE, DEFAULT_SYNTHESIS_MODEL,
};
use common::db::PgStore;
use common::llm::OpenAiModel;
use common::tracing::init_tracing;
use common::{Nl2SqlError, Pipeline};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "nl2sql")]
#[command(about = "answer portuguese questions about a postgres schema", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    database: DatabaseArgs,

    #[command(flatten)]
    llm: LlmArgs,

    #[command(flatten)]
    pipeline: PipelineArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP query endpoint
    Serve {
        /// Address to bind to
        #[arg(long, env = "NL2SQL_HOST", default_value = "0.0.0.0")]
        host: String,

        /// Port to bind to
        #[arg(long, env = "NL2SQL_PORT", default_value_t = 8000)]
        port: u16,
    },
    /// Answer a single question and exit
    Ask {
        /// Question in portuguese
        pergunta: String,

        /// Print the executed statement to stderr
        #[arg(long, default_value = "false")]
        show_sql: bool,
    },
}

#[derive(Args)]
struct DatabaseArgs {
    #[arg(long = "db-host", env = "DB_HOST", default_value = "localhost")]
    host: String,

    #[arg(long = "db-port", env = "DB_PORT", default_value_t = 5432)]
    port: u16,

    #[arg(long = "db-name", env = "DB_NAME", default_value = "postgres")]
    name: String,

    #[arg(long = "db-user", env = "DB_USER", default_value = "postgres")]
    user: String,

    #[arg(long = "db-password", env = "DB_PASSWORD", default_value = "", hide_env_values = true)]
    password: String,

    /// Bound on every catalog fetch and query execution
    #[arg(long = "db-timeout-secs", env = "NL2SQL_DB_TIMEOUT_SECS", default_value_t = 30)]
    timeout_secs: u64,
}

impl DatabaseArgs {
    fn config(&self) -> DatabaseConfig {
        DatabaseConfig {
            host: self.host.clone(),
            port: self.port,
            dbname: self.name.clone(),
            user: self.user.clone(),
            password: self.password.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

#[derive(Args)]
struct LlmArgs {
    #[arg(long, env = "OPENAI_API_KEY", default_value = "", hide_env_values = true)]
    api_key: String,

    /// Chat-completions compatible endpoint
    #[arg(long, env = "OPENAI_BASE_URL", default_value = DEFAULT_LLM_BASE_URL)]
    base_url: String,

    /// Model that writes the sql
    #[arg(long, env = "NL2SQL_SYNTHESIS_MODEL", default_value = DEFAULT_SYNTHESIS_MODEL)]
    synthesis_model: String,

    /// Model that phrases the answer
    #[arg(long, env = "NL2SQL_RENDERING_MODEL", default_value = DEFAULT_RENDERING_MODEL)]
    rendering_model: String,

    #[arg(long, env = "NL2SQL_TEMPERATURE", default_value_t = 0.0)]
    temperature: f32,

    #[arg(long = "llm-timeout-secs", env = "NL2SQL_LLM_TIMEOUT_SECS", default_value_t = 60)]
    timeout_secs: u64,
}

impl LlmArgs {
    fn config(&self) -> LlmConfig {
        LlmConfig {
            api_key: self.api_key.clone(),
            base_url: self.base_url.clone(),
            synthesis_model: self.synthesis_model.clone(),
            rendering_model: self.rendering_model.clone(),
            temperature: self.temperature,
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

#[derive(Args)]
struct PipelineArgs {
    /// Database schema the questions are about
    #[arg(long, env = "NL2SQL_NAMESPACE", default_value = DEFAULT_NAMESPACE)]
    namespace: String,

    /// Table counted by the month shortcuts
    #[arg(long, env = "NL2SQL_SHORTCUT_TABLE", default_value = DEFAULT_SHORTCUT_TABLE)]
    shortcut_table: String,

    #[arg(long, env = "NL2SQL_SHORTCUT_DATE_COLUMN", default_value = DEFAULT_SHORTCUT_DATE_COLUMN)]
    shortcut_date_column: String,

    /// Last day of month for the shortcuts: 28 or calendar
    #[arg(long, env = "NL2SQL_MONTH_END", default_value = "28")]
    month_end: MonthEnd,

    /// Questions not in portuguese: reject, flag or off
    #[arg(long, env = "NL2SQL_LOCALE_POLICY", default_value = "reject")]
    locale_policy: LocalePolicy,

    /// Let the rendering model phrase single-value answers
    #[arg(long, env = "NL2SQL_PHRASE_SCALAR", default_value = "false")]
    phrase_scalar: bool,
}

impl PipelineArgs {
    fn config(&self) -> PipelineConfig {
        PipelineConfig {
            namespace: self.namespace.clone(),
            shortcut_table: self.shortcut_table.clone(),
            shortcut_date_column: self.shortcut_date_column.clone(),
            month_end: self.month_end,
            locale_policy: self.locale_policy,
            phrase_scalar_with_model: self.phrase_scalar,
        }
    }
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let _guard = init_tracing("nl2sql")?;

        let pipeline = Arc::new(self.build_pipeline()?);

        match self.command {
            Commands::Serve { host, port } => {
                server::serve(&ServerConfig { host, port }, pipeline).await
            }
            Commands::Ask { pergunta, show_sql } => ask(&pipeline, &pergunta, show_sql).await,
        }
    }

    fn build_pipeline(&self) -> Result<Pipeline> {
        let database = self.database.config();
        let llm = self.llm.config();
        let config = self.pipeline.config();

        if llm.api_key.is_empty() {
            tracing::warn!("OPENAI_API_KEY is not set, model calls will be rejected");
        }

        tracing::info!(
            namespace = %config.namespace,
            db_host = %database.host,
            db_name = %database.dbname,
            synthesis_model = %llm.synthesis_model,
            rendering_model = %llm.rendering_model,
            locale_policy = ?config.locale_policy,
            month_end = ?config.month_end,
            "building pipeline"
        );

        let store = Arc::new(PgStore::new(&database, &config.namespace));
        let (synthesis, rendering) = OpenAiModel::pair(&llm)?;

        let pipeline = Pipeline::new(
            &config,
            store,
            Arc::new(synthesis),
            Arc::new(rendering),
            database.timeout,
        )?;
        Ok(pipeline)
    }
}

async fn ask(pipeline: &Pipeline, pergunta: &str, show_sql: bool) -> Result<()> {
    match pipeline.answer(pergunta).await {
        Ok(answer) => {
            if show_sql {
                eprintln!("{}", answer.sql);
            }
            if answer.locale_flagged {
                eprintln!("{}", server::LOCALE_WARNING);
            }
            println!("{}", answer.text);
            Ok(())
        }
        Err(Nl2SqlError::ExecutionFailure { message, query }) => Err(anyhow::anyhow!(
            "query execution failed: {}\nquery_sql: {}",
            message,
            query
        )),
        Err(e) => Err(e.into()),
    }
}
