//! sqlscribe: ask questions about a PostgreSQL database in plain language

mod config;
mod logging;
mod render;
mod repl;

use clap::Parser;
use sqlscribe_agent::{OpenAiSqlAgent, QueryAgent, SqlToolkit, build_system_prompt};
use sqlscribe_core::DatabaseDriver;
use sqlscribe_driver_postgres::PostgresDriver;
use sqlscribe_schema::{DdlSynthesizer, load_schema_text};
use std::process::ExitCode;
use std::sync::Arc;

use config::Args;
use logging::LoggingConfig;
use repl::SchemaView;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    let _logging = match logging::init(LoggingConfig::default().with_json_logs(args.log_json)) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("warning: logging disabled: {e:#}");
            None
        }
    };

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "fatal startup error");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let settings = args.into_settings()?;
    let driver = Arc::new(PostgresDriver::new());

    tracing::info!(
        engine = driver.display_name(),
        connection = %driver.build_connection_string(&settings.connection),
        "reading database schema"
    );
    let synthesizer = DdlSynthesizer::new(settings.sequence_defaults);
    let schema_text = load_schema_text(
        driver.as_ref(),
        &settings.connection,
        &settings.selection,
        &synthesizer,
    )
    .await;

    let system_prompt = build_system_prompt(
        &settings.connection.schema,
        schema_text.agent_context(),
        settings.agent.max_result_rows,
    );
    let toolkit = SqlToolkit::new(
        driver,
        settings.connection.clone(),
        settings.agent.max_result_rows,
    );
    let agent = OpenAiSqlAgent::new(settings.agent.clone(), toolkit, system_prompt)?;
    let metadata = agent.metadata();
    tracing::info!(agent = %metadata.name, model = %metadata.model, "query agent ready");

    let schema_view = SchemaView {
        tables_label: settings.tables_label(),
        text: schema_text.display_text().to_string(),
    };

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    let interrupted = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "could not listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    let outcome = repl::run_loop(stdin, &mut stdout, &schema_view, &agent, interrupted).await;
    agent.toolkit().close().await;

    let (reason, stats) = outcome?;
    tracing::info!(
        ?reason,
        agent_calls = stats.agent_calls,
        agent_failures = stats.agent_failures,
        "sqlscribe finished"
    );
    Ok(())
}
