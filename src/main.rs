//! sqltable - run a parameterized SQL query and print the result table.

mod cli;
mod output;

use cli::{Cli, OutputFormat};
use sqltable::config::Config;
use sqltable::db::redact_connection_string;
use sqltable::error::Result;
use sqltable::logging;
use sqltable::query::QueryExecutor;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    logging::init_stderr_logging();

    if let Err(e) = run().await {
        error!("{}: {}", e.category(), e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse_args();
    let format = cli.parse_output_format()?;

    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let config = Config::load_from_file(&config_path)?;

    let connection = cli.resolve_connection(&config)?;
    info!("Connection: {}", redact_connection_string(&connection));

    let mut executor = QueryExecutor::with_sqlx().with_retry_policy(cli.retry_policy(&config)?);
    let table = executor
        .execute_with(connection, cli.query.clone(), cli.parameters()?)
        .await?;

    match format {
        OutputFormat::Text => print!("{}", output::render_text(table)),
        OutputFormat::Json => println!("{}", output::render_json(table)),
    }

    Ok(())
}
