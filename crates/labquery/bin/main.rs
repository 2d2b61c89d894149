//! labquery command line.
//!
//! ```bash
//! # Show the SQL a saved query compiles to
//! labquery compile --configuration ./config --query query.json
//!
//! # Run it against the database named by LABQUERY_DATABASE_URL
//! labquery search --configuration ./config --query query.json --limit 20 --stats
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use labquery::{state, Searcher};
use labquery_configuration::environment::ProcessEnvironment;
use labquery_configuration::{
    configuration::configuration_jsonschema, make_runtime_configuration, parse_configuration,
    runtime_metadata, write_parsed_configuration, Configuration, ParsedConfiguration,
};
use query_engine_metadata::metadata::Metadata;
use query_engine_models::Query;
use query_engine_sql::sql;
use query_engine_translation::translation::helpers::Env;
use query_engine_translation::translation::lowering;
use query_engine_translation::translation::query::distinct::resolve_distinct_fields;
use query_engine_translation::translation::query::{
    compile_query, plan_search, OrderDirection, SearchOptions,
};

#[derive(Parser)]
#[command(name = "labquery", version, about = "Search laboratory records with query trees")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write an empty configuration and its JSON schema into a directory
    Initialize {
        #[arg(long, env = "LABQUERY_CONFIGURATION")]
        configuration: PathBuf,
    },
    /// Print the JSON schema of the configuration file
    PrintSchema,
    /// Compile the selected search of a query and print the statements it runs
    Compile {
        #[arg(long, env = "LABQUERY_CONFIGURATION")]
        configuration: PathBuf,
        /// A query object, as saved by the search UI
        #[arg(long)]
        query: PathBuf,
        /// Fail unless the query selects this format
        #[arg(long)]
        format: Option<String>,
        #[command(flatten)]
        options: OptionArgs,
    },
    /// Print the fields that make the rows of a format distinct
    Distinct {
        #[arg(long, env = "LABQUERY_CONFIGURATION")]
        configuration: PathBuf,
        #[arg(long)]
        format: String,
        #[arg(long)]
        order_by: Option<String>,
        /// Split rows on every many-to-many instance
        #[arg(long)]
        split_all: bool,
    },
    /// Print how the selected search of a query would be run
    Plan {
        #[arg(long, env = "LABQUERY_CONFIGURATION")]
        configuration: PathBuf,
        #[arg(long)]
        query: PathBuf,
        #[command(flatten)]
        options: OptionArgs,
    },
    /// Check that the configured database answers
    Check {
        #[arg(long, env = "LABQUERY_CONFIGURATION")]
        configuration: PathBuf,
    },
    /// Run the selected search of a query and print the results as JSON
    Search {
        #[arg(long, env = "LABQUERY_CONFIGURATION")]
        configuration: PathBuf,
        #[arg(long)]
        query: PathBuf,
        #[command(flatten)]
        options: OptionArgs,
    },
}

#[derive(clap::Args)]
struct OptionArgs {
    #[arg(long)]
    limit: Option<u32>,
    #[arg(long)]
    offset: Option<u32>,
    /// A field path relative to the format's root, e.g. `samples__animal__name`
    #[arg(long)]
    order_by: Option<String>,
    #[arg(long)]
    descending: bool,
    /// Compute the stats of the format
    #[arg(long)]
    stats: bool,
}

impl From<OptionArgs> for SearchOptions {
    fn from(args: OptionArgs) -> Self {
        SearchOptions {
            limit: args.limit,
            offset: args.offset,
            order_by: args.order_by,
            order_direction: if args.descending {
                OrderDirection::Desc
            } else {
                OrderDirection::Asc
            },
            compute_stats: args.stats,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Initialize { configuration } => {
            write_parsed_configuration(&ParsedConfiguration::initial(), &configuration).await?;
            tracing::info!(dir = %configuration.display(), "configuration written");
        }
        Command::PrintSchema => {
            println!("{}", serde_json::to_string_pretty(&configuration_jsonschema())?);
        }
        Command::Compile {
            configuration,
            query,
            format,
            options,
        } => {
            let metadata = read_metadata(&configuration).await?;
            let query = read_query(&query).await?;
            match compile_query(&metadata, &query, format.as_deref())? {
                Some(predicate) => println!("-- predicate: {predicate}"),
                None => println!("-- predicate: none"),
            }
            let env = Env::new(&metadata);
            let plan = plan_search(&env, &query, &options.into())?;
            let execution_plan = lowering::translate(&env, &plan)?;
            print_statement("rows", &execution_plan.rows_sql());
            print_statement("count", &execution_plan.count_sql());
            for stats in &execution_plan.stats {
                print_statement(&format!("stats {}", stats.name), &stats.select.to_statement());
            }
        }
        Command::Distinct {
            configuration,
            format,
            order_by,
            split_all,
        } => {
            let metadata = read_metadata(&configuration).await?;
            let env = Env::new(&metadata);
            let format_spec = env.lookup_format(&format)?;
            let fields =
                resolve_distinct_fields(&env, format_spec, order_by.as_deref(), false, split_all)?;
            for field in fields {
                println!("{field}");
            }
        }
        Command::Plan {
            configuration,
            query,
            options,
        } => {
            let metadata = read_metadata(&configuration).await?;
            let query = read_query(&query).await?;
            let env = Env::new(&metadata);
            let plan = plan_search(&env, &query, &options.into())?;
            println!("format:   {} ({})", plan.format_id, plan.root_entity);
            println!("distinct: {}", plan.distinct_fields.join(", "));
            let order_by: Vec<String> = plan
                .order_by
                .iter()
                .map(|element| match element.direction {
                    OrderDirection::Asc => element.path.clone(),
                    OrderDirection::Desc => format!("-{}", element.path),
                })
                .collect();
            println!("order by: {}", order_by.join(", "));
            for step in lowering::prefetch_steps(&env, &plan)? {
                let filter = step
                    .filter
                    .as_ref()
                    .map(|filter| format!(" where {}", filter.predicate))
                    .unwrap_or_default();
                println!("prefetch: {} ({}){filter}", step.path, step.entity);
            }
        }
        Command::Check { configuration } => {
            let (_, state) = connect(&configuration).await?;
            state::health_check(&state.pool).await?;
            println!("ok");
        }
        Command::Search {
            configuration,
            query,
            options,
        } => {
            let (configuration, state) = connect(&configuration).await?;
            let searcher = Searcher::new(
                Arc::clone(&configuration.metadata),
                Arc::new(state.backend()),
            );
            let query = read_query(&query).await?;
            let results = searcher.execute(&query, &options.into()).await?;
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
    }
    Ok(())
}

/// Resolve the configuration against the process environment and open the pool.
async fn connect(configuration_dir: &Path) -> anyhow::Result<(Configuration, state::State)> {
    let parsed = parse_configuration(configuration_dir).await?;
    let configuration = make_runtime_configuration(parsed, ProcessEnvironment)?;
    let mut registry = prometheus::Registry::new();
    let state = state::create_state(&configuration, &mut registry).await?;
    Ok((configuration, state))
}

/// Read and check the metadata of a configuration directory without resolving its secrets.
async fn read_metadata(configuration_dir: &Path) -> anyhow::Result<Metadata> {
    let parsed = parse_configuration(configuration_dir).await?;
    Ok(runtime_metadata(&parsed)?)
}

async fn read_query(path: &Path) -> anyhow::Result<Query> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parsing {}", path.display()))
}

fn print_statement(title: &str, statement: &sql::string::SQL) {
    println!("-- {title}");
    println!(
        "{};",
        sqlformat::format(
            &statement.sql,
            &sqlformat::QueryParams::None,
            sqlformat::FormatOptions::default(),
        )
    );
    for (index, param) in statement.params.iter().enumerate() {
        match param {
            sql::string::Param::String(value) => println!("-- ${}: {value:?}", index + 1),
        }
    }
}
