//! SensorThings CLI - inspect the schema and the SQL the resolver emits
//!
//! Usage:
//!   sensorthings schema [--dialect <dialect>]
//!   sensorthings explain <path> [--top N] [--skip N] [--select a,b] [--orderby "x desc"] [--count]
//!   sensorthings init [--database <file>]
//!
//! Examples:
//!   sensorthings schema --dialect postgres
//!   sensorthings explain "Things(1)/Datastreams" --orderby "name desc" --count
//!   sensorthings init --database ./sta.sqlite

use clap::{Parser, Subcommand, ValueEnum};
use sensorthings::config::Settings;
use sensorthings::fields;
use sensorthings::query::{self, Query, ResourcePath};
use sensorthings::resolver::PathResolver;
use sensorthings::schema;
use sensorthings::sql::Dialect;
use sensorthings::store::{schema_ddl, Store};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "sensorthings")]
#[command(about = "SensorThings core - path/query compiler and entity store")]
#[command(version)]
struct Cli {
    /// Config file (defaults to STA_CONFIG, ./sensorthings.toml, then the user config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the DDL for every entity and link table
    Schema {
        /// SQL dialect to generate
        #[arg(short, long, default_value = "sqlite")]
        dialect: DialectArg,
    },

    /// Print the SQL a resource path resolves to
    Explain {
        /// Resource path, e.g. Things(1)/Datastreams
        path: String,

        /// SQL dialect to generate
        #[arg(short, long, default_value = "sqlite")]
        dialect: DialectArg,

        #[arg(long)]
        top: Option<u64>,

        #[arg(long)]
        skip: Option<u64>,

        /// Comma-separated property names
        #[arg(long)]
        select: Option<String>,

        /// Comma-separated `path [asc|desc]` items
        #[arg(long)]
        orderby: Option<String>,

        /// Also print the count query
        #[arg(long)]
        count: bool,
    },

    /// Create the schema in a SQLite database
    Init {
        /// Database file (defaults to persistence.database)
        #[arg(short, long)]
        database: Option<String>,
    },
}

#[derive(Clone, ValueEnum)]
enum DialectArg {
    Sqlite,
    Postgres,
}

impl From<DialectArg> for Dialect {
    fn from(arg: DialectArg) -> Self {
        match arg {
            DialectArg::Sqlite => Dialect::Sqlite,
            DialectArg::Postgres => Dialect::Postgres,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::from_file(path),
        None => Settings::load(),
    };
    let settings = match settings {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    env_logger::Builder::new()
        .parse_filters(&settings.logging.filter)
        .parse_default_env()
        .init();

    match cli.command {
        Commands::Schema { dialect } => cmd_schema(dialect),
        Commands::Explain {
            path,
            dialect,
            top,
            skip,
            select,
            orderby,
            count,
        } => {
            let options = ExplainOptions {
                top,
                skip,
                select,
                orderby,
                count,
            };
            cmd_explain(&settings, &path, dialect, options)
        }
        Commands::Init { database } => cmd_init(settings, database),
    }
}

fn cmd_schema(dialect: DialectArg) -> ExitCode {
    println!(
        "{}",
        schema_ddl(schema::global(), fields::global(), dialect.into())
    );
    ExitCode::SUCCESS
}

struct ExplainOptions {
    top: Option<u64>,
    skip: Option<u64>,
    select: Option<String>,
    orderby: Option<String>,
    count: bool,
}

fn cmd_explain(
    settings: &Settings,
    path: &str,
    dialect: DialectArg,
    options: ExplainOptions,
) -> ExitCode {
    let path = match ResourcePath::parse(path, schema::global()) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Invalid path: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let entity_type = path.main_element().entity_type;

    let mut query = Query::new();
    query.top = options.top;
    query.skip = options.skip;
    query.count = options.count;
    if let Some(select) = &options.select {
        match query::parse_select(entity_type, select) {
            Ok(properties) => query = query.select(properties),
            Err(e) => {
                eprintln!("Invalid $select: {}", e);
                return ExitCode::FAILURE;
            }
        }
    }
    if let Some(orderby) = &options.orderby {
        match query::parse_order_by(entity_type, orderby) {
            Ok(items) => query.order_by = items,
            Err(e) => {
                eprintln!("Invalid $orderby: {}", e);
                return ExitCode::FAILURE;
            }
        }
    }

    let resolver = PathResolver::new(schema::global(), fields::global(), settings.query);
    match resolver.resolve(&path, &query) {
        Ok(resolved) => {
            let dialect: Dialect = dialect.into();
            println!("{};", resolved.sql.to_sql(dialect));
            if let Some(count) = &resolved.count {
                println!();
                println!("{};", count.to_sql(dialect));
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Resolution error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn cmd_init(mut settings: Settings, database: Option<String>) -> ExitCode {
    if let Some(database) = database {
        settings.persistence.database = database;
    }
    match Store::from_settings(&settings) {
        Ok(_) => {
            println!("OK: schema ready in {}", settings.persistence.database);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
