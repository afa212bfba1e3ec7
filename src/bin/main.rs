//! cubequery CLI - translate between permalinks, data requests and pivots
//!
//! Usage:
//!   cubequery request --schema <schema.json> --permalink <query string>
//!   cubequery permalink --schema <schema.json> --request <query string> [--cube <name>]
//!   cubequery validate --schema <schema.json> --permalink <query string>
//!   cubequery pivot --data <rows.json> --col <field> --row <field> --value <field>
//!   cubequery catalog --schema <schema.json> [--locale <locale>] [--search <text>]
//!
//! Examples:
//!   cubequery request --schema trade.json --permalink 'cube=trade&measures=Value&drilldowns=[Time].[Year]'
//!   cubequery pivot --data rows.json --col Year --row Country --value Value --aggregation max

use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use cubequery::catalog::CatalogIndex;
use cubequery::codec::{
    parse_permalink, search_pairs, serialize_permalink, to_request_with, FlatRequest,
};
use cubequery::config::Settings;
use cubequery::model::QueryItem;
use cubequery::pivot::{Aggregation, PivotOutcome, PivotRunner, PivotSpec, Record};
use cubequery::schema::{Cube, StaticSchema};
use cubequery::validation::validate;
use tracing::{debug, warn};

#[derive(Parser)]
#[command(name = "cubequery")]
#[command(about = "cubequery - OLAP query parameters, permalinks and pivots")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Turn a permalink into a data-server request
    Request {
        /// Path to the schema JSON document
        #[arg(short, long)]
        schema: PathBuf,

        /// Permalink query string
        #[arg(short, long)]
        permalink: String,
    },

    /// Turn a data-server request into a permalink
    Permalink {
        /// Path to the schema JSON document
        #[arg(short, long)]
        schema: PathBuf,

        /// Request query string
        #[arg(short, long)]
        request: String,

        /// Cube to resolve against (defaults to the request's cube)
        #[arg(short, long)]
        cube: Option<String>,
    },

    /// Check whether a permalink describes an executable query
    Validate {
        /// Path to the schema JSON document
        #[arg(short, long)]
        schema: PathBuf,

        /// Permalink query string
        #[arg(short, long)]
        permalink: String,
    },

    /// Cross-tabulate a JSON array of result rows
    Pivot {
        /// Path to the rows JSON document
        #[arg(short, long)]
        data: PathBuf,

        /// Field spread across columns
        #[arg(long)]
        col: String,

        /// Field spread across rows
        #[arg(long)]
        row: String,

        /// Field aggregated into cells
        #[arg(long)]
        value: String,

        /// Aggregation for repeated pairs (defaults to the configured one)
        #[arg(short, long)]
        aggregation: Option<Aggregation>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        output: OutputFormat,
    },

    /// List or search the cube catalog
    Catalog {
        /// Path to the schema JSON document
        #[arg(short, long)]
        schema: PathBuf,

        /// Locale for annotation lookup (defaults to the configured one)
        #[arg(short, long)]
        locale: Option<String>,

        /// Only show tables matching this text
        #[arg(long)]
        search: Option<String>,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Tab-separated rows
    Text,
    /// The matrix as JSON
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => return fail(format!("Error loading settings: {}", e)),
    };
    init_tracing(&settings);

    match cli.command {
        Commands::Request { schema, permalink } => cmd_request(&settings, &schema, &permalink),
        Commands::Permalink {
            schema,
            request,
            cube,
        } => cmd_permalink(&schema, &request, cube),
        Commands::Validate { schema, permalink } => cmd_validate(&schema, &permalink),
        Commands::Pivot {
            data,
            col,
            row,
            value,
            aggregation,
            output,
        } => cmd_pivot(&settings, &data, col, row, value, aggregation, output),
        Commands::Catalog {
            schema,
            locale,
            search,
        } => cmd_catalog(&settings, &schema, locale, search),
    }
}

fn init_tracing(settings: &Settings) {
    let directive = settings
        .logging
        .resolved_filter()
        .unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn fail(message: impl Display) -> ExitCode {
    eprintln!("{}", message);
    ExitCode::FAILURE
}

fn load_schema(path: &Path) -> Result<StaticSchema, ExitCode> {
    StaticSchema::from_json_file(path)
        .map_err(|e| fail(format!("Error reading schema '{}': {}", path.display(), e)))
}

/// Find the cube named by a query string's `cube` field.
fn cube_for<'a>(
    schema: &'a StaticSchema,
    query: &str,
    cube: Option<String>,
) -> Result<&'a Cube, ExitCode> {
    let name = cube
        .or_else(|| {
            search_pairs(query)
                .into_iter()
                .find(|(key, _)| key == "cube")
                .map(|(_, value)| value)
        })
        .ok_or_else(|| fail("Query does not name a cube; pass --cube"))?;

    schema
        .schema()
        .cube(&name)
        .ok_or_else(|| fail(format!("Cube '{}' not found in schema", name)))
}

fn cmd_request(settings: &Settings, schema: &Path, permalink: &str) -> ExitCode {
    let schema = match load_schema(schema) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let cube = match cube_for(&schema, permalink, None) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let mut item = match parse_permalink(cube, permalink) {
        Ok(item) => item,
        Err(e) => return fail(format!("Invalid permalink: {}", e)),
    };
    item.params.apply_defaults(&settings.query);

    if let Err(issue) = validate(&item.params) {
        warn!(issue = issue.id(), "query is not executable: {}", issue);
    }

    println!("{}", to_request_with(&item.params, &settings.query).to_query_string());
    ExitCode::SUCCESS
}

fn cmd_permalink(schema: &Path, request: &str, cube: Option<String>) -> ExitCode {
    let schema = match load_schema(schema) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let cube = match cube_for(&schema, request, cube) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let mut flat = FlatRequest::from_query_string(request);
    if flat.cube.is_empty() {
        flat.cube = cube.name.clone();
    }
    let params = match cubequery::codec::from_request(cube, &flat) {
        Ok(params) => params,
        Err(e) => return fail(format!("Invalid request: {}", e)),
    };

    println!(
        "{}",
        serialize_permalink(&QueryItem {
            params,
            ..Default::default()
        })
    );
    ExitCode::SUCCESS
}

fn cmd_validate(schema: &Path, permalink: &str) -> ExitCode {
    let schema = match load_schema(schema) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let cube = match cube_for(&schema, permalink, None) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let item = match parse_permalink(cube, permalink) {
        Ok(item) => item,
        Err(e) => return fail(format!("Invalid permalink: {}", e)),
    };

    match validate(&item.params) {
        Ok(()) => {
            println!("✓ Query is executable");
            ExitCode::SUCCESS
        }
        Err(issue) => {
            eprintln!("✗ {} ({})", issue, issue.id());
            ExitCode::FAILURE
        }
    }
}

fn cmd_pivot(
    settings: &Settings,
    data: &Path,
    col: String,
    row: String,
    value: String,
    aggregation: Option<Aggregation>,
    output: OutputFormat,
) -> ExitCode {
    let content = match fs::read_to_string(data) {
        Ok(s) => s,
        Err(e) => return fail(format!("Error reading file '{}': {}", data.display(), e)),
    };
    let records: Vec<Record> = match serde_json::from_str(&content) {
        Ok(records) => records,
        Err(e) => return fail(format!("Expected a JSON array of objects: {}", e)),
    };

    let aggregation = match aggregation.map(Ok).unwrap_or_else(|| settings.pivot.aggregation()) {
        Ok(agg) => agg,
        Err(e) => return fail(e),
    };
    let spec = match PivotSpec::new(col, row, value) {
        Ok(spec) => spec.with_aggregation(aggregation),
        Err(e) => return fail(e),
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => return fail(format!("Failed to start runtime: {}", e)),
    };
    debug!(rows = records.len(), %aggregation, "pivoting");
    let outcome = runtime.block_on(async {
        let runner = PivotRunner::new();
        runner.submit(Arc::new(records), spec).await
    });

    let matrix = match outcome {
        Ok(PivotOutcome::Current(matrix)) => matrix,
        Ok(PivotOutcome::Superseded) => return fail("Pivot was superseded"),
        Err(e) => return fail(e),
    };

    match output {
        OutputFormat::Text => {
            for row in matrix.to_text_rows() {
                println!("{}", row.join("\t"));
            }
        }
        OutputFormat::Json => match serde_json::to_string_pretty(&matrix) {
            Ok(json) => println!("{}", json),
            Err(e) => return fail(e),
        },
    }
    ExitCode::SUCCESS
}

fn cmd_catalog(
    settings: &Settings,
    schema: &Path,
    locale: Option<String>,
    search: Option<String>,
) -> ExitCode {
    let schema = match load_schema(schema) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let locale = locale.unwrap_or_else(|| settings.query.default_locale.clone());
    let index = CatalogIndex::build(&schema.schema().cubes, Some(&locale), &settings.catalog);

    if let Some(needle) = search {
        let groups = index.search(&needle);
        if groups.is_empty() {
            println!("No tables match '{}'.", needle);
        }
        for (group, tables) in groups {
            println!("{}:", group);
            for table in tables {
                println!("  - {} ({})", table.label, table.cube);
            }
        }
        return ExitCode::SUCCESS;
    }

    for topic in index.topics() {
        println!("{}", topic);
        for subtopic in index.subtopics(topic) {
            println!("  {}", subtopic);
            for table in index.tables(topic, subtopic) {
                println!("    - {} ({})", table.label, table.cube);
            }
        }
    }
    ExitCode::SUCCESS
}
