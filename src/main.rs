use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};
use cmdb_map::layout::LayoutAlgorithm;
use cmdb_map::{Config, ExportFormat, LayoutPlan, Session};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "cmdb-map")]
#[command(about = "Create paths between ServiceNow CMDB tables")]
#[command(group(
    ArgGroup::new("mode")
        .required(true)
        .args(["source", "export_format", "all_tables"])
))]
struct Args {
    /// Source table name (e.g., cmdb_ci_zone)
    #[arg(long = "generate-single-table-graph", value_name = "SOURCE")]
    source: Option<String>,

    /// Target table name (e.g., cmdb_ci_server). Without it, the source
    /// table's relationship neighbourhood is rendered.
    #[arg(long = "target-table", value_name = "TARGET", requires = "source")]
    target: Option<String>,

    /// Show only the shortest path (default: show all paths)
    #[arg(long, requires = "target")]
    shortest_path: bool,

    /// Maximum number of paths to report
    #[arg(long)]
    max_paths: Option<usize>,

    /// Export the whole graph (json, graphml, gml, gexf)
    #[arg(long, value_name = "FORMAT")]
    export_format: Option<String>,

    /// Render a single-table graph for every table with enough relationships
    #[arg(long)]
    all_tables: bool,

    /// Minimum relationships (in + out) for --all-tables
    #[arg(long, requires = "all_tables")]
    min_relationships: Option<usize>,

    /// Render only the N most connected tables with --all-tables
    #[arg(long, requires = "all_tables")]
    max_tables: Option<usize>,

    /// Directory holding the exported JSON files
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Layout algorithm (layered, circular)
    #[arg(long)]
    layout: Option<String>,

    /// Render one graph per layout algorithm
    #[arg(long, conflicts_with = "layout")]
    all_layouts: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load()?;

    // Initialize logger from RUST_LOG or the configured level
    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", config.logging.level.as_str())
    ).init();

    if let Some(dir) = &args.data_dir {
        config = config.with_data_dir(dir.clone());
    }
    if let Some(max_paths) = args.max_paths {
        config.paths.max_paths = max_paths;
    }
    if let Some(layout) = &args.layout {
        config.layout.algorithm = layout.parse::<LayoutAlgorithm>()?;
    }
    if let Some(min) = args.min_relationships {
        config.tables.min_relationships = min;
    }
    if args.max_tables.is_some() {
        config.tables.max_tables = args.max_tables;
    }
    config.validate()?;

    let export_format = args
        .export_format
        .as_deref()
        .map(str::parse::<ExportFormat>)
        .transpose()?;

    let plan = if args.all_layouts {
        LayoutPlan::All
    } else {
        LayoutPlan::Single(config.layout.algorithm)
    };
    let started = chrono::Local::now();
    let run_dir = config.run_dir(started);
    let output_dir = config.run_output_dir(started);
    let table_dir = config.table_output_dir(started);

    let session = Session::open(config)
        .context("Failed to build graph")?;

    if let Some(format) = export_format {
        let path = session.export(format, &run_dir)?;
        println!("Graph exported to {}", path.display());
        return Ok(());
    }

    if args.all_tables {
        let batch = session.render_all_tables(&table_dir, plan)?;
        println!("\n{}", batch.summary());
        if batch.succeeded() > 0 {
            println!("\nGraphs saved to: {}/", table_dir.display());
        }
        return Ok(());
    }

    let source = args.source.as_deref().context("No source table given")?;
    let outcome = match &args.target {
        Some(target) => {
            let report = session.discover(source, target, args.shortest_path)?;
            if report.is_empty() {
                println!("{}", report.no_path_message());
                return Ok(());
            }
            for line in &report.lines {
                println!("{}", line);
            }
            session.render_paths(&report, &output_dir, plan)?
        }
        None => session.render_centered(source, &output_dir, plan)?,
    };

    if args.all_layouts {
        println!("{}", outcome.summary());
    }
    if outcome.succeeded() == 0 {
        anyhow::bail!("No graph could be rendered for '{}'", source);
    }

    println!("\nGraph saved to: {}/", output_dir.display());

    Ok(())
}
