use anyhow::Result;
use clap::Parser;
use cmdb_map::graph::GraphStats;
use cmdb_map::{Config, Session};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "stats")]
#[command(about = "Print statistics for the assembled CMDB table graph")]
struct Args {
    /// Directory holding the exported JSON files
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Number of sample relationships to print
    #[arg(short, long, default_value_t = 10)]
    limit: usize,

    /// Also list the relationships of this table
    #[arg(short, long)]
    table: Option<String>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut config = Config::load()?;
    if let Some(dir) = &args.data_dir {
        config = config.with_data_dir(dir.clone());
    }

    let session = Session::open(config)?;
    let graph = session.graph();
    let summary = session.summary();
    let stats = GraphStats::compute(graph);

    println!("\n=== CMDB Table Graph Statistics ===\n");
    println!("{:-<60}", "");
    println!("{:<32} {:>12}", "Nodes (tables)", stats.nodes);
    println!("{:<32} {:>12}", "  bare relationship endpoints", summary.bare_nodes);
    println!("{:<32} {:>12}", "Edges", stats.edges);
    println!("{:<32} {:>12}", "  relationship", stats.relationship_edges);
    println!("{:<32} {:>12}", "  hierarchy", stats.hierarchy_edges);
    println!("{:<32} {:>12}", "Duplicate relationships skipped", summary.duplicate_relationships);
    println!("{:<32} {:>12}", "Unresolved parents", summary.unresolved_parents);
    println!("{:<32} {:>12}", "Weakly connected components", stats.components);
    println!("{:<32} {:>12.6}", "Density", stats.density);
    println!("{:<32} {:>12.2}", "Average degree", stats.average_degree);
    println!("{:-<60}", "");

    if !stats.top_central_nodes.is_empty() {
        println!("\nMost connected tables:\n");
        println!("{:<40} {:>12}", "Table", "Centrality");
        println!("{:-<60}", "");
        for (table, centrality) in &stats.top_central_nodes {
            println!("{:<40} {:>12.4}", table, centrality);
        }
        println!("{:-<60}", "");
    }

    println!("\nSample relationships (first {}):", args.limit);
    println!("{:-<80}", "");
    for (source, target, edge) in graph.edges().take(args.limit) {
        println!("{} --[{}]--> {}", source, edge.label, target);
        println!(
            "  Relationship: {} (from {})",
            edge.rel_type.as_deref().unwrap_or(edge.kind.as_str()),
            edge.source_file
        );
        println!();
    }

    if let Some(table) = &args.table {
        let relationships = graph.relationships_of(table)?;
        let labels = session.labels();

        println!("Relationships for {} ({}):", table, labels.display_label(table, 50));
        println!("  Inheritance: {}", graph.inheritance_chain(table).join(" → "));
        println!("{:-<80}", "");
        println!("Incoming ({}):", relationships.incoming.len());
        for entry in &relationships.incoming {
            println!("  {} --[{}]--> {}  ({})", entry.peer, entry.label, table, entry.kind.as_str());
        }
        println!("Outgoing ({}):", relationships.outgoing.len());
        for entry in &relationships.outgoing {
            println!("  {} --[{}]--> {}  ({})", table, entry.label, entry.peer, entry.kind.as_str());
        }
        println!();
    }

    Ok(())
}
