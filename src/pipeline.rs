//! One run: load records, assemble the graph, discover paths, render views,
//! export the whole graph.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::{CmdbMapError, Result};
use crate::export::{export_graph, ExportFormat};
use crate::graph::{
    assemble_with_summary, find_paths, neighborhood, AssemblySummary, CmdbGraph, DiscoveredPath,
    PathQuery, SubGraph,
};
use crate::labels::LabelResolver;
use crate::layout::{normalize, LayoutAlgorithm, LayoutRegistry, NormalizeWarning, Positions};
use crate::records::{load_store, RecordStore};
use crate::render::{output_file_name, JsonSceneRenderer, RenderScene, Renderer, SceneRequest};

/// Ring depth of single-table views.
pub const CENTERED_DEPTH: usize = 2;

/// Which layouts to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutPlan {
    /// One file, falling back through the preference order.
    Single(LayoutAlgorithm),
    /// One file per algorithm, each on its own.
    All,
}

/// Paths found for one query, with their console lines.
#[derive(Debug, Clone)]
pub struct PathReport {
    pub source: String,
    pub target: String,
    pub shortest_only: bool,
    pub paths: Vec<DiscoveredPath>,
    /// `Path n: a → b → …`, in discovery order.
    pub lines: Vec<String>,
}

impl PathReport {
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Informational line for an empty report.
    pub fn no_path_message(&self) -> String {
        format!("No paths found between '{}' and '{}'", self.source, self.target)
    }
}

/// Files written by one render call.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub written: Vec<PathBuf>,
    pub failures: Vec<(LayoutAlgorithm, String)>,
}

impl BatchOutcome {
    pub fn attempted(&self) -> usize {
        self.written.len() + self.failures.len()
    }

    pub fn succeeded(&self) -> usize {
        self.written.len()
    }

    /// e.g. `1/2 layouts succeeded`
    pub fn summary(&self) -> String {
        format!("{}/{} layouts succeeded", self.succeeded(), self.attempted())
    }
}

/// Outcome of rendering one single-table view per selected table.
#[derive(Debug, Clone, Default)]
pub struct TableBatch {
    /// Selected tables with their edge counts, in render order.
    pub selected: Vec<(String, usize)>,
    pub rendered: Vec<(String, BatchOutcome)>,
    pub failures: Vec<(String, String)>,
}

impl TableBatch {
    /// Tables with at least one file written.
    pub fn succeeded(&self) -> usize {
        self.rendered.iter().filter(|(_, o)| o.succeeded() > 0).count()
    }

    /// e.g. `Completed: 3/4 graphs generated successfully`
    pub fn summary(&self) -> String {
        format!(
            "Completed: {}/{} graphs generated successfully",
            self.succeeded(),
            self.selected.len()
        )
    }
}

/// A loaded and assembled data set plus the collaborators that draw it.
pub struct Session {
    config: Config,
    store: RecordStore,
    graph: CmdbGraph,
    summary: AssemblySummary,
    layouts: LayoutRegistry,
    renderer: Box<dyn Renderer>,
}

impl Session {
    /// Load the records under `config.data_dir` and assemble the graph.
    pub fn open(config: Config) -> Result<Self> {
        let store = load_store(config.data_dir())?;
        Ok(Self::from_store(config, store))
    }

    pub fn from_store(config: Config, store: RecordStore) -> Self {
        let (graph, summary) = assemble_with_summary(&store);
        Self {
            config,
            store,
            graph,
            summary,
            layouts: LayoutRegistry::new(),
            renderer: Box::new(JsonSceneRenderer),
        }
    }

    /// Replace the scene renderer.
    pub fn with_renderer(mut self, renderer: Box<dyn Renderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn graph(&self) -> &CmdbGraph {
        &self.graph
    }

    pub fn summary(&self) -> &AssemblySummary {
        &self.summary
    }

    pub fn labels(&self) -> LabelResolver<'_> {
        LabelResolver::new(&self.store)
    }

    /// Find paths from `source` to `target` using the configured bounds.
    pub fn discover(&self, source: &str, target: &str, shortest_only: bool) -> Result<PathReport> {
        let query = PathQuery {
            max_paths: self.config.paths.max_paths,
            shortest_only,
            max_path_length: self.config.paths.max_path_length,
        };
        let paths = find_paths(&self.graph, source, target, &query)?;

        let labels = self.labels();
        let lines = paths
            .iter()
            .enumerate()
            .map(|(i, p)| labels.path_line(i + 1, &p.nodes, self.config.labels.path_max_length))
            .collect();

        log::info!("Found {} path(s) from '{}' to '{}'", paths.len(), source, target);

        Ok(PathReport {
            source: source.to_string(),
            target: target.to_string(),
            shortest_only,
            paths,
            lines,
        })
    }

    /// Render the view of a non-empty path report into `output_dir`.
    pub fn render_paths(&self, report: &PathReport, output_dir: &Path, plan: LayoutPlan) -> Result<BatchOutcome> {
        if report.is_empty() {
            return Err(CmdbMapError::InvalidInput(format!(
                "no paths between '{}' and '{}' to render",
                report.source, report.target
            )));
        }
        let view = SubGraph::from_paths(&self.graph, &report.source, &report.target, &report.paths);
        self.render_view(&view, Some(report.target.as_str()), report.shortest_only, output_dir, plan)
    }

    /// Render the single-table view of `table` into `output_dir`.
    pub fn render_centered(&self, table: &str, output_dir: &Path, plan: LayoutPlan) -> Result<BatchOutcome> {
        let view = neighborhood::centered_graph(&self.graph, table, CENTERED_DEPTH)?;
        self.render_view(&view, None, false, output_dir, plan)
    }

    /// Tables with at least `min_relationships` edges (in + out), most
    /// connected first, ties by name, capped at `max_tables`.
    pub fn table_candidates(&self, min_relationships: usize, max_tables: Option<usize>) -> Vec<(String, usize)> {
        let mut tables: Vec<(String, usize)> = self
            .graph
            .nodes()
            .filter_map(|node| {
                let ix = self.graph.node_index(&node.name)?;
                let degree = self.graph.degree(ix);
                (degree >= min_relationships).then(|| (node.name.clone(), degree))
            })
            .collect();
        tables.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        if let Some(max) = max_tables {
            tables.truncate(max);
        }
        tables
    }

    /// Render the single-table view of every table selected by the
    /// `[tables]` config into `output_dir`. A failing table is recorded
    /// and the batch moves on.
    pub fn render_all_tables(&self, output_dir: &Path, plan: LayoutPlan) -> Result<TableBatch> {
        let selected = self.table_candidates(
            self.config.tables.min_relationships,
            self.config.tables.max_tables,
        );
        log::info!(
            "Generating individual graphs for {} tables into {}",
            selected.len(),
            output_dir.display()
        );

        let labels = self.labels();
        let mut batch = TableBatch::default();
        for (i, (table, degree)) in selected.iter().enumerate() {
            log::info!(
                "{:3}/{}: {} ({} relationships)",
                i + 1,
                selected.len(),
                labels.display_label(table, 40),
                degree
            );
            match self.render_centered(table, output_dir, plan) {
                Ok(outcome) => batch.rendered.push((table.clone(), outcome)),
                Err(e) => {
                    log::warn!("Graph for '{}' failed: {}", table, e);
                    batch.failures.push((table.clone(), e.to_string()));
                }
            }
        }
        batch.selected = selected;

        log::info!("{}", batch.summary());
        Ok(batch)
    }

    /// Export the whole graph to `<dir>/cmdb_graph.<format>`.
    pub fn export(&self, format: ExportFormat, dir: &Path) -> Result<PathBuf> {
        export_graph(&self.graph, format, dir)
    }

    fn render_view(
        &self,
        view: &SubGraph,
        target: Option<&str>,
        shortest_only: bool,
        output_dir: &Path,
        plan: LayoutPlan,
    ) -> Result<BatchOutcome> {
        fs::create_dir_all(output_dir)?;
        let mut outcome = BatchOutcome::default();

        match plan {
            LayoutPlan::Single(requested) => {
                let (positions, used) = self.layouts.layout_with_fallback(view, requested)?;
                let file = output_dir.join(output_file_name(
                    &view.root,
                    target,
                    shortest_only,
                    None,
                    self.renderer.extension(),
                ));
                self.draw(view, target, shortest_only, &positions, used, &file)?;
                outcome.written.push(file);
            }
            LayoutPlan::All => {
                for algorithm in LayoutAlgorithm::ALL {
                    let file = output_dir.join(output_file_name(
                        &view.root,
                        target,
                        shortest_only,
                        Some(algorithm),
                        self.renderer.extension(),
                    ));
                    let drawn = self
                        .layouts
                        .layout(view, algorithm)
                        .and_then(|positions| {
                            self.draw(view, target, shortest_only, &positions, algorithm, &file)
                        });
                    match drawn {
                        Ok(()) => outcome.written.push(file),
                        Err(e) => {
                            log::warn!("Layout '{}' failed: {}", algorithm, e);
                            outcome.failures.push((algorithm, e.to_string()));
                        }
                    }
                }
                log::info!("{}", outcome.summary());
            }
        }

        Ok(outcome)
    }

    fn draw(
        &self,
        view: &SubGraph,
        target: Option<&str>,
        shortest_only: bool,
        positions: &Positions,
        layout: LayoutAlgorithm,
        file: &Path,
    ) -> Result<()> {
        let placed = normalize(positions, &view.root, self.config.layout.root_inset);
        if let Some(NormalizeWarning::RootMissing(root)) = &placed.warning {
            log::warn!("'{}' missing from {} layout, positions not anchored", root, layout);
        }

        let request = SceneRequest {
            source: &view.root,
            target,
            shortest_only,
            layout,
            label_length: self.config.labels.max_length,
        };
        let scene = RenderScene::build(view, &placed, &self.labels(), &request)?;
        self.renderer.render(&scene, file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_datacenter_exports(dir: &Path) {
        fs::write(
            dir.join("sys_db_object.json"),
            r#"{"records": [
                {"name": "zone", "label": "Data Center Zone", "sys_id": "z1"},
                {"name": "rack", "label": "Rack", "sys_id": "r1"},
                {"name": "computer", "label": "Computer", "sys_id": "c1", "super_class": ""},
                {"name": "server", "label": "Server", "sys_id": "s1", "super_class": "c1"}
            ]}"#,
        )
        .unwrap();
        fs::write(
            dir.join("cmdb_rel_type.json"),
            r#"[{"sys_id": "contains", "name": "Contains::Contained by",
                 "parent_descriptor": "Contains", "child_descriptor": "Contained by"}]"#,
        )
        .unwrap();
        fs::write(
            dir.join("cmdb_rel_type_suggest.json"),
            concat!(
                r#"{"base_class": "zone", "dependent_class": "rack", "cmdb_rel_type": "contains"}"#,
                "\n",
                r#"{"base_class": "rack", "dependent_class": "computer", "cmdb_rel_type": "contains"}"#,
                "\n"
            ),
        )
        .unwrap();
    }

    fn open_session(data: &TempDir) -> Session {
        write_datacenter_exports(data.path());
        Session::open(Config::default().with_data_dir(data.path())).unwrap()
    }

    #[test]
    fn test_discover_datacenter_shortest_path() {
        let data = TempDir::new().unwrap();
        let session = open_session(&data);

        let report = session.discover("zone", "server", true).unwrap();
        assert_eq!(report.paths.len(), 1);
        assert_eq!(report.paths[0].nodes, vec!["zone", "rack", "computer", "server"]);
        assert_eq!(report.paths[0].bridge.as_deref(), Some("computer"));
        assert_eq!(
            report.lines,
            vec!["Path 1: Data Center Zone → Rack → Computer → Server".to_string()]
        );
    }

    #[test]
    fn test_discover_unknown_table() {
        let data = TempDir::new().unwrap();
        let session = open_session(&data);

        let err = session.discover("no_such_table", "server", false).unwrap_err();
        assert!(matches!(err, CmdbMapError::NotFound(ref t) if t == "no_such_table"));
    }

    #[test]
    fn test_open_missing_required_file() {
        let data = TempDir::new().unwrap();
        let result = Session::open(Config::default().with_data_dir(data.path()));
        assert!(matches!(result, Err(CmdbMapError::MissingInput(_))));
    }

    #[test]
    fn test_render_paths_single_layout() {
        let data = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let session = open_session(&data);
        let report = session.discover("zone", "server", false).unwrap();

        let graphs = out.path().join("path_graphs");
        let outcome = session
            .render_paths(&report, &graphs, LayoutPlan::Single(LayoutAlgorithm::Layered))
            .unwrap();

        assert_eq!(outcome.summary(), "1/1 layouts succeeded");
        assert_eq!(outcome.written, vec![graphs.join("zone_to_server_paths.json")]);
        let scene: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&outcome.written[0]).unwrap()).unwrap();
        assert_eq!(scene["title"], "CMDB Paths: Data Center Zone → Server");
    }

    #[test]
    fn test_render_paths_all_layouts() {
        let data = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let session = open_session(&data);
        let report = session.discover("zone", "server", true).unwrap();

        let outcome = session.render_paths(&report, out.path(), LayoutPlan::All).unwrap();
        assert_eq!(outcome.summary(), "2/2 layouts succeeded");
        assert!(out.path().join("zone_to_server_shortest_path_layered.json").exists());
        assert!(out.path().join("zone_to_server_shortest_path_circular.json").exists());
    }

    #[test]
    fn test_batch_counts_layout_failures() {
        let data = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let session = open_session(&data);

        // server has no out-edges in its own view, so layered cannot reach
        // the other nodes from it
        let outcome = session.render_centered("server", out.path(), LayoutPlan::All).unwrap();
        assert_eq!(outcome.summary(), "1/2 layouts succeeded");
        assert_eq!(outcome.failures[0].0, LayoutAlgorithm::Layered);
        assert!(out.path().join("server_circular.json").exists());
    }

    #[test]
    fn test_render_centered_falls_back() {
        let data = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let session = open_session(&data);

        let outcome = session
            .render_centered("server", out.path(), LayoutPlan::Single(LayoutAlgorithm::Layered))
            .unwrap();
        let scene: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(out.path().join("server.json")).unwrap()).unwrap();
        assert_eq!(outcome.written.len(), 1);
        assert_eq!(scene["layout"], "circular");
    }

    #[test]
    fn test_render_empty_report_rejected() {
        let data = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let session = open_session(&data);
        let report = session.discover("server", "zone", false).unwrap();

        assert!(report.is_empty());
        assert!(session
            .render_paths(&report, out.path(), LayoutPlan::All)
            .is_err());
    }

    #[test]
    fn test_no_path_report_writes_nothing() {
        let data = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let session = open_session(&data);

        let report = session.discover("server", "zone", false).unwrap();
        assert!(report.is_empty());
        assert_eq!(report.no_path_message(), "No paths found between 'server' and 'zone'");
        assert!(!out.path().join("path_graphs").exists());
    }

    #[test]
    fn test_table_candidates_by_degree() {
        let data = TempDir::new().unwrap();
        let session = open_session(&data);

        let all = session.table_candidates(1, None);
        assert_eq!(
            all,
            vec![
                ("computer".to_string(), 2),
                ("rack".to_string(), 2),
                ("server".to_string(), 1),
                ("zone".to_string(), 1),
            ]
        );
        assert_eq!(session.table_candidates(2, None).len(), 2);
        assert_eq!(session.table_candidates(1, Some(1)), vec![("computer".to_string(), 2)]);
        assert!(session.table_candidates(3, None).is_empty());
    }

    #[test]
    fn test_render_all_tables() {
        let data = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        write_datacenter_exports(data.path());
        let mut config = Config::default().with_data_dir(data.path());
        config.tables.min_relationships = 2;
        let session = Session::open(config).unwrap();

        let dir = out.path().join("table_graphs");
        let batch = session
            .render_all_tables(&dir, LayoutPlan::Single(LayoutAlgorithm::Layered))
            .unwrap();

        assert_eq!(batch.summary(), "Completed: 2/2 graphs generated successfully");
        assert!(batch.failures.is_empty());
        assert!(dir.join("computer.json").exists());
        assert!(dir.join("rack.json").exists());
        assert!(!dir.join("zone.json").exists());
    }

    #[test]
    fn test_all_tables_counts_tables_without_output() {
        let data = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let session = open_session(&data).with_renderer(Box::new(FailingRenderer));

        let batch = session.render_all_tables(out.path(), LayoutPlan::All).unwrap();
        assert_eq!(batch.selected.len(), 4);
        assert_eq!(batch.summary(), "Completed: 0/4 graphs generated successfully");
    }

    #[test]
    fn test_session_export() {
        let data = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let session = open_session(&data);

        let path = session.export(ExportFormat::Json, out.path()).unwrap();
        assert_eq!(path, out.path().join("cmdb_graph.json"));
        let doc: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(doc["nodes"].as_array().unwrap().len(), 4);
        assert_eq!(doc["links"].as_array().unwrap().len(), 3);
    }

    struct FailingRenderer;

    impl Renderer for FailingRenderer {
        fn extension(&self) -> &str {
            "png"
        }

        fn render(&self, _scene: &RenderScene, _path: &Path) -> Result<()> {
            Err(CmdbMapError::Render("rasteriser unavailable".to_string()))
        }
    }

    #[test]
    fn test_render_failure_reported_per_layout() {
        let data = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let session = open_session(&data).with_renderer(Box::new(FailingRenderer));
        let report = session.discover("rack", "server", false).unwrap();

        let outcome = session.render_paths(&report, out.path(), LayoutPlan::All).unwrap();
        assert_eq!(outcome.summary(), "0/2 layouts succeeded");
        assert!(outcome.failures[0].1.contains("rasteriser unavailable"));
    }
}
