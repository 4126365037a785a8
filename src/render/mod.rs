//! Hand-off from a placed view to an output file.
//!
//! Rasterising is left to an external [`Renderer`]; the built-in
//! [`JsonSceneRenderer`] writes the scene itself so any drawing tool can
//! pick it up.

pub mod scene;

pub use scene::{EdgeStyle, LegendEntry, NodeRole, RenderScene, SceneEdge, SceneNode, SceneRequest};

use std::fs;
use std::path::Path;

use crate::error::{CmdbMapError, Result};
use crate::layout::LayoutAlgorithm;

/// Paints a scene to a file.
pub trait Renderer {
    /// File extension, without the dot.
    fn extension(&self) -> &str;

    fn render(&self, scene: &RenderScene, path: &Path) -> Result<()>;
}

/// Writes the scene as pretty-printed JSON.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonSceneRenderer;

impl Renderer for JsonSceneRenderer {
    fn extension(&self) -> &str {
        "json"
    }

    fn render(&self, scene: &RenderScene, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(scene)?;
        fs::write(path, content)
            .map_err(|e| CmdbMapError::Render(format!("{}: {}", path.display(), e)))?;
        log::debug!("Scene written to {}", path.display());
        Ok(())
    }
}

/// Output file name for a view.
///
/// Path views are `<source>_to_<target>_paths` (or `_shortest_path`),
/// single-table views are `<source>`. Batch runs add `_<layout>`.
pub fn output_file_name(
    source: &str,
    target: Option<&str>,
    shortest_only: bool,
    layout: Option<LayoutAlgorithm>,
    extension: &str,
) -> String {
    let mut stem = match target {
        Some(target) if shortest_only => format!("{}_to_{}_shortest_path", source, target),
        Some(target) => format!("{}_to_{}_paths", source, target),
        None => source.to_string(),
    };
    if let Some(layout) = layout {
        stem.push('_');
        stem.push_str(layout.id());
    }
    format!("{}.{}", stem, extension)
}
