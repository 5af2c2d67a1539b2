pub mod canvas;
pub mod client;
pub mod config;
pub mod forms;
pub mod hierarchy;
pub mod ir;
pub mod layout;
pub mod measure;
pub mod model;
pub mod navigation;
pub mod projector;
pub mod search;
pub mod selection;
pub mod shell;
pub mod svg;
pub mod view;

use std::collections::{HashMap, HashSet};

use wasm_bindgen::prelude::*;

use ir::GraphIR;
use layout::LayoutEngine;
use model::{Relationship, Table};
use projector::Projector;
use svg::{Frame, SvgRenderer};

/// Panic hook and console logging for the browser build.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(target_arch = "wasm32")]
    {
        console_error_panic_hook::set_once();
        tracing_wasm::set_as_global_default();
    }
}

/// Project a relationship list onto a graph.
///
/// `tables_json` is the table catalog used to label nodes; tables missing
/// from it become placeholder cards.
#[wasm_bindgen(js_name = "projectRelationships")]
pub fn project_relationships(relationships_json: &str, tables_json: &str) -> Result<String, String> {
    let relationships: Vec<Relationship> =
        serde_json::from_str(relationships_json).map_err(|e| e.to_string())?;
    let tables: Vec<Table> = serde_json::from_str(tables_json).map_err(|e| e.to_string())?;
    let catalog: HashMap<_, _> = tables.into_iter().map(|t| (t.id.clone(), t)).collect();

    let graph = futures::executor::block_on(Projector::default().project(&relationships, &catalog));
    serde_json::to_string(&graph).map_err(|e| e.to_string())
}

/// Render a projected graph to a standalone SVG document.
#[wasm_bindgen(js_name = "graphToSvg")]
pub fn graph_to_svg(graph_json: &str, darkmode: bool) -> Result<String, String> {
    let graph: GraphIR = serde_json::from_str(graph_json).map_err(|e| e.to_string())?;
    let layout = LayoutEngine::default().layout(&graph, &HashSet::new());
    let frame = Frame::around(&layout, canvas::EXPORT_MARGIN);
    Ok(SvgRenderer::new(darkmode).render(&graph, &layout, &frame))
}
