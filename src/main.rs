//! Demo der Kugelgeometrie-Engine.
//!
//! Baut zwei Großkreise aus Screen-Punkten, schneidet sie, zieht einen Punkt
//! und gibt die dabei neu berechneten Zustände als JSON aus.

use glam::DVec3;
use spherical_construction::{
    move_object, project_screen_point, AppState, EngineOptions, NodeId, NodeSnapshot,
    SphereVector,
};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    log::info!(
        "Spherical Construction Demo v{} startet...",
        env!("CARGO_PKG_VERSION")
    );

    let options = EngineOptions::load_from_file(&EngineOptions::config_path());
    let radius = options.sphere_radius_px;
    let mut state = AppState::new(options);

    let screen = [(71.0, 97.0), (147.0, 181.0), (71.0, 136.0), (179.0, 53.0)];
    let points = screen
        .iter()
        .map(|&(x, y)| state.graph.create_point(project_screen_point(x, y, radius)))
        .collect::<anyhow::Result<Vec<NodeId>>>()?;

    let first = state.graph.create_line(points[0], points[1])?;
    let second = state.graph.create_line(points[2], points[3])?;
    let crossings = state.graph.create_intersection_points(first, second)?;
    for id in &crossings {
        if let Some(location) = state.graph.location(*id) {
            log::info!("Schnittpunkt {id}: {location:.4?}");
        }
    }

    let dragged = points[0];
    let previous = state.graph.location(dragged).unwrap_or(DVec3::Z);
    let current = previous.rotate_about(DVec3::Y, 0.1);
    state.record_undo_snapshot();
    let snapshots: Vec<NodeSnapshot> = move_object(&mut state, dragged, previous, current)?;

    println!("{}", serde_json::to_string_pretty(&snapshots)?);
    Ok(())
}
