use hazard_sweeper as hs;
use wasm_bindgen::prelude::*;

/// Plays a full episode. `hazards` is row-major, non-zero marking a hazard.
/// Returns the serialized episode report.
#[wasm_bindgen]
pub fn play(size: u8, hazards: Vec<u8>, strategy: &str) -> Result<Vec<u8>, String> {
    console_error_panic_hook::set_once();

    let strategy: hs::Strategy = strategy.parse().map_err(|e: hs::StrategyParseError| e.to_string())?;
    let layout = hs::Layout::new(size as usize, hazards.into_iter().map(|h| h != 0).collect())
        .map_err(|e| e.to_string())?;

    let mut agent =
        hs::Agent::new(layout, hs::EpisodeConfig::new(strategy)).map_err(|e| e.to_string())?;
    agent.run().map_err(|e| e.to_string())?;
    agent.report().serialize().map_err(|e| e.to_string())
}

/// 0 = won, 1 = lost, 2 = stuck, 255 = still running.
#[wasm_bindgen]
pub fn outcome(bts: Vec<u8>) -> Result<u8, String> {
    console_error_panic_hook::set_once();

    let report = hs::EpisodeReport::deserialize(&bts).map_err(|e| e.to_string())?;
    Ok(match report.outcome {
        Some(hs::Outcome::Won) => 0,
        Some(hs::Outcome::Lost) => 1,
        Some(hs::Outcome::Stuck) => 2,
        None => 255,
    })
}

/// -1 = unknown, 0..=8 = revealed hint, 9 = flagged hazard.
#[wasm_bindgen]
pub fn get_cells(bts: Vec<u8>) -> Result<Vec<i8>, String> {
    console_error_panic_hook::set_once();

    let report = hs::EpisodeReport::deserialize(&bts).map_err(|e| e.to_string())?;
    Ok(report
        .cells
        .into_iter()
        .map(|cell| match cell {
            hs::CellState::Unknown => -1,
            hs::CellState::Revealed(n) => n as i8,
            hs::CellState::FlaggedHazard => 9,
        })
        .collect())
}
