use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color as TableColor, ContentArrangement, Table};

/// Table and cell creation helpers
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn create_cyan_header(labels: &[&str]) -> Vec<Cell> {
    labels
        .iter()
        .map(|label| Cell::new(*label).fg(TableColor::Cyan))
        .collect()
}

pub fn color_coded_coverage_cell(percent: f64) -> Cell {
    let text = format!("{percent:.1}%");
    if percent >= 80.0 {
        Cell::new(text).fg(TableColor::Green)
    } else if percent >= 50.0 {
        Cell::new(text).fg(TableColor::Yellow)
    } else {
        Cell::new(text).fg(TableColor::Red)
    }
}

pub fn delay_cell(seconds: Option<f64>) -> Cell {
    match seconds {
        Some(secs) if secs >= 60.0 => Cell::new(format!("{:.1}min", secs / 60.0)),
        Some(secs) => Cell::new(format!("{secs:.1}s")),
        None => Cell::new("N/A").fg(TableColor::DarkGrey),
    }
}
