use comfy_table::{presets::ASCII_BORDERS_ONLY_CONDENSED, Attribute, Cell, ContentArrangement, Table};

/// Create a table with the standard CLI styling (outer borders, no wrapping)
pub fn styled_table() -> Table {
    let mut table = Table::new();
    table.load_preset(ASCII_BORDERS_ONLY_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Disabled);
    table
}

/// Create a header cell with bold styling
pub fn header(text: &str) -> Cell {
    Cell::new(text).add_attribute(Attribute::Bold)
}
