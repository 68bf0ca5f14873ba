use std::path::Path;

use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use omop_map::MapSummary;
use omop_model::RunReport;

pub fn print_link_summary(report: &RunReport, output_dir: &Path) {
    println!("Output: {}", output_dir.display());
    println!("Persons: {}", report.person_count);
    println!("Visit occurrences: {}", report.visit_count);

    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Table"),
        header_cell("Files"),
        header_cell("Records"),
        header_cell("Linked visits"),
        header_cell("Output"),
    ]);
    apply_summary_table_style(&mut table);
    for index in 1..=3 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    align_column(&mut table, 4, CellAlignment::Center);

    for summary in &report.tables {
        table.add_row(vec![
            Cell::new(summary.table)
                .fg(Color::Blue)
                .add_attribute(Attribute::Bold),
            Cell::new(summary.source_files),
            Cell::new(summary.records),
            count_cell(summary.linked_visits, Color::Green),
            output_cell(summary.output.as_deref()),
        ]);
    }
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        dim_cell("-"),
        Cell::new(report.total_records()).add_attribute(Attribute::Bold),
        dim_cell("-"),
        dim_cell("-"),
    ]);
    println!("{table}");
    print_unresolved_table(report);

    if !report.skipped_inputs.is_empty() {
        eprintln!("Skipped inputs:");
        for skipped in &report.skipped_inputs {
            eprintln!("- {} ({})", skipped.path.display(), skipped.reason);
        }
    }
}

fn print_unresolved_table(report: &RunReport) {
    if report.unresolved_concepts.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Table"),
        header_cell("Column"),
        header_cell("Concept id"),
        header_cell("Rows"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 3, CellAlignment::Right);
    for concept in &report.unresolved_concepts {
        table.add_row(vec![
            Cell::new(concept.table),
            Cell::new(&concept.column),
            Cell::new(&concept.value).fg(Color::Yellow),
            count_cell(concept.count, Color::Yellow),
        ]);
    }
    println!();
    println!("Unresolved concepts (replaced with 0):");
    println!("{table}");
}

pub fn print_map_summary(summaries: &[MapSummary], output_dir: &Path) {
    println!("Output: {}", output_dir.display());
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Instrument"),
        header_cell("Table"),
        header_cell("Rows"),
        header_cell("Facts"),
        header_cell("Skipped"),
    ]);
    apply_summary_table_style(&mut table);
    for index in 2..=4 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    for summary in summaries {
        table.add_row(vec![
            Cell::new(&summary.instrument)
                .fg(Color::Blue)
                .add_attribute(Attribute::Bold),
            Cell::new(summary.table),
            Cell::new(summary.input_rows),
            Cell::new(summary.facts),
            count_cell(summary.skipped, Color::Yellow),
        ]);
    }
    println!("{table}");
}

fn output_cell(path: Option<&Path>) -> Cell {
    match path {
        Some(_) => Cell::new("✓")
            .fg(Color::Green)
            .add_attribute(Attribute::Bold),
        None => dim_cell("-"),
    }
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
