use std::path::Path;

use anyhow::Result;
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use polars::prelude::AnyValue;
use sdc_hierarchy::TreeHierarchy;
use sdc_result::{CellStatus, TableResult};
use serde_json::json;

use crate::commands::CompileResult;

pub fn print_compile_summary(result: &CompileResult, print_batch: bool) {
    let job = &result.job;
    println!("Job: {}", job.name());
    println!("Directory: {}", job.directory().display());
    println!("Batch: {}", job.batch_path().display());

    let mut artifacts = Table::new();
    artifacts.set_header(vec![
        header_cell("Kind"),
        header_cell("Subject"),
        header_cell("Path"),
    ]);
    apply_table_style(&mut artifacts);
    for artifact in &result.artifacts {
        artifacts.add_row(vec![
            kind_cell(artifact.kind),
            Cell::new(&artifact.subject),
            path_cell(&artifact.path),
        ]);
    }
    println!("{artifacts}");

    let mut commands = Table::new();
    commands.set_header(vec![
        header_cell("#"),
        header_cell("Command"),
        header_cell("Argument"),
    ]);
    apply_table_style(&mut commands);
    align_column(&mut commands, 0, CellAlignment::Right);
    for (position, command) in result.commands.iter().enumerate() {
        commands.add_row(vec![
            dim_cell(position + 1),
            Cell::new(command.keyword())
                .fg(Color::Blue)
                .add_attribute(Attribute::Bold),
            command.argument().map_or_else(|| dim_cell("-"), Cell::new),
        ]);
    }
    println!("{commands}");

    if print_batch {
        println!();
        print!("{}", result.script());
    }
}

pub fn print_compile_json(result: &CompileResult) -> Result<()> {
    let commands: Vec<_> = result
        .commands
        .iter()
        .map(|command| json!({ "keyword": command.keyword(), "argument": command.argument() }))
        .collect();
    let artifacts = serde_json::to_value(&result.artifacts)?;
    let value = json!({
        "job": result.job.name(),
        "directory": result.job.directory().display().to_string(),
        "batch": result.job.batch_path().display().to_string(),
        "artifacts": artifacts,
        "commands": commands,
    });
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

pub fn print_problems_json(job_name: &str, problems: &[String]) -> Result<()> {
    let value = json!({ "job": job_name, "problems": problems });
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

pub fn print_problems(job_name: &str, problems: &[String]) {
    if problems.is_empty() {
        println!("Job {job_name}: no problems found.");
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![header_cell("#"), header_cell("Problem")]);
    apply_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Right);
    for (position, problem) in problems.iter().enumerate() {
        table.add_row(vec![
            dim_cell(position + 1),
            Cell::new(problem).fg(Color::Red),
        ]);
    }
    println!("Job {job_name}: {} problem(s)", problems.len());
    println!("{table}");
}

pub fn print_table_result(result: &TableResult, marker: &str, counts_only: bool) -> Result<()> {
    println!("Response: {}", result.response());
    let mut counts = Table::new();
    counts.set_header(vec![
        header_cell("Status"),
        header_cell("Code"),
        header_cell("Cells"),
    ]);
    apply_table_style(&mut counts);
    align_column(&mut counts, 1, CellAlignment::Center);
    align_column(&mut counts, 2, CellAlignment::Right);
    let mut total = 0usize;
    for (status, count) in result.status_counts()? {
        total += count;
        counts.add_row(vec![
            Cell::new(status),
            Cell::new(status.letter()),
            count_cell(count, status_color(status)),
        ]);
    }
    counts.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        dim_cell("-"),
        Cell::new(total).add_attribute(Attribute::Bold),
    ]);
    println!("{counts}");
    if counts_only {
        return Ok(());
    }

    let frame = result.to_dataframe(marker)?;
    let mut cells = Table::new();
    cells.set_header(
        frame
            .get_column_names()
            .iter()
            .map(|name| header_cell(name.as_str()))
            .collect::<Vec<_>>(),
    );
    apply_table_style(&mut cells);
    let statuses = result.statuses()?;
    for (row, status) in statuses.iter().enumerate() {
        let mut line = Vec::with_capacity(frame.width());
        for column in frame.get_columns() {
            let text = value_text(column.get(row)?);
            let cell = if column.name().as_str() == "status" {
                Cell::new(text).fg(status_color(*status))
            } else {
                Cell::new(text)
            };
            line.push(cell);
        }
        cells.add_row(line);
    }
    println!("{cells}");
    Ok(())
}

pub fn print_hierarchy(path: &Path, hierarchy: &TreeHierarchy) {
    println!("Hierarchy: {}", path.display());
    print!("{hierarchy}");
    println!("Code length: {}", hierarchy.code_length());
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
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

fn kind_cell(kind: &str) -> Cell {
    match kind {
        "batch" | "output" => Cell::new(kind)
            .fg(Color::Green)
            .add_attribute(Attribute::Bold),
        _ => Cell::new(kind),
    }
}

fn path_cell(path: &Path) -> Cell {
    if path.exists() {
        Cell::new(path.display())
    } else {
        dim_cell(path.display())
    }
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

fn status_color(status: CellStatus) -> Color {
    match status {
        CellStatus::Safe => Color::Green,
        CellStatus::Unsafe => Color::Red,
        CellStatus::SecondaryUnsafe => Color::Yellow,
        CellStatus::Protected => Color::Blue,
        CellStatus::Empty | CellStatus::Unknown => Color::DarkGrey,
    }
}

fn value_text(value: AnyValue<'_>) -> String {
    match value {
        AnyValue::Null => String::new(),
        AnyValue::String(text) => text.to_string(),
        AnyValue::StringOwned(text) => text.to_string(),
        other => other.to_string(),
    }
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
