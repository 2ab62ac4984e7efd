use chrono::{DateTime, Utc};
use colored::Colorize;
use prefsync::columns::DisplayColumn;
use prefsync::filter::{self, NumericFilterValue};
use prefsync::model::{GridPreference, PreferenceDocument, ResolvedTheme, TeamColorScheme, TeamId};
use std::collections::BTreeSet;
use timeago::Formatter;

const LABEL_WIDTH: usize = 18;

pub(crate) fn print_success(message: &str) {
    println!("{}", message.green());
}

pub(crate) fn print_failure(message: &str) {
    println!("{}", message.red());
}

pub(crate) fn print_info(message: &str) {
    println!("{}", message.dimmed());
}

pub(crate) fn print_theme(doc: &PreferenceDocument, resolved: ResolvedTheme) {
    println!(
        "{:<width$}{} {}",
        "theme",
        doc.theme().to_string().bold(),
        format!("({})", resolved).dimmed(),
        width = LABEL_WIDTH
    );
}

pub(crate) fn print_document(
    doc: &PreferenceDocument,
    resolved: ResolvedTheme,
    last_saved: Option<DateTime<Utc>>,
) {
    print_theme(doc, resolved);
    let saved = match last_saved {
        Some(at) => format_time_ago(at),
        None => "never".to_string(),
    };
    println!("{:<width$}{}", "saved", saved.dimmed(), width = LABEL_WIDTH);

    println!();
    println!("{}", "Team colors".bold());
    if doc.team_color_schemes.is_empty() {
        print_info("  none");
    }
    for (team, colors) in &doc.team_color_schemes {
        print_team(*team, colors);
    }

    for (key, grid) in doc.grids.iter() {
        println!();
        println!("{}", key.to_string().bold());
        print_grid(grid);
    }
}

pub(crate) fn print_team(team: TeamId, colors: &TeamColorScheme) {
    let mut line = format!(
        "  {}primary {}  secondary {}",
        format!("{:<6}", team).yellow(),
        colors.primary,
        colors.secondary
    );
    if let Some(accent) = &colors.accent {
        line.push_str(&format!("  accent {}", accent));
    }
    println!("{}", line);
}

fn print_grid(grid: &GridPreference) {
    println!("  {:<16}{}", "columns", grid.columns.join(", "));
    if let Some(column) = &grid.sort_column {
        let direction = grid
            .sort_direction
            .map(|d| format!(" {:?}", d).to_lowercase())
            .unwrap_or_default();
        println!("  {:<16}{}{}", "sort", column, direction);
    }
    if !grid.column_widths.is_empty() {
        let widths: Vec<String> = grid
            .column_widths
            .iter()
            .map(|(column, width)| format!("{}={}", column, width))
            .collect();
        println!("  {:<16}{}", "widths", widths.join(", "));
    }
    for (column, value) in &grid.numeric_filters {
        println!("  {:<16}{} {}", "filter", column, format_filter(value).cyan());
    }
    print_categories("positions", &grid.position_filter);
    print_categories("statuses", &grid.status_filter);
}

fn print_categories(label: &str, codes: &BTreeSet<String>) {
    if !codes.is_empty() {
        let codes: Vec<&str> = codes.iter().map(String::as_str).collect();
        println!("  {:<16}{}", label, codes.join(", "));
    }
}

pub(crate) fn print_columns(columns: &[DisplayColumn]) {
    let mut position = 0;
    for column in columns {
        if column.visible {
            position += 1;
            println!(
                "{:>3}. {}{}",
                position,
                format!("{:<18}", column.def.key).bold(),
                column.def.label.dimmed()
            );
        } else {
            println!(
                "  {}  {}{}",
                "-".dimmed(),
                format!("{:<18}", column.def.key).dimmed(),
                column.def.label.dimmed()
            );
        }
    }
}

pub(crate) fn format_filter(value: &NumericFilterValue) -> String {
    filter::format(Some(value))
}

fn format_time_ago(timestamp: DateTime<Utc>) -> String {
    let duration = Utc::now().signed_duration_since(timestamp);
    Formatter::new().convert(duration.to_std().unwrap_or_default())
}
