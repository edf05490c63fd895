//! Terminal rendering for the dashboard commands.

use crate::model::Position;
use crate::valuation::SymbolValuation;
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Defines different styles for text elements.
pub enum StyleType {
    Title,
    TotalLabel,
    TotalValue,
    Error,
    Subtle,
}

/// Applies a consistent style to a string.
pub fn style_text(text: &str, style_type: StyleType) -> String {
    let styled = match style_type {
        StyleType::Title => style(text).bold().underlined(),
        StyleType::TotalLabel => style(text).bold(),
        StyleType::TotalValue => style(text).green().bold(),
        StyleType::Error => style(text).red(),
        StyleType::Subtle => style(text).dim(),
    };
    styled.to_string()
}

/// Creates a new `comfy_table::Table` with standard styling.
pub fn new_styled_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Creates a styled header cell for a table.
pub fn header_cell(text: &str) -> Cell {
    Cell::new(text)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

/// Formats an `Option<T>` into a `Cell`. `None` is displayed as "N/A".
pub fn format_optional_cell<T>(value: Option<T>, format_fn: impl Fn(T) -> String) -> Cell {
    value.map_or(na_cell(), |v| {
        Cell::new(format_fn(v)).set_alignment(CellAlignment::Right)
    })
}

/// Creates a cell for unavailable values.
pub fn na_cell() -> Cell {
    Cell::new("N/A")
        .fg(Color::DarkGrey)
        .set_alignment(CellAlignment::Right)
}

/// Creates a cell for a signed gain/loss value with color coding.
pub fn gain_cell(gain: f64) -> Cell {
    let text = format!("{gain:+.2}");
    if gain >= 0.0 {
        Cell::new(text)
            .fg(Color::Green)
            .set_alignment(CellAlignment::Right)
    } else {
        Cell::new(text)
            .fg(Color::Red)
            .set_alignment(CellAlignment::Right)
    }
}

/// Spinner shown while provider fan-out is in flight.
pub fn new_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ "),
    );
    pb.set_message(message.to_string());
    pb
}

/// Renders the full valuation report for one user.
pub fn render_valuation_report(user: &str, valuations: &[SymbolValuation]) -> String {
    let mut table = new_styled_table();
    table.set_header(vec![
        header_cell("Symbol"),
        header_cell("Net Qty"),
        header_cell("Avg Cost"),
        header_cell("Rate"),
        header_cell("Sources"),
        header_cell("Market Value"),
        header_cell("Unrealized P/L"),
    ]);

    let mut total_value = 0.0;
    let mut total_gain = 0.0;
    let mut all_valid = true;
    for v in valuations {
        table.add_row(vec![
            Cell::new(&v.symbol),
            Cell::new(format!("{:.4}", v.position.net_quantity))
                .set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.2}", v.position.avg_cost_basis))
                .set_alignment(CellAlignment::Right),
            format_optional_cell(v.rate.as_ref(), |r| format!("{:.4}", r.rate)),
            format_optional_cell(v.rate.as_ref(), |r| r.quote_count.to_string()),
            format_optional_cell(v.market_value, |mv| format!("{mv:.2}")),
            v.unrealized_gain.map_or_else(na_cell, gain_cell),
        ]);

        match (v.market_value, v.unrealized_gain) {
            (Some(mv), Some(gain)) => {
                total_value += mv;
                total_gain += gain;
            }
            _ => all_valid = false,
        }
    }

    let mut output = format!("Portfolio: {}\n\n", style_text(user, StyleType::Title));
    output.push_str(&table.to_string());

    let total_style = if all_valid {
        StyleType::TotalValue
    } else {
        StyleType::Subtle
    };
    output.push_str(&format!(
        "\n\n{} {} ({} {:+.2})",
        style_text("Total Value:", StyleType::TotalLabel),
        style_text(&format!("{total_value:.2}"), total_style),
        style_text("unrealized", StyleType::Subtle),
        total_gain,
    ));
    if !all_valid {
        output.push_str(&format!(
            "\n{}",
            style_text(
                "Some rates were unavailable; totals cover valued symbols only.",
                StyleType::Error
            )
        ));
        for v in valuations.iter().filter(|v| v.error.is_some()) {
            output.push_str(&format!(
                "\n  {}: {}",
                v.symbol,
                style_text(v.error.as_deref().unwrap_or("unknown"), StyleType::Subtle)
            ));
        }
    }

    output
}

/// Renders a single position lookup.
pub fn render_position(user: &str, position: &Position) -> String {
    let mut table = new_styled_table();
    table.set_header(vec![
        header_cell("Symbol"),
        header_cell("Net Qty"),
        header_cell("Avg Cost"),
    ]);
    table.add_row(vec![
        Cell::new(&position.symbol),
        Cell::new(format!("{:.4}", position.net_quantity)).set_alignment(CellAlignment::Right),
        Cell::new(format!("{:.2}", position.avg_cost_basis)).set_alignment(CellAlignment::Right),
    ]);

    format!(
        "Position for {}\n\n{}",
        style_text(user, StyleType::Title),
        table
    )
}
