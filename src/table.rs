use std::io::{self, Write};

use super::records::Route;

const DESTINATION_WIDTH: usize = 30;
/// Too narrow for a "Number" header, so the column is headed "No.".
const NUMBER_WIDTH: usize = 4;
const TIME_WIDTH: usize = 20;

/// Writes the routes as a bordered table, or just `not_found_message` when there
/// are none.
pub fn write_routes<W: Write>(
    out: &mut W,
    routes: &[Route],
    not_found_message: &str,
) -> io::Result<()> {
    if routes.is_empty() {
        return writeln!(out, "{not_found_message}");
    }

    let line = separator();
    writeln!(out, "{line}")?;
    writeln!(
        out,
        "| {:^DESTINATION_WIDTH$} | {:^NUMBER_WIDTH$} | {:^TIME_WIDTH$} |",
        "Destination", "No.", "Time"
    )?;
    writeln!(out, "{line}")?;
    for route in routes {
        let number = route
            .number
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default();
        writeln!(
            out,
            "| {:<DESTINATION_WIDTH$} | {:>NUMBER_WIDTH$} | {:<TIME_WIDTH$} |",
            route.destination,
            number,
            route.time_text()
        )?;
    }
    writeln!(out, "{line}")
}

fn separator() -> String {
    format!(
        "+-{}-+-{}-+-{}-+",
        "-".repeat(DESTINATION_WIDTH),
        "-".repeat(NUMBER_WIDTH),
        "-".repeat(TIME_WIDTH)
    )
}
