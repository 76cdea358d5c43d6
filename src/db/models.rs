//! Workbook layout constants and append results.

/// Titles of the fixed six-column header.
pub const HEADER_TITLES: [&str; 6] = [
    "Time",
    "Wi-Fi State",
    "SSID",
    "Signal (%)",
    "Internet",
    "Ping (ms)",
];

/// Column letters matching `HEADER_TITLES`.
pub const HEADER_COLUMNS: [&str; 6] = ["A", "B", "C", "D", "E", "F"];

/// Width applied to every header column.
pub const HEADER_COLUMN_WIDTH: f64 = 20.0;

/// Top-left cell of the trend chart.
pub const CHART_ANCHOR: &str = "H2";

/// Bottom-right cell of the trend chart.
pub const CHART_EXTENT: &str = "P20";

/// Last row a day's sheet can reach: the header plus one row per second.
///
/// The chart is bound up to this row so it never needs rewriting as rows
/// are appended.
pub const LAST_SHEET_ROW: u32 = 86_401;

/// Result of a single append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendOutcome {
    pub sheet: String,
    /// One-based; the header is row 1.
    pub row_num: u32,
    pub sheet_created: bool,
    pub chart_created: bool,
}
