//! Excel workbook store: one sheet per day, one latency chart per sheet.

use std::path::{Path, PathBuf};

use thiserror::Error;
use umya_spreadsheet::structs::drawing::spreadsheet::MarkerType;
use umya_spreadsheet::structs::{Chart, ChartType, Spreadsheet, Worksheet};

use super::models::*;
use crate::sample::Sample;

/// Workbook error types.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Workbook error: {0}")]
    Xlsx(#[from] umya_spreadsheet::reader::xlsx::XlsxError),
    #[error("Workbook error: {0}")]
    XlsxWrite(#[from] umya_spreadsheet::writer::xlsx::XlsxError),
    #[error("Cannot create sheet {0}: {1}")]
    SheetCreate(String, &'static str),
    #[error("Sheet not found: {0}")]
    SheetNotFound(String),
}

/// Sheet name for a sample, e.g. `03.07.25`.
pub fn sheet_name(sample: &Sample) -> String {
    sample.timestamp.format("%d.%m.%y").to_string()
}

/// A workbook loaded into memory.
pub struct Workbook {
    path: PathBuf,
    book: Spreadsheet,
}

impl Workbook {
    /// Load the workbook at `path`, or start an empty one if the file is absent.
    ///
    /// A file that exists but cannot be read is an error; it is never
    /// replaced by a fresh workbook.
    pub fn open<P: Into<PathBuf>>(path: P) -> Result<Self, StoreError> {
        let path = path.into();
        let book = if path.exists() {
            umya_spreadsheet::reader::xlsx::read(&path)?
        } else {
            umya_spreadsheet::new_file_empty_worksheet()
        };
        Ok(Self { path, book })
    }

    /// Append one row for `sample` to its day's sheet.
    ///
    /// Creates the sheet (with header) on first use and attaches the trend
    /// chart to any sheet that has none. Nothing reaches disk until `save`.
    pub fn append_row(&mut self, sample: &Sample) -> Result<AppendOutcome, StoreError> {
        let sheet = sheet_name(sample);

        let sheet_created = self.book.get_sheet_by_name(&sheet).is_none();
        if sheet_created {
            let ws = self
                .book
                .new_sheet(sheet.clone())
                .map_err(|e| StoreError::SheetCreate(sheet.clone(), e))?;
            write_header(ws);
        }

        let ws = self
            .book
            .get_sheet_by_name_mut(&sheet)
            .ok_or_else(|| StoreError::SheetNotFound(sheet.clone()))?;

        let row_num = ws.get_highest_row().max(1) + 1;
        write_row(ws, row_num, sample);

        let chart_created = !has_chart(ws);
        if chart_created {
            ws.add_chart(latency_chart(&sheet));
        }

        Ok(AppendOutcome {
            sheet,
            row_num,
            sheet_created,
            chart_created,
        })
    }

    /// Write the workbook next to its destination, then rename it into place.
    ///
    /// An interrupted save leaves the previous file intact.
    pub fn save(&self) -> Result<(), StoreError> {
        let tmp = temp_path(&self.path);
        if let Err(e) = umya_spreadsheet::writer::xlsx::write(&self.book, &tmp) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_header(ws: &mut Worksheet) {
    for (col, (title, letter)) in (1u32..).zip(HEADER_TITLES.iter().zip(HEADER_COLUMNS)) {
        ws.get_cell_mut((col, 1u32)).set_value_string(*title);
        ws.get_style_mut((col, 1u32)).get_font_mut().set_bold(true);
        ws.get_column_dimension_mut(letter)
            .set_width(HEADER_COLUMN_WIDTH);
    }
}

/// Unmeasured signal and timed-out pings stay blank.
fn write_row(ws: &mut Worksheet, row: u32, sample: &Sample) {
    let time = sample.timestamp.format("%H:%M:%S").to_string();
    ws.get_cell_mut((1u32, row)).set_value_string(time);
    ws.get_cell_mut((2u32, row))
        .set_value_string(sample.adapter_state.as_str());
    ws.get_cell_mut((3u32, row)).set_value_string(sample.ssid.as_str());
    if let Some(signal) = sample.signal_quality {
        ws.get_cell_mut((4u32, row)).set_value_number(signal);
    }
    ws.get_cell_mut((5u32, row))
        .set_value_string(sample.internet_status().as_str());
    if let Some(ms) = sample.latency.millis() {
        ws.get_cell_mut((6u32, row)).set_value_number(ms);
    }
}

fn has_chart(ws: &Worksheet) -> bool {
    !ws.get_worksheet_drawing().get_chart_collection().is_empty()
}

/// Line chart of the ping column, titled by its header.
fn latency_chart(sheet: &str) -> Chart {
    let mut from_marker = MarkerType::default();
    from_marker.set_coordinate(CHART_ANCHOR);
    let mut to_marker = MarkerType::default();
    to_marker.set_coordinate(CHART_EXTENT);

    let values = format!("'{}'!$F$2:$F${}", sheet, LAST_SHEET_ROW);
    let mut chart = Chart::default();
    chart
        .new_chart(
            ChartType::LineChart,
            from_marker,
            to_marker,
            vec![values.as_str()],
        )
        .set_series_title(vec![HEADER_TITLES[5]]);
    chart
}

/// Appends reportable samples to the workbook file, one load/save per call.
#[derive(Debug, Clone)]
pub struct StoreWriter {
    path: PathBuf,
}

impl StoreWriter {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append_row(&self, sample: &Sample) -> Result<AppendOutcome, StoreError> {
        let mut workbook = Workbook::open(&self.path)?;
        let outcome = workbook.append_row(sample)?;
        workbook.save()?;

        if outcome.sheet_created {
            tracing::info!("Workbook: created sheet {}", outcome.sheet);
        }
        if outcome.chart_created {
            tracing::info!("Workbook: attached latency chart to {}", outcome.sheet);
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::tests::sample;
    use crate::sample::{AdapterState, Latency};
    use chrono::{Duration, NaiveDate};
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> StoreWriter {
        StoreWriter::new(dir.path().join("wifi_log.xlsx"))
    }

    fn read_back(store: &StoreWriter) -> Spreadsheet {
        umya_spreadsheet::reader::xlsx::read(store.path()).unwrap()
    }

    fn sheet_names(book: &Spreadsheet) -> Vec<String> {
        book.get_sheet_collection()
            .iter()
            .map(|ws| ws.get_name().to_string())
            .collect()
    }

    fn row_values(ws: &Worksheet, row: u32) -> Vec<String> {
        (1u32..=6).map(|col| ws.get_value((col, row))).collect()
    }

    fn chart_count(ws: &Worksheet) -> usize {
        ws.get_worksheet_drawing().get_chart_collection().len()
    }

    #[test]
    fn test_creates_sheet_with_header_row_and_chart() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let mut s = sample(AdapterState::Connected, Some(99), Latency::Measured(23));
        s.ssid = "TestSSID".to_string();
        let outcome = store.append_row(&s).unwrap();
        assert!(store.path().exists());
        assert_eq!(outcome.sheet, "03.07.25");
        assert_eq!(outcome.row_num, 2);
        assert!(outcome.sheet_created);
        assert!(outcome.chart_created);

        let book = read_back(&store);
        assert_eq!(sheet_names(&book), ["03.07.25"]);
        let ws = book.get_sheet_by_name("03.07.25").unwrap();

        assert_eq!(row_values(ws, 1), HEADER_TITLES);
        for (col, letter) in (1u32..).zip(HEADER_COLUMNS) {
            let bold = ws
                .get_style((col, 1u32))
                .get_font()
                .map_or(false, |font| *font.get_bold());
            assert!(bold, "header cell {} is not bold", letter);
            let width = ws.get_column_dimension(letter).map(|c| *c.get_width());
            assert_eq!(width, Some(HEADER_COLUMN_WIDTH));
        }

        assert_eq!(
            row_values(ws, 2),
            ["12:00:00", "connected", "TestSSID", "99", "online", "23"]
        );
        assert_eq!(ws.get_highest_row(), 2);
        assert_eq!(chart_count(ws), 1);
    }

    #[test]
    fn test_saved_file_is_a_zip_package() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store
            .append_row(&sample(AdapterState::Connected, Some(60), Latency::Measured(9)))
            .unwrap();

        let bytes = std::fs::read(store.path()).unwrap();
        assert_eq!(&bytes[..2], b"PK");
        assert!(!temp_path(store.path()).exists());
    }

    #[test]
    fn test_repeated_appends_keep_one_chart() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let base = sample(AdapterState::Connected, Some(50), Latency::Measured(30));
        for i in 0..5u32 {
            let mut s = base.clone();
            s.timestamp = base.timestamp + Duration::seconds(10 * i64::from(i));
            let outcome = store.append_row(&s).unwrap();
            assert_eq!(outcome.row_num, 2 + i);
            assert_eq!(outcome.sheet_created, i == 0);
            assert_eq!(outcome.chart_created, i == 0);
        }

        let book = read_back(&store);
        let ws = book.get_sheet_by_name("03.07.25").unwrap();
        assert_eq!(ws.get_highest_row(), 6);
        assert_eq!(row_values(ws, 1), HEADER_TITLES);
        assert_eq!(chart_count(ws), 1);

        let times: Vec<_> = (2u32..=6).map(|row| ws.get_value((1u32, row))).collect();
        assert_eq!(times, ["12:00:00", "12:00:10", "12:00:20", "12:00:30", "12:00:40"]);
    }

    #[test]
    fn test_new_day_leaves_previous_sheet_untouched() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let today = sample(AdapterState::Connected, Some(80), Latency::Measured(12));
        store.append_row(&today).unwrap();
        store.append_row(&today).unwrap();

        let rows_before: Vec<_> = {
            let book = read_back(&store);
            let ws = book.get_sheet_by_name("03.07.25").unwrap();
            (1u32..=3).map(|row| row_values(ws, row)).collect()
        };

        let mut tomorrow = today.clone();
        tomorrow.timestamp = NaiveDate::from_ymd_opt(2025, 7, 4)
            .unwrap()
            .and_hms_opt(0, 0, 5)
            .unwrap();
        let outcome = store.append_row(&tomorrow).unwrap();
        assert_eq!(outcome.sheet, "04.07.25");
        assert!(outcome.sheet_created);
        assert!(outcome.chart_created);
        assert_eq!(outcome.row_num, 2);

        let book = read_back(&store);
        assert_eq!(sheet_names(&book), ["03.07.25", "04.07.25"]);

        let yesterday = book.get_sheet_by_name("03.07.25").unwrap();
        let rows_after: Vec<_> = (1u32..=3).map(|row| row_values(yesterday, row)).collect();
        assert_eq!(rows_after, rows_before);
        assert_eq!(yesterday.get_highest_row(), 3);
        assert_eq!(chart_count(yesterday), 1);

        let ws = book.get_sheet_by_name("04.07.25").unwrap();
        assert_eq!(ws.get_highest_row(), 2);
        assert_eq!(ws.get_value((1u32, 2u32)), "00:00:05");
        assert_eq!(chart_count(ws), 1);
    }

    #[test]
    fn test_sentinels_are_blank_cells() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let down = sample(AdapterState::Disconnected, None, Latency::Timeout);
        store.append_row(&down).unwrap();

        let book = read_back(&store);
        let ws = book.get_sheet_by_name("03.07.25").unwrap();
        assert_eq!(
            row_values(ws, 2),
            ["12:00:00", "disconnected", "N/A", "", "offline", ""]
        );
    }

    #[test]
    fn test_unreadable_file_is_not_replaced() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::write(store.path(), b"not a workbook").unwrap();

        let s = sample(AdapterState::Connected, Some(70), Latency::Measured(20));
        assert!(store.append_row(&s).is_err());
        assert_eq!(std::fs::read(store.path()).unwrap(), b"not a workbook");
    }

    #[test]
    fn test_temp_path_sits_next_to_destination() {
        assert_eq!(
            temp_path(Path::new("/var/log/wifi_log.xlsx")),
            PathBuf::from("/var/log/wifi_log.xlsx.tmp")
        );
    }
}
