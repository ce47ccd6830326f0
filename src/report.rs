use chrono::NaiveDate;
use csv::{QuoteStyle, ReaderBuilder, Terminator, WriterBuilder};
use tracing::{info, warn};

use crate::error::{EngineError, EngineResult};
use crate::input::parse_stored_number;
use crate::log::ObservationLog;
use crate::models::{lenient, Daypart, DaypartEntry, Observation, PerDaypart, SavedBy};
use crate::store::KeyValueStore;

const LEADING_COLUMNS: [&str; 3] = ["Date", "Time", "Saved By"];
const DAYPART_COLUMNS: [&str; 4] = ["Sales", "Target Productivity", "Actual Productivity", "PIC"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quoting {
    /// Quote fields that contain the delimiter, a quote or a line break.
    Necessary,
    /// Never quote; such fields are an encoding error.
    Never,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportFormat {
    pub delimiter: u8,
    pub quoting: Quoting,
}

impl Default for ReportFormat {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quoting: Quoting::Necessary,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportedReport {
    pub filename: String,
    pub contents: String,
    pub rows: usize,
}

pub fn header() -> Vec<String> {
    let mut columns: Vec<String> = LEADING_COLUMNS.iter().map(|column| column.to_string()).collect();
    for daypart in Daypart::ALL {
        for column in DAYPART_COLUMNS {
            columns.push(format!("{} {}", daypart.label(), column));
        }
    }
    columns
}

fn row(observation: &Observation) -> Vec<String> {
    let number = |value: Option<f64>| value.map(|value| value.to_string()).unwrap_or_default();
    let mut fields = vec![
        observation
            .date
            .map(|date| date.format(lenient::DATE_FORMAT).to_string())
            .unwrap_or_default(),
        observation
            .time
            .map(|time| time.format(lenient::TIME_FORMAT).to_string())
            .unwrap_or_default(),
        observation.saved_by.label().to_string(),
    ];
    for (_, entry) in observation.entries.iter() {
        fields.push(number(entry.sales));
        fields.push(number(entry.target_productivity));
        fields.push(number(entry.actual_productivity));
        fields.push(entry.person_in_charge.clone());
    }
    fields
}

/// One header row, then one row per observation in the order given. Missing
/// values are written as empty fields.
pub fn to_delimited_text<'a>(
    observations: impl IntoIterator<Item = &'a Observation>,
    format: &ReportFormat,
) -> EngineResult<String> {
    let columns = header();
    let mut writer = WriterBuilder::new()
        .delimiter(format.delimiter)
        .terminator(Terminator::Any(b'\n'))
        .quote_style(match format.quoting {
            Quoting::Necessary => QuoteStyle::Necessary,
            Quoting::Never => QuoteStyle::Never,
        })
        .from_writer(Vec::new());
    writer.write_record(&columns)?;

    for (index, observation) in observations.into_iter().enumerate() {
        let fields = row(observation);
        if format.quoting == Quoting::Never {
            let delimiter = char::from(format.delimiter);
            for (field, column) in fields.iter().zip(&columns) {
                if field.contains(delimiter) || field.contains('\n') || field.contains('\r') {
                    return Err(EngineError::encoding(
                        index + 1,
                        column.clone(),
                        "value contains a delimiter and quoting is disabled",
                    ));
                }
            }
        }
        writer.write_record(&fields)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|err| EngineError::Io(err.into_error()))?;
    String::from_utf8(bytes).map_err(|err| EngineError::encoding(0, "report", err.to_string()))
}

/// Reads text produced by [`to_delimited_text`] back into observations.
pub fn from_delimited_text(text: &str, format: &ReportFormat) -> EngineResult<Vec<Observation>> {
    let mut reader = ReaderBuilder::new()
        .delimiter(format.delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let expected = header();
    let found: Vec<String> = reader.headers()?.iter().map(|column| column.trim().to_string()).collect();
    if found != expected {
        return Err(EngineError::encoding(
            0,
            "header",
            format!("expected {} report columns, found {}", expected.len(), found.len()),
        ));
    }

    let mut observations = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let raw = |index: usize| record.get(index).unwrap_or("");
        let field = |index: usize| raw(index).trim();
        let number = |index: usize| parse_stored_number(field(index));

        let entries = PerDaypart::from_fn(|daypart| {
            let offset = LEADING_COLUMNS.len() + position(daypart) * DAYPART_COLUMNS.len();
            DaypartEntry {
                sales: number(offset),
                target_productivity: number(offset + 1),
                actual_productivity: number(offset + 2),
                person_in_charge: raw(offset + 3).to_string(),
            }
        });
        let saved_by = match field(2).parse::<SavedBy>() {
            Ok(saved_by) => saved_by,
            Err(err) => {
                warn!(target: "daypart::report", row = row + 1, error = %err, "unknown save origin, reading as manual");
                SavedBy::Manual
            }
        };
        observations.push(Observation {
            date: lenient::parse_date(field(0)),
            time: lenient::parse_time(field(1)),
            saved_by,
            entries,
        });
    }
    Ok(observations)
}

fn position(daypart: Daypart) -> usize {
    Daypart::ALL
        .iter()
        .position(|candidate| *candidate == daypart)
        .unwrap_or_default()
}

pub fn range_filename(prefix: &str, start: NaiveDate, end: NaiveDate) -> String {
    format!("{prefix}-{start}-to-{end}.csv")
}

pub fn daily_filename(prefix: &str, date: NaiveDate) -> String {
    format!("{prefix}-{date}.csv")
}

pub fn export_range<S: KeyValueStore>(
    log: &ObservationLog<S>,
    prefix: &str,
    start: NaiveDate,
    end: NaiveDate,
    format: &ReportFormat,
) -> EngineResult<ExportedReport> {
    let selected = log.filter_by_date_range(start, end);
    let contents = to_delimited_text(selected.iter().copied(), format)?;
    info!(target: "daypart::report", profile = log.profile_id(), %start, %end, rows = selected.len(), "report exported");
    Ok(ExportedReport {
        filename: range_filename(prefix, start, end),
        contents,
        rows: selected.len(),
    })
}

/// Last seven days up to `today`, named after `today`.
pub fn export_weekly<S: KeyValueStore>(
    log: &ObservationLog<S>,
    prefix: &str,
    today: NaiveDate,
    format: &ReportFormat,
) -> EngineResult<ExportedReport> {
    let selected = log.last_week(today);
    let contents = to_delimited_text(selected.iter().copied(), format)?;
    info!(target: "daypart::report", profile = log.profile_id(), %today, rows = selected.len(), "weekly report exported");
    Ok(ExportedReport {
        filename: daily_filename(prefix, today),
        contents,
        rows: selected.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::NaiveTime;

    fn sample(day: u32) -> Observation {
        let mut entries = PerDaypart::<DaypartEntry>::default();
        entries.breakfast = DaypartEntry {
            sales: Some(6000.0),
            target_productivity: Some(70.0),
            actual_productivity: Some(66.0),
            person_in_charge: "Sarah Chen".to_string(),
        };
        entries.dinner.sales = Some(9200.0);
        Observation::new(
            NaiveDate::from_ymd_opt(2026, 2, day).unwrap(),
            NaiveTime::from_hms_opt(23, 0, 3).unwrap(),
            SavedBy::Auto,
            entries,
        )
    }

    #[test]
    fn header_lists_every_daypart_column() {
        let columns = header();
        assert_eq!(columns.len(), 19);
        assert_eq!(columns[3], "Breakfast Sales");
        assert_eq!(columns[6], "Breakfast PIC");
        assert_eq!(columns[18], "Dinner PIC");
    }

    #[test]
    fn missing_values_are_empty_fields() {
        let text = to_delimited_text([&sample(7)], &ReportFormat::default()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[1],
            "2026-02-07,23:00:03,Auto-save,6000,70,66,Sarah Chen,,,,,,,,,9200,,,"
        );
        assert!(!text.contains("null"));
    }

    #[test]
    fn empty_input_is_just_the_header() {
        let text = to_delimited_text(std::iter::empty(), &ReportFormat::default()).unwrap();
        assert_eq!(text.lines().count(), 1);
    }

    #[test]
    fn delimiter_in_a_value_is_quoted_or_rejected() {
        let mut observation = sample(7);
        observation.entries.lunch.person_in_charge = "Park, David".to_string();

        let quoted = to_delimited_text([&observation], &ReportFormat::default()).unwrap();
        assert!(quoted.contains("\"Park, David\""));

        let plain = ReportFormat {
            delimiter: b',',
            quoting: Quoting::Never,
        };
        let err = to_delimited_text([&observation], &plain).unwrap_err();
        match err {
            EngineError::Encoding { row, column, .. } => {
                assert_eq!(row, 1);
                assert_eq!(column, "Lunch PIC");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn reading_back_restores_the_fields() {
        let mut second = sample(8);
        second.saved_by = SavedBy::Manual;
        second.entries.lunch.person_in_charge = "Park, \"DJ\" David".to_string();
        second.entries.lunch.actual_productivity = Some(118.5);
        let observations = vec![sample(7), second];

        let text = to_delimited_text(&observations, &ReportFormat::default()).unwrap();
        let parsed = from_delimited_text(&text, &ReportFormat::default()).unwrap();
        assert_eq!(parsed, observations);
    }

    #[test]
    fn tier_targets_and_signed_values_survive_a_round_trip() {
        let profile = crate::config::Profile::preset("tiered").unwrap();
        let mut draft = PerDaypart::<DaypartEntry>::default();
        draft.breakfast.sales = Some(5400.0);
        draft.lunch.sales = Some(10250.75);
        draft.afternoon.sales = Some(7800.0);
        draft.dinner.sales = Some(6268.0);
        draft.lunch.actual_productivity = Some(104.333);
        draft.dinner.person_in_charge = "  Mike Rodriguez ".to_string();
        let tiered = profile
            .calculator
            .observation(
                &draft,
                NaiveDate::from_ymd_opt(2026, 2, 6).unwrap(),
                NaiveTime::from_hms_opt(21, 40, 12).unwrap(),
                SavedBy::Manual,
            )
            .unwrap();
        assert!(tiered.entries.lunch.target_productivity.is_some());

        let mut refund = sample(8);
        refund.entries.afternoon.sales = Some(-250.0);
        refund.entries.afternoon.actual_productivity = Some(0.125);

        let observations = vec![tiered, refund];
        let text = to_delimited_text(&observations, &ReportFormat::default()).unwrap();
        let parsed = from_delimited_text(&text, &ReportFormat::default()).unwrap();
        assert_eq!(parsed, observations);
        assert_eq!(parsed[0].entries.dinner.person_in_charge, "  Mike Rodriguez ");
        assert_eq!(parsed[1].entries.afternoon.sales, Some(-250.0));
    }

    #[test]
    fn unknown_save_origin_reads_as_manual() {
        let text = to_delimited_text([&sample(7)], &ReportFormat::default())
            .unwrap()
            .replace("Auto-save", "Scheduler");
        let parsed = from_delimited_text(&text, &ReportFormat::default()).unwrap();
        assert_eq!(parsed[0].saved_by, SavedBy::Manual);
    }

    #[test]
    fn reader_rejects_foreign_files() {
        let err = from_delimited_text("name,email\nAvery,avery@example.com\n", &ReportFormat::default());
        assert!(matches!(err, Err(EngineError::Encoding { .. })));
    }

    #[test]
    fn filenames_follow_the_export_pattern() {
        let start = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 2, 7).unwrap();
        assert_eq!(
            range_filename("productivity-report-forsyth", start, end),
            "productivity-report-forsyth-2026-02-01-to-2026-02-07.csv"
        );
        assert_eq!(
            daily_filename("productivity-report", end),
            "productivity-report-2026-02-07.csv"
        );
    }

    #[test]
    fn export_range_uses_the_log_window() {
        let mut log = ObservationLog::open(MemoryStore::new(), "default", 23).unwrap();
        log.append(sample(1)).unwrap();
        log.append(sample(5)).unwrap();
        log.append(sample(9)).unwrap();

        let start = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 2, 7).unwrap();
        let report = export_range(&log, "productivity-report", start, end, &ReportFormat::default()).unwrap();
        assert_eq!(report.rows, 2);
        assert_eq!(report.contents.lines().count(), 3);
        assert_eq!(report.filename, "productivity-report-2026-02-01-to-2026-02-07.csv");

        let weekly = export_weekly(&log, "productivity-report", end, &ReportFormat::default()).unwrap();
        assert_eq!(weekly.rows, 2);
        assert_eq!(weekly.filename, "productivity-report-2026-02-07.csv");
    }
}
