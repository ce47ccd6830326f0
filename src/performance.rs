use std::cmp::Ordering;
use std::fmt::Write;
use std::str::FromStr;

use chrono::NaiveDate;

use crate::input::format_currency;
use crate::models::{Daypart, Observation};
use crate::zone::{classify, labor_delta, Zone, ZoneBands};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerformanceRating {
    Exceeding,
    Achieved,
    Near,
    Below,
}

impl PerformanceRating {
    pub fn from_score(score: f64) -> Self {
        if score >= 105.0 {
            Self::Exceeding
        } else if score >= 100.0 {
            Self::Achieved
        } else if score >= 95.0 {
            Self::Near
        } else {
            Self::Below
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Exceeding => "Exceeding target",
            Self::Achieved => "Target achieved",
            Self::Near => "Near target",
            Self::Below => "Below target",
        }
    }

    pub fn met_target(self) -> bool {
        matches!(self, Self::Exceeding | Self::Achieved)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Performance,
    Name,
    Daypart,
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "performance" | "score" => Ok(Self::Performance),
            "name" | "pic" => Ok(Self::Name),
            "daypart" => Ok(Self::Daypart),
            other => Err(format!("unknown sort key {other:?} (expected performance, name or daypart)")),
        }
    }
}

/// One daypart of one saved day, scored against its target.
#[derive(Debug, Clone, PartialEq)]
pub struct ShiftPerformance {
    pub date: Option<NaiveDate>,
    pub daypart: Daypart,
    pub person_in_charge: String,
    pub sales: Option<f64>,
    pub actual: f64,
    pub target: f64,
    pub score: f64,
    pub rating: PerformanceRating,
    pub zone: Option<Zone>,
    pub labor_delta: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TeamSummary {
    pub targets_met: usize,
    pub average_score: f64,
    pub total_shifts: usize,
}

/// Actual as a percentage of target; `None` unless both are entered.
pub fn performance_score(actual: Option<f64>, target: Option<f64>) -> Option<f64> {
    let actual = actual.filter(|value| *value > 0.0)?;
    let target = target.filter(|value| *value > 0.0)?;
    Some(actual / target * 100.0)
}

pub fn collect_shifts<'a>(
    observations: impl IntoIterator<Item = &'a Observation>,
    bands: &ZoneBands,
) -> Vec<ShiftPerformance> {
    let mut shifts = Vec::new();
    for observation in observations {
        for (daypart, entry) in observation.entries.iter() {
            let Some(score) = performance_score(entry.actual_productivity, entry.target_productivity) else {
                continue;
            };
            let actual = entry.actual_productivity.unwrap_or_default();
            let target = entry.target_productivity.unwrap_or_default();
            shifts.push(ShiftPerformance {
                date: observation.date,
                daypart,
                person_in_charge: entry.person_in_charge.trim().to_string(),
                sales: entry.sales,
                actual,
                target,
                score,
                rating: PerformanceRating::from_score(score),
                zone: classify(Some(actual), Some(target), bands).map(|result| result.zone),
                labor_delta: labor_delta(entry.sales, Some(actual), Some(target)),
            });
        }
    }
    shifts
}

pub fn sort_shifts(shifts: &mut [ShiftPerformance], key: SortKey) {
    match key {
        SortKey::Performance => {
            shifts.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal))
        }
        SortKey::Name => shifts.sort_by(|a, b| {
            a.person_in_charge
                .to_lowercase()
                .cmp(&b.person_in_charge.to_lowercase())
        }),
        SortKey::Daypart => shifts.sort_by(|a, b| a.daypart.cmp(&b.daypart)),
    }
}

pub fn summarize(shifts: &[ShiftPerformance]) -> TeamSummary {
    let total_shifts = shifts.len();
    let targets_met = shifts.iter().filter(|shift| shift.rating.met_target()).count();
    let average_score = if total_shifts == 0 {
        0.0
    } else {
        shifts.iter().map(|shift| shift.score).sum::<f64>() / total_shifts as f64
    };
    TeamSummary {
        targets_met,
        average_score,
        total_shifts,
    }
}

pub fn build_report(
    profile: &str,
    start: NaiveDate,
    end: NaiveDate,
    shifts: &[ShiftPerformance],
) -> String {
    let summary = summarize(shifts);
    let mut output = String::new();

    let _ = writeln!(output, "# Team Performance Report");
    let _ = writeln!(output, "Generated for {} ({} to {})", profile, start, end);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Team Summary");
    let _ = writeln!(output, "- Targets met: {}", summary.targets_met);
    let _ = writeln!(output, "- Average performance: {:.1}%", summary.average_score);
    let _ = writeln!(output, "- Total shifts: {}", summary.total_shifts);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Shifts");

    if shifts.is_empty() {
        let _ = writeln!(output, "No shifts with both actual and target productivity in this window.");
        return output;
    }

    for (rank, shift) in shifts.iter().enumerate() {
        let pic = if shift.person_in_charge.is_empty() {
            "unassigned"
        } else {
            shift.person_in_charge.as_str()
        };
        let date = shift
            .date
            .map(|date| date.to_string())
            .unwrap_or_else(|| "undated".to_string());
        let sales = shift
            .sales
            .map(format_currency)
            .unwrap_or_else(|| "no sales".to_string());
        let _ = write!(
            output,
            "{}. {} ({}, {}): {:.1}% of target, actual {:.1} vs target {:.1}, {} sales, {}",
            rank + 1,
            pic,
            shift.daypart,
            date,
            shift.score,
            shift.actual,
            shift.target,
            sales,
            shift.rating.label()
        );
        if let Some(zone) = shift.zone {
            let _ = write!(output, ", {} zone", zone);
        }
        if let Some(delta) = shift.labor_delta {
            let _ = write!(output, ", {:+.1} labor hrs", delta);
        }
        let _ = writeln!(output);
    }

    output
}
