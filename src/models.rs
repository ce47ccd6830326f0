use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Daypart {
    Breakfast,
    Lunch,
    Afternoon,
    Dinner,
}

impl Daypart {
    pub const ALL: [Daypart; 4] = [
        Daypart::Breakfast,
        Daypart::Lunch,
        Daypart::Afternoon,
        Daypart::Dinner,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Daypart::Breakfast => "breakfast",
            Daypart::Lunch => "lunch",
            Daypart::Afternoon => "afternoon",
            Daypart::Dinner => "dinner",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Daypart::Breakfast => "Breakfast",
            Daypart::Lunch => "Lunch",
            Daypart::Afternoon => "Afternoon",
            Daypart::Dinner => "Dinner",
        }
    }
}

impl fmt::Display for Daypart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Daypart {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Daypart::ALL
            .into_iter()
            .find(|daypart| daypart.key().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| format!("unknown daypart {value:?}"))
    }
}

/// One value per daypart. Serializes as an object keyed by daypart name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "T: Serialize",
    deserialize = "T: Deserialize<'de> + Default"
))]
pub struct PerDaypart<T> {
    #[serde(default)]
    pub breakfast: T,
    #[serde(default)]
    pub lunch: T,
    #[serde(default)]
    pub afternoon: T,
    #[serde(default)]
    pub dinner: T,
}

impl<T> PerDaypart<T> {
    pub fn from_fn(mut build: impl FnMut(Daypart) -> T) -> Self {
        Self {
            breakfast: build(Daypart::Breakfast),
            lunch: build(Daypart::Lunch),
            afternoon: build(Daypart::Afternoon),
            dinner: build(Daypart::Dinner),
        }
    }

    pub fn get(&self, daypart: Daypart) -> &T {
        match daypart {
            Daypart::Breakfast => &self.breakfast,
            Daypart::Lunch => &self.lunch,
            Daypart::Afternoon => &self.afternoon,
            Daypart::Dinner => &self.dinner,
        }
    }

    pub fn get_mut(&mut self, daypart: Daypart) -> &mut T {
        match daypart {
            Daypart::Breakfast => &mut self.breakfast,
            Daypart::Lunch => &mut self.lunch,
            Daypart::Afternoon => &mut self.afternoon,
            Daypart::Dinner => &mut self.dinner,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Daypart, &T)> {
        Daypart::ALL.into_iter().map(move |daypart| (daypart, self.get(daypart)))
    }

    pub fn map<U>(&self, mut apply: impl FnMut(Daypart, &T) -> U) -> PerDaypart<U> {
        PerDaypart::from_fn(|daypart| apply(daypart, self.get(daypart)))
    }
}

/// Sales entered for each daypart of one business day. `None` means not entered.
pub type DailySales = PerDaypart<Option<f64>>;

pub fn total_sales(sales: &DailySales) -> Option<f64> {
    let entered: Vec<f64> = sales.iter().filter_map(|(_, value)| *value).collect();
    if entered.is_empty() {
        None
    } else {
        Some(entered.iter().sum())
    }
}

/// Sales range mapped linearly onto a productivity range for one daypart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DaypartRange {
    pub sales_min: f64,
    pub sales_max: f64,
    pub prod_min: f64,
    pub prod_max: f64,
}

impl DaypartRange {
    pub fn new(sales_min: f64, sales_max: f64, prod_min: f64, prod_max: f64) -> EngineResult<Self> {
        let range = Self {
            sales_min,
            sales_max,
            prod_min,
            prod_max,
        };
        range.validate()?;
        Ok(range)
    }

    pub fn validate(&self) -> EngineResult<()> {
        let values = [self.sales_min, self.sales_max, self.prod_min, self.prod_max];
        if values.iter().any(|value| !value.is_finite()) {
            return Err(EngineError::configuration("daypart range bounds must be finite"));
        }
        if self.sales_min >= self.sales_max {
            return Err(EngineError::domain(format!(
                "sales range {}..{} is empty",
                self.sales_min, self.sales_max
            )));
        }
        if self.prod_min >= self.prod_max {
            return Err(EngineError::domain(format!(
                "productivity range {}..{} is empty",
                self.prod_min, self.prod_max
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tier {
    #[serde(rename = "top50")]
    Top50,
    #[serde(rename = "top33")]
    Top33,
    #[serde(rename = "top20")]
    Top20,
    #[serde(rename = "top10")]
    Top10,
}

impl Tier {
    pub const ALL: [Tier; 4] = [Tier::Top50, Tier::Top33, Tier::Top20, Tier::Top10];

    pub fn key(self) -> &'static str {
        match self {
            Tier::Top50 => "top50",
            Tier::Top33 => "top33",
            Tier::Top20 => "top20",
            Tier::Top10 => "top10",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Tier::Top50 => "Top 50%",
            Tier::Top33 => "Top 33%",
            Tier::Top20 => "Top 20%",
            Tier::Top10 => "Top 10%",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Tier::ALL
            .into_iter()
            .find(|tier| tier.key().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| format!("unknown tier {value:?} (expected top50, top33, top20 or top10)"))
    }
}

/// Two dayparts reported together on a condensed gauge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombinedPeriod {
    Day,
    Night,
}

impl CombinedPeriod {
    pub const ALL: [CombinedPeriod; 2] = [CombinedPeriod::Day, CombinedPeriod::Night];

    pub fn constituents(self) -> (Daypart, Daypart) {
        match self {
            CombinedPeriod::Day => (Daypart::Breakfast, Daypart::Lunch),
            CombinedPeriod::Night => (Daypart::Afternoon, Daypart::Dinner),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CombinedPeriod::Day => "Day",
            CombinedPeriod::Night => "Night",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SavedBy {
    Manual,
    #[serde(rename = "Auto-save", alias = "Auto")]
    Auto,
}

impl SavedBy {
    pub fn label(self) -> &'static str {
        match self {
            SavedBy::Manual => "Manual",
            SavedBy::Auto => "Auto-save",
        }
    }
}

impl FromStr for SavedBy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "Manual" => Ok(SavedBy::Manual),
            "Auto-save" | "Auto" => Ok(SavedBy::Auto),
            other => Err(format!("unknown save origin {other:?}")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DaypartEntry {
    #[serde(default, with = "lenient::number")]
    pub sales: Option<f64>,
    #[serde(default, with = "lenient::number")]
    pub target_productivity: Option<f64>,
    #[serde(default, with = "lenient::number")]
    pub actual_productivity: Option<f64>,
    #[serde(default, rename = "pic", alias = "personInCharge")]
    pub person_in_charge: String,
}

impl DaypartEntry {
    pub fn has_data(&self) -> bool {
        self.sales.is_some()
            || self.actual_productivity.is_some()
            || !self.person_in_charge.trim().is_empty()
    }
}

/// Values typed in for a day that has not been saved yet.
pub type DraftDay = PerDaypart<DaypartEntry>;

pub fn draft_has_data(draft: &DraftDay) -> bool {
    draft.iter().any(|(_, entry)| entry.has_data())
}

/// One saved snapshot of a business day.
///
/// `date` and `time` are `None` only for stored records whose values could not
/// be parsed; records built by the engine always carry both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    #[serde(default, with = "lenient::date")]
    pub date: Option<NaiveDate>,
    #[serde(default, with = "lenient::time")]
    pub time: Option<NaiveTime>,
    pub saved_by: SavedBy,
    #[serde(flatten)]
    pub entries: PerDaypart<DaypartEntry>,
}

impl Observation {
    pub fn new(
        date: NaiveDate,
        time: NaiveTime,
        saved_by: SavedBy,
        entries: PerDaypart<DaypartEntry>,
    ) -> Self {
        Self {
            date: Some(date),
            time: Some(time.with_nanosecond(0).unwrap_or(time)),
            saved_by,
            entries,
        }
    }

    pub fn entry(&self, daypart: Daypart) -> &DaypartEntry {
        self.entries.get(daypart)
    }
}

/// Serde adapters that accept both the engine's own layout and the loosely
/// typed records written by earlier versions of the tool.
pub(crate) mod lenient {
    pub const DATE_FORMAT: &str = "%Y-%m-%d";
    pub const TIME_FORMAT: &str = "%H:%M:%S";

    pub fn parse_date(value: &str) -> Option<chrono::NaiveDate> {
        let value = value.trim();
        chrono::NaiveDate::parse_from_str(value, DATE_FORMAT)
            .or_else(|_| chrono::NaiveDate::parse_from_str(value, "%m/%d/%Y"))
            .ok()
    }

    pub fn parse_time(value: &str) -> Option<chrono::NaiveTime> {
        let value = value.trim();
        chrono::NaiveTime::parse_from_str(value, TIME_FORMAT)
            .or_else(|_| chrono::NaiveTime::parse_from_str(value, "%I:%M:%S %p"))
            .or_else(|_| chrono::NaiveTime::parse_from_str(value, "%H:%M"))
            .ok()
    }

    pub mod date {
        use chrono::NaiveDate;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(value: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error> {
            match value {
                Some(date) => serializer.serialize_str(&date.format(super::DATE_FORMAT).to_string()),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveDate>, D::Error> {
            let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
            Ok(raw.as_ref().and_then(|value| value.as_str()).and_then(super::parse_date))
        }
    }

    pub mod time {
        use chrono::NaiveTime;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(value: &Option<NaiveTime>, serializer: S) -> Result<S::Ok, S::Error> {
            match value {
                Some(time) => serializer.serialize_str(&time.format(super::TIME_FORMAT).to_string()),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveTime>, D::Error> {
            let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
            Ok(raw.as_ref().and_then(|value| value.as_str()).and_then(super::parse_time))
        }
    }

    pub mod number {
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
            match value {
                Some(number) => serializer.serialize_f64(*number),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
            let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
            Ok(match raw {
                Some(serde_json::Value::Number(number)) => number.as_f64(),
                Some(serde_json::Value::String(text)) => crate::input::parse_stored_number(&text),
                _ => None,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn daypart_parses_case_insensitively() {
        assert_eq!("Lunch".parse::<Daypart>().unwrap(), Daypart::Lunch);
        assert_eq!(" dinner ".parse::<Daypart>().unwrap(), Daypart::Dinner);
        assert!("brunch".parse::<Daypart>().is_err());
    }

    #[test]
    fn degenerate_ranges_are_rejected() {
        assert!(DaypartRange::new(4000.0, 8000.0, 60.0, 80.0).is_ok());
        assert!(matches!(
            DaypartRange::new(4000.0, 4000.0, 60.0, 80.0),
            Err(EngineError::Domain { .. })
        ));
        assert!(matches!(
            DaypartRange::new(4000.0, 8000.0, 80.0, 60.0),
            Err(EngineError::Domain { .. })
        ));
    }

    #[test]
    fn total_sales_ignores_missing_dayparts() {
        let mut sales = DailySales::default();
        assert_eq!(total_sales(&sales), None);
        sales.lunch = Some(10_000.0);
        sales.dinner = Some(9_500.0);
        assert_eq!(total_sales(&sales), Some(19_500.0));
    }

    #[test]
    fn loads_records_written_by_the_browser_tool() {
        let raw = r#"{
            "date": "2/7/2026",
            "time": "11:00:03 PM",
            "savedBy": "Auto-save",
            "breakfast": { "sales": "6000", "targetProductivity": 70, "pic": "Sarah", "actualProductivity": "72" },
            "lunch": { "sales": "", "pic": "", "actualProductivity": "" }
        }"#;
        let observation: Observation = serde_json::from_str(raw).unwrap();

        assert_eq!(observation.date, NaiveDate::from_ymd_opt(2026, 2, 7));
        assert_eq!(observation.time, NaiveTime::from_hms_opt(23, 0, 3));
        assert_eq!(observation.saved_by, SavedBy::Auto);
        assert_eq!(observation.entry(Daypart::Breakfast).sales, Some(6000.0));
        assert_eq!(observation.entry(Daypart::Breakfast).actual_productivity, Some(72.0));
        assert_eq!(observation.entry(Daypart::Breakfast).person_in_charge, "Sarah");
        assert_eq!(observation.entry(Daypart::Lunch).sales, None);
        assert_eq!(observation.entry(Daypart::Dinner), &DaypartEntry::default());
    }

    #[test]
    fn malformed_dates_load_as_missing() {
        let raw = r#"{ "date": "sometime", "savedBy": "Manual" }"#;
        let observation: Observation = serde_json::from_str(raw).unwrap();
        assert_eq!(observation.date, None);
        assert_eq!(observation.time, None);
    }

    #[test]
    fn draft_with_only_a_pic_has_data() {
        let mut draft = DraftDay::default();
        assert!(!draft_has_data(&draft));
        draft.dinner.person_in_charge = "Mike".to_string();
        assert!(draft_has_data(&draft));
    }

    #[test]
    fn entry_without_values_has_no_data() {
        let mut entry = DaypartEntry::default();
        assert!(!entry.has_data());
        entry.person_in_charge = "  ".to_string();
        assert!(!entry.has_data());
        entry.actual_productivity = Some(66.0);
        assert!(entry.has_data());
    }
}
