use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use tracing::{debug, info, warn};

use crate::error::{EngineError, EngineResult};
use crate::models::{lenient, Observation, SavedBy};
use crate::store::KeyValueStore;

pub const DATA_KEY_PREFIX: &str = "productivity-data";
pub const AUTOSAVE_KEY_PREFIX: &str = "last-auto-save";

/// Hour of the day (local time) in which the autosave may fire.
pub const DEFAULT_AUTOSAVE_HOUR: u32 = 23;

pub fn data_key(profile_id: &str) -> String {
    format!("{DATA_KEY_PREFIX}-{profile_id}")
}

pub fn autosave_key(profile_id: &str) -> String {
    format!("{AUTOSAVE_KEY_PREFIX}-{profile_id}")
}

/// Saved observations for one profile, newest first, mirrored in a
/// key-value store.
///
/// Every write goes to the store before the in-memory list changes, so a
/// failed write leaves the log as it was. Callers sharing a log across
/// threads must wrap it in a mutex; all mutation goes through `&mut self`.
pub struct ObservationLog<S> {
    profile_id: String,
    store: S,
    observations: Vec<Observation>,
    last_auto_save: Option<NaiveDate>,
    autosave_hour: u32,
}

impl<S: KeyValueStore> ObservationLog<S> {
    pub fn open(store: S, profile_id: impl Into<String>, autosave_hour: u32) -> EngineResult<Self> {
        let profile_id = profile_id.into();
        if autosave_hour > 23 {
            return Err(EngineError::configuration(format!(
                "autosave hour {autosave_hour} is not an hour of the day"
            )));
        }

        let observations = match store.get(&data_key(&profile_id))? {
            Some(text) => decode_records(&text)?,
            None => Vec::new(),
        };
        let last_auto_save = store
            .get(&autosave_key(&profile_id))?
            .as_deref()
            .and_then(lenient::parse_date);

        info!(
            target: "daypart::log",
            profile = %profile_id,
            records = observations.len(),
            last_auto_save = ?last_auto_save,
            "observation log loaded"
        );

        Ok(Self {
            profile_id,
            store,
            observations,
            last_auto_save,
            autosave_hour,
        })
    }

    pub fn profile_id(&self) -> &str {
        &self.profile_id
    }

    pub fn load_all(&self) -> &[Observation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn last_auto_save(&self) -> Option<NaiveDate> {
        self.last_auto_save
    }

    pub fn append(&mut self, observation: Observation) -> EngineResult<()> {
        self.append_all(vec![observation]).map(|_| ())
    }

    /// Inserts `observations` at the head in one write, keeping their order.
    pub fn append_all(&mut self, observations: Vec<Observation>) -> EngineResult<usize> {
        let added = observations.len();
        if added == 0 {
            return Ok(0);
        }
        let next = self.with_head(observations);
        let text = serde_json::to_string(&next)?;
        self.store.put(&data_key(&self.profile_id), &text)?;
        self.observations = next;
        info!(target: "daypart::log", profile = %self.profile_id, added, total = self.observations.len(), "observations appended");
        Ok(added)
    }

    /// Autosave decision for one poll of the host's scheduler.
    ///
    /// Fires only during the autosave hour, only when there is unsaved data,
    /// and at most once per calendar day. Returns whether an observation was
    /// appended.
    pub fn maybe_auto_save<F>(&mut self, now: NaiveDateTime, has_unsaved_data: bool, build: F) -> EngineResult<bool>
    where
        F: FnOnce(NaiveDate, NaiveTime) -> EngineResult<Observation>,
    {
        let today = now.date();
        if now.hour() != self.autosave_hour {
            return Ok(false);
        }
        if self.last_auto_save == Some(today) {
            debug!(target: "daypart::log", profile = %self.profile_id, %today, "autosave already ran today");
            return Ok(false);
        }
        if !has_unsaved_data {
            debug!(target: "daypart::log", profile = %self.profile_id, "nothing to autosave");
            return Ok(false);
        }

        let mut observation = build(today, now.time())?;
        observation.saved_by = SavedBy::Auto;
        let next = self.with_head(vec![observation]);
        let text = serde_json::to_string(&next)?;
        let stamp = today.format(lenient::DATE_FORMAT).to_string();
        let data = data_key(&self.profile_id);
        let autosave = autosave_key(&self.profile_id);
        self.store
            .put_all(&[(data.as_str(), text.as_str()), (autosave.as_str(), stamp.as_str())])?;

        self.observations = next;
        self.last_auto_save = Some(today);
        info!(target: "daypart::log", profile = %self.profile_id, %today, "autosaved observation");
        Ok(true)
    }

    /// Observations dated within `start..=end`. Records without a readable
    /// date are skipped.
    pub fn filter_by_date_range(&self, start: NaiveDate, end: NaiveDate) -> Vec<&Observation> {
        let mut undated = 0usize;
        let matches: Vec<&Observation> = self
            .observations
            .iter()
            .filter(|observation| match observation.date {
                Some(date) => date >= start && date <= end,
                None => {
                    undated += 1;
                    false
                }
            })
            .collect();
        if undated > 0 {
            warn!(target: "daypart::log", profile = %self.profile_id, undated, "skipped records without a usable date");
        }
        matches
    }

    /// From seven days before `today` through `today`, both ends included,
    /// so eight calendar days in all.
    pub fn last_week(&self, today: NaiveDate) -> Vec<&Observation> {
        self.filter_by_date_range(today - Duration::days(7), today)
    }

    fn with_head(&self, mut head: Vec<Observation>) -> Vec<Observation> {
        head.extend(self.observations.iter().cloned());
        head
    }
}

/// Parses a stored list, dropping entries that are not records at all.
fn decode_records(text: &str) -> EngineResult<Vec<Observation>> {
    let raw: Vec<serde_json::Value> = serde_json::from_str(text)?;
    let mut observations = Vec::with_capacity(raw.len());
    for (index, value) in raw.into_iter().enumerate() {
        match serde_json::from_value::<Observation>(value) {
            Ok(observation) => observations.push(observation),
            Err(err) => {
                warn!(target: "daypart::log", index, error = %err, "dropping unreadable stored record");
            }
        }
    }
    Ok(observations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DaypartEntry, PerDaypart};
    use crate::store::{MemoryStore, SqliteStore};

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> EngineResult<Option<String>> {
            Ok(None)
        }

        fn put_all(&mut self, _entries: &[(&str, &str)]) -> EngineResult<()> {
            Err(EngineError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk full",
            )))
        }
    }

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn at(day: NaiveDate, hour: u32) -> NaiveDateTime {
        day.and_hms_opt(hour, 5, 0).unwrap()
    }

    fn observation(day: NaiveDate, sales: f64) -> Observation {
        let mut entries = PerDaypart::<DaypartEntry>::default();
        entries.breakfast.sales = Some(sales);
        entries.breakfast.person_in_charge = "Sarah".to_string();
        Observation::new(day, NaiveTime::from_hms_opt(14, 30, 0).unwrap(), SavedBy::Manual, entries)
    }

    #[test]
    fn append_inserts_at_head_and_persists() {
        let mut log = ObservationLog::open(MemoryStore::new(), "default", 23).unwrap();
        log.append(observation(date(2026, 2, 6), 5000.0)).unwrap();
        log.append(observation(date(2026, 2, 7), 6000.0)).unwrap();

        assert_eq!(log.len(), 2);
        assert_eq!(log.load_all()[0].date, Some(date(2026, 2, 7)));

        let store = log.store;
        let reopened = ObservationLog::open(store, "default", 23).unwrap();
        assert_eq!(reopened.load_all().len(), 2);
        assert_eq!(reopened.load_all()[1].entry(crate::models::Daypart::Breakfast).sales, Some(5000.0));
    }

    #[test]
    fn profiles_keep_separate_logs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("guide.sqlite3");

        let mut main_site = ObservationLog::open(SqliteStore::open(&path).unwrap(), "default", 23).unwrap();
        main_site.append(observation(date(2026, 2, 7), 6000.0)).unwrap();

        let other_site = ObservationLog::open(SqliteStore::open(&path).unwrap(), "forsyth", 23).unwrap();
        assert!(other_site.is_empty());
        let main_again = ObservationLog::open(SqliteStore::open(&path).unwrap(), "default", 23).unwrap();
        assert_eq!(main_again.len(), 1);
    }

    #[test]
    fn failed_write_leaves_log_unchanged() {
        let mut log = ObservationLog::open(BrokenStore, "default", 23).unwrap();
        assert!(log.append(observation(date(2026, 2, 7), 6000.0)).is_err());
        assert!(log.is_empty());

        let fired = log.maybe_auto_save(at(date(2026, 2, 7), 23), true, |day, time| {
            Ok(Observation::new(day, time, SavedBy::Auto, PerDaypart::default()))
        });
        assert!(fired.is_err());
        assert!(log.is_empty());
        assert_eq!(log.last_auto_save(), None);
    }

    #[test]
    fn autosave_fires_once_per_day_in_the_window() {
        let mut seeded = MemoryStore::new();
        seeded.put(&autosave_key("default"), "2026-02-06").unwrap();
        let mut log = ObservationLog::open(seeded, "default", 23).unwrap();
        let today = date(2026, 2, 7);
        let build = |day: NaiveDate, time: NaiveTime| -> EngineResult<Observation> {
            Ok(Observation::new(day, time, SavedBy::Manual, PerDaypart::default()))
        };

        assert!(log.maybe_auto_save(at(today, 23), true, build).unwrap());
        assert_eq!(log.len(), 1);
        assert_eq!(log.load_all()[0].saved_by, SavedBy::Auto);
        assert_eq!(log.last_auto_save(), Some(today));

        assert!(!log.maybe_auto_save(at(today, 23), true, build).unwrap());
        assert_eq!(log.len(), 1);

        let reopened = ObservationLog::open(log.store, "default", 23).unwrap();
        assert_eq!(reopened.last_auto_save(), Some(today));
        assert_eq!(reopened.len(), 1);
    }

    #[test]
    fn autosave_waits_for_the_hour_and_for_data() {
        let mut log = ObservationLog::open(MemoryStore::new(), "default", 23).unwrap();
        let today = date(2026, 2, 7);
        let build = |day: NaiveDate, time: NaiveTime| -> EngineResult<Observation> {
            Ok(Observation::new(day, time, SavedBy::Auto, PerDaypart::default()))
        };

        assert!(!log.maybe_auto_save(at(today, 22), true, build).unwrap());
        assert!(!log.maybe_auto_save(at(today, 23), false, build).unwrap());
        assert_eq!(log.last_auto_save(), None);
        assert!(log.maybe_auto_save(at(today, 23), true, build).unwrap());
        assert!(log.maybe_auto_save(at(date(2026, 2, 8), 23), true, build).unwrap());
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn date_filter_is_inclusive_and_skips_undated_records() {
        let mut store = MemoryStore::new();
        store
            .put(
                &data_key("default"),
                r#"[
                    {"date": "2026-02-08", "time": "10:00:00", "savedBy": "Manual"},
                    {"date": "not a date", "savedBy": "Manual"},
                    {"savedBy": "Manual"},
                    {"date": "2/6/2026", "time": "11:00:00 PM", "savedBy": "Auto-save"},
                    {"date": "2026-02-01", "savedBy": "Manual"},
                    42
                ]"#,
            )
            .unwrap();
        let log = ObservationLog::open(store, "default", 23).unwrap();
        assert_eq!(log.len(), 5);

        let window = log.filter_by_date_range(date(2026, 2, 6), date(2026, 2, 8));
        let dates: Vec<_> = window.iter().map(|observation| observation.date).collect();
        assert_eq!(dates, vec![Some(date(2026, 2, 8)), Some(date(2026, 2, 6))]);

        assert!(log.filter_by_date_range(date(2026, 2, 8), date(2026, 2, 6)).is_empty());
    }

    #[test]
    fn last_week_covers_seven_days_back() {
        let mut log = ObservationLog::open(MemoryStore::new(), "default", 23).unwrap();
        log.append(observation(date(2026, 1, 30), 1.0)).unwrap();
        log.append(observation(date(2026, 1, 31), 2.0)).unwrap();
        log.append(observation(date(2026, 2, 7), 3.0)).unwrap();
        assert_eq!(log.last_week(date(2026, 2, 7)).len(), 2);
    }

    #[test]
    fn invalid_autosave_hour_is_rejected() {
        assert!(ObservationLog::open(MemoryStore::new(), "default", 24).is_err());
    }
}
