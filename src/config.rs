use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{EngineError, EngineResult};
use crate::gauge::{DialScale, GaugeGeometry};
use crate::log::DEFAULT_AUTOSAVE_HOUR;
use crate::models::{Daypart, DaypartRange, PerDaypart, Tier};
use crate::target::{TargetCalculator, TargetStrategy, TierModel, WeightBounds};
use crate::tiers::{TierPoint, TierTable, TierValues};
use crate::zone::ZoneBands;

pub const PRESETS: [&str; 3] = ["default", "forsyth", "tiered"];

/// Profile as written in a JSON file. Nothing here is trusted until
/// [`ProfileConfig::validate`] has run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileConfig {
    pub id: String,
    #[serde(default = "default_report_prefix")]
    pub report_prefix: String,
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub combined_periods: bool,
    #[serde(default)]
    pub zone_bands: ZoneBands,
    #[serde(default)]
    pub gauge: GaugeGeometry,
    #[serde(default = "default_autosave_hour")]
    pub autosave_hour: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum StrategyConfig {
    RangeMapped {
        ranges: PerDaypart<Option<DaypartRange>>,
    },
    #[serde(rename_all = "camelCase")]
    TierWeighted {
        table: Vec<TierPoint>,
        #[serde(default)]
        baseline: Option<TierValues>,
        weights: PerDaypart<Option<f64>>,
        #[serde(default = "default_tier")]
        tier: Tier,
        #[serde(default)]
        weight_bounds: WeightBounds,
    },
}

fn default_report_prefix() -> String {
    "productivity-report".to_string()
}

fn default_autosave_hour() -> u32 {
    DEFAULT_AUTOSAVE_HOUR
}

fn default_tier() -> Tier {
    Tier::Top50
}

/// A validated profile: everything one deployment site needs.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub id: String,
    pub report_prefix: String,
    pub calculator: TargetCalculator,
    pub combined_periods: bool,
    pub zone_bands: ZoneBands,
    pub gauge: GaugeGeometry,
    pub autosave_hour: u32,
}

impl ProfileConfig {
    pub fn from_json(text: &str) -> EngineResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn preset(name: &str) -> EngineResult<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "default" => Ok(default_preset()),
            "forsyth" => Ok(forsyth_preset()),
            "tiered" => Ok(tiered_preset()),
            other => Err(EngineError::configuration(format!(
                "unknown profile preset {other:?} (expected one of {})",
                PRESETS.join(", ")
            ))),
        }
    }

    pub fn validate(self) -> EngineResult<Profile> {
        let id = self.id.trim().to_string();
        if id.is_empty() {
            return Err(EngineError::configuration("profile id is empty"));
        }
        if !id.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_') {
            return Err(EngineError::configuration(format!(
                "profile id {id:?} may only contain letters, digits, '-' and '_'"
            )));
        }
        let report_prefix = self.report_prefix.trim().to_string();
        if report_prefix.is_empty() || report_prefix.contains(['/', '\\']) {
            return Err(EngineError::configuration(format!(
                "report prefix {report_prefix:?} is not a usable file name"
            )));
        }
        if self.autosave_hour > 23 {
            return Err(EngineError::configuration(format!(
                "autosave hour {} is not an hour of the day",
                self.autosave_hour
            )));
        }
        self.zone_bands.validate()?;
        self.gauge.validate()?;

        let strategy = match self.strategy {
            StrategyConfig::RangeMapped { ranges } => TargetStrategy::RangeMapped(required_ranges(ranges)?),
            StrategyConfig::TierWeighted {
                table,
                baseline,
                weights,
                tier,
                weight_bounds,
            } => TargetStrategy::TierWeighted(tier_model(table, baseline, weights, tier, weight_bounds)?),
        };

        debug!(target: "daypart::config", profile = %id, "profile validated");
        Ok(Profile {
            id,
            report_prefix,
            calculator: TargetCalculator::new(strategy),
            combined_periods: self.combined_periods,
            zone_bands: self.zone_bands,
            gauge: self.gauge,
            autosave_hour: self.autosave_hour,
        })
    }
}

fn required_ranges(ranges: PerDaypart<Option<DaypartRange>>) -> EngineResult<PerDaypart<DaypartRange>> {
    let mut missing = Vec::new();
    for (daypart, range) in ranges.iter() {
        match range {
            Some(range) => range.validate()?,
            None => missing.push(daypart.key()),
        }
    }
    match (ranges.breakfast, ranges.lunch, ranges.afternoon, ranges.dinner) {
        (Some(breakfast), Some(lunch), Some(afternoon), Some(dinner)) => Ok(PerDaypart {
            breakfast,
            lunch,
            afternoon,
            dinner,
        }),
        _ => Err(EngineError::configuration(format!(
            "missing sales range for {}",
            missing.join(", ")
        ))),
    }
}

fn tier_model(
    table: Vec<TierPoint>,
    baseline: Option<TierValues>,
    weights: PerDaypart<Option<f64>>,
    tier: Tier,
    weight_bounds: WeightBounds,
) -> EngineResult<TierModel> {
    let bounds_ok = weight_bounds.min.is_finite()
        && weight_bounds.max.is_finite()
        && weight_bounds.min > 0.0
        && weight_bounds.min <= weight_bounds.max;
    if !bounds_ok {
        return Err(EngineError::configuration(format!(
            "weight bounds {}..={} are not a positive interval",
            weight_bounds.min, weight_bounds.max
        )));
    }
    for (daypart, weight) in weights.iter() {
        match weight {
            Some(weight) if weight_bounds.contains(*weight) => {}
            Some(weight) => {
                return Err(EngineError::configuration(format!(
                    "weight {weight} for {daypart} is outside {}..={}",
                    weight_bounds.min, weight_bounds.max
                )))
            }
            None => {
                return Err(EngineError::configuration(format!("missing weight for {daypart}")));
            }
        }
    }
    if let Some(values) = &baseline {
        if Tier::ALL.iter().any(|tier| !values.get(*tier).is_finite()) {
            return Err(EngineError::configuration("baseline productivity must be finite"));
        }
    }
    Ok(TierModel {
        table: TierTable::new(table)?,
        baseline,
        weights: weights.map(|_, weight| weight.unwrap_or(1.0)),
        tier,
        weight_bounds,
    })
}

impl Profile {
    pub fn preset(name: &str) -> EngineResult<Self> {
        ProfileConfig::preset(name)?.validate()
    }

    pub fn from_json(text: &str) -> EngineResult<Self> {
        ProfileConfig::from_json(text)?.validate()
    }

    pub fn load(path: &Path) -> EngineResult<Self> {
        let text = fs::read_to_string(path)?;
        let profile = Self::from_json(&text)?;
        info!(target: "daypart::config", profile = %profile.id, path = %path.display(), "profile loaded");
        Ok(profile)
    }

    /// Gauge scale for one daypart: the configured productivity window for
    /// range-mapped profiles, otherwise a window centred on `target`.
    pub fn dial_scale(&self, daypart: Daypart, target: Option<f64>) -> EngineResult<Option<DialScale>> {
        match self.calculator.strategy() {
            TargetStrategy::RangeMapped(ranges) => {
                let range = ranges.get(daypart);
                DialScale::new(range.prod_min, range.prod_max).map(Some)
            }
            TargetStrategy::TierWeighted(_) => match target {
                Some(target) => DialScale::centered(target, self.gauge.dial_window).map(Some),
                None => Ok(None),
            },
        }
    }
}

fn range(sales_min: f64, sales_max: f64, prod_min: f64, prod_max: f64) -> Option<DaypartRange> {
    Some(DaypartRange {
        sales_min,
        sales_max,
        prod_min,
        prod_max,
    })
}

fn default_preset() -> ProfileConfig {
    ProfileConfig {
        id: "default".to_string(),
        report_prefix: default_report_prefix(),
        strategy: StrategyConfig::RangeMapped {
            ranges: PerDaypart {
                breakfast: range(4000.0, 8000.0, 60.0, 80.0),
                lunch: range(8000.0, 12000.0, 100.0, 120.0),
                afternoon: range(5000.0, 9000.0, 90.0, 100.0),
                dinner: range(8000.0, 12000.0, 80.0, 90.0),
            },
        },
        combined_periods: false,
        zone_bands: ZoneBands::default(),
        gauge: GaugeGeometry::default(),
        autosave_hour: DEFAULT_AUTOSAVE_HOUR,
    }
}

fn forsyth_preset() -> ProfileConfig {
    ProfileConfig {
        id: "forsyth".to_string(),
        report_prefix: "productivity-report-forsyth".to_string(),
        strategy: StrategyConfig::RangeMapped {
            ranges: PerDaypart {
                breakfast: range(3000.0, 7000.0, 60.0, 80.0),
                lunch: range(7000.0, 11000.0, 100.0, 120.0),
                afternoon: range(4000.0, 8000.0, 90.0, 100.0),
                dinner: range(7000.0, 11000.0, 80.0, 90.0),
            },
        },
        combined_periods: true,
        zone_bands: ZoneBands::default(),
        gauge: GaugeGeometry::default(),
        autosave_hour: DEFAULT_AUTOSAVE_HOUR,
    }
}

fn tier_point(sales: f64, top50: f64, top33: f64, top20: f64, top10: f64) -> TierPoint {
    TierPoint {
        sales,
        values: TierValues {
            top50,
            top33,
            top20,
            top10,
        },
    }
}

fn tiered_preset() -> ProfileConfig {
    ProfileConfig {
        id: "tiered".to_string(),
        report_prefix: "productivity-report-tiered".to_string(),
        strategy: StrategyConfig::TierWeighted {
            table: vec![
                tier_point(28337.0, 86.28, 88.69, 91.41, 94.45),
                tier_point(31100.0, 87.32, 89.75, 92.58, 95.78),
                tier_point(33938.0, 88.22, 90.68, 93.60, 96.94),
                tier_point(36370.0, 88.90, 91.38, 94.37, 97.81),
            ],
            baseline: Some(TierValues {
                top50: 87.68,
                top33: 90.13,
                top20: 92.99,
                top10: 96.25,
            }),
            weights: PerDaypart {
                breakfast: Some(0.76),
                lunch: Some(1.24),
                afternoon: Some(1.06),
                dinner: Some(0.94),
            },
            tier: Tier::Top50,
            weight_bounds: WeightBounds::default(),
        },
        combined_periods: true,
        zone_bands: ZoneBands::default(),
        gauge: GaugeGeometry::default(),
        autosave_hour: DEFAULT_AUTOSAVE_HOUR,
    }
}
