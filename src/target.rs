use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EngineError, EngineResult};
use crate::interpolate::{interpolate_strict, RangeReading};
use crate::models::{
    total_sales, CombinedPeriod, DailySales, Daypart, DaypartEntry, DaypartRange, DraftDay, Observation, PerDaypart,
    SavedBy, Tier,
};
use crate::tiers::{TierTable, TierValues};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetStatus {
    /// No sales entered for the daypart.
    NoSales,
    /// Tier model only: some but not all dayparts have sales, so the daily
    /// total is not known yet.
    IncompleteDay,
    /// Tier model only: no sales at all, the tier's baseline is used.
    Baseline,
    BelowRange,
    InRange,
    AboveRange,
}

/// Target productivity for one daypart.
///
/// `value` is clamped into the configured range and is what zone and labor
/// math should use. [`Target::displayed`] hides it when sales fell outside
/// the range-mapped sales window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Target {
    pub value: Option<f64>,
    pub status: TargetStatus,
}

impl Target {
    fn missing(status: TargetStatus) -> Self {
        Self {
            value: None,
            status,
        }
    }

    pub fn displayed(&self) -> Option<f64> {
        match self.status {
            TargetStatus::InRange | TargetStatus::Baseline => self.value,
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightBounds {
    pub min: f64,
    pub max: f64,
}

impl Default for WeightBounds {
    fn default() -> Self {
        Self { min: 0.5, max: 1.5 }
    }
}

impl WeightBounds {
    pub fn contains(&self, weight: f64) -> bool {
        weight.is_finite() && weight > 0.0 && weight >= self.min && weight <= self.max
    }
}

/// Chain-wide daily productivity by tier, scaled per daypart by a weight.
#[derive(Debug, Clone, PartialEq)]
pub struct TierModel {
    pub table: TierTable,
    pub baseline: Option<TierValues>,
    pub weights: PerDaypart<f64>,
    pub tier: Tier,
    pub weight_bounds: WeightBounds,
}

impl TierModel {
    /// Daily (unweighted) productivity for the selected tier.
    pub fn daily_target(&self, sales: &DailySales) -> EngineResult<Target> {
        let entered = sales.iter().filter(|(_, value)| value.is_some()).count();
        if entered == 0 {
            return Ok(match &self.baseline {
                Some(baseline) => Target {
                    value: Some(baseline.get(self.tier)),
                    status: TargetStatus::Baseline,
                },
                None => Target::missing(TargetStatus::NoSales),
            });
        }
        if entered < Daypart::ALL.len() {
            return Ok(Target::missing(TargetStatus::IncompleteDay));
        }
        let total = total_sales(sales).unwrap_or_default();
        Ok(Target {
            value: Some(self.table.value_at(total, self.tier)?),
            status: TargetStatus::InRange,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TargetStrategy {
    /// Each daypart's own sales window mapped onto its productivity window.
    RangeMapped(PerDaypart<DaypartRange>),
    TierWeighted(TierModel),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TargetCalculator {
    strategy: TargetStrategy,
}

impl TargetCalculator {
    pub fn new(strategy: TargetStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> &TargetStrategy {
        &self.strategy
    }

    pub fn target(&self, daypart: Daypart, sales: &DailySales) -> EngineResult<Target> {
        match &self.strategy {
            TargetStrategy::RangeMapped(ranges) => {
                let Some(value) = *sales.get(daypart) else {
                    return Ok(Target::missing(TargetStatus::NoSales));
                };
                let range = ranges.get(daypart);
                let reading = interpolate_strict(
                    value,
                    range.sales_min,
                    range.sales_max,
                    range.prod_min,
                    range.prod_max,
                )?;
                Ok(match reading {
                    RangeReading::Within(target) => Target {
                        value: Some(target),
                        status: TargetStatus::InRange,
                    },
                    RangeReading::Below => Target {
                        value: Some(range.prod_min),
                        status: TargetStatus::BelowRange,
                    },
                    RangeReading::Above => Target {
                        value: Some(range.prod_max),
                        status: TargetStatus::AboveRange,
                    },
                })
            }
            TargetStrategy::TierWeighted(model) => {
                let daily = model.daily_target(sales)?;
                let weight = *model.weights.get(daypart);
                Ok(Target {
                    value: daily.value.map(|value| value * weight),
                    status: daily.status,
                })
            }
        }
    }

    pub fn targets(&self, sales: &DailySales) -> EngineResult<PerDaypart<Target>> {
        let mut targets = PerDaypart::from_fn(|_| Target::missing(TargetStatus::NoSales));
        for daypart in Daypart::ALL {
            *targets.get_mut(daypart) = self.target(daypart, sales)?;
        }
        Ok(targets)
    }

    /// Draft entries with each daypart's displayed target filled in, ready to
    /// be saved. Targets are computed with the current weights and tier.
    pub fn with_targets(&self, draft: &DraftDay) -> EngineResult<PerDaypart<DaypartEntry>> {
        let sales = draft.map(|_, entry| entry.sales);
        let targets = self.targets(&sales)?;
        Ok(draft.map(|daypart, entry| DaypartEntry {
            target_productivity: targets.get(daypart).displayed(),
            ..entry.clone()
        }))
    }

    /// Snapshot of `draft` for the business day `date`, with displayed
    /// targets filled in.
    pub fn observation(
        &self,
        draft: &DraftDay,
        date: NaiveDate,
        time: NaiveTime,
        saved_by: SavedBy,
    ) -> EngineResult<Observation> {
        Ok(Observation::new(date, time, saved_by, self.with_targets(draft)?))
    }

    /// Sales-weighted average of the two constituent targets. `Some(0.0)` when
    /// neither daypart has sales; `None` when a daypart with sales has no
    /// target yet.
    pub fn combined(&self, period: CombinedPeriod, sales: &DailySales) -> EngineResult<Option<f64>> {
        let (first, second) = period.constituents();
        let mut weighted = 0.0;
        let mut total = 0.0;
        for daypart in [first, second] {
            let daypart_sales = sales.get(daypart).unwrap_or(0.0);
            if daypart_sales == 0.0 {
                continue;
            }
            let Some(target) = self.target(daypart, sales)?.value else {
                return Ok(None);
            };
            weighted += daypart_sales * target;
            total += daypart_sales;
        }
        if total == 0.0 {
            return Ok(Some(0.0));
        }
        Ok(Some(weighted / total))
    }

    /// Changes one daypart weight for subsequent calculations.
    pub fn set_weight(&mut self, daypart: Daypart, weight: f64) -> EngineResult<()> {
        let TargetStrategy::TierWeighted(model) = &mut self.strategy else {
            return Err(EngineError::configuration(
                "daypart weights only apply to the tier-weighted strategy",
            ));
        };
        if !model.weight_bounds.contains(weight) {
            return Err(EngineError::configuration(format!(
                "weight {weight} for {daypart} is outside {}..={}",
                model.weight_bounds.min, model.weight_bounds.max
            )));
        }
        debug!(target: "daypart::target", %daypart, weight, "daypart weight changed");
        *model.weights.get_mut(daypart) = weight;
        Ok(())
    }

    pub fn set_tier(&mut self, tier: Tier) -> EngineResult<()> {
        let TargetStrategy::TierWeighted(model) = &mut self.strategy else {
            return Err(EngineError::configuration(
                "tiers only apply to the tier-weighted strategy",
            ));
        };
        debug!(target: "daypart::target", %tier, "target tier changed");
        model.tier = tier;
        Ok(())
    }
}
