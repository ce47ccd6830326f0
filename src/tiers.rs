use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::interpolate::interpolate;
use crate::models::Tier;

/// One productivity value per tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierValues {
    pub top50: f64,
    pub top33: f64,
    pub top20: f64,
    pub top10: f64,
}

impl TierValues {
    pub fn get(&self, tier: Tier) -> f64 {
        match tier {
            Tier::Top50 => self.top50,
            Tier::Top33 => self.top33,
            Tier::Top20 => self.top20,
            Tier::Top10 => self.top10,
        }
    }

    fn all_finite(&self) -> bool {
        Tier::ALL.iter().all(|tier| self.get(*tier).is_finite())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierPoint {
    pub sales: f64,
    #[serde(flatten)]
    pub values: TierValues,
}

/// Daily productivity by tier, sampled at increasing total-sales breakpoints.
///
/// Values are expected to be non-decreasing with sales for every tier; that is
/// an assumption about the configured data and is not checked here.
#[derive(Debug, Clone, PartialEq)]
pub struct TierTable {
    points: Vec<TierPoint>,
}

impl TierTable {
    pub fn new(points: Vec<TierPoint>) -> EngineResult<Self> {
        if points.is_empty() {
            return Err(EngineError::configuration("tier table has no points"));
        }
        for point in &points {
            if !point.sales.is_finite() || !point.values.all_finite() {
                return Err(EngineError::configuration(format!(
                    "tier point at sales {} has a non-finite value",
                    point.sales
                )));
            }
        }
        if let Some(pair) = points.windows(2).find(|pair| pair[0].sales >= pair[1].sales) {
            return Err(EngineError::configuration(format!(
                "tier table sales must strictly increase ({} then {})",
                pair[0].sales, pair[1].sales
            )));
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[TierPoint] {
        &self.points
    }

    /// Tier value at `sales`, interpolated between the bracketing breakpoints
    /// and clamped to the first/last point outside the table.
    pub fn value_at(&self, sales: f64, tier: Tier) -> EngineResult<f64> {
        if !sales.is_finite() {
            return Err(EngineError::domain(format!("cannot look up tier value for sales {sales}")));
        }
        let (first, last) = match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Err(EngineError::configuration("tier table has no points")),
        };
        if sales <= first.sales {
            return Ok(first.values.get(tier));
        }
        if sales >= last.sales {
            return Ok(last.values.get(tier));
        }

        let upper_index = self.points.partition_point(|point| point.sales <= sales);
        let lower = &self.points[upper_index - 1];
        let upper = &self.points[upper_index];
        interpolate(
            sales,
            lower.sales,
            upper.sales,
            lower.values.get(tier),
            upper.values.get(tier),
        )
    }
}
