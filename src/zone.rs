use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Zone {
    Recovery,
    Stabilize,
    Sustain,
    Invest,
}

impl Zone {
    pub const ALL: [Zone; 4] = [Zone::Recovery, Zone::Stabilize, Zone::Sustain, Zone::Invest];

    pub fn label(self) -> &'static str {
        match self {
            Zone::Recovery => "Recovery",
            Zone::Stabilize => "Stabilize",
            Zone::Sustain => "Sustain",
            Zone::Invest => "Invest",
        }
    }

    /// Staffing action recommended while the shift sits in this zone.
    pub fn action(self) -> &'static str {
        match self {
            Zone::Recovery => "Reduce labor / tighten deployment",
            Zone::Stabilize => "Hold, coach, no adds",
            Zone::Sustain => "Maintain deployment",
            Zone::Invest => "Prep, train, clean",
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Half-widths of the symmetric bands around target, in productivity points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoneBands {
    pub inner: f64,
    pub outer: f64,
}

impl Default for ZoneBands {
    fn default() -> Self {
        Self {
            inner: 3.0,
            outer: 8.0,
        }
    }
}

impl ZoneBands {
    pub fn new(inner: f64, outer: f64) -> EngineResult<Self> {
        let bands = Self { inner, outer };
        bands.validate()?;
        Ok(bands)
    }

    pub fn validate(&self) -> EngineResult<()> {
        if !self.inner.is_finite() || !self.outer.is_finite() || self.inner <= 0.0 {
            return Err(EngineError::configuration(format!(
                "zone bands must be positive, got inner {} outer {}",
                self.inner, self.outer
            )));
        }
        if self.outer <= self.inner {
            return Err(EngineError::configuration(format!(
                "outer zone band {} must be wider than inner band {}",
                self.outer, self.inner
            )));
        }
        Ok(())
    }

    /// Productivity values where the zone changes, lowest first:
    /// Recovery/Stabilize, Stabilize/Sustain, Sustain/Invest, and the outer
    /// edge used to close the Invest arc on a gauge.
    pub fn boundaries(&self, target: f64) -> [f64; 4] {
        [
            target - self.outer,
            target - self.inner,
            target + self.inner,
            target + self.outer,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub zone: Zone,
    pub action: &'static str,
    pub diff: f64,
}

/// A productivity reading counts only when it is present and positive; zero
/// means "not entered yet".
fn entered(value: Option<f64>) -> Option<f64> {
    value.filter(|value| value.is_finite() && *value > 0.0)
}

pub fn classify(actual: Option<f64>, target: Option<f64>, bands: &ZoneBands) -> Option<Classification> {
    let actual = entered(actual)?;
    let target = entered(target)?;
    let diff = actual - target;
    let zone = if diff <= -bands.outer {
        Zone::Recovery
    } else if diff <= -bands.inner {
        Zone::Stabilize
    } else if diff <= bands.inner {
        Zone::Sustain
    } else {
        Zone::Invest
    };
    Some(Classification {
        zone,
        action: zone.action(),
        diff,
    })
}

/// Labor hours used beyond (positive) or below (negative) what the target
/// productivity implies for the same sales.
pub fn labor_delta(sales: Option<f64>, actual: Option<f64>, target: Option<f64>) -> Option<f64> {
    let sales = sales.filter(|value| value.is_finite() && *value != 0.0)?;
    let actual = entered(actual)?;
    let target = entered(target)?;
    Some(sales / actual - sales / target)
}
