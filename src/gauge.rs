//! Angle geometry for circular productivity gauges.
//!
//! Angles are in degrees, measured the way SVG measures them (clockwise from
//! the positive x axis). Nothing here knows about rendering.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::zone::{Zone, ZoneBands};

/// Arcs narrower than this are not drawn.
pub const MIN_ARC_DEGREES: f64 = 1.0;

/// Maps `value` from `[value_min, value_max]` onto the dial, clamping to the
/// ends, and normalizes the result into `[0, 360)`.
pub fn angle(value: f64, value_min: f64, value_max: f64, start_angle: f64, angular_span: f64) -> EngineResult<f64> {
    if value_min == value_max || !(value_max - value_min).is_finite() {
        return Err(EngineError::domain(format!(
            "gauge scale {value_min}..{value_max} has no width"
        )));
    }
    if !value.is_finite() {
        return Err(EngineError::domain(format!("cannot place {value} on a gauge")));
    }
    let ratio = ((value - value_min) / (value_max - value_min)).clamp(0.0, 1.0);
    Ok((start_angle + ratio * angular_span).rem_euclid(360.0))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArcSweep {
    pub start: f64,
    /// End angle, unwrapped so that `end >= start`.
    pub end: f64,
    pub sweep: f64,
    pub large_arc: bool,
}

/// Clockwise arc from `start` to `end`. An end before the start wraps through
/// 360. Returns `None` for arcs narrower than [`MIN_ARC_DEGREES`].
pub fn arc(start: f64, end: f64) -> Option<ArcSweep> {
    let end = if end < start { end + 360.0 } else { end };
    let sweep = end - start;
    if !sweep.is_finite() || sweep.abs() < MIN_ARC_DEGREES {
        return None;
    }
    Some(ArcSweep {
        start,
        end,
        sweep,
        large_arc: sweep > 180.0,
    })
}

/// `count` evenly spaced values from `min` to `max` inclusive.
pub fn ticks(min: f64, max: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![min],
        _ => {
            let step = (max - min) / (count - 1) as f64;
            (0..count)
                .map(|index| if index == count - 1 { max } else { min + index as f64 * step })
                .collect()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DialScale {
    pub min: f64,
    pub max: f64,
}

impl DialScale {
    pub fn new(min: f64, max: f64) -> EngineResult<Self> {
        if !(min < max) || !(max - min).is_finite() {
            return Err(EngineError::domain(format!("dial scale {min}..{max} is empty")));
        }
        Ok(Self { min, max })
    }

    /// A window of `window` points centred on `target`, with the lower end
    /// never below 1.
    pub fn centered(target: f64, window: f64) -> EngineResult<Self> {
        Self::new((target - window / 2.0).max(1.0), target + window / 2.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GaugeGeometry {
    pub start_angle: f64,
    pub span: f64,
    /// Width of the target-centred scale, in productivity points.
    #[serde(default = "default_dial_window")]
    pub dial_window: f64,
}

fn default_dial_window() -> f64 {
    40.0
}

impl Default for GaugeGeometry {
    fn default() -> Self {
        Self {
            start_angle: 135.0,
            span: 270.0,
            dial_window: default_dial_window(),
        }
    }
}

impl GaugeGeometry {
    pub fn validate(&self) -> EngineResult<()> {
        if !self.start_angle.is_finite() || !self.span.is_finite() {
            return Err(EngineError::configuration("gauge angles must be finite"));
        }
        if self.span <= 0.0 || self.span > 360.0 {
            return Err(EngineError::configuration(format!(
                "gauge span {} must be within (0, 360]",
                self.span
            )));
        }
        if !self.dial_window.is_finite() || self.dial_window <= 0.0 {
            return Err(EngineError::configuration(format!(
                "dial window {} must be positive",
                self.dial_window
            )));
        }
        Ok(())
    }

    pub fn angle(&self, value: f64, scale: &DialScale) -> EngineResult<f64> {
        angle(value, scale.min, scale.max, self.start_angle, self.span)
    }

    pub fn end_angle(&self) -> f64 {
        (self.start_angle + self.span).rem_euclid(360.0)
    }

    /// Needle position for a reading; unset or non-positive readings have no
    /// needle.
    pub fn needle(&self, value: Option<f64>, scale: &DialScale) -> EngineResult<Option<f64>> {
        match value.filter(|value| *value > 0.0) {
            Some(value) => self.angle(value, scale).map(Some),
            None => Ok(None),
        }
    }

    /// Arcs for each zone around `target`, clipped to the scale. Zones that
    /// collapse to less than a degree are left out.
    pub fn zone_arcs(&self, target: f64, bands: &ZoneBands, scale: &DialScale) -> EngineResult<Vec<(Zone, ArcSweep)>> {
        let [recovery, stabilize, sustain, invest] = bands.boundaries(target);
        let edges = [
            self.start_angle.rem_euclid(360.0),
            self.angle(recovery, scale)?,
            self.angle(stabilize, scale)?,
            self.angle(sustain, scale)?,
            self.angle(invest, scale)?,
        ];
        Ok(Zone::ALL
            .into_iter()
            .zip(edges.windows(2))
            .filter_map(|(zone, pair)| arc(pair[0], pair[1]).map(|sweep| (zone, sweep)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_wrap_around_the_dial() {
        assert_eq!(angle(60.0, 60.0, 80.0, 135.0, 270.0).unwrap(), 135.0);
        assert_eq!(angle(80.0, 60.0, 80.0, 135.0, 270.0).unwrap(), 45.0);
        assert_eq!(angle(70.0, 60.0, 80.0, 135.0, 270.0).unwrap(), 270.0);
    }

    #[test]
    fn full_scale_sweeps_the_configured_span() {
        for (start, span) in [(135.0, 270.0), (180.0, 180.0), (0.0, 90.0), (300.0, 200.0)] {
            let low = angle(10.0, 10.0, 50.0, start, span).unwrap();
            let high = angle(50.0, 10.0, 50.0, start, span).unwrap();
            let difference = (high - low).rem_euclid(360.0);
            assert!((difference - span.rem_euclid(360.0)).abs() < 1e-9);
        }
    }

    #[test]
    fn values_outside_the_scale_clamp() {
        assert_eq!(angle(10.0, 60.0, 80.0, 135.0, 270.0).unwrap(), 135.0);
        assert_eq!(angle(500.0, 60.0, 80.0, 135.0, 270.0).unwrap(), 45.0);
    }

    #[test]
    fn degenerate_scale_is_rejected() {
        assert!(angle(70.0, 70.0, 70.0, 135.0, 270.0).is_err());
        assert!(DialScale::new(5.0, 5.0).is_err());
    }

    #[test]
    fn arc_wraps_when_end_precedes_start() {
        let sweep = arc(300.0, 45.0).unwrap();
        assert_eq!(sweep.end, 405.0);
        assert_eq!(sweep.sweep, 105.0);
        assert!(!sweep.large_arc);

        let long = arc(135.0, 45.0).unwrap();
        assert_eq!(long.sweep, 270.0);
        assert!(long.large_arc);
    }

    #[test]
    fn tiny_arcs_are_degenerate() {
        assert!(arc(90.0, 90.5).is_none());
        assert!(arc(90.0, 90.0).is_none());
        assert!(arc(90.0, 91.0).is_some());
    }

    #[test]
    fn ticks_are_evenly_spaced() {
        let values = ticks(4000.0, 8000.0, 17);
        assert_eq!(values.len(), 17);
        assert_eq!(values[0], 4000.0);
        assert_eq!(values[4], 5000.0);
        assert_eq!(values[16], 8000.0);
        assert!(ticks(0.0, 1.0, 0).is_empty());
    }

    #[test]
    fn centered_scale_floors_at_one() {
        let scale = DialScale::centered(70.0, 40.0).unwrap();
        assert_eq!((scale.min, scale.max), (50.0, 90.0));
        let low = DialScale::centered(10.0, 40.0).unwrap();
        assert_eq!((low.min, low.max), (1.0, 30.0));
    }

    #[test]
    fn target_sits_mid_dial_and_zones_are_ordered() {
        let geometry = GaugeGeometry::default();
        let scale = DialScale::centered(70.0, 40.0).unwrap();
        assert_eq!(geometry.angle(70.0, &scale).unwrap(), 270.0);

        let arcs = geometry.zone_arcs(70.0, &ZoneBands::default(), &scale).unwrap();
        let zones: Vec<Zone> = arcs.iter().map(|(zone, _)| *zone).collect();
        assert_eq!(zones, Zone::ALL.to_vec());
        let sustain = arcs[2].1;
        assert!((sustain.sweep - 6.0 / 40.0 * 270.0).abs() < 1e-9);
    }

    #[test]
    fn needle_is_hidden_without_a_reading() {
        let geometry = GaugeGeometry::default();
        let scale = DialScale::new(60.0, 80.0).unwrap();
        assert_eq!(geometry.needle(None, &scale).unwrap(), None);
        assert_eq!(geometry.needle(Some(0.0), &scale).unwrap(), None);
        assert_eq!(geometry.needle(Some(80.0), &scale).unwrap(), Some(45.0));
    }

    #[test]
    fn end_angle_wraps_past_full_turn() {
        assert_eq!(GaugeGeometry::default().end_angle(), 45.0);
        let half = GaugeGeometry {
            start_angle: 180.0,
            span: 180.0,
            ..GaugeGeometry::default()
        };
        assert_eq!(half.end_angle(), 0.0);
    }

    #[test]
    fn geometry_validation() {
        assert!(GaugeGeometry::default().validate().is_ok());
        let flat = GaugeGeometry {
            span: 0.0,
            ..GaugeGeometry::default()
        };
        assert!(flat.validate().is_err());
    }
}
