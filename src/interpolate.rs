use crate::error::{EngineError, EngineResult};

/// Where a value fell relative to an interpolation domain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RangeReading {
    Below,
    Within(f64),
    Above,
}

impl RangeReading {
    pub fn value(self) -> Option<f64> {
        match self {
            RangeReading::Within(value) => Some(value),
            RangeReading::Below | RangeReading::Above => None,
        }
    }
}

/// Linear map from `[src_min, src_max]` onto `[dst_min, dst_max]`, clamped at
/// both ends. The endpoints map exactly onto `dst_min` and `dst_max`.
pub fn interpolate(
    value: f64,
    src_min: f64,
    src_max: f64,
    dst_min: f64,
    dst_max: f64,
) -> EngineResult<f64> {
    ensure_width(src_min, src_max)?;
    ensure_finite(value)?;
    let ratio = ((value - src_min) / (src_max - src_min)).clamp(0.0, 1.0);
    if ratio == 0.0 {
        return Ok(dst_min);
    }
    if ratio == 1.0 {
        return Ok(dst_max);
    }
    Ok(dst_min + ratio * (dst_max - dst_min))
}

/// Like [`interpolate`], but values outside the source domain are reported as
/// `Below`/`Above` instead of being clamped.
pub fn interpolate_strict(
    value: f64,
    src_min: f64,
    src_max: f64,
    dst_min: f64,
    dst_max: f64,
) -> EngineResult<RangeReading> {
    ensure_width(src_min, src_max)?;
    ensure_finite(value)?;
    let (low, high) = if src_min < src_max {
        (src_min, src_max)
    } else {
        (src_max, src_min)
    };
    if value < low {
        return Ok(RangeReading::Below);
    }
    if value > high {
        return Ok(RangeReading::Above);
    }
    interpolate(value, src_min, src_max, dst_min, dst_max).map(RangeReading::Within)
}

fn ensure_finite(value: f64) -> EngineResult<()> {
    if !value.is_finite() {
        return Err(EngineError::domain(format!("cannot interpolate {value}")));
    }
    Ok(())
}

fn ensure_width(min: f64, max: f64) -> EngineResult<()> {
    if min == max || !(max - min).is_finite() {
        return Err(EngineError::domain(format!(
            "cannot interpolate over the degenerate range {min}..{max}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn midpoint_maps_to_midpoint() {
        let value = interpolate(6000.0, 4000.0, 8000.0, 60.0, 80.0).unwrap();
        assert!((value - 70.0).abs() < 1e-9);
    }

    #[test]
    fn endpoints_are_exact_and_clamped() {
        assert_eq!(interpolate(4000.0, 4000.0, 8000.0, 60.0, 80.0).unwrap(), 60.0);
        assert_eq!(interpolate(8000.0, 4000.0, 8000.0, 60.0, 80.0).unwrap(), 80.0);
        assert_eq!(interpolate(100.0, 4000.0, 8000.0, 60.0, 80.0).unwrap(), 60.0);
        assert_eq!(interpolate(1e9, 4000.0, 8000.0, 60.0, 80.0).unwrap(), 80.0);
    }

    #[test]
    fn monotonic_in_both_directions() {
        let mut rising = f64::MIN;
        let mut falling = f64::MAX;
        for step in 0..=100 {
            let value = 4000.0 + step as f64 * 40.0;
            let up = interpolate(value, 4000.0, 8000.0, 60.0, 80.0).unwrap();
            let down = interpolate(value, 4000.0, 8000.0, 80.0, 60.0).unwrap();
            assert!(up >= rising);
            assert!(down <= falling);
            rising = up;
            falling = down;
        }
    }

    #[test]
    fn degenerate_source_range_is_a_domain_error() {
        assert!(matches!(
            interpolate(5.0, 3.0, 3.0, 0.0, 1.0),
            Err(EngineError::Domain { .. })
        ));
        assert!(interpolate_strict(5.0, 3.0, 3.0, 0.0, 1.0).is_err());
    }

    #[test]
    fn strict_variant_reports_out_of_range() {
        assert_eq!(
            interpolate_strict(3999.0, 4000.0, 8000.0, 60.0, 80.0).unwrap(),
            RangeReading::Below
        );
        assert_eq!(
            interpolate_strict(8001.0, 4000.0, 8000.0, 60.0, 80.0).unwrap(),
            RangeReading::Above
        );
        assert_eq!(
            interpolate_strict(8000.0, 4000.0, 8000.0, 60.0, 80.0).unwrap(),
            RangeReading::Within(80.0)
        );
        assert_eq!(RangeReading::Below.value(), None);
    }

    #[test]
    fn non_finite_input_is_a_domain_error() {
        assert!(matches!(
            interpolate(f64::NAN, 4000.0, 8000.0, 60.0, 80.0),
            Err(EngineError::Domain { .. })
        ));
        assert!(matches!(
            interpolate_strict(f64::NAN, 4000.0, 8000.0, 60.0, 80.0),
            Err(EngineError::Domain { .. })
        ));
        assert!(interpolate(f64::INFINITY, 4000.0, 8000.0, 60.0, 80.0).is_err());
    }
}
