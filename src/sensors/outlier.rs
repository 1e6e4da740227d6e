//! Stateless plausibility filter for raw temperature fields.

use log::warn;

/// Accept `candidate` when it parses as a number, lies within
/// `[min, max]` and, if `previous` is present, differs from it by at most
/// `max_delta`. Every rejection is logged at warn.
pub fn accept(candidate: &str, previous: Option<f64>, min: f64, max: f64, max_delta: f64) -> bool {
    let Ok(t) = candidate.trim().parse::<f64>() else {
        warn!("Not a parsable temperature '{candidate}'");
        return false;
    };
    if !t.is_finite() || t < min || t > max {
        warn!("Unrealistic temperature {t}");
        return false;
    }
    if let Some(prev) = previous {
        if (prev - t).abs() > max_delta {
            warn!("Ignoring too large temperature difference {prev} -> {t}");
            return false;
        }
    }
    true
}
