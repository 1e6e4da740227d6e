//! Low-precision daylight oracle.
//!
//! Solar position from the NOAA general solar position approximation
//! (accurate to a fraction of a degree, which is plenty for deciding
//! whether the collectors can see the sun). The sun counts as shining when
//! its azimuth lies strictly between 95° and 300° and its zenith angle is
//! below 79° before local noon, or below 83.5° from noon on.

use core::f64::consts::PI;

use chrono::{DateTime, Datelike, Local, Timelike, Utc};

use crate::app::ports::DaylightPort;

const MIN_AZIMUTH: f64 = 95.0;
const MAX_AZIMUTH: f64 = 300.0;
const MORNING_ZENITH: f64 = 79.0;
const EVENING_ZENITH: f64 = 83.5;

/// Azimuth (clockwise from north) and zenith angle, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolarPosition {
    pub azimuth: f64,
    pub zenith: f64,
}

pub struct SunPositionDaylight {
    latitude: f64,
    longitude: f64,
}

impl SunPositionDaylight {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Solar position at `at` for the configured site.
    pub fn position(&self, at: DateTime<Utc>) -> SolarPosition {
        let day = f64::from(at.ordinal0());
        let hour = f64::from(at.hour())
            + f64::from(at.minute()) / 60.0
            + f64::from(at.second()) / 3600.0;
        let days_in_year = if at.date_naive().leap_year() { 366.0 } else { 365.0 };

        // Fractional year (radians)
        let g = 2.0 * PI / days_in_year * (day + (hour - 12.0) / 24.0);

        let eq_time = 229.18
            * (0.000_075 + 0.001_868 * g.cos()
                - 0.032_077 * g.sin()
                - 0.014_615 * (2.0 * g).cos()
                - 0.040_849 * (2.0 * g).sin());
        let decl = 0.006_918 - 0.399_912 * g.cos() + 0.070_257 * g.sin()
            - 0.006_758 * (2.0 * g).cos()
            + 0.000_907 * (2.0 * g).sin()
            - 0.002_697 * (3.0 * g).cos()
            + 0.001_48 * (3.0 * g).sin();

        // True solar time (minutes) and hour angle (degrees)
        let solar_minutes = hour * 60.0 + eq_time + 4.0 * self.longitude;
        let hour_angle = solar_minutes / 4.0 - 180.0;

        let lat = self.latitude.to_radians();
        let ha = hour_angle.to_radians();
        let cos_zenith = (lat.sin() * decl.sin() + lat.cos() * decl.cos() * ha.cos()).clamp(-1.0, 1.0);
        let zenith = cos_zenith.acos();

        let denom = lat.cos() * zenith.sin();
        let azimuth = if denom.abs() < 1e-9 {
            180.0
        } else {
            let a = ((lat.sin() * cos_zenith - decl.sin()) / denom)
                .clamp(-1.0, 1.0)
                .acos()
                .to_degrees();
            if hour_angle.rem_euclid(360.0) < 180.0 && hour_angle.rem_euclid(360.0) > 0.0 {
                (a + 180.0) % 360.0
            } else {
                (540.0 - a) % 360.0
            }
        };

        SolarPosition {
            azimuth,
            zenith: zenith.to_degrees(),
        }
    }

    fn shining_at(&self, position: SolarPosition, before_noon: bool) -> bool {
        let max_zenith = if before_noon {
            MORNING_ZENITH
        } else {
            EVENING_ZENITH
        };
        position.azimuth > MIN_AZIMUTH
            && position.azimuth < MAX_AZIMUTH
            && position.zenith < max_zenith
    }
}

impl DaylightPort for SunPositionDaylight {
    fn sun_shining(&self, at: DateTime<Local>) -> bool {
        let position = self.position(at.with_timezone(&Utc));
        self.shining_at(position, at.hour() < 12)
    }
}
