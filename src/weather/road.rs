//! Diurnal road surface temperature.

const SECONDS_PER_DAY: f64 = 24.0 * 60.0 * 60.0;

/// Daylight window in seconds from midnight. Inside it the road follows the
/// solar heating curve; outside it temperatures are interpolated across the night.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DaylightWindow {
    pub start: f64,
    pub end: f64,
}

impl Default for DaylightWindow {
    fn default() -> Self {
        DaylightWindow {
            start: 8.0 * 60.0 * 60.0,
            end: 18.0 * 60.0 * 60.0,
        }
    }
}

impl DaylightWindow {
    /// Road temperature at `seconds` past midnight for the given ambient
    /// temperature and sky coefficient (see `WeatherType::road_temperature_coefficient`).
    pub fn road_temperature(&self, seconds: f64, ambient: f64, coefficient: f64) -> f64 {
        if seconds < self.start || seconds > self.end {
            let morning = self.daylight_curve(self.start, ambient, coefficient);
            let evening = self.daylight_curve(self.end, ambient, coefficient);
            let from = self.start;
            let to = self.end - SECONDS_PER_DAY;
            let seconds = if seconds > self.end {
                seconds - SECONDS_PER_DAY
            } else {
                seconds
            };
            return morning + (evening - morning) * (seconds - from) / (to - from);
        }
        self.daylight_curve(seconds, ambient, coefficient)
    }

    fn daylight_curve(&self, seconds: f64, ambient: f64, coefficient: f64) -> f64 {
        let time = (seconds / 3600.0 - 7.0) * 0.04167;
        let k = if coefficient == 0.0 { 1.0 } else { coefficient };
        ambient
            * (1.0
                + 5.33332
                    * k
                    * (1.0 - time)
                    * ((-6.0 * time).exp() * (6.0 * time).sin() + 0.25)
                    * (0.9 * time).sin())
    }
}
