use std::time::Duration;

/// Grip never reported below this, however green the track.
pub const MIN_GRIP: f64 = 0.6;
pub const MAX_GRIP: f64 = 1.0;

/// Track rubbering parameters, all in percent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GripParams {
    pub starting_value: f64,
    pub increase_per_lap: f64,
    /// Share of the driven laps carried into the next session.
    pub transfer: f64,
}

impl Default for GripParams {
    fn default() -> Self {
        GripParams {
            starting_value: 99.0,
            increase_per_lap: 0.05,
            transfer: 80.0,
        }
    }
}

/// Estimated laps driven by all connected cars, the source of track rubber.
#[derive(Debug, Clone)]
pub struct GripState {
    laps: f64,
    lap_length_km: f64,
}

impl GripState {
    /// Lap lengths below one kilometre are raised to one.
    pub fn new(lap_length_km: f64) -> Self {
        GripState {
            laps: 0.0,
            lap_length_km: lap_length_km.max(1.0),
        }
    }

    pub fn laps(&self) -> f64 {
        self.laps
    }

    pub fn lap_length_km(&self) -> f64 {
        self.lap_length_km
    }

    /// Add the distance covered in `dt` by cars moving at `speeds_kmh`.
    pub fn accumulate<I>(&mut self, speeds_kmh: I, dt: Duration)
    where
        I: IntoIterator<Item = f64>,
    {
        let hours = dt.as_secs_f64() / 3600.0;
        for speed in speeds_kmh {
            if speed.is_finite() && speed > 0.0 {
                self.laps += speed * hours / self.lap_length_km;
            }
        }
    }

    pub fn grip(&self, params: &GripParams) -> f64 {
        ((params.starting_value + params.increase_per_lap * self.laps) / 100.0)
            .clamp(MIN_GRIP, MAX_GRIP)
    }

    /// Keep only the configured share of rubber for a new session.
    pub fn carry_over(&mut self, params: &GripParams) {
        self.laps *= (params.transfer / 100.0).clamp(0.0, 1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lap_length_floor() {
        assert_eq!(GripState::new(0.2).lap_length_km(), 1.0);
        assert_eq!(GripState::new(20.8).lap_length_km(), 20.8);
    }

    #[test]
    fn accumulates_laps_from_speed() {
        let mut grip = GripState::new(5.0);
        // Two cars at 180 km/h for one minute cover 6 km, 1.2 laps.
        grip.accumulate([180.0, 180.0], Duration::from_secs(60));
        assert!((grip.laps() - 1.2).abs() < 1e-9);
    }

    #[test]
    fn ignores_bad_speeds() {
        let mut grip = GripState::new(5.0);
        grip.accumulate([-50.0, f64::NAN, f64::INFINITY], Duration::from_secs(60));
        assert_eq!(grip.laps(), 0.0);
    }

    #[test]
    fn grip_rises_and_saturates() {
        let params = GripParams::default();
        let mut grip = GripState::new(1.0);
        assert!((grip.grip(&params) - 0.99).abs() < 1e-9);
        grip.accumulate([60.0], Duration::from_secs(10 * 3600));
        assert_eq!(grip.grip(&params), 1.0);
    }

    #[test]
    fn grip_floor() {
        let params = GripParams {
            starting_value: 20.0,
            increase_per_lap: 0.0,
            transfer: 100.0,
        };
        assert_eq!(GripState::new(5.0).grip(&params), MIN_GRIP);
    }

    #[test]
    fn new_session_keeps_transfer_share() {
        let params = GripParams::default();
        let mut grip = GripState::new(1.0);
        grip.accumulate([100.0], Duration::from_secs(3600));
        grip.carry_over(&params);
        assert!((grip.laps() - 80.0).abs() < 1e-9);

        let mut grip2 = grip.clone();
        grip2.carry_over(&GripParams {
            transfer: 250.0,
            ..params
        });
        assert!((grip2.laps() - 80.0).abs() < 1e-9);
        grip.carry_over(&GripParams {
            transfer: -10.0,
            ..params
        });
        assert_eq!(grip.laps(), 0.0);
    }
}
