use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use super::graph::WeatherGraph;
use super::types::{WeatherDescription, WeatherType};

/// Chance that a band (rain, thunderstorm) persists into the next change.
const BAND_CONTINUATION: f64 = 0.8;
/// Chance of keeping the same type when changes are not limited to neighbours.
const STAY_CHANCE: f64 = 0.2;
const SYNTHETIC_PRESSURE_HPA: f64 = 1030.0;

/// Tunables for synthetic weather generation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RandomWeatherPolicy {
    pub neighbours_only: bool,
    /// Per-change chance of rain, 0–1.
    pub rain_chance: f64,
    /// Per-change chance of a thunderstorm, 0–1.
    pub thunder_chance: f64,
}

impl Default for RandomWeatherPolicy {
    fn default() -> Self {
        RandomWeatherPolicy {
            neighbours_only: true,
            rain_chance: 0.05,
            thunder_chance: 0.005,
        }
    }
}

/// Weighted pick from `table`, restricted to `allowed` when given.
///
/// Draws uniformly in `[0, Σweights)` and returns the first entry whose
/// cumulative weight exceeds the draw. Returns `None` when nothing is left
/// after filtering.
pub fn pick_weather_type<R: Rng + ?Sized>(
    table: &[(f64, WeatherType)],
    allowed: Option<&[WeatherType]>,
    rng: &mut R,
) -> Option<WeatherType> {
    let filtered: Vec<(f64, WeatherType)> = table
        .iter()
        .copied()
        .filter(|(_, t)| allowed.is_none_or(|list| list.contains(t)))
        .collect();
    let first = filtered.first()?.1;

    let total: f64 = filtered.iter().map(|(w, _)| w).sum();
    let mut chance = rng.r#gen::<f64>() * total;
    for (weight, weather_type) in &filtered {
        if chance < *weight {
            return Some(*weather_type);
        }
        chance -= weight;
    }
    Some(first)
}

/// Synthetic weather generator. Owns its PRNG so runs can be reproduced from a seed.
pub struct WeatherRandomizer<'g> {
    graph: &'g WeatherGraph,
    policy: RandomWeatherPolicy,
    rng: ChaCha8Rng,
}

impl<'g> WeatherRandomizer<'g> {
    /// Seed 0 picks a seed from system entropy.
    pub fn new(graph: &'g WeatherGraph, policy: RandomWeatherPolicy, seed: u64) -> Self {
        let rng = if seed == 0 {
            ChaCha8Rng::from_entropy()
        } else {
            ChaCha8Rng::seed_from_u64(seed)
        };
        WeatherRandomizer { graph, policy, rng }
    }

    pub fn policy(&self) -> &RandomWeatherPolicy {
        &self.policy
    }

    /// Uniform draw in `[min, max)`, shared with the callers that jitter
    /// durations and rain endpoints.
    pub fn uniform(&mut self, min: f64, max: f64) -> f64 {
        min + self.rng.r#gen::<f64>() * (max - min)
    }

    /// Next weather type given the previous one.
    ///
    /// Thunderstorms are tried first, then rain, then the regular table, so
    /// wet bands tend to persist without a fixed transition matrix.
    pub fn generate_random_weather_type(&mut self, previous: Option<WeatherType>) -> WeatherType {
        let policy = self.policy;

        if !policy.neighbours_only {
            if let Some(previous) = previous {
                if self.rng.r#gen::<f64>() < STAY_CHANCE {
                    return previous;
                }
            }
        }

        let allowed = match previous {
            Some(previous) if policy.neighbours_only => self.graph.neighbours(previous),
            _ => None,
        };

        let chance = self.rng.r#gen::<f64>() * (policy.thunder_chance + policy.rain_chance).max(1.0)
            - policy.thunder_chance;

        let in_thunder = previous.is_some_and(|t| self.graph.is_thunderstorm(t));
        if chance < 0.0 || (in_thunder && self.rng.r#gen::<f64>() < BAND_CONTINUATION) {
            if let Some(t) = pick_weather_type(&self.graph.thunderstorm, allowed, &mut self.rng) {
                return t;
            }
        }

        let in_rain = previous.is_some_and(|t| self.graph.is_rain(t));
        if chance < policy.rain_chance || (in_rain && self.rng.r#gen::<f64>() < BAND_CONTINUATION) {
            if let Some(t) = pick_weather_type(&self.graph.rain, allowed, &mut self.rng) {
                return t;
            }
        }

        // Storm nodes have no regular neighbour: clear up.
        pick_weather_type(&self.graph.regular, allowed, &mut self.rng).unwrap_or(WeatherType::Clear)
    }

    /// Next full description: the type's baseline with jitter applied.
    pub fn generate_random_description(&mut self, previous: Option<WeatherType>) -> WeatherDescription {
        let weather_type = self.generate_random_weather_type(previous);
        match previous {
            Some(previous) => debug!(from = %previous, to = %weather_type, "Switching weather"),
            None => debug!(to = %weather_type, "Initial weather"),
        }

        let baseline = weather_type.baseline();
        WeatherDescription {
            weather_type,
            temperature: baseline.temperature * self.uniform(0.95, 1.05),
            wind_speed: baseline.wind_speed * self.uniform(0.6, 1.2),
            wind_direction: self.uniform(0.0, 360.0),
            humidity: (baseline.humidity * self.uniform(0.6, 1.2)).clamp(0.0, 1.0),
            pressure: SYNTHETIC_PRESSURE_HPA,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use crate::weather::types::WeatherType::*;

    fn randomizer(policy: RandomWeatherPolicy, seed: u64) -> WeatherRandomizer<'static> {
        WeatherRandomizer::new(WeatherGraph::standard(), policy, seed)
    }

    #[test]
    fn pick_from_empty_filter_returns_none() {
        let graph = WeatherGraph::standard();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let allowed = [Clear, FewClouds];
        assert_eq!(pick_weather_type(&graph.thunderstorm, Some(&allowed), &mut rng), None);
        assert_eq!(pick_weather_type(&[], None, &mut rng), None);
    }

    #[test]
    fn pick_respects_allowed_subset() {
        let graph = WeatherGraph::standard();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let allowed = [Fog, Mist];
        for _ in 0..200 {
            let t = pick_weather_type(&graph.regular, Some(&allowed), &mut rng).unwrap();
            assert!(allowed.contains(&t));
        }
    }

    #[test]
    fn pick_follows_weights() {
        let table = vec![(0.9, Clear), (0.1, Fog)];
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut counts: HashMap<WeatherType, u32> = HashMap::new();
        for _ in 0..10_000 {
            *counts.entry(pick_weather_type(&table, None, &mut rng).unwrap()).or_default() += 1;
        }
        let clear = counts[&Clear] as f64 / 10_000.0;
        assert!((clear - 0.9).abs() < 0.03, "clear share {clear}");
    }

    #[test]
    fn same_seed_same_sequence() {
        let mut a = randomizer(RandomWeatherPolicy::default(), 99);
        let mut b = randomizer(RandomWeatherPolicy::default(), 99);
        let mut prev_a = None;
        let mut prev_b = None;
        for _ in 0..50 {
            let da = a.generate_random_description(prev_a);
            let db = b.generate_random_description(prev_b);
            assert_eq!(da, db);
            prev_a = Some(da.weather_type);
            prev_b = Some(db.weather_type);
        }
    }

    #[test]
    fn neighbours_only_never_leaves_the_graph_edge() {
        let graph = WeatherGraph::standard();
        let policy = RandomWeatherPolicy {
            neighbours_only: true,
            rain_chance: 0.3,
            thunder_chance: 0.1,
        };
        let mut r = randomizer(policy, 5);
        let mut current = Clear;
        for _ in 0..2000 {
            let next = r.generate_random_weather_type(Some(current));
            assert!(
                next == Clear || graph.neighbours(current).unwrap().contains(&next),
                "{current} -> {next} is not an edge"
            );
            current = next;
        }
    }

    #[test]
    fn zero_chances_stay_in_regular_band() {
        let graph = WeatherGraph::standard();
        let policy = RandomWeatherPolicy {
            neighbours_only: false,
            rain_chance: 0.0,
            thunder_chance: 0.0,
        };
        let mut r = randomizer(policy, 11);
        let mut prev = None;
        for _ in 0..1000 {
            let t = r.generate_random_weather_type(prev);
            assert!(!graph.is_rain(t) && !graph.is_thunderstorm(t), "{t}");
            prev = Some(t);
        }
    }

    #[test]
    fn certain_thunder_picks_thunderstorm() {
        let graph = WeatherGraph::standard();
        let policy = RandomWeatherPolicy {
            neighbours_only: false,
            rain_chance: 0.0,
            thunder_chance: 1.0,
        };
        let mut r = randomizer(policy, 3);
        for _ in 0..200 {
            assert!(graph.is_thunderstorm(r.generate_random_weather_type(None)));
        }
    }

    #[test]
    fn rain_band_is_sticky() {
        let graph = WeatherGraph::standard();
        let policy = RandomWeatherPolicy {
            neighbours_only: false,
            rain_chance: 0.0,
            thunder_chance: 0.0,
        };
        let mut r = randomizer(policy, 21);
        let mut wet = 0;
        for _ in 0..2000 {
            if graph.is_rain(r.generate_random_weather_type(Some(Rain))) {
                wet += 1;
            }
        }
        // 20% stay plus 80% × 80% continuation.
        let share = wet as f64 / 2000.0;
        assert!(share > 0.75 && share < 0.9, "wet share {share}");
    }

    #[test]
    fn unconnected_previous_type_uses_full_tables() {
        // Snow has no neighbours, so nothing is filtered and the regular table applies.
        let graph = WeatherGraph::standard();
        let mut r = randomizer(RandomWeatherPolicy::default(), 8);
        let t = r.generate_random_weather_type(Some(Snow));
        assert!(graph.regular.iter().any(|(_, x)| *x == t) || graph.is_rain(t) || graph.is_thunderstorm(t));
    }

    #[test]
    fn thunderstorm_without_regular_neighbours_clears() {
        let graph = WeatherGraph::standard();
        let policy = RandomWeatherPolicy {
            neighbours_only: true,
            rain_chance: 0.0,
            thunder_chance: 0.0,
        };
        let mut r = randomizer(policy, 13);
        let mut cleared = 0;
        for _ in 0..1000 {
            let next = r.generate_random_weather_type(Some(Thunderstorm));
            assert!(next == Clear || graph.is_thunderstorm(next), "{next}");
            if next == Clear {
                cleared += 1;
            }
        }
        // 80% band continuation, every other draw misses the regular table.
        let share = cleared as f64 / 1000.0;
        assert!(share > 0.15 && share < 0.25, "clear share {share}");
    }

    #[test]
    fn description_jitter_stays_in_bounds() {
        let mut r = randomizer(RandomWeatherPolicy::default(), 17);
        let mut prev = None;
        for _ in 0..500 {
            let d = r.generate_random_description(prev);
            let base = d.weather_type.baseline();
            assert!(d.temperature >= base.temperature * 0.95 && d.temperature <= base.temperature * 1.05);
            assert!(d.wind_speed >= base.wind_speed * 0.6 && d.wind_speed <= base.wind_speed * 1.2);
            assert!((0.0..360.0).contains(&d.wind_direction));
            assert!((0.0..=1.0).contains(&d.humidity));
            assert_eq!(d.pressure, 1030.0);
            prev = Some(d.weather_type);
        }
    }
}
