use std::collections::HashMap;
use std::sync::OnceLock;

use super::types::WeatherType;

/// Weighted selection table: `(weight, type)` pairs.
pub type ChanceTable = Vec<(f64, WeatherType)>;

/// Which weather types may follow which, plus the weighted tables the
/// randomizer draws from. Built once and only ever read afterwards.
#[derive(Debug, Clone)]
pub struct WeatherGraph {
    neighbours: HashMap<WeatherType, Vec<WeatherType>>,
    pub regular: ChanceTable,
    pub rain: ChanceTable,
    pub thunderstorm: ChanceTable,
}

static STANDARD: OnceLock<WeatherGraph> = OnceLock::new();

const CONNECTIONS: &[(WeatherType, WeatherType)] = {
    use crate::weather::types::WeatherType::*;
    &[
        (Clear, FewClouds),
        (Clear, ScatteredClouds),
        (Clear, Mist),
        (FewClouds, ScatteredClouds),
        (FewClouds, BrokenClouds),
        (FewClouds, Mist),
        (FewClouds, Windy),
        (FewClouds, LightDrizzle),
        (ScatteredClouds, BrokenClouds),
        (ScatteredClouds, OvercastClouds),
        (ScatteredClouds, Mist),
        (ScatteredClouds, Windy),
        (ScatteredClouds, Drizzle),
        (ScatteredClouds, LightRain),
        (BrokenClouds, OvercastClouds),
        (BrokenClouds, Mist),
        (BrokenClouds, Windy),
        (BrokenClouds, Drizzle),
        (BrokenClouds, Rain),
        (OvercastClouds, Mist),
        (OvercastClouds, Fog),
        (OvercastClouds, Windy),
        (OvercastClouds, HeavyDrizzle),
        (OvercastClouds, Rain),
        (Fog, Mist),
        (Fog, Rain),
        (Mist, LightDrizzle),
        (Mist, LightRain),
        (Mist, Windy),
        (Windy, Drizzle),
        (Windy, LightRain),
        (Windy, Rain),
        (LightDrizzle, Drizzle),
        (LightDrizzle, HeavyDrizzle),
        (LightDrizzle, LightRain),
        (LightDrizzle, Rain),
        (Drizzle, HeavyDrizzle),
        (Drizzle, LightRain),
        (Drizzle, Rain),
        (HeavyDrizzle, LightRain),
        (HeavyDrizzle, Rain),
        (HeavyDrizzle, HeavyRain),
        (HeavyDrizzle, LightThunderstorm),
        (LightRain, Rain),
        (LightRain, LightThunderstorm),
        (Rain, HeavyRain),
        (Rain, Thunderstorm),
        (HeavyRain, Thunderstorm),
        (HeavyRain, HeavyThunderstorm),
        (LightThunderstorm, Thunderstorm),
        (Thunderstorm, HeavyThunderstorm),
    ]
};

impl WeatherGraph {
    /// The shared graph, built on first use.
    pub fn standard() -> &'static WeatherGraph {
        STANDARD.get_or_init(WeatherGraph::build)
    }

    fn build() -> Self {
        use crate::weather::types::WeatherType::*;

        let mut neighbours: HashMap<WeatherType, Vec<WeatherType>> = HashMap::new();
        for &(a, b) in CONNECTIONS {
            neighbours.entry(a).or_default().push(b);
            neighbours.entry(b).or_default().push(a);
        }
        // Staying put is always a legal move.
        for (key, list) in neighbours.iter_mut() {
            list.push(*key);
        }

        WeatherGraph {
            neighbours,
            regular: vec![
                (0.4, Clear),
                (0.2, FewClouds),
                (0.1, ScatteredClouds),
                (0.1, BrokenClouds),
                (0.2, OvercastClouds),
                (0.1, Fog),
                (0.1, Mist),
                (0.2, Windy),
            ],
            rain: vec![
                (0.1, LightDrizzle),
                (0.2, Drizzle),
                (0.2, HeavyDrizzle),
                (0.2, LightRain),
                (0.3, Rain),
                (0.1, HeavyRain),
            ],
            thunderstorm: vec![
                (0.6, LightThunderstorm),
                (0.3, Thunderstorm),
                (0.1, HeavyThunderstorm),
            ],
        }
    }

    /// Types reachable from `weather_type` in one change, itself included.
    /// `None` for types outside the graph (snow, dust, ...).
    pub fn neighbours(&self, weather_type: WeatherType) -> Option<&[WeatherType]> {
        self.neighbours.get(&weather_type).map(Vec::as_slice)
    }

    pub fn is_rain(&self, weather_type: WeatherType) -> bool {
        self.rain.iter().any(|(_, t)| *t == weather_type)
    }

    pub fn is_thunderstorm(&self, weather_type: WeatherType) -> bool {
        self.thunderstorm.iter().any(|(_, t)| *t == weather_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weather::types::WeatherType::*;

    #[test]
    fn every_node_neighbours_itself() {
        let graph = WeatherGraph::standard();
        for t in WeatherType::ALL {
            if let Some(list) = graph.neighbours(t) {
                assert!(list.contains(&t), "{t} missing self-loop");
            }
        }
    }

    #[test]
    fn connections_are_symmetric() {
        let graph = WeatherGraph::standard();
        for &(a, b) in CONNECTIONS {
            assert!(graph.neighbours(a).unwrap().contains(&b));
            assert!(graph.neighbours(b).unwrap().contains(&a));
        }
    }

    #[test]
    fn clear_cannot_jump_to_thunderstorm() {
        let graph = WeatherGraph::standard();
        let list = graph.neighbours(Clear).unwrap();
        assert_eq!(list.len(), 4);
        assert!(list.contains(&FewClouds));
        assert!(!list.contains(&Thunderstorm));
    }

    #[test]
    fn types_outside_the_graph_have_no_neighbours() {
        let graph = WeatherGraph::standard();
        assert!(graph.neighbours(Snow).is_none());
        assert!(graph.neighbours(Hurricane).is_none());
    }

    #[test]
    fn bands_partition_tables() {
        let graph = WeatherGraph::standard();
        assert!(graph.is_rain(Drizzle));
        assert!(!graph.is_rain(Thunderstorm));
        assert!(graph.is_thunderstorm(HeavyThunderstorm));
        assert!(!graph.is_thunderstorm(Clear));
        for (_, t) in &graph.regular {
            assert!(!graph.is_rain(*t) && !graph.is_thunderstorm(*t));
        }
    }

    #[test]
    fn tables_have_positive_weights() {
        let graph = WeatherGraph::standard();
        for table in [&graph.regular, &graph.rain, &graph.thunderstorm] {
            assert!(table.iter().all(|(w, _)| *w > 0.0));
        }
    }
}
