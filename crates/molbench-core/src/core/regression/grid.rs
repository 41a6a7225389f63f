use std::collections::BTreeMap;

/// One point in a hyperparameter grid.
pub type Hyperparameters = BTreeMap<String, f64>;

/// A hyperparameter grid: each named parameter with the values to try.
///
/// Combinations are enumerated with keys in sorted order and the last key varying
/// fastest, so the search order is stable across runs.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParamGrid(BTreeMap<String, Vec<f64>>);

impl ParamGrid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, values: Vec<f64>) -> Self {
        self.0.insert(name.to_string(), values);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, values: Vec<f64>) {
        self.0.insert(name.into(), values);
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// All combinations; an empty grid yields a single empty combination.
    pub fn combinations(&self) -> Vec<Hyperparameters> {
        let mut combos = vec![Hyperparameters::new()];
        for (name, values) in &self.0 {
            combos = combos
                .into_iter()
                .flat_map(|combo| {
                    values.iter().map(move |&v| {
                        let mut next = combo.clone();
                        next.insert(name.clone(), v);
                        next
                    })
                })
                .collect();
        }
        combos
    }
}

impl FromIterator<(String, Vec<f64>)> for ParamGrid {
    fn from_iter<I: IntoIterator<Item = (String, Vec<f64>)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_sorted_key_varies_fastest() {
        let grid = ParamGrid::new()
            .with("b", vec![1.0, 2.0])
            .with("a", vec![10.0, 20.0]);
        let combos = grid.combinations();
        let pairs: Vec<(f64, f64)> = combos.iter().map(|c| (c["a"], c["b"])).collect();
        assert_eq!(pairs, vec![(10.0, 1.0), (10.0, 2.0), (20.0, 1.0), (20.0, 2.0)]);
    }

    #[test]
    fn empty_grid_yields_one_empty_combination() {
        let combos = ParamGrid::new().combinations();
        assert_eq!(combos.len(), 1);
        assert!(combos[0].is_empty());
    }

    #[test]
    fn empty_value_list_yields_no_combinations() {
        assert!(ParamGrid::new().with("alpha", vec![]).combinations().is_empty());
    }
}
