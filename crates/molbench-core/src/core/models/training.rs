use std::collections::HashSet;

/// Membership oracle for the molecules a generative model was trained on.
pub trait TrainingSet: Send + Sync {
    fn contains(&self, smiles: &str) -> bool;
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A training set held entirely in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SmilesSet {
    molecules: HashSet<String>,
}

impl SmilesSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, smiles: impl Into<String>) -> bool {
        self.molecules.insert(smiles.into())
    }
}

impl<S: Into<String>> FromIterator<S> for SmilesSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            molecules: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl TrainingSet for SmilesSet {
    fn contains(&self, smiles: &str) -> bool {
        self.molecules.contains(smiles)
    }

    fn len(&self) -> usize {
        self.molecules.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership_is_exact_string_match() {
        let set: SmilesSet = ["CCO", "c1ccccc1"].into_iter().collect();
        assert!(set.contains("CCO"));
        assert!(!set.contains("OCC"));
        assert_eq!(set.len(), 2);
        assert!(!set.is_empty());
    }
}
