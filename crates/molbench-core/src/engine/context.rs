use super::backend::DistanceBackend;
use super::inference::CachedInference;
use super::progress::ProgressReporter;
use crate::core::chem::MoleculeValidator;
use crate::core::models::training::TrainingSet;

/// Everything a metric needs, constructed once per run and passed by reference.
#[derive(Clone, Copy)]
pub struct BenchmarkContext<'a> {
    pub inference: &'a CachedInference<'a>,
    pub validator: &'a dyn MoleculeValidator,
    pub training_set: Option<&'a dyn TrainingSet>,
    pub backend: &'a dyn DistanceBackend,
    pub reporter: &'a ProgressReporter<'a>,
}

impl<'a> BenchmarkContext<'a> {
    pub fn new(
        inference: &'a CachedInference<'a>,
        validator: &'a dyn MoleculeValidator,
        backend: &'a dyn DistanceBackend,
        reporter: &'a ProgressReporter<'a>,
    ) -> Self {
        Self {
            inference,
            validator,
            training_set: None,
            backend,
            reporter,
        }
    }

    pub fn with_training_set(mut self, training_set: &'a dyn TrainingSet) -> Self {
        self.training_set = Some(training_set);
        self
    }
}
