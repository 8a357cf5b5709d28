pub mod features;
pub mod model;

pub use features::FeatureFrame;
pub use model::{LogisticModel, ModelWeights, SolverOptions, TrainingReport};
