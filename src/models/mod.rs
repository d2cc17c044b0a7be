pub mod context;
pub mod feedback;
pub mod recommendation;

pub use context::{ContextSnapshot, FeatureVector, Scalar};
pub use feedback::{FeedbackRecord, TrainingSample};
pub use recommendation::{Arrangement, Recommendation, Settings};
