pub mod bleu;
pub mod evaluator;
pub mod reference_index;

pub use evaluator::{BleuEvaluator, Evaluator};
pub use reference_index::ReferenceIndex;
