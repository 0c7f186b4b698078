//! The model-backed and pure stages of the pipeline.

pub mod answer;
pub mod decompose;
pub mod fuse;
pub mod select;
pub mod verify;

pub use answer::SubAnswerGenerator;
pub use decompose::{parse_subquestions, QueryDecomposer};
pub use fuse::{render_evidence, AnswerFuser};
pub use select::{select, select_baseline, select_evidence};
pub use verify::FaithfulnessVerifier;
