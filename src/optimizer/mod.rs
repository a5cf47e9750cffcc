// src/optimizer/mod.rs — Instruction optimization loop

pub mod engine;
pub mod guard;
pub mod mutator;
pub mod report;
pub mod scorer;
pub mod types;

pub use engine::InstructionOptimizer;
pub use mutator::{InstructionWriter, LlmInstructionWriter, Mutator};
pub use report::{BenchmarkRow, BenchmarkTable, OptimizationResult};
pub use scorer::Scorer;
pub use types::{Candidate, MismatchedRow, MutationMode, ProgressEvent, RunConfig};
