// src/lib.rs — Library root for instruct-evolve

pub mod cli;
pub mod dataset;
pub mod infra;
pub mod labeler;
pub mod optimizer;
pub mod provider;
pub mod util;
