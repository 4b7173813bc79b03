//! Normalizer core - deterministic command/utterance normalization
//!
//! This crate turns one raw line of text - a CLI command or a
//! conversational task request - into a canonical task payload, a
//! resolved command, a clarification question, or a typed rejection.
//! The pipeline is pure and rule-driven: identical input and tables
//! always produce an identical outcome, and temporal language is kept
//! as text, never resolved into dates.

pub mod canonical;
pub mod engine;
pub mod entities;
pub mod intent;
pub mod normalize;
pub mod resolve;
pub mod score;
pub mod tables;
pub mod tokenize;
pub mod types;

pub use engine::*;
pub use tables::*;
pub use types::*;

// Python bindings
#[cfg(feature = "extension-module")]
pub mod py;

#[cfg(feature = "extension-module")]
use pyo3::prelude::*;

#[cfg(feature = "extension-module")]
#[pymodule]
fn normalizer_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    use py::*;
    m.add_class::<PyEngine>()?;
    m.add_function(wrap_pyfunction!(py_parse_text, m)?)?;
    Ok(())
}
