//! Python bindings for the normalization engine using PyO3

use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList};
use crate::engine::Engine;
use crate::tables::VerbEntry;
use crate::types::{Intent, ParseContext, ParseOutcome, VisibleItem};
use serde_json;

/// Parse one line with the default rule tables, returning the outcome
/// as a JSON string (Python function)
#[pyfunction]
pub fn py_parse_text(input: &str) -> PyResult<String> {
    let outcome = Engine::new().parse(input, &ParseContext::default());
    outcome.to_json().map_err(|e| {
        PyErr::new::<pyo3::exceptions::PyValueError, _>(format!(
            "Failed to serialize outcome: {}",
            e
        ))
    })
}

/// Python wrapper for the normalization engine
#[pyclass]
pub struct PyEngine {
    engine: Engine,
}

#[pymethods]
impl PyEngine {
    #[new]
    fn new() -> Self {
        Self {
            engine: Engine::new(),
        }
    }

    /// Register an additional verb entry before parsing
    fn add_verb(
        &mut self,
        canonical: String,
        intent: String,
        synonyms: Vec<String>,
    ) -> PyResult<()> {
        let intent = Intent::parse_name(&intent).ok_or_else(|| {
            PyErr::new::<pyo3::exceptions::PyValueError, _>(format!(
                "Unknown intent '{}'",
                intent
            ))
        })?;
        self.engine.add_verb(VerbEntry {
            canonical,
            intent,
            synonyms,
        });
        Ok(())
    }

    /// Parse one line of input against the session context
    ///
    /// `visible_items` is a list of dicts with `index`, `id` and `title`
    /// keys, mirroring what the caller currently displays.
    #[pyo3(signature = (input, in_active_listing = false, visible_items = None))]
    fn parse<'py>(
        &self,
        input: &str,
        in_active_listing: bool,
        visible_items: Option<Bound<'py, PyList>>,
        py: Python<'py>,
    ) -> PyResult<Bound<'py, PyDict>> {
        let mut ctx = ParseContext {
            in_active_listing,
            visible_items: Vec::new(),
        };
        if let Some(items) = visible_items {
            for item in items.iter() {
                let item_dict = item.downcast::<PyDict>()?;
                let index: u64 = item_dict
                    .get_item("index")?
                    .and_then(|v| v.extract().ok())
                    .unwrap_or_default();
                let id: String = item_dict
                    .get_item("id")?
                    .and_then(|v| v.extract().ok())
                    .unwrap_or_default();
                let title: String = item_dict
                    .get_item("title")?
                    .and_then(|v| v.extract().ok())
                    .unwrap_or_default();
                ctx.visible_items.push(VisibleItem { index, id, title });
            }
        }

        let outcome = self.engine.parse(input, &ctx);
        let dict = PyDict::new_bound(py);
        dict.set_item("type", outcome.type_name())?;
        match outcome {
            ParseOutcome::Task { task, confidence } => {
                dict.set_item("confidence", confidence)?;
                dict.set_item("task", to_json(&task)?)?;
            }
            ParseOutcome::Command {
                command,
                confidence,
            } => {
                dict.set_item("confidence", confidence)?;
                dict.set_item("command", to_json(&command)?)?;
            }
            ParseOutcome::Clarification {
                prompt,
                candidates,
                confidence,
            } => {
                dict.set_item("confidence", confidence)?;
                dict.set_item("prompt", prompt)?;
                dict.set_item("candidates", to_json(&candidates)?)?;
            }
            ParseOutcome::Rejected { kind, message } => {
                dict.set_item("kind", kind.name())?;
                dict.set_item("message", message)?;
            }
        }
        Ok(dict)
    }
}

/// Nested payloads cross the boundary as JSON strings
fn to_json<T: serde::Serialize>(value: &T) -> PyResult<String> {
    serde_json::to_string(value).map_err(|e| {
        PyErr::new::<pyo3::exceptions::PyValueError, _>(format!(
            "Failed to serialize payload: {}",
            e
        ))
    })
}
