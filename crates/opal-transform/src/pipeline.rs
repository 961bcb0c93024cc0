//! The transformation pipeline
//!
//! Orchestrates load → match → mutate → write over one or many raw inputs.
//! Each input is processed independently; models are created per load and
//! discarded after the corresponding write. The pipeline itself performs no
//! file or archive I/O — callers supply raw bytes or text.

use crate::adapter::ClassAdapter;
use crate::error::TransformError;
use crate::model::ClassModel;
use crate::mutate::{apply, Edit};
use tracing::{debug, warn};

/// Caller-supplied transformation logic
///
/// Given a loaded class model, return the edits to apply. Returning no edits
/// leaves the class unchanged (the write still re-serializes it). Closures
/// with the same shape implement this automatically.
pub trait Transformer {
    /// Decide the edits for one class
    fn transform(&self, class: &ClassModel) -> Vec<Edit>;
}

impl<F> Transformer for F
where
    F: Fn(&ClassModel) -> Vec<Edit>,
{
    fn transform(&self, class: &ClassModel) -> Vec<Edit> {
        self(class)
    }
}

/// Pipeline behavior switches
#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineOptions {
    /// Stop processing remaining batch inputs after the first failure
    pub fail_fast: bool,
}

/// Load → match → mutate → write orchestration over one adapter
pub struct Pipeline<A: ClassAdapter> {
    adapter: A,
    options: PipelineOptions,
}

impl<A: ClassAdapter> Pipeline<A> {
    /// Create a pipeline with default options
    pub fn new(adapter: A) -> Self {
        Self {
            adapter,
            options: PipelineOptions::default(),
        }
    }

    /// Create a pipeline with explicit options
    pub fn with_options(adapter: A, options: PipelineOptions) -> Self {
        Self { adapter, options }
    }

    /// The adapter this pipeline loads and writes through
    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Transform a single raw input
    pub fn transform<T: Transformer>(
        &self,
        raw: &A::Raw,
        transformer: &T,
    ) -> Result<A::Raw, TransformError> {
        let mut class = self.adapter.load(raw)?;
        debug!("loaded class `{}` from {}", class.name, class.origin());

        let edits = transformer.transform(&class);
        let edit_count = edits.len();
        apply(&mut class, edits)?;
        debug!("applied {} edits to `{}`", edit_count, class.name);

        self.adapter.write(&class)
    }

    /// Transform a batch of labeled raw inputs
    ///
    /// Inputs are processed independently and results reported per input; a
    /// failure never corrupts the processing of other inputs. In fail-fast
    /// mode the remaining inputs are skipped after the first failure and do
    /// not appear in the result.
    pub fn transform_batch<T: Transformer>(
        &self,
        inputs: &[(String, A::Raw)],
        transformer: &T,
    ) -> Vec<(String, Result<A::Raw, TransformError>)> {
        let mut results = Vec::with_capacity(inputs.len());
        for (id, raw) in inputs {
            let result = self.transform(raw, transformer);
            if let Err(error) = &result {
                warn!("transforming `{id}` failed: {error}");
            }
            let failed = result.is_err();
            results.push((id.clone(), result));
            if failed && self.options.fail_fast {
                debug!("fail-fast: skipping remaining inputs");
                break;
            }
        }
        results
    }
}
