//! Side channel carrying metadata between pipeline stages.
//!
//! # Overview
//!
//! Each column of a pipeline owns a map from producer name to an ordered list of
//! annotations. A completed estimator publishes an annotation under its own name; later
//! stages look it up by `(column, producer name, annotation type)` when they build their
//! transformer.
//!
//! # Design Decisions
//!
//! The bus is an explicit handle passed to every estimator constructor rather than a
//! global. Cloning the handle shares the same underlying store. Pipelines are
//! single-threaded, so the store uses `Rc<RefCell<_>>` and is neither `Send` nor `Sync`.
//!
//! Annotations are stored as `Rc<dyn Any>` and recovered by type. Several annotations of
//! different types may share one producer name; a lookup returns the first one of the
//! requested type.

use std::{any::Any, cell::RefCell, collections::BTreeMap, fmt, rc::Rc};

use crate::FeaturizerError;

/// An opaque annotation payload.
pub type AnnotationPtr = Rc<dyn Any>;

type ColumnAnnotations = BTreeMap<String, Vec<AnnotationPtr>>;

/// Shared, column-indexed annotation store.
#[derive(Clone)]
pub struct AnnotationBus {
    columns: Rc<RefCell<Vec<ColumnAnnotations>>>,
}

impl fmt::Debug for AnnotationBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnnotationBus")
            .field("column_sizes", &self.snapshot().sizes)
            .finish()
    }
}

/// Number of producer entries per column at some point in time.
///
/// Taken before a group of estimators completes, and compared afterwards with
/// [`AnnotationBus::producers_added_since`] to find what they published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationSnapshot {
    sizes: Vec<usize>,
}

impl AnnotationBus {
    /// Creates a bus for `num_columns` columns.
    ///
    /// # Errors
    ///
    /// Returns [`FeaturizerError::InvalidArgument`] if `num_columns` is zero.
    pub fn new(num_columns: usize) -> Result<Self, FeaturizerError> {
        if num_columns == 0 {
            return Err(FeaturizerError::InvalidArgument {
                name: "num_columns",
                reason: "must be at least 1",
            });
        }
        Ok(Self {
            columns: Rc::new(RefCell::new(vec![ColumnAnnotations::new(); num_columns])),
        })
    }

    #[must_use]
    pub fn num_columns(&self) -> usize {
        self.columns.borrow().len()
    }

    /// Fails unless `column` addresses an existing column.
    pub fn check_column(&self, column: usize) -> Result<(), FeaturizerError> {
        if column >= self.num_columns() {
            return Err(FeaturizerError::InvalidArgument {
                name: "column",
                reason: "column index is out of range",
            });
        }
        Ok(())
    }

    /// Appends an annotation produced by `producer` for `column`.
    pub fn publish<A>(
        &self,
        column: usize,
        producer: &str,
        annotation: A,
    ) -> Result<(), FeaturizerError>
    where
        A: Any,
    {
        self.publish_ptr(column, producer, Rc::new(annotation))
    }

    /// Appends an already shared annotation.
    pub fn publish_ptr(
        &self,
        column: usize,
        producer: &str,
        annotation: AnnotationPtr,
    ) -> Result<(), FeaturizerError> {
        self.check_column(column)?;
        let mut columns = self.columns.borrow_mut();
        columns[column]
            .entry(producer.to_owned())
            .or_default()
            .push(annotation);
        Ok(())
    }

    /// Returns the first annotation of type `A` published by `producer` for `column`.
    ///
    /// # Errors
    ///
    /// Returns [`FeaturizerError::AnnotationNotFound`] if there is none. Lookups never fall
    /// back to a default value.
    ///
    /// # Examples
    ///
    /// ```
    /// use featurizer_core::{AnnotationBus, FeaturizerError};
    ///
    /// let bus = AnnotationBus::new(2)?;
    /// bus.publish(1, "MeanEstimator", 12.5_f64)?;
    /// assert_eq!(*bus.lookup::<f64>(1, "MeanEstimator")?, 12.5);
    /// assert!(bus.lookup::<f64>(0, "MeanEstimator").is_err());
    /// # Ok::<(), FeaturizerError>(())
    /// ```
    pub fn lookup<A>(&self, column: usize, producer: &str) -> Result<Rc<A>, FeaturizerError>
    where
        A: Any,
    {
        self.try_lookup(column, producer)?
            .ok_or(FeaturizerError::AnnotationNotFound)
    }

    /// Like [`AnnotationBus::lookup`], but a missing annotation is `Ok(None)`.
    pub fn try_lookup<A>(
        &self,
        column: usize,
        producer: &str,
    ) -> Result<Option<Rc<A>>, FeaturizerError>
    where
        A: Any,
    {
        self.check_column(column)?;
        let columns = self.columns.borrow();
        let found = columns[column]
            .get(producer)
            .into_iter()
            .flatten()
            .find_map(|annotation| Rc::clone(annotation).downcast::<A>().ok());
        Ok(found)
    }

    /// Number of annotations `producer` has published for `column`.
    #[must_use]
    pub fn count(&self, column: usize, producer: &str) -> usize {
        self.columns
            .borrow()
            .get(column)
            .and_then(|annotations| annotations.get(producer))
            .map_or(0, Vec::len)
    }

    /// Records how many producers have published to each column.
    #[must_use]
    pub fn snapshot(&self) -> AnnotationSnapshot {
        AnnotationSnapshot {
            sizes: self.columns.borrow().iter().map(BTreeMap::len).collect(),
        }
    }

    /// Returns the columns whose producer count grew since `snapshot`, with the growth.
    #[must_use]
    pub fn producers_added_since(&self, snapshot: &AnnotationSnapshot) -> Vec<(usize, usize)> {
        self.columns
            .borrow()
            .iter()
            .zip(&snapshot.sizes)
            .enumerate()
            .filter_map(|(column, (annotations, &before))| {
                let after = annotations.len();
                (after > before).then_some((column, after - before))
            })
            .collect()
    }

    /// Removes every annotation `producer` published for `column` and returns them.
    pub fn take(
        &self,
        column: usize,
        producer: &str,
    ) -> Result<Vec<AnnotationPtr>, FeaturizerError> {
        self.check_column(column)?;
        let mut columns = self.columns.borrow_mut();
        Ok(columns[column].remove(producer).unwrap_or_default())
    }
}
