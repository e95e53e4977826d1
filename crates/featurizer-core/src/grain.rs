//! Group-by-key composition.
//!
//! # Overview
//!
//! A [`GrainEstimator`] trains one independent inner estimator per grain (group-by key).
//! Its input is `(grain, inner input)`. Inner estimators are created lazily the first time
//! their grain shows up, and a grain whose estimator has finished ignores further input.
//!
//! On completion, the annotation each inner estimator published is moved off the bus and
//! repackaged into a single [`GrainAnnotation`] published under the wrapper's own name.
//! The resulting [`GrainTransformer`] dispatches every input to the transformer of its
//! grain and tags the output with the grain.
//!
//! # Design Decisions
//!
//! - An inner [`FitResult::Reset`] is rejected with [`FeaturizerError::GrainReset`]: other
//!   grains have already consumed the same batches. [`FitResult::ResetAndContinue`] is
//!   not an error and is not passed on; that grain simply keeps training.
//! - There is no fallback transformer. Executing an unseen grain fails with
//!   [`FeaturizerError::GrainNotFound`].
//! - Annotation bookkeeping relies on each inner estimator publishing at most one
//!   annotation, under its own name, for one column. Anything else is a programming error
//!   reported as [`FeaturizerError::UnexpectedAnnotationInsertion`].
//!
//! # Examples
//!
//! ```
//! use featurizer_core::{
//!     AnnotationBus, FeaturizerError, FilterDecoratorEstimator, GrainEstimator, Pick,
//!     Transformer, TransformerEstimator, driver,
//! };
//!
//! let bus = AnnotationBus::new(1)?;
//! let mut grains = GrainEstimator::new(
//!     "GrainedDecorator",
//!     bus.clone(),
//!     |bus| FilterDecoratorEstimator::<(i32, char), Pick<0>>::new(bus),
//!     None,
//! )?;
//! driver::train(&mut grains, &[vec![('a', (1, 'x')), ('b', (2, 'y'))]])?;
//! assert_eq!(grains.num_grains(), 2);
//!
//! let mut transformer = grains.create_transformer()?;
//! assert_eq!(transformer.execute_single(&('b', (7, 'z')))?, ('b', 7));
//! assert!(transformer.execute_single(&('c', (7, 'z'))).is_err());
//! # Ok::<(), FeaturizerError>(())
//! ```

use std::{
    any::Any,
    collections::{BTreeMap, btree_map::Entry},
    fmt,
    rc::Rc,
};

use serde::{Serialize, de::DeserializeOwned};
use tracing::debug;

use crate::{
    AnnotationBus, AnnotationPtr, ArchiveLoad, ArchiveReader, ArchiveWriter, Estimator,
    EstimatorCore, FeaturizerError, FitResult, TrainingState, Transformer, TransformerEstimator,
};

/// Creates the estimator for a newly seen grain.
pub type CreateEstimatorFn<E> = Box<dyn Fn(AnnotationBus) -> Result<E, FeaturizerError>>;

/// The annotations published by every grain's estimator, keyed by grain.
pub struct GrainAnnotation<G> {
    annotations: BTreeMap<G, AnnotationPtr>,
}

impl<G> fmt::Debug for GrainAnnotation<G>
where
    G: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GrainAnnotation")
            .field("grains", &self.annotations.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<G> GrainAnnotation<G>
where
    G: Ord,
{
    /// Returns the annotation of type `A` published for `grain`.
    #[must_use]
    pub fn get<A>(&self, grain: &G) -> Option<Rc<A>>
    where
        A: Any,
    {
        let annotation = self.annotations.get(grain)?;
        Rc::clone(annotation).downcast::<A>().ok()
    }

    pub fn grains(&self) -> impl Iterator<Item = &G> {
        self.annotations.keys()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }
}

/// Trains one `E` per grain of type `G`.
pub struct GrainEstimator<G, E> {
    core: EstimatorCore,
    create: CreateEstimatorFn<E>,
    grains: BTreeMap<G, E>,
    remaining: Option<usize>,
    created_transformer: bool,
}

impl<G, E> fmt::Debug for GrainEstimator<G, E>
where
    G: fmt::Debug,
    E: Estimator,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let grains = self
            .grains
            .iter()
            .map(|(grain, estimator)| (grain, estimator.state()))
            .collect::<Vec<_>>();
        f.debug_struct("GrainEstimator")
            .field("core", &self.core)
            .field("grains", &grains)
            .field("remaining", &self.remaining)
            .finish_non_exhaustive()
    }
}

impl<G, E> GrainEstimator<G, E>
where
    G: Ord + Clone,
    E: Estimator,
{
    /// Creates a grain wrapper.
    ///
    /// `create` builds the estimator for each new grain. `max_items` bounds the number of
    /// training items consumed across all grains; `None` means unbounded.
    pub fn new<F>(
        name: impl Into<String>,
        bus: AnnotationBus,
        create: F,
        max_items: Option<usize>,
    ) -> Result<Self, FeaturizerError>
    where
        F: Fn(AnnotationBus) -> Result<E, FeaturizerError> + 'static,
    {
        Ok(Self {
            core: EstimatorCore::new(name, bus)?,
            create: Box::new(create),
            grains: BTreeMap::new(),
            remaining: max_items,
            created_transformer: false,
        })
    }

    #[must_use]
    pub fn num_grains(&self) -> usize {
        self.grains.len()
    }

    /// Training state of the estimator for `grain`, if that grain has been seen.
    #[must_use]
    pub fn grain_state(&self, grain: &G) -> Option<TrainingState> {
        self.grains.get(grain).map(Estimator::state)
    }

    pub fn grains(&self) -> impl Iterator<Item = &G> {
        self.grains.keys()
    }

    /// Completes one grain and moves what it published into `collected`.
    fn collect_annotation(
        bus: &AnnotationBus,
        grain: &G,
        estimator: &mut E,
        column: &mut Option<usize>,
        collected: &mut BTreeMap<G, AnnotationPtr>,
    ) -> Result<(), FeaturizerError> {
        let snapshot = bus.snapshot();
        estimator.complete_training()?;

        let mut added = false;
        for (index, growth) in bus.producers_added_since(&snapshot) {
            if added || growth > 1 {
                return Err(FeaturizerError::UnexpectedAnnotationInsertion {
                    reason: "insertion (duplicate)",
                });
            }
            if column.is_some_and(|column| column != index) {
                return Err(FeaturizerError::UnexpectedAnnotationInsertion {
                    reason: "insertion (different column)",
                });
            }
            *column = Some(index);

            let mut annotations = bus.take(index, estimator.name())?;
            let Some(annotation) = annotations.pop() else {
                return Err(FeaturizerError::UnexpectedAnnotationInsertion {
                    reason: "insertion (different Estimator)",
                });
            };
            if !annotations.is_empty() {
                return Err(FeaturizerError::UnexpectedAnnotationInsertion { reason: "size" });
            }
            collected.insert(grain.clone(), annotation);
            added = true;
        }
        Ok(())
    }
}

impl<G, E> Estimator for GrainEstimator<G, E>
where
    G: Ord + Clone + 'static,
    E: Estimator,
{
    type Input = (G, E::Input);

    fn core(&self) -> &EstimatorCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EstimatorCore {
        &mut self.core
    }

    fn begin_training_impl(&mut self) -> Result<bool, FeaturizerError> {
        Ok(self.remaining != Some(0))
    }

    fn fit_impl(&mut self, items: &[Self::Input]) -> Result<FitResult, FeaturizerError> {
        let count = self.remaining.map_or(items.len(), |remaining| remaining.min(items.len()));

        for (grain, input) in &items[..count] {
            let estimator = match self.grains.entry(grain.clone()) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    let mut estimator = (self.create)(self.core.bus().clone())?;
                    estimator.begin_training()?;
                    debug!(
                        estimator = self.core.name(),
                        state = %estimator.state(),
                        "grain created"
                    );
                    entry.insert(estimator)
                }
            };
            if estimator.state() != TrainingState::Training {
                continue;
            }
            if estimator.fit(std::slice::from_ref(input))? == FitResult::Reset {
                return Err(FeaturizerError::GrainReset);
            }
        }

        if let Some(remaining) = &mut self.remaining {
            *remaining -= count;
            if *remaining == 0 {
                return Ok(FitResult::Complete);
            }
        }
        Ok(FitResult::Continue)
    }

    fn on_data_completed_impl(&mut self) -> Result<bool, FeaturizerError> {
        for estimator in self.grains.values_mut() {
            estimator.on_data_completed()?;
        }
        Ok(true)
    }

    fn complete_training_impl(&mut self) -> Result<(), FeaturizerError> {
        let bus = self.core.bus().clone();
        let mut column = None;
        let mut collected = BTreeMap::new();

        for (grain, estimator) in &mut self.grains {
            if estimator.state() == TrainingState::Training {
                estimator.on_data_completed()?;
            }
            Self::collect_annotation(&bus, grain, estimator, &mut column, &mut collected)?;
        }

        if let Some(column) = column {
            debug!(
                estimator = self.core.name(),
                column,
                grains = collected.len(),
                "grain annotations repackaged"
            );
            bus.publish(
                column,
                self.core.name(),
                GrainAnnotation {
                    annotations: collected,
                },
            )?;
        }
        Ok(())
    }
}

impl<G, E> TransformerEstimator for GrainEstimator<G, E>
where
    G: Ord + Clone + Serialize + DeserializeOwned + 'static,
    E: TransformerEstimator,
{
    type Transformer = GrainTransformer<G, E::Transformer>;

    fn create_transformer_impl(&mut self) -> Result<Self::Transformer, FeaturizerError> {
        let mut transformers = BTreeMap::new();
        for (grain, estimator) in &mut self.grains {
            transformers.insert(grain.clone(), estimator.create_transformer()?);
        }
        GrainTransformer::new(transformers)
    }

    fn has_created_transformer(&self) -> bool {
        self.created_transformer
    }

    fn mark_transformer_created(&mut self) {
        self.created_transformer = true;
    }

    fn load_transformer(
        &self,
        reader: &mut ArchiveReader<'_>,
    ) -> Result<Self::Transformer, FeaturizerError> {
        let prototype = (self.create)(self.core.bus().clone())?;
        GrainTransformer::load_with(reader, |reader| prototype.load_transformer(reader))
    }
}

/// One transformer per grain. Outputs are tagged with the grain of their input.
#[derive(Debug, Clone, PartialEq)]
pub struct GrainTransformer<G, T> {
    transformers: BTreeMap<G, T>,
}

impl<G, T> GrainTransformer<G, T>
where
    G: Ord,
{
    /// # Errors
    ///
    /// Returns [`FeaturizerError::InvalidArgument`] if `transformers` is empty.
    pub fn new(transformers: BTreeMap<G, T>) -> Result<Self, FeaturizerError> {
        if transformers.is_empty() {
            return Err(FeaturizerError::InvalidArgument {
                name: "transformers",
                reason: "at least one grain is required",
            });
        }
        Ok(Self { transformers })
    }

    #[must_use]
    pub fn num_grains(&self) -> usize {
        self.transformers.len()
    }

    #[must_use]
    pub fn get(&self, grain: &G) -> Option<&T> {
        self.transformers.get(grain)
    }

    /// Reads a grain map, loading each grain's transformer with `load`.
    pub fn load_with<F>(
        reader: &mut ArchiveReader<'_>,
        mut load: F,
    ) -> Result<Self, FeaturizerError>
    where
        G: DeserializeOwned,
        F: FnMut(&mut ArchiveReader<'_>) -> Result<T, FeaturizerError>,
    {
        reader.read_version()?;
        let count: u64 = reader.read()?;
        let mut transformers = BTreeMap::new();
        for _ in 0..count {
            let grain: G = reader.read()?;
            let transformer = load(reader)?;
            if transformers.insert(grain, transformer).is_some() {
                return Err(FeaturizerError::InvalidArgument {
                    name: "transformers",
                    reason: "archive contains a grain twice",
                });
            }
        }
        Self::new(transformers)
    }
}

impl<G, T> Transformer for GrainTransformer<G, T>
where
    G: Ord + Clone + Serialize,
    T: Transformer,
{
    type Input = (G, T::Input);
    type Output = (G, T::Output);

    fn execute(
        &mut self,
        input: &Self::Input,
        callback: &mut dyn FnMut(Self::Output),
    ) -> Result<(), FeaturizerError> {
        let (grain, input) = input;
        let transformer = self
            .transformers
            .get_mut(grain)
            .ok_or(FeaturizerError::GrainNotFound)?;
        transformer.execute(input, &mut |output| callback((grain.clone(), output)))
    }

    fn flush(&mut self, callback: &mut dyn FnMut(Self::Output)) -> Result<(), FeaturizerError> {
        for (grain, transformer) in &mut self.transformers {
            transformer.flush(&mut |output| callback((grain.clone(), output)))?;
        }
        Ok(())
    }

    fn save(&self, writer: &mut ArchiveWriter) -> Result<(), FeaturizerError> {
        writer.write_version()?;
        writer.write(&(self.transformers.len() as u64))?;
        for (grain, transformer) in &self.transformers {
            writer.write(grain)?;
            transformer.save(writer)?;
        }
        Ok(())
    }
}

impl<G, T> ArchiveLoad for GrainTransformer<G, T>
where
    G: Ord + DeserializeOwned,
    T: ArchiveLoad,
{
    fn load(reader: &mut ArchiveReader<'_>) -> Result<Self, FeaturizerError> {
        Self::load_with(reader, T::load)
    }
}
