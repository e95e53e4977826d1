use std::{any::Any, fmt, marker::PhantomData};

use crate::{ArchiveWriter, FeaturizerError, Transformer};

/// A type-erased `Vec<T>` flowing between chain stages.
pub(crate) struct Batch {
    items: Box<dyn Any>,
    len: usize,
}

impl Batch {
    pub(crate) fn new<T>(items: Vec<T>) -> Self
    where
        T: 'static,
    {
        Self {
            len: items.len(),
            items: Box::new(items),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub(crate) fn as_slice<T>(&self) -> Result<&[T], FeaturizerError>
    where
        T: 'static,
    {
        self.items
            .downcast_ref::<Vec<T>>()
            .map(Vec::as_slice)
            .ok_or(FeaturizerError::StageTypeMismatch)
    }

    pub(crate) fn into_vec<T>(self) -> Result<Vec<T>, FeaturizerError>
    where
        T: 'static,
    {
        self.items
            .downcast::<Vec<T>>()
            .map(|items| *items)
            .map_err(|_| FeaturizerError::StageTypeMismatch)
    }
}

/// Object-safe view of a [`Transformer`] operating on [`Batch`]es.
pub(crate) trait ErasedTransformer {
    fn execute_batch(&mut self, batch: Batch) -> Result<Batch, FeaturizerError>;
    fn flush_batch(&mut self) -> Result<Batch, FeaturizerError>;
    fn save(&self, writer: &mut ArchiveWriter) -> Result<(), FeaturizerError>;
}

pub(crate) struct Erased<T>(pub(crate) T);

impl<T> ErasedTransformer for Erased<T>
where
    T: Transformer,
    T::Input: 'static,
    T::Output: 'static,
{
    fn execute_batch(&mut self, batch: Batch) -> Result<Batch, FeaturizerError> {
        let mut outputs = Vec::with_capacity(batch.len);
        for item in batch.as_slice::<T::Input>()? {
            self.0.execute(item, &mut |output| outputs.push(output))?;
        }
        Ok(Batch::new(outputs))
    }

    fn flush_batch(&mut self) -> Result<Batch, FeaturizerError> {
        Ok(Batch::new(self.0.flush_all()?))
    }

    fn save(&self, writer: &mut ArchiveWriter) -> Result<(), FeaturizerError> {
        self.0.save(writer)
    }
}

pub(crate) type BoxedErasedTransformer = Box<dyn ErasedTransformer>;

/// The runtime side of a [`Chain`](crate::Chain): the transformers released by its
/// stages, executed in stage order.
///
/// Each stage's outputs become the next stage's inputs, so one input may fan out into any
/// number of final outputs. A chain with no transforming stage passes input through.
pub struct TransformerChain<In, Out> {
    stages: Vec<BoxedErasedTransformer>,
    _marker: PhantomData<fn(In) -> Out>,
}

impl<In, Out> fmt::Debug for TransformerChain<In, Out> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformerChain")
            .field("num_stages", &self.stages.len())
            .finish()
    }
}

impl<In, Out> TransformerChain<In, Out>
where
    In: Clone + 'static,
    Out: 'static,
{
    pub(crate) fn new(stages: Vec<BoxedErasedTransformer>) -> Self {
        Self {
            stages,
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub fn num_stages(&self) -> usize {
        self.stages.len()
    }

    /// Runs `batch` through the stages starting at `start`.
    fn run_from(&mut self, start: usize, mut batch: Batch) -> Result<Batch, FeaturizerError> {
        for stage in &mut self.stages[start..] {
            if batch.is_empty() {
                break;
            }
            batch = stage.execute_batch(batch)?;
        }
        Ok(batch)
    }

    fn emit(batch: Batch, callback: &mut dyn FnMut(Out)) -> Result<(), FeaturizerError> {
        if batch.is_empty() {
            return Ok(());
        }
        for output in batch.into_vec::<Out>()? {
            callback(output);
        }
        Ok(())
    }
}

impl<In, Out> Transformer for TransformerChain<In, Out>
where
    In: Clone + 'static,
    Out: 'static,
{
    type Input = In;
    type Output = Out;

    fn execute(
        &mut self,
        input: &In,
        callback: &mut dyn FnMut(Out),
    ) -> Result<(), FeaturizerError> {
        let batch = self.run_from(0, Batch::new(vec![input.clone()]))?;
        Self::emit(batch, callback)
    }

    /// Flushes stage `i`, runs its output through stages `i + 1..`, then moves on to the
    /// next stage's flush.
    fn flush(&mut self, callback: &mut dyn FnMut(Out)) -> Result<(), FeaturizerError> {
        for index in 0..self.stages.len() {
            let flushed = self.stages[index].flush_batch()?;
            let batch = self.run_from(index + 1, flushed)?;
            Self::emit(batch, callback)?;
        }
        Ok(())
    }

    fn save(&self, writer: &mut ArchiveWriter) -> Result<(), FeaturizerError> {
        self.stages.iter().try_for_each(|stage| stage.save(writer))
    }
}
