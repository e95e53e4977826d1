use crate::{ArchiveWriter, FeaturizerError};

/// Applies what an estimator learned to inference data.
///
/// A transformer may emit zero, one or many outputs per input through `callback`. Any
/// output held back (e.g. a window that waits for more input) is emitted by
/// [`Transformer::flush`] at the end of the stream.
pub trait Transformer {
    type Input;
    type Output;

    fn execute(
        &mut self,
        input: &Self::Input,
        callback: &mut dyn FnMut(Self::Output),
    ) -> Result<(), FeaturizerError>;

    /// Emits buffered output and resets any streaming state.
    fn flush(&mut self, callback: &mut dyn FnMut(Self::Output)) -> Result<(), FeaturizerError> {
        let _ = callback;
        Ok(())
    }

    /// Writes a versioned payload that the matching loader can read back.
    fn save(&self, writer: &mut ArchiveWriter) -> Result<(), FeaturizerError>;

    /// Executes a transformer that emits exactly one output per input.
    ///
    /// # Errors
    ///
    /// Returns [`FeaturizerError::MultipleOutputs`] if the transformer emitted zero or
    /// several values.
    fn execute_single(&mut self, input: &Self::Input) -> Result<Self::Output, FeaturizerError> {
        let mut output = None;
        let mut extra = false;
        self.execute(input, &mut |value| {
            if output.is_some() {
                extra = true;
            } else {
                output = Some(value);
            }
        })?;
        match output {
            Some(value) if !extra => Ok(value),
            _ => Err(FeaturizerError::MultipleOutputs),
        }
    }

    /// Executes every input and collects the outputs, without flushing.
    fn transform_all<'a, I>(&mut self, inputs: I) -> Result<Vec<Self::Output>, FeaturizerError>
    where
        Self: Sized,
        I: IntoIterator<Item = &'a Self::Input>,
        Self::Input: 'a,
    {
        let mut outputs = Vec::new();
        for input in inputs {
            self.execute(input, &mut |value| outputs.push(value))?;
        }
        Ok(outputs)
    }

    /// Flushes and collects the outputs.
    fn flush_all(&mut self) -> Result<Vec<Self::Output>, FeaturizerError> {
        let mut outputs = Vec::new();
        self.flush(&mut |value| outputs.push(value))?;
        Ok(outputs)
    }
}

pub type BoxedTransformer<I, O> = Box<dyn Transformer<Input = I, Output = O>>;

impl<T> Transformer for Box<T>
where
    T: Transformer + ?Sized,
{
    type Input = T::Input;
    type Output = T::Output;

    fn execute(
        &mut self,
        input: &Self::Input,
        callback: &mut dyn FnMut(Self::Output),
    ) -> Result<(), FeaturizerError> {
        (**self).execute(input, callback)
    }

    fn flush(&mut self, callback: &mut dyn FnMut(Self::Output)) -> Result<(), FeaturizerError> {
        (**self).flush(callback)
    }

    fn save(&self, writer: &mut ArchiveWriter) -> Result<(), FeaturizerError> {
        (**self).save(writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Emits each input `n` times.
    struct Repeat(usize);

    impl Transformer for Repeat {
        type Input = u8;
        type Output = u8;

        fn execute(
            &mut self,
            input: &u8,
            callback: &mut dyn FnMut(u8),
        ) -> Result<(), FeaturizerError> {
            for _ in 0..self.0 {
                callback(*input);
            }
            Ok(())
        }

        fn save(&self, _writer: &mut ArchiveWriter) -> Result<(), FeaturizerError> {
            Ok(())
        }
    }

    #[test]
    fn test_execute_single() {
        assert_eq!(Repeat(1).execute_single(&7).unwrap(), 7);
        let err = Repeat(2).execute_single(&7).unwrap_err();
        assert!(matches!(err, FeaturizerError::MultipleOutputs));
        assert!(matches!(
            Repeat(0).execute_single(&7),
            Err(FeaturizerError::MultipleOutputs)
        ));
    }

    #[test]
    fn test_transform_all_fans_out() {
        let mut repeat = Repeat(2);
        assert_eq!(repeat.transform_all(&[1, 2]).unwrap(), vec![1, 1, 2, 2]);
        assert!(repeat.flush_all().unwrap().is_empty());
    }

    #[test]
    fn test_boxed() {
        let mut boxed: BoxedTransformer<u8, u8> = Box::new(Repeat(1));
        assert_eq!(boxed.execute_single(&3).unwrap(), 3);
    }
}
