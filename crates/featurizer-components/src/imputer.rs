use std::{fmt, marker::PhantomData};

use featurizer_core::{
    ArchiveLoad, ArchiveReader, ArchiveWriter, FeaturizerError, ImputeInto, Nullable, Transformer,
};
use serde::{Serialize, de::DeserializeOwned};

/// Replaces null inputs with a value learned during training.
///
/// Non-null inputs are passed through, converted to the output type.
///
/// ```
/// use featurizer_components::ImputerTransformer;
/// use featurizer_core::Transformer;
///
/// let mut imputer = ImputerTransformer::<Option<i32>, f64>::new(2.5);
/// let outputs = imputer.transform_all(&[Some(1), None]).unwrap();
/// assert_eq!(outputs, vec![1.0, 2.5]);
/// ```
pub struct ImputerTransformer<T, O> {
    value: O,
    _marker: PhantomData<fn(&T)>,
}

impl<T, O> ImputerTransformer<T, O> {
    #[must_use]
    pub fn new(value: O) -> Self {
        Self {
            value,
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub fn value(&self) -> &O {
        &self.value
    }
}

impl<T, O> fmt::Debug for ImputerTransformer<T, O>
where
    O: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImputerTransformer")
            .field("value", &self.value)
            .finish()
    }
}

impl<T, O> Clone for ImputerTransformer<T, O>
where
    O: Clone,
{
    fn clone(&self) -> Self {
        Self::new(self.value.clone())
    }
}

impl<T, O> PartialEq for ImputerTransformer<T, O>
where
    O: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T, O> Transformer for ImputerTransformer<T, O>
where
    T: Nullable,
    T::Value: ImputeInto<O>,
    O: Clone + Serialize,
{
    type Input = T;
    type Output = O;

    fn execute(&mut self, input: &T, callback: &mut dyn FnMut(O)) -> Result<(), FeaturizerError> {
        let output = match input.nullable_value() {
            Some(value) => value.impute_into(),
            None => self.value.clone(),
        };
        callback(output);
        Ok(())
    }

    fn save(&self, writer: &mut ArchiveWriter) -> Result<(), FeaturizerError> {
        writer.write_version()?;
        writer.write(&self.value)
    }
}

impl<T, O> ArchiveLoad for ImputerTransformer<T, O>
where
    O: DeserializeOwned,
{
    fn load(reader: &mut ArchiveReader<'_>) -> Result<Self, FeaturizerError> {
        reader.read_version()?;
        Ok(Self::new(reader.read()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strings() {
        let mut imputer = ImputerTransformer::<Option<String>, String>::new("missing".to_owned());
        let outputs = imputer
            .transform_all(&[Some("a".to_owned()), None])
            .unwrap();
        assert_eq!(outputs, vec!["a".to_owned(), "missing".to_owned()]);
    }

    #[test]
    fn test_nan_input() {
        let mut imputer = ImputerTransformer::<f32, f64>::new(-1.0);
        let outputs = imputer.transform_all(&[f32::NAN, 0.5]).unwrap();
        assert_eq!(outputs, vec![-1.0, 0.5]);
    }

    #[test]
    fn test_save_and_load() {
        let imputer = ImputerTransformer::<Option<u8>, u8>::new(7);
        let mut writer = ArchiveWriter::new();
        imputer.save(&mut writer).unwrap();

        let bytes = writer.into_bytes();
        let mut reader = ArchiveReader::new(&bytes);
        let loaded = ImputerTransformer::<Option<u8>, u8>::load(&mut reader).unwrap();
        reader.finish().unwrap();
        assert_eq!(loaded, imputer);
    }
}
