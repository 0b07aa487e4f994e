//! Host tensors exchanged with the inference engine.

use crate::network::ElementType;
use onnx_transformers_shared::ErrorEnvelope;
use serde::{Serialize, Serializer};

/// Tensor construction and conversion failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TensorError {
    /// Element count does not match the product of the shape.
    #[error("tensor shape {shape:?} expects {expected} elements, got {actual}")]
    ShapeMismatch {
        /// Requested shape.
        shape: Vec<usize>,
        /// Elements implied by the shape.
        expected: usize,
        /// Elements supplied.
        actual: usize,
    },
    /// Target element type is not a supported host type.
    #[error("cannot convert {from} tensor to {to}")]
    UnsupportedCast {
        /// Source type tag.
        from: String,
        /// Target type tag.
        to: String,
    },
    /// A value does not fit the target element type.
    #[error("value {value} does not fit into {to}")]
    ValueOutOfRange {
        /// Offending value.
        value: i64,
        /// Target type tag.
        to: String,
    },
}

impl From<TensorError> for ErrorEnvelope {
    fn from(error: TensorError) -> Self {
        Self::inference("invalid_tensor", error.to_string())
    }
}

/// Element buffer of a host tensor.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TensorData {
    /// 64-bit integers.
    Int64(Vec<i64>),
    /// 32-bit integers.
    Int32(Vec<i32>),
    /// 32-bit floats.
    Float32(Vec<f32>),
}

impl TensorData {
    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Int64(values) => values.len(),
            Self::Int32(values) => values.len(),
            Self::Float32(values) => values.len(),
        }
    }

    /// Returns true when there are no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element type of the buffer.
    #[must_use]
    pub const fn element_type(&self) -> ElementType {
        match self {
            Self::Int64(_) => ElementType::Int64,
            Self::Int32(_) => ElementType::Int32,
            Self::Float32(_) => ElementType::Float32,
        }
    }
}

/// Row-major host tensor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tensor {
    shape: Vec<usize>,
    data: TensorData,
}

impl Tensor {
    /// Build a tensor, validating the element count against the shape.
    pub fn new(shape: Vec<usize>, data: TensorData) -> Result<Self, TensorError> {
        let expected = shape.iter().product::<usize>();
        if expected != data.len() {
            return Err(TensorError::ShapeMismatch {
                shape,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { shape, data })
    }

    /// Build an `int64` tensor.
    pub fn from_i64(shape: Vec<usize>, values: Vec<i64>) -> Result<Self, TensorError> {
        Self::new(shape, TensorData::Int64(values))
    }

    /// Build an `int32` tensor.
    pub fn from_i32(shape: Vec<usize>, values: Vec<i32>) -> Result<Self, TensorError> {
        Self::new(shape, TensorData::Int32(values))
    }

    /// Build a `float` tensor.
    pub fn from_f32(shape: Vec<usize>, values: Vec<f32>) -> Result<Self, TensorError> {
        Self::new(shape, TensorData::Float32(values))
    }

    /// Shape.
    #[must_use]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Element buffer.
    #[must_use]
    pub const fn data(&self) -> &TensorData {
        &self.data
    }

    /// Number of axes.
    #[must_use]
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true when there are no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Element type.
    #[must_use]
    pub const fn element_type(&self) -> ElementType {
        self.data.element_type()
    }

    /// `float` view.
    #[must_use]
    pub fn as_f32(&self) -> Option<&[f32]> {
        match &self.data {
            TensorData::Float32(values) => Some(values),
            _ => None,
        }
    }

    /// `int64` view.
    #[must_use]
    pub fn as_i64(&self) -> Option<&[i64]> {
        match &self.data {
            TensorData::Int64(values) => Some(values),
            _ => None,
        }
    }

    /// `int32` view.
    #[must_use]
    pub fn as_i32(&self) -> Option<&[i32]> {
        match &self.data {
            TensorData::Int32(values) => Some(values),
            _ => None,
        }
    }

    /// Remove every axis of length one.
    #[must_use]
    pub fn squeeze(self) -> Self {
        let shape = self.shape.into_iter().filter(|extent| *extent != 1).collect();
        Self {
            shape,
            data: self.data,
        }
    }

    /// Apply `f` to every element of a `float` tensor. Integer tensors are
    /// returned unchanged.
    #[must_use]
    pub fn map_f32(self, f: impl Fn(f32) -> f32) -> Self {
        match self.data {
            TensorData::Float32(values) => Self {
                shape: self.shape,
                data: TensorData::Float32(values.into_iter().map(f).collect()),
            },
            data => Self {
                shape: self.shape,
                data,
            },
        }
    }

    /// Convert an integer tensor to the given element type.
    pub fn cast_to(self, target: &ElementType) -> Result<Self, TensorError> {
        let data = match (self.data, target) {
            (data @ TensorData::Int64(_), ElementType::Int64)
            | (data @ TensorData::Int32(_), ElementType::Int32)
            | (data @ TensorData::Float32(_), ElementType::Float32) => data,
            (TensorData::Int64(values), ElementType::Int32) => TensorData::Int32(
                values
                    .into_iter()
                    .map(|value| {
                        i32::try_from(value).map_err(|_| TensorError::ValueOutOfRange {
                            value,
                            to: target.type_tag().to_owned(),
                        })
                    })
                    .collect::<Result<_, _>>()?,
            ),
            (TensorData::Int64(values), ElementType::Float32) => {
                TensorData::Float32(values.into_iter().map(int_to_f32).collect())
            },
            (TensorData::Int32(values), ElementType::Int64) => {
                TensorData::Int64(values.into_iter().map(i64::from).collect())
            },
            (data, target) => {
                return Err(TensorError::UnsupportedCast {
                    from: data.element_type().type_tag().to_owned(),
                    to: target.type_tag().to_owned(),
                });
            },
        };
        Ok(Self {
            shape: self.shape,
            data,
        })
    }
}

#[expect(
    clippy::cast_precision_loss,
    reason = "token ids, masks and offsets stay well below 2^24"
)]
fn int_to_f32(value: i64) -> f32 {
    value as f32
}

/// Ordered name-to-tensor list fed to the engine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NamedTensors {
    entries: Vec<(String, Tensor)>,
}

impl NamedTensors {
    /// Empty list.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append an entry, replacing an existing entry of the same name in place.
    pub fn insert(&mut self, name: impl Into<String>, tensor: Tensor) {
        let name = name.into();
        if let Some(slot) = self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            slot.1 = tensor;
        } else {
            self.entries.push((name, tensor));
        }
    }

    /// Look up a tensor by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Tensor> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, tensor)| tensor)
    }

    /// Take a tensor out by name.
    pub fn remove(&mut self, name: &str) -> Option<Tensor> {
        let index = self
            .entries
            .iter()
            .position(|(existing, _)| existing == name)?;
        Some(self.entries.remove(index).1)
    }

    /// Names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Tensor)> {
        self.entries
            .iter()
            .map(|(name, tensor)| (name.as_str(), tensor))
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Serialized as a JSON object whose keys keep insertion order.
impl Serialize for NamedTensors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

impl IntoIterator for NamedTensors {
    type Item = (String, Tensor);
    type IntoIter = std::vec::IntoIter<(String, Tensor)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl FromIterator<(String, Tensor)> for NamedTensors {
    fn from_iter<I: IntoIterator<Item = (String, Tensor)>>(iter: I) -> Self {
        let mut tensors = Self::new();
        for (name, tensor) in iter {
            tensors.insert(name, tensor);
        }
        tensors
    }
}
