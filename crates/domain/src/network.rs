//! Declared input/output signature of an inference network.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One axis of a declared tensor shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Dimension {
    /// Static extent.
    Fixed(i64),
    /// Named, unresolved extent such as `batch_size`.
    Symbolic(String),
}

impl Dimension {
    /// Returns the static extent, if any.
    #[must_use]
    pub const fn as_fixed(&self) -> Option<i64> {
        match self {
            Self::Fixed(value) => Some(*value),
            Self::Symbolic(_) => None,
        }
    }

    /// Returns true for unresolved extents.
    #[must_use]
    pub const fn is_symbolic(&self) -> bool {
        matches!(self, Self::Symbolic(_))
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(value) => write!(formatter, "{value}"),
            Self::Symbolic(name) => formatter.write_str(name),
        }
    }
}

/// Element type of a declared tensor, parsed from the engine's type tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ElementType {
    /// `tensor(int64)`
    Int64,
    /// `tensor(int32)`
    Int32,
    /// `tensor(float)`
    Float32,
    /// `tensor(float16)`
    Float16,
    /// `tensor(double)`
    Float64,
    /// `tensor(bool)`
    Bool,
    /// Any other tag, kept verbatim.
    Other(String),
}

impl ElementType {
    /// Parse an engine type tag such as `tensor(int64)`.
    #[must_use]
    pub fn from_type_tag(tag: &str) -> Self {
        match tag {
            "tensor(int64)" => Self::Int64,
            "tensor(int32)" => Self::Int32,
            "tensor(float)" => Self::Float32,
            "tensor(float16)" => Self::Float16,
            "tensor(double)" => Self::Float64,
            "tensor(bool)" => Self::Bool,
            other => Self::Other(other.to_owned()),
        }
    }

    /// Engine type tag.
    #[must_use]
    pub fn type_tag(&self) -> &str {
        match self {
            Self::Int64 => "tensor(int64)",
            Self::Int32 => "tensor(int32)",
            Self::Float32 => "tensor(float)",
            Self::Float16 => "tensor(float16)",
            Self::Float64 => "tensor(double)",
            Self::Bool => "tensor(bool)",
            Self::Other(tag) => tag,
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.type_tag())
    }
}

impl Serialize for ElementType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.type_tag())
    }
}

impl<'de> Deserialize<'de> for ElementType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(Self::from_type_tag(&tag))
    }
}

/// Declared tensor of a network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TensorSpec {
    /// Tensor name.
    pub name: String,
    /// Element type.
    pub element_type: ElementType,
    /// Declared shape.
    pub shape: Vec<Dimension>,
}

impl TensorSpec {
    /// Build a tensor spec.
    pub fn new(name: impl Into<String>, element_type: ElementType, shape: Vec<Dimension>) -> Self {
        Self {
            name: name.into(),
            element_type,
            shape,
        }
    }
}

/// Ordered input or output signature.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelIo {
    names: Vec<String>,
    types: BTreeMap<String, ElementType>,
    shapes: BTreeMap<String, Vec<Dimension>>,
}

impl ModelIo {
    /// Build a signature preserving declaration order.
    #[must_use]
    pub fn from_specs(specs: &[TensorSpec]) -> Self {
        let mut io = Self::default();
        for spec in specs {
            io.names.push(spec.name.clone());
            io.types
                .insert(spec.name.clone(), spec.element_type.clone());
            io.shapes.insert(spec.name.clone(), spec.shape.clone());
        }
        io
    }

    /// Declared names, in order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Element type of a declared tensor.
    #[must_use]
    pub fn element_type(&self, name: &str) -> Option<&ElementType> {
        self.types.get(name)
    }

    /// Shape of a declared tensor.
    #[must_use]
    pub fn shape(&self, name: &str) -> Option<&[Dimension]> {
        self.shapes.get(name).map(Vec::as_slice)
    }

    /// Number of declared tensors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns true when nothing is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Input and output signatures of a network.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInfo {
    /// Input signature.
    pub input: ModelIo,
    /// Output signature.
    pub output: ModelIo,
}

impl NetworkInfo {
    /// Build from declared input and output specs.
    #[must_use]
    pub fn from_specs(inputs: &[TensorSpec], outputs: &[TensorSpec]) -> Self {
        Self {
            input: ModelIo::from_specs(inputs),
            output: ModelIo::from_specs(outputs),
        }
    }

    /// Declared input names.
    #[must_use]
    pub fn input_names(&self) -> &[String] {
        self.input.names()
    }

    /// Element type of an input.
    #[must_use]
    pub fn input_type(&self, name: &str) -> Option<&ElementType> {
        self.input.element_type(name)
    }

    /// Shape of an input.
    #[must_use]
    pub fn input_shape(&self, name: &str) -> Option<&[Dimension]> {
        self.input.shape(name)
    }

    /// Declared output names.
    #[must_use]
    pub fn output_names(&self) -> &[String] {
        self.output.names()
    }

    /// Element type of an output.
    #[must_use]
    pub fn output_type(&self, name: &str) -> Option<&ElementType> {
        self.output.element_type(name)
    }

    /// Shape of an output.
    #[must_use]
    pub fn output_shape(&self, name: &str) -> Option<&[Dimension]> {
        self.output.shape(name)
    }
}
