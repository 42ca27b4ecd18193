//! Node Values
//!
//! Nodes hold values from a small, closed set of payloads. `Value` is the
//! payload, `ValueType` is the tag a node declares so that assignments can be
//! checked and explicit attribute data can be coerced into the representation
//! a computed attribute works with.
//!
//! Array payloads sit behind `Arc`, so handing a value to the output geometry
//! or to another node is a reference-count bump. Identity (`Value::same`) is
//! pointer identity for arrays and equality for scalars.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::factory::Immersion;
use crate::utility::BoundingBox;

/// The metric normals are computed in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    #[default]
    Euclidean,
    Hyperbolic,
    Elliptic,
}

/// Declared type of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// Accepts every payload. Used for nodes mirroring explicit attribute data.
    Any,
    Bool,
    Count,
    Double,
    Metric,
    Ints,
    Doubles,
    Strings,
    IntArrays,
    DoubleArrays,
    BoundingBox,
    Immersion,
}

impl ValueType {
    /// Check whether a value may be stored in a node of this type.
    pub fn accepts(self, value: &Value) -> bool {
        self == ValueType::Any || self == value.value_type()
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Any => "any",
            ValueType::Bool => "bool",
            ValueType::Count => "count",
            ValueType::Double => "double",
            ValueType::Metric => "metric",
            ValueType::Ints => "int[]",
            ValueType::Doubles => "double[]",
            ValueType::Strings => "string[]",
            ValueType::IntArrays => "int[][]",
            ValueType::DoubleArrays => "double[][]",
            ValueType::BoundingBox => "bounding box",
            ValueType::Immersion => "immersion",
        };
        f.write_str(name)
    }
}

/// A node payload.
#[derive(Debug, Clone)]
pub enum Value {
    Bool(bool),
    Count(usize),
    Double(f64),
    Metric(Metric),
    Ints(Arc<Vec<usize>>),
    Doubles(Arc<Vec<f64>>),
    Strings(Arc<Vec<String>>),
    IntArrays(Arc<Vec<Vec<usize>>>),
    DoubleArrays(Arc<Vec<Vec<f64>>>),
    BoundingBox(BoundingBox),
    Immersion(Arc<dyn Immersion>),
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Bool(_) => ValueType::Bool,
            Value::Count(_) => ValueType::Count,
            Value::Double(_) => ValueType::Double,
            Value::Metric(_) => ValueType::Metric,
            Value::Ints(_) => ValueType::Ints,
            Value::Doubles(_) => ValueType::Doubles,
            Value::Strings(_) => ValueType::Strings,
            Value::IntArrays(_) => ValueType::IntArrays,
            Value::DoubleArrays(_) => ValueType::DoubleArrays,
            Value::BoundingBox(_) => ValueType::BoundingBox,
            Value::Immersion(_) => ValueType::Immersion,
        }
    }

    /// Identity test used to skip no-op assignments.
    ///
    /// Arrays and immersions compare by allocation, scalars by value.
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Count(a), Value::Count(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a.to_bits() == b.to_bits(),
            (Value::Metric(a), Value::Metric(b)) => a == b,
            (Value::Ints(a), Value::Ints(b)) => Arc::ptr_eq(a, b),
            (Value::Doubles(a), Value::Doubles(b)) => Arc::ptr_eq(a, b),
            (Value::Strings(a), Value::Strings(b)) => Arc::ptr_eq(a, b),
            (Value::IntArrays(a), Value::IntArrays(b)) => Arc::ptr_eq(a, b),
            (Value::DoubleArrays(a), Value::DoubleArrays(b)) => Arc::ptr_eq(a, b),
            (Value::BoundingBox(a), Value::BoundingBox(b)) => a == b,
            (Value::Immersion(a), Value::Immersion(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Number of elements described by an array payload, `None` for scalars.
    pub fn len(&self) -> Option<usize> {
        match self {
            Value::Ints(v) => Some(v.len()),
            Value::Doubles(v) => Some(v.len()),
            Value::Strings(v) => Some(v.len()),
            Value::IntArrays(v) => Some(v.len()),
            Value::DoubleArrays(v) => Some(v.len()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_count(&self) -> Option<usize> {
        match self {
            Value::Count(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_metric(&self) -> Option<Metric> {
        match self {
            Value::Metric(m) => Some(*m),
            _ => None,
        }
    }

    pub fn as_ints(&self) -> Option<&Arc<Vec<usize>>> {
        match self {
            Value::Ints(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_doubles(&self) -> Option<&Arc<Vec<f64>>> {
        match self {
            Value::Doubles(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_strings(&self) -> Option<&Arc<Vec<String>>> {
        match self {
            Value::Strings(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_int_arrays(&self) -> Option<&Arc<Vec<Vec<usize>>>> {
        match self {
            Value::IntArrays(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_double_arrays(&self) -> Option<&Arc<Vec<Vec<f64>>>> {
        match self {
            Value::DoubleArrays(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bounding_box(&self) -> Option<BoundingBox> {
        match self {
            Value::BoundingBox(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_immersion(&self) -> Option<&Arc<dyn Immersion>> {
        match self {
            Value::Immersion(i) => Some(i),
            _ => None,
        }
    }

    /// Convert explicit data into the representation of a node of type `ty`.
    ///
    /// Returns `None` when no conversion exists.
    pub fn coerce(self, ty: ValueType) -> Option<Value> {
        if ty.accepts(&self) {
            return Some(self);
        }
        match (self, ty) {
            (Value::Count(n), ValueType::Double) => Some(Value::Double(n as f64)),
            (Value::Ints(v), ValueType::Doubles) => {
                Some(Value::Doubles(Arc::new(v.iter().map(|&i| i as f64).collect())))
            }
            (Value::Doubles(v), ValueType::DoubleArrays) => Some(Value::DoubleArrays(Arc::new(
                v.iter().map(|&d| vec![d]).collect(),
            ))),
            (Value::Ints(v), ValueType::IntArrays) => {
                Some(Value::IntArrays(Arc::new(v.iter().map(|&i| vec![i]).collect())))
            }
            (Value::IntArrays(v), ValueType::DoubleArrays) => Some(Value::DoubleArrays(Arc::new(
                v.iter()
                    .map(|row| row.iter().map(|&i| i as f64).collect())
                    .collect(),
            ))),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Value::Count(value)
    }
}

impl From<Metric> for Value {
    fn from(value: Metric) -> Self {
        Value::Metric(value)
    }
}

impl From<Vec<usize>> for Value {
    fn from(value: Vec<usize>) -> Self {
        Value::Ints(Arc::new(value))
    }
}

impl From<Vec<f64>> for Value {
    fn from(value: Vec<f64>) -> Self {
        Value::Doubles(Arc::new(value))
    }
}

impl From<Vec<String>> for Value {
    fn from(value: Vec<String>) -> Self {
        Value::Strings(Arc::new(value))
    }
}

impl From<Vec<Vec<usize>>> for Value {
    fn from(value: Vec<Vec<usize>>) -> Self {
        Value::IntArrays(Arc::new(value))
    }
}

impl From<Vec<Vec<f64>>> for Value {
    fn from(value: Vec<Vec<f64>>) -> Self {
        Value::DoubleArrays(Arc::new(value))
    }
}

impl From<BoundingBox> for Value {
    fn from(value: BoundingBox) -> Self {
        Value::BoundingBox(value)
    }
}

/// Take the buffer out of a recompute hint if it can be reused in place.
///
/// The buffer is reused only when nobody else holds the `Arc` and its shape is
/// `rows x cols`; otherwise a zeroed buffer is allocated.
pub fn reuse_rows(hint: Option<Value>, rows: usize, cols: usize) -> Vec<Vec<f64>> {
    if let Some(Value::DoubleArrays(shared)) = hint {
        if let Ok(buffer) = Arc::try_unwrap(shared) {
            if buffer.len() == rows && buffer.iter().all(|row| row.len() == cols) {
                return buffer;
            }
        }
    }
    vec![vec![0.0; cols]; rows]
}
