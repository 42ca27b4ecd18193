//! Client input shapes.
//!
//! Setters accept either nested rows (one row per element) or a flat array
//! whose length is a whole multiple of the element count.

use indexmap::IndexMap;

use crate::data::{Attribute, Category};
use crate::error::{GeometryError, Result};
use crate::graph::Value;

/// Floating point attribute data.
#[derive(Debug, Clone, PartialEq)]
pub enum DoubleData {
    /// `count * fiber` values, element after element.
    Flat(Vec<f64>),
    /// One row per element.
    Nested(Vec<Vec<f64>>),
}

impl DoubleData {
    /// Split into one row per element.
    ///
    /// Flat data must divide evenly into `count` rows; nested data must have
    /// `count` rows.
    pub fn into_rows(self, category: Category, attribute: &Attribute, count: usize) -> Result<Vec<Vec<f64>>> {
        let wrong_length = |found: usize| GeometryError::WrongLength {
            category,
            attribute: attribute.clone(),
            expected: count,
            found,
        };
        match self {
            DoubleData::Nested(rows) => {
                if rows.len() != count {
                    return Err(wrong_length(rows.len()));
                }
                Ok(rows)
            }
            DoubleData::Flat(values) => {
                if count == 0 {
                    return if values.is_empty() {
                        Ok(Vec::new())
                    } else {
                        Err(wrong_length(values.len()))
                    };
                }
                if values.is_empty() || values.len() % count != 0 {
                    return Err(wrong_length(values.len()));
                }
                let fiber = values.len() / count;
                Ok(values.chunks(fiber).map(<[f64]>::to_vec).collect())
            }
        }
    }
}

impl From<Vec<f64>> for DoubleData {
    fn from(values: Vec<f64>) -> Self {
        DoubleData::Flat(values)
    }
}

impl From<Vec<Vec<f64>>> for DoubleData {
    fn from(rows: Vec<Vec<f64>>) -> Self {
        DoubleData::Nested(rows)
    }
}

impl<const N: usize> From<Vec<[f64; N]>> for DoubleData {
    fn from(rows: Vec<[f64; N]>) -> Self {
        DoubleData::Nested(rows.into_iter().map(|row| row.to_vec()).collect())
    }
}

/// Index data for edges and faces.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexData {
    /// Fixed-size polygons or polylines packed back to back.
    Flat { indices: Vec<usize>, per_element: usize },
    /// One row per element; rows may differ in length.
    Nested(Vec<Vec<usize>>),
}

impl IndexData {
    pub fn flat(indices: Vec<usize>, per_element: usize) -> Self {
        IndexData::Flat { indices, per_element }
    }

    /// Split into one row per element.
    pub fn into_rows(self) -> Result<Vec<Vec<usize>>> {
        match self {
            IndexData::Nested(rows) => Ok(rows),
            IndexData::Flat { indices, per_element } => {
                if per_element == 0 {
                    return Err(GeometryError::InvalidArgument(
                        "elements need at least one index".to_string(),
                    ));
                }
                if indices.len() % per_element != 0 {
                    return Err(GeometryError::InvalidArgument(format!(
                        "{} indices do not split into elements of {}",
                        indices.len(),
                        per_element
                    )));
                }
                Ok(indices.chunks(per_element).map(<[usize]>::to_vec).collect())
            }
        }
    }
}

impl From<Vec<Vec<usize>>> for IndexData {
    fn from(rows: Vec<Vec<usize>>) -> Self {
        IndexData::Nested(rows)
    }
}

impl<const N: usize> From<Vec<[usize; N]>> for IndexData {
    fn from(rows: Vec<[usize; N]>) -> Self {
        IndexData::Nested(rows.into_iter().map(|row| row.to_vec()).collect())
    }
}

/// Named attribute lists for bulk setting.
pub type AttributeMap = IndexMap<Attribute, Value>;
