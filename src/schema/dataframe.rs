use crate::error::InferenceError;
use crate::types::{infer_dtype, map_element_type_to_datatype, DataType, ElementType, Sample};

use super::{FieldSchema, TypeParams};

/// A labelled column of sample data.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub element_type: ElementType,
    pub values: Vec<Sample>,
}

impl Column {
    pub fn new(name: impl Into<String>, element_type: ElementType, values: Vec<Sample>) -> Self {
        Self {
            name: name.into(),
            element_type,
            values,
        }
    }
}

/// Column-oriented tabular data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataFrame {
    pub columns: Vec<Column>,
}

impl DataFrame {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn num_rows(&self) -> usize {
        self.columns.first().map(|c| c.values.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.num_columns() == 0 || self.num_rows() == 0
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// A copy of this frame without the named column.
    pub fn without_column(&self, name: &str) -> DataFrame {
        DataFrame::new(self.columns.iter().filter(|c| c.name != name).cloned().collect())
    }

    /// Fails when columns disagree on their row count.
    pub fn check_rectangular(&self) -> Result<(), InferenceError> {
        let expected = self.num_rows();
        match self.columns.iter().find(|c| c.values.len() != expected) {
            Some(column) => Err(InferenceError::RaggedColumn {
                column: column.name.clone(),
                expected,
                actual: column.values.len(),
            }),
            None => Ok(()),
        }
    }
}

/// Infers one field per column. Declared element types are used first, columns they
/// cannot resolve are classified from the first row.
pub fn infer_fields_from_dataframe(data: &DataFrame) -> Result<Vec<FieldSchema>, InferenceError> {
    if data.is_empty() {
        return Err(InferenceError::EmptyData);
    }
    data.check_rectangular()?;

    let mut dtypes: Vec<DataType> = data
        .columns
        .iter()
        .map(|c| map_element_type_to_datatype(c.element_type))
        .collect();
    let mut params = vec![TypeParams::default(); dtypes.len()];

    if dtypes.contains(&DataType::Unknown) {
        for (i, column) in data.columns.iter().enumerate() {
            if dtypes[i] != DataType::Unknown {
                continue;
            }
            let sample = &column.values[0];
            let dtype = infer_dtype(sample);
            if dtype.is_vector() {
                params[i].dim = sample.vector_dim();
            }
            tracing::debug!(column = %column.name, ?dtype, "inferred column type from first row");
            dtypes[i] = dtype;
        }
    }

    let unresolved: Vec<String> = data
        .columns
        .iter()
        .zip(&dtypes)
        .filter(|(_, dtype)| **dtype == DataType::Unknown)
        .map(|(c, _)| c.name.clone())
        .collect();
    if !unresolved.is_empty() {
        return Err(InferenceError::UnresolvedColumns(unresolved));
    }

    data.columns
        .iter()
        .zip(dtypes)
        .zip(params)
        .map(|((column, dtype), params)| {
            FieldSchema::builder(column.name.clone(), dtype)
                .type_params(params)
                .build()
                .map_err(InferenceError::from)
        })
        .collect()
}
