use serde_json::Value;

use super::{is_numeric_datatype, map_element_type_to_datatype, DataType, ElementType};

/// A single scalar value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float(f32),
    Double(f64),
    String(String),
}

impl Scalar {
    pub fn to_json(&self) -> Value {
        match self {
            Scalar::Null => Value::Null,
            Scalar::Bool(v) => Value::from(*v),
            Scalar::Int8(v) => Value::from(*v),
            Scalar::Int16(v) => Value::from(*v),
            Scalar::Int32(v) => Value::from(*v),
            Scalar::Int64(v) => Value::from(*v),
            Scalar::Float(v) => Value::from(*v),
            Scalar::Double(v) => Value::from(*v),
            Scalar::String(v) => Value::from(v.as_str()),
        }
    }
}

/// A cell of sample data: a scalar, a raw byte string, or a sequence of scalars.
#[derive(Debug, Clone, PartialEq)]
pub enum Sample {
    Scalar(Scalar),
    Bytes(Vec<u8>),
    Sequence {
        items: Vec<Scalar>,
        /// Element type of the container, when it carries one.
        element_type: Option<ElementType>,
    },
}

impl Sample {
    pub fn sequence(items: Vec<Scalar>) -> Self {
        Sample::Sequence {
            items,
            element_type: None,
        }
    }

    pub fn float_vector(values: &[f32]) -> Self {
        Sample::Sequence {
            items: values.iter().copied().map(Scalar::Float).collect(),
            element_type: Some(ElementType::Float32),
        }
    }

    /// Vector dimension implied by this sample: bits for bytes, elements for sequences.
    pub fn vector_dim(&self) -> Option<i64> {
        match self {
            Sample::Scalar(_) => None,
            Sample::Bytes(bytes) => Some(bytes.len() as i64 * 8),
            Sample::Sequence { items, .. } => Some(items.len() as i64),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Sample::Scalar(scalar) => scalar.to_json(),
            Sample::Bytes(bytes) => Value::from(bytes.clone()),
            Sample::Sequence { items, .. } => {
                Value::Array(items.iter().map(Scalar::to_json).collect())
            }
        }
    }
}

impl From<Scalar> for Sample {
    fn from(scalar: Scalar) -> Self {
        Sample::Scalar(scalar)
    }
}

/// Classifies a scalar by its exact type. Booleans never count as integers.
pub fn infer_dtype_by_scalar(value: &Scalar) -> DataType {
    match value {
        Scalar::Bool(_) => DataType::Bool,
        Scalar::Int8(_) => DataType::Int8,
        Scalar::Int16(_) => DataType::Int16,
        Scalar::Int32(_) => DataType::Int32,
        Scalar::Int64(_) => DataType::Int64,
        Scalar::Float(_) => DataType::Float,
        Scalar::Double(_) => DataType::Double,
        Scalar::String(_) => DataType::String,
        Scalar::Null => DataType::Unknown,
    }
}

/// Classifies a sample. Later stages are consulted only when earlier ones come back
/// `Unknown`: homogeneous structure, then the first element, then the container's
/// element type.
pub fn infer_dtype(sample: &Sample) -> DataType {
    let (items, element_type) = match sample {
        Sample::Scalar(scalar) => return infer_dtype_by_scalar(scalar),
        Sample::Bytes(_) => return DataType::BinaryVector,
        Sample::Sequence {
            items,
            element_type,
        } => (items, element_type),
    };

    let dtype = infer_homogeneous(items);
    if dtype != DataType::Unknown {
        return dtype;
    }

    if let Some(first) = items.first() {
        let dtype = infer_dtype_by_scalar(first);
        if dtype != DataType::Unknown {
            tracing::debug!(?dtype, "inferred sequence type from its first element");
            return dtype;
        }
    }

    match element_type {
        Some(element_type) => map_element_type_to_datatype(*element_type),
        None => DataType::Unknown,
    }
}

fn infer_homogeneous(items: &[Scalar]) -> DataType {
    if items.is_empty() {
        return DataType::Unknown;
    }
    // Doubles sit outside the float predicate but still make up a float vector.
    let all_numeric = items.iter().all(|item| {
        let dtype = infer_dtype_by_scalar(item);
        is_numeric_datatype(dtype) || dtype == DataType::Double
    });
    if all_numeric {
        DataType::FloatVector
    } else {
        DataType::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bool_is_not_integer() {
        assert_eq!(infer_dtype_by_scalar(&Scalar::Bool(true)), DataType::Bool);
        assert_eq!(infer_dtype_by_scalar(&Scalar::Int64(1)), DataType::Int64);
    }

    #[test]
    fn test_scalar_kinds() {
        assert_eq!(infer_dtype_by_scalar(&Scalar::Int8(1)), DataType::Int8);
        assert_eq!(infer_dtype_by_scalar(&Scalar::Float(1.0)), DataType::Float);
        assert_eq!(infer_dtype_by_scalar(&Scalar::Double(1.0)), DataType::Double);
        assert_eq!(
            infer_dtype_by_scalar(&Scalar::String("a".into())),
            DataType::String
        );
        assert_eq!(infer_dtype_by_scalar(&Scalar::Null), DataType::Unknown);
    }

    #[test]
    fn test_scalar_sample_delegates() {
        assert_eq!(infer_dtype(&Scalar::Bool(false).into()), DataType::Bool);
    }

    #[test]
    fn test_numeric_sequence_is_float_vector() {
        let ints = Sample::sequence(vec![Scalar::Int64(1), Scalar::Int64(2)]);
        assert_eq!(infer_dtype(&ints), DataType::FloatVector);

        let mixed = Sample::sequence(vec![Scalar::Int32(1), Scalar::Double(0.5)]);
        assert_eq!(infer_dtype(&mixed), DataType::FloatVector);

        assert_eq!(infer_dtype(&Sample::float_vector(&[0.1, 0.2])), DataType::FloatVector);
    }

    #[test]
    fn test_bytes_are_binary_vector() {
        assert_eq!(infer_dtype(&Sample::Bytes(vec![0, 255])), DataType::BinaryVector);
        assert_eq!(Sample::Bytes(vec![0, 255]).vector_dim(), Some(16));
    }

    #[test]
    fn test_falls_back_to_first_element() {
        let strings = Sample::sequence(vec![
            Scalar::String("a".into()),
            Scalar::String("b".into()),
        ]);
        assert_eq!(infer_dtype(&strings), DataType::String);

        let bools = Sample::sequence(vec![Scalar::Bool(true), Scalar::Int64(3)]);
        assert_eq!(infer_dtype(&bools), DataType::Bool);
    }

    #[test]
    fn test_falls_back_to_container_element_type() {
        let sample = Sample::Sequence {
            items: vec![Scalar::Null, Scalar::Int32(3)],
            element_type: Some(ElementType::Int32),
        };
        assert_eq!(infer_dtype(&sample), DataType::Int32);

        let empty = Sample::Sequence {
            items: vec![],
            element_type: Some(ElementType::Float64),
        };
        assert_eq!(infer_dtype(&empty), DataType::Double);
    }

    #[test]
    fn test_unresolved_is_unknown() {
        assert_eq!(infer_dtype(&Sample::sequence(vec![])), DataType::Unknown);
        let object = Sample::Sequence {
            items: vec![Scalar::Null],
            element_type: Some(ElementType::Object),
        };
        assert_eq!(infer_dtype(&object), DataType::Unknown);
    }
}
