pub mod inference;

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

pub use inference::{infer_dtype, infer_dtype_by_scalar, Sample, Scalar};

/// Field data type, carried on the wire as its integer code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum DataType {
    None,
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    Float,
    Double,
    String,
    BinaryVector,
    FloatVector,
    /// Inference sentinel, never valid in a finished schema.
    Unknown,
}

impl DataType {
    pub const ALL: [DataType; 12] = [
        DataType::None,
        DataType::Bool,
        DataType::Int8,
        DataType::Int16,
        DataType::Int32,
        DataType::Int64,
        DataType::Float,
        DataType::Double,
        DataType::String,
        DataType::BinaryVector,
        DataType::FloatVector,
        DataType::Unknown,
    ];

    pub fn code(self) -> i32 {
        match self {
            DataType::None => 0,
            DataType::Bool => 1,
            DataType::Int8 => 2,
            DataType::Int16 => 3,
            DataType::Int32 => 4,
            DataType::Int64 => 5,
            DataType::Float => 10,
            DataType::Double => 11,
            DataType::String => 20,
            DataType::BinaryVector => 100,
            DataType::FloatVector => 101,
            DataType::Unknown => 999,
        }
    }

    pub fn is_vector(self) -> bool {
        matches!(self, DataType::BinaryVector | DataType::FloatVector)
    }

    /// Name used by the server's HTTP API.
    pub fn rest_name(self) -> &'static str {
        match self {
            DataType::None => "None",
            DataType::Bool => "Bool",
            DataType::Int8 => "Int8",
            DataType::Int16 => "Int16",
            DataType::Int32 => "Int32",
            DataType::Int64 => "Int64",
            DataType::Float => "Float",
            DataType::Double => "Double",
            DataType::String => "VarChar",
            DataType::BinaryVector => "BinaryVector",
            DataType::FloatVector => "FloatVector",
            DataType::Unknown => "Unknown",
        }
    }

    pub fn from_rest_name(name: &str) -> Option<Self> {
        let dtype = match name {
            "None" => DataType::None,
            "Bool" => DataType::Bool,
            "Int8" => DataType::Int8,
            "Int16" => DataType::Int16,
            "Int32" => DataType::Int32,
            "Int64" => DataType::Int64,
            "Float" => DataType::Float,
            "Double" => DataType::Double,
            "VarChar" | "String" => DataType::String,
            "BinaryVector" => DataType::BinaryVector,
            "FloatVector" => DataType::FloatVector,
            _ => return None,
        };
        Some(dtype)
    }
}

impl TryFrom<i32> for DataType {
    type Error = SchemaError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        DataType::ALL
            .into_iter()
            .find(|dtype| dtype.code() == code)
            .ok_or(SchemaError::UnknownTypeCode(code))
    }
}

impl From<DataType> for i32 {
    fn from(dtype: DataType) -> Self {
        dtype.code()
    }
}

pub fn is_integer_datatype(dtype: DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64
    )
}

pub fn is_float_datatype(dtype: DataType) -> bool {
    matches!(dtype, DataType::Float)
}

pub fn is_numeric_datatype(dtype: DataType) -> bool {
    is_float_datatype(dtype) || is_integer_datatype(dtype)
}

/// Native element type of a column or array container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    /// Heterogeneous or reference-typed storage with no scalar mapping.
    Object,
}

/// Maps a native element type to a scalar [`DataType`], `Unknown` when unmapped.
pub fn map_element_type_to_datatype(element_type: ElementType) -> DataType {
    match element_type {
        ElementType::Bool => DataType::Bool,
        ElementType::Int8 => DataType::Int8,
        ElementType::Int16 => DataType::Int16,
        ElementType::Int32 => DataType::Int32,
        ElementType::Int64 => DataType::Int64,
        ElementType::Float32 => DataType::Float,
        ElementType::Float64 => DataType::Double,
        ElementType::Object => DataType::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_is_integer_or_float() {
        for dtype in DataType::ALL {
            assert_eq!(
                is_numeric_datatype(dtype),
                is_integer_datatype(dtype) || is_float_datatype(dtype),
                "{dtype:?}"
            );
        }
    }

    #[test]
    fn test_vectors_and_strings_are_not_numeric() {
        for dtype in [
            DataType::String,
            DataType::BinaryVector,
            DataType::FloatVector,
            DataType::Bool,
            DataType::Unknown,
        ] {
            assert!(!is_numeric_datatype(dtype));
        }
    }

    #[test]
    fn test_code_mapping_is_bidirectional() {
        for dtype in DataType::ALL {
            assert_eq!(DataType::try_from(dtype.code()).unwrap(), dtype);
        }
        assert!(matches!(
            DataType::try_from(42),
            Err(SchemaError::UnknownTypeCode(42))
        ));
    }

    #[test]
    fn test_serializes_as_code() {
        assert_eq!(serde_json::to_string(&DataType::FloatVector).unwrap(), "101");
        let dtype: DataType = serde_json::from_str("5").unwrap();
        assert_eq!(dtype, DataType::Int64);
        assert!(serde_json::from_str::<DataType>("7").is_err());
    }

    #[test]
    fn test_element_type_mapping() {
        assert_eq!(map_element_type_to_datatype(ElementType::Int64), DataType::Int64);
        assert_eq!(map_element_type_to_datatype(ElementType::Float32), DataType::Float);
        assert_eq!(map_element_type_to_datatype(ElementType::Float64), DataType::Double);
        assert_eq!(map_element_type_to_datatype(ElementType::Object), DataType::Unknown);
    }

    #[test]
    fn test_rest_names_round_trip() {
        for dtype in DataType::ALL.into_iter().filter(|d| *d != DataType::Unknown) {
            assert_eq!(DataType::from_rest_name(dtype.rest_name()), Some(dtype));
        }
    }
}
