//! Staged volume parameters.
//!
//! Parameters are set by name and only interpreted when the volume is
//! committed. Lookups report missing or mistyped entries as
//! [`VolumeError`]s carrying the parameter name.

use crate::data::Data;
use crate::error::{Result, VolumeError};
use std::collections::HashMap;

/// A single staged parameter value
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Int(i32),
    Vec3i([i32; 3]),
    Vec3f([f32; 3]),
    Data(Data),
    /// Ordered sequence of arrays, entries may be absent
    DataArray(Vec<Option<Data>>),
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Int(value)
    }
}

impl From<[i32; 3]> for ParamValue {
    fn from(value: [i32; 3]) -> Self {
        ParamValue::Vec3i(value)
    }
}

impl From<[f32; 3]> for ParamValue {
    fn from(value: [f32; 3]) -> Self {
        ParamValue::Vec3f(value)
    }
}

impl From<Data> for ParamValue {
    fn from(value: Data) -> Self {
        ParamValue::Data(value)
    }
}

impl From<Vec<Data>> for ParamValue {
    fn from(value: Vec<Data>) -> Self {
        ParamValue::DataArray(value.into_iter().map(Some).collect())
    }
}

impl From<Vec<Option<Data>>> for ParamValue {
    fn from(value: Vec<Option<Data>>) -> Self {
        ParamValue::DataArray(value)
    }
}

/// Named parameters staged on a volume
#[derive(Debug, Clone, Default)]
pub struct ParameterSet {
    values: HashMap<String, ParamValue>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<ParamValue> {
        self.values.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn type_error(name: &'static str, expected: &'static str) -> VolumeError {
        VolumeError::ParameterType { name, expected }
    }

    pub fn vec3i(&self, name: &'static str) -> Result<[i32; 3]> {
        match self.values.get(name) {
            Some(ParamValue::Vec3i(v)) => Ok(*v),
            Some(_) => Err(Self::type_error(name, "vec3i")),
            None => Err(VolumeError::MissingParameter(name)),
        }
    }

    pub fn vec3f_or(&self, name: &'static str, default: [f32; 3]) -> Result<[f32; 3]> {
        match self.values.get(name) {
            Some(ParamValue::Vec3f(v)) => Ok(*v),
            Some(_) => Err(Self::type_error(name, "vec3f")),
            None => Ok(default),
        }
    }

    pub fn int_opt(&self, name: &'static str) -> Result<Option<i32>> {
        match self.values.get(name) {
            Some(ParamValue::Int(v)) => Ok(Some(*v)),
            Some(_) => Err(Self::type_error(name, "int")),
            None => Ok(None),
        }
    }

    pub fn data_opt(&self, name: &'static str) -> Result<Option<&Data>> {
        match self.values.get(name) {
            Some(ParamValue::Data(d)) => Ok(Some(d)),
            Some(_) => Err(Self::type_error(name, "data")),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_and_mistyped() {
        let mut params = ParameterSet::new();
        assert_eq!(
            params.vec3i("dimensions"),
            Err(VolumeError::MissingParameter("dimensions"))
        );

        params.set("dimensions", [1.0f32, 2.0, 3.0]);
        assert!(matches!(
            params.vec3i("dimensions"),
            Err(VolumeError::ParameterType { name: "dimensions", .. })
        ));

        params.set("dimensions", [4, 5, 6]);
        assert_eq!(params.vec3i("dimensions"), Ok([4, 5, 6]));
    }

    #[test]
    fn test_defaults() {
        let params = ParameterSet::new();
        assert_eq!(params.vec3f_or("gridSpacing", [1.0; 3]), Ok([1.0; 3]));
        assert_eq!(params.int_opt("filter"), Ok(None));
        assert!(params.is_empty());
    }

    #[test]
    fn test_data_array_from_vec() {
        let mut params = ParameterSet::new();
        params.set("data", vec![Data::from(vec![1.0f32]), Data::from(vec![2u8])]);
        match params.get("data") {
            Some(ParamValue::DataArray(array)) => {
                assert_eq!(array.len(), 2);
                assert!(array.iter().all(Option::is_some));
            }
            other => panic!("unexpected value {:?}", other),
        }
        assert!(matches!(
            params.data_opt("data"),
            Err(VolumeError::ParameterType { name: "data", .. })
        ));
    }
}
