//! Shared, typed data arrays handed to a volume as parameters.
//!
//! Arrays are reference counted so committing a volume never copies voxel
//! payloads; the caller keeps its own handle.

use crate::error::{Result, VolumeError};
use std::sync::Arc;

/// Element type of a [`Data`] array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    UChar,
    Char,
    Short,
    UShort,
    Int,
    UInt,
    Float,
    Double,
}

impl DataType {
    /// Element types a voxel attribute may use
    pub const VOXEL_TYPES: [DataType; 5] = [
        DataType::UChar,
        DataType::Short,
        DataType::UShort,
        DataType::Float,
        DataType::Double,
    ];

    pub fn is_voxel_type(self) -> bool {
        Self::VOXEL_TYPES.contains(&self)
    }

    pub fn size_of(self) -> usize {
        match self {
            DataType::UChar | DataType::Char => 1,
            DataType::Short | DataType::UShort => 2,
            DataType::Int | DataType::UInt | DataType::Float => 4,
            DataType::Double => 8,
        }
    }
}

/// A shared one-dimensional array of scalars
#[derive(Debug, Clone, PartialEq)]
pub enum Data {
    UChar(Arc<[u8]>),
    Char(Arc<[i8]>),
    Short(Arc<[i16]>),
    UShort(Arc<[u16]>),
    Int(Arc<[i32]>),
    UInt(Arc<[u32]>),
    Float(Arc<[f32]>),
    Double(Arc<[f64]>),
}

impl Data {
    pub fn data_type(&self) -> DataType {
        match self {
            Data::UChar(_) => DataType::UChar,
            Data::Char(_) => DataType::Char,
            Data::Short(_) => DataType::Short,
            Data::UShort(_) => DataType::UShort,
            Data::Int(_) => DataType::Int,
            Data::UInt(_) => DataType::UInt,
            Data::Float(_) => DataType::Float,
            Data::Double(_) => DataType::Double,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Data::UChar(d) => d.len(),
            Data::Char(d) => d.len(),
            Data::Short(d) => d.len(),
            Data::UShort(d) => d.len(),
            Data::Int(d) => d.len(),
            Data::UInt(d) => d.len(),
            Data::Float(d) => d.len(),
            Data::Double(d) => d.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element `index` widened (or narrowed, for `Double`) to `f32`
    #[inline]
    pub fn get_f32(&self, index: usize) -> f32 {
        match self {
            Data::UChar(d) => d[index] as f32,
            Data::Char(d) => d[index] as f32,
            Data::Short(d) => d[index] as f32,
            Data::UShort(d) => d[index] as f32,
            Data::Int(d) => d[index] as f32,
            Data::UInt(d) => d[index] as f32,
            Data::Float(d) => d[index],
            Data::Double(d) => d[index] as f32,
        }
    }

    pub fn as_u8(&self) -> Option<&[u8]> {
        match self {
            Data::UChar(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<&[f32]> {
        match self {
            Data::Float(d) => Some(d),
            _ => None,
        }
    }

    /// Decode a native byte order buffer of `data_type` elements.
    ///
    /// The buffer needs no particular alignment; a trailing partial element
    /// is an error.
    pub fn from_bytes(data_type: DataType, bytes: &[u8]) -> Result<Data> {
        let size = data_type.size_of();
        if bytes.len() % size != 0 {
            return Err(VolumeError::invalid(
                "data",
                format!(
                    "byte length {} is not a multiple of the {:?} element size {}",
                    bytes.len(),
                    data_type,
                    size
                ),
            ));
        }

        fn read<T: bytemuck::Pod>(bytes: &[u8]) -> Arc<[T]> {
            bytes
                .chunks_exact(std::mem::size_of::<T>())
                .map(bytemuck::pod_read_unaligned::<T>)
                .collect()
        }

        Ok(match data_type {
            DataType::UChar => Data::UChar(Arc::from(bytes)),
            DataType::Char => Data::Char(read(bytes)),
            DataType::Short => Data::Short(read(bytes)),
            DataType::UShort => Data::UShort(read(bytes)),
            DataType::Int => Data::Int(read(bytes)),
            DataType::UInt => Data::UInt(read(bytes)),
            DataType::Float => Data::Float(read(bytes)),
            DataType::Double => Data::Double(read(bytes)),
        })
    }
}

macro_rules! impl_data_from {
    ($ty:ty, $variant:ident) => {
        impl From<Vec<$ty>> for Data {
            fn from(values: Vec<$ty>) -> Self {
                Data::$variant(values.into())
            }
        }

        impl From<&[$ty]> for Data {
            fn from(values: &[$ty]) -> Self {
                Data::$variant(values.into())
            }
        }

        impl From<Arc<[$ty]>> for Data {
            fn from(values: Arc<[$ty]>) -> Self {
                Data::$variant(values)
            }
        }
    };
}

impl_data_from!(u8, UChar);
impl_data_from!(i8, Char);
impl_data_from!(i16, Short);
impl_data_from!(u16, UShort);
impl_data_from!(i32, Int);
impl_data_from!(u32, UInt);
impl_data_from!(f32, Float);
impl_data_from!(f64, Double);
