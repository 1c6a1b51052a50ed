//! Staged object parameters
//!
//! Every managed object carries a string-keyed [`Params`] bag. Writes land
//! here immediately but only take effect when the object is committed.

use std::collections::HashMap;

use lumen_core::DataType;
use lumen_math::{Vec3, Vec4};

use crate::object::ObjectRef;

/// A single parameter value
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Int(i32),
    Int2([i32; 2]),
    Int3([i32; 3]),
    Int4([i32; 4]),
    UInt(u32),
    UInt2([u32; 2]),
    UInt3([u32; 3]),
    UInt4([u32; 4]),
    Float(f32),
    Float2([f32; 2]),
    Float3([f32; 3]),
    Float4([f32; 4]),
    String(String),
    /// Object reference; `None` for the null handle
    Object(Option<ObjectRef>),
}

impl Param {
    /// Type tag the value was sent with
    pub fn data_type(&self) -> DataType {
        match self {
            Param::Int(_) => DataType::Int,
            Param::Int2(_) => DataType::Int2,
            Param::Int3(_) => DataType::Int3,
            Param::Int4(_) => DataType::Int4,
            Param::UInt(_) => DataType::UInt,
            Param::UInt2(_) => DataType::UInt2,
            Param::UInt3(_) => DataType::UInt3,
            Param::UInt4(_) => DataType::UInt4,
            Param::Float(_) => DataType::Float,
            Param::Float2(_) => DataType::Float2,
            Param::Float3(_) => DataType::Float3,
            Param::Float4(_) => DataType::Float4,
            Param::String(_) => DataType::String,
            Param::Object(_) => DataType::Object,
        }
    }

    /// Scalar view, converting integers
    pub fn as_float(&self) -> Option<f32> {
        match self {
            Param::Float(v) => Some(*v),
            Param::Int(v) => Some(*v as f32),
            Param::UInt(v) => Some(*v as f32),
            _ => None,
        }
    }

    /// Integer view, truncating floats
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Param::Int(v) => Some(*v),
            Param::UInt(v) => i32::try_from(*v).ok(),
            Param::Float(v) => Some(*v as i32),
            _ => None,
        }
    }

    pub fn as_vec3(&self) -> Option<Vec3> {
        match self {
            Param::Float3(v) => Some(Vec3::from_array(*v)),
            Param::Float4([x, y, z, _]) => Some(Vec3::new(*x, *y, *z)),
            Param::Int3([x, y, z]) => Some(Vec3::new(*x as f32, *y as f32, *z as f32)),
            _ => None,
        }
    }

    pub fn as_int3(&self) -> Option<[i32; 3]> {
        match self {
            Param::Int3(v) => Some(*v),
            Param::UInt3([x, y, z]) => Some([*x as i32, *y as i32, *z as i32]),
            _ => None,
        }
    }

    pub fn as_float2(&self) -> Option<[f32; 2]> {
        match self {
            Param::Float2(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Param::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Param::Object(obj) => obj.as_ref(),
            _ => None,
        }
    }
}

/// String-keyed parameter bag
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    values: HashMap<String, Param>,
}

impl Params {
    /// Create an empty bag
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` under `name`, replacing any previous value
    pub fn set(&mut self, name: impl Into<String>, value: Param) -> Option<Param> {
        self.values.insert(name.into(), value)
    }

    pub fn get(&self, name: &str) -> Option<&Param> {
        self.values.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Param> {
        self.values.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Param)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn float(&self, name: &str, default: f32) -> f32 {
        self.get(name).and_then(Param::as_float).unwrap_or(default)
    }

    pub fn int(&self, name: &str, default: i32) -> i32 {
        self.get(name).and_then(Param::as_int).unwrap_or(default)
    }

    pub fn vec3(&self, name: &str, default: Vec3) -> Vec3 {
        self.get(name).and_then(Param::as_vec3).unwrap_or(default)
    }

    pub fn int3(&self, name: &str) -> Option<[i32; 3]> {
        self.get(name).and_then(Param::as_int3)
    }

    pub fn float2(&self, name: &str, default: [f32; 2]) -> [f32; 2] {
        self.get(name).and_then(Param::as_float2).unwrap_or(default)
    }

    /// RGBA color; a float3 value gets an opaque alpha
    pub fn color(&self, name: &str, default: Vec4) -> Vec4 {
        match self.get(name) {
            Some(Param::Float4(c)) => Vec4::from_array(*c),
            Some(Param::Float3(c)) => Vec3::from_array(*c).extend(1.0),
            _ => default,
        }
    }

    pub fn string(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Param::as_str)
    }

    pub fn object(&self, name: &str) -> Option<&ObjectRef> {
        self.get(name).and_then(Param::as_object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_getters() {
        let mut params = Params::new();
        params.set("fovy", Param::Float(45.0));
        params.set("aoSamples", Param::Int(4));
        params.set("pos", Param::Float3([1.0, 2.0, 3.0]));
        params.set("voxelType", Param::String("uchar".into()));

        assert_eq!(params.float("fovy", 60.0), 45.0);
        assert_eq!(params.float("aoSamples", 0.0), 4.0);
        assert_eq!(params.int("aoSamples", 1), 4);
        assert_eq!(params.vec3("pos", Vec3::ZERO), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(params.string("voxelType"), Some("uchar"));
        assert_eq!(params.float("missing", 1.5), 1.5);
    }

    #[test]
    fn test_color_promotion() {
        let mut params = Params::new();
        params.set("bgColor", Param::Float3([0.5, 0.25, 0.0]));
        assert_eq!(params.color("bgColor", Vec4::ZERO), Vec4::new(0.5, 0.25, 0.0, 1.0));

        params.set("bgColor", Param::Float4([0.0, 0.0, 0.0, 0.5]));
        assert_eq!(params.color("bgColor", Vec4::ONE).w, 0.5);
    }

    #[test]
    fn test_set_replaces() {
        let mut params = Params::new();
        assert!(params.set("radius", Param::Float(1.0)).is_none());
        assert_eq!(params.set("radius", Param::Float(2.0)), Some(Param::Float(1.0)));
        assert_eq!(params.len(), 1);
        assert_eq!(params.get("radius").map(Param::data_type), Some(DataType::Float));
    }
}
