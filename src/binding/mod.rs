//! Global parameter and texture binding table
//!
//! Replaces implicit engine-global shader state with an explicit context
//! object. Writes are last-writer-wins; determinism comes from ordered
//! stage recording, which makes write order a correctness invariant
//! rather than an accident.

use std::collections::HashMap;

use glam::{Vec2, Vec3, Vec4};

use crate::target::pool::TargetHandle;

/// A named global parameter value
#[derive(Clone, Debug, PartialEq)]
pub enum ParamValue {
    Float(f32),
    Int(i32),
    Bool(bool),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    /// Color, stored linear RGBA
    Color(Vec4),
    FloatArray(Vec<f32>),
    Vec4Array(Vec<Vec4>),
}

impl ParamValue {
    /// Scalar view of the value, if it has one
    pub fn as_float(&self) -> Option<f32> {
        match self {
            ParamValue::Float(v) => Some(*v),
            ParamValue::Int(v) => Some(*v as f32),
            ParamValue::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
            _ => None,
        }
    }
}

impl From<f32> for ParamValue {
    fn from(v: f32) -> Self {
        ParamValue::Float(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        ParamValue::Int(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<Vec2> for ParamValue {
    fn from(v: Vec2) -> Self {
        ParamValue::Vec2(v)
    }
}

impl From<Vec3> for ParamValue {
    fn from(v: Vec3) -> Self {
        ParamValue::Vec3(v)
    }
}

impl From<Vec4> for ParamValue {
    fn from(v: Vec4) -> Self {
        ParamValue::Vec4(v)
    }
}

/// What a named global texture points at
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureBinding {
    /// A scratch target written earlier this frame
    Scratch(TargetHandle),
    /// 1x1 black fallback, bound when an upstream pass is disabled so a
    /// dependent sample never reads stale memory
    NeutralBlack,
}

/// Named global parameter/texture table with last-writer-wins semantics
#[derive(Clone, Debug, Default)]
pub struct BindingTable {
    params: HashMap<String, ParamValue>,
    textures: HashMap<String, TextureBinding>,
}

impl BindingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: &str, value: impl Into<ParamValue>) {
        self.params.insert(name.to_owned(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.params.get(name)
    }

    pub fn float(&self, name: &str) -> Option<f32> {
        self.params.get(name).and_then(ParamValue::as_float)
    }

    pub fn set_texture(&mut self, name: &str, binding: TextureBinding) {
        self.textures.insert(name.to_owned(), binding);
    }

    pub fn texture(&self, name: &str) -> Option<TextureBinding> {
        self.textures.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.params.len() + self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty() && self.textures.is_empty()
    }

    pub fn clear(&mut self) {
        self.params.clear();
        self.textures.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_writer_wins() {
        let mut table = BindingTable::new();
        table.set("blur_offset", 0.5);
        table.set("blur_offset", 2.5);
        assert_eq!(table.float("blur_offset"), Some(2.5));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_value_conversions() {
        let mut table = BindingTable::new();
        table.set("steps", 12);
        table.set("preview", true);
        table.set("tint", Vec4::ONE);

        assert_eq!(table.float("steps"), Some(12.0));
        assert_eq!(table.float("preview"), Some(1.0));
        assert_eq!(table.float("tint"), None);
        assert_eq!(table.get("tint"), Some(&ParamValue::Vec4(Vec4::ONE)));
    }

    #[test]
    fn test_texture_neutral_fallback_binding() {
        let mut table = BindingTable::new();
        table.set_texture("volumetric_surface", TextureBinding::NeutralBlack);
        assert_eq!(
            table.texture("volumetric_surface"),
            Some(TextureBinding::NeutralBlack)
        );
        assert_eq!(table.texture("unbound"), None);
    }
}
