use std::collections::BTreeMap;

use glam::{Quat, Vec2, Vec3, Vec4};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterType {
    Float,
    Float2,
    Float3,
    Float4,
    Quaternion,
    String,
}

impl ParameterType {
    pub const ALL: [ParameterType; 6] = [
        ParameterType::Float,
        ParameterType::Float2,
        ParameterType::Float3,
        ParameterType::Float4,
        ParameterType::Quaternion,
        ParameterType::String,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ParameterType::Float => "Float",
            ParameterType::Float2 => "Float2",
            ParameterType::Float3 => "Float3",
            ParameterType::Float4 => "Float4",
            ParameterType::Quaternion => "Quaternion",
            ParameterType::String => "String",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|ty| ty.name() == name)
    }

    /// Number of floats in one value, zero for strings.
    pub fn component_count(self) -> usize {
        match self {
            ParameterType::Float => 1,
            ParameterType::Float2 => 2,
            ParameterType::Float3 => 3,
            ParameterType::Float4 | ParameterType::Quaternion => 4,
            ParameterType::String => 0,
        }
    }

    pub fn size_bytes(self) -> usize {
        self.component_count() * std::mem::size_of::<f32>()
    }

    pub fn is_animatable(self) -> bool {
        self != ParameterType::String
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue {
    Float(f32),
    Float2(Vec2),
    Float3(Vec3),
    Float4(Vec4),
    Quaternion(Quat),
    String(String),
}

impl ParameterValue {
    pub fn ty(&self) -> ParameterType {
        match self {
            ParameterValue::Float(_) => ParameterType::Float,
            ParameterValue::Float2(_) => ParameterType::Float2,
            ParameterValue::Float3(_) => ParameterType::Float3,
            ParameterValue::Float4(_) => ParameterType::Float4,
            ParameterValue::Quaternion(_) => ParameterType::Quaternion,
            ParameterValue::String(_) => ParameterType::String,
        }
    }

    pub fn default_for(ty: ParameterType) -> Self {
        match ty {
            ParameterType::Float => ParameterValue::Float(0.0),
            ParameterType::Float2 => ParameterValue::Float2(Vec2::ZERO),
            ParameterType::Float3 => ParameterValue::Float3(Vec3::ZERO),
            ParameterType::Float4 => ParameterValue::Float4(Vec4::ZERO),
            ParameterType::Quaternion => ParameterValue::Quaternion(Quat::IDENTITY),
            ParameterType::String => ParameterValue::String(String::new()),
        }
    }

    /// Components of a numeric value, quaternions as `xyzw`. Empty for strings.
    pub fn components(&self) -> Vec<f32> {
        match self {
            ParameterValue::Float(value) => vec![*value],
            ParameterValue::Float2(value) => value.to_array().to_vec(),
            ParameterValue::Float3(value) => value.to_array().to_vec(),
            ParameterValue::Float4(value) => value.to_array().to_vec(),
            ParameterValue::Quaternion(value) => value.to_array().to_vec(),
            ParameterValue::String(_) => Vec::new(),
        }
    }

    pub fn from_components(ty: ParameterType, components: &[f32]) -> Option<Self> {
        if components.len() != ty.component_count() {
            return None;
        }

        match ty {
            ParameterType::Float => Some(ParameterValue::Float(components[0])),
            ParameterType::Float2 => Some(ParameterValue::Float2(Vec2::from_slice(components))),
            ParameterType::Float3 => Some(ParameterValue::Float3(Vec3::from_slice(components))),
            ParameterType::Float4 => Some(ParameterValue::Float4(Vec4::from_slice(components))),
            ParameterType::Quaternion => {
                Some(ParameterValue::Quaternion(Quat::from_slice(components)))
            }
            ParameterType::String => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParameterValue::String(value) => Some(value),
            _ => None,
        }
    }
}

/// Keyframed values of one parameter, keys sorted ascending and unique.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterCurve {
    ty: ParameterType,
    keys: Vec<f32>,
    values: Vec<f32>,
}

impl ParameterCurve {
    pub fn new(ty: ParameterType) -> Self {
        Self {
            ty,
            keys: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Rebuilds a curve from its raw key and flattened value arrays.
    pub fn from_raw(ty: ParameterType, keys: Vec<f32>, values: Vec<f32>) -> Option<Self> {
        let sorted = keys.windows(2).all(|pair| pair[0] < pair[1]);
        if !ty.is_animatable() || keys.len() * ty.component_count() != values.len() || !sorted {
            return None;
        }
        Some(Self { ty, keys, values })
    }

    pub fn ty(&self) -> ParameterType {
        self.ty
    }

    pub fn keys(&self) -> &[f32] {
        &self.keys
    }

    /// Values flattened in key order.
    pub fn raw_values(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn value(&self, index: usize) -> Option<ParameterValue> {
        let arity = self.ty.component_count();
        let components = self.values.get(index * arity..(index + 1) * arity)?;
        ParameterValue::from_components(self.ty, components)
    }

    /// Inserts a key keeping the curve sorted. A key at an existing time replaces its value.
    /// Returns `false` if the value does not match the curve type.
    pub fn add(&mut self, time: f32, value: &ParameterValue) -> bool {
        if value.ty() != self.ty || !self.ty.is_animatable() {
            return false;
        }

        let arity = self.ty.component_count();
        let components = value.components();
        let index = self.keys.partition_point(|key| *key < time);

        if self.keys.get(index) == Some(&time) {
            self.values[index * arity..(index + 1) * arity].copy_from_slice(&components);
        } else {
            self.keys.insert(index, time);
            self.values
                .splice(index * arity..index * arity, components.into_iter());
        }
        true
    }

    /// Samples the curve, clamping outside the key range. Quaternions are slerped.
    pub fn evaluate(&self, time: f32) -> Option<ParameterValue> {
        let last = self.keys.len().checked_sub(1)?;
        let index = self.keys.partition_point(|key| *key < time);
        if index == 0 {
            return self.value(0);
        }
        if index > last {
            return self.value(last);
        }

        let (a, b) = (self.value(index - 1)?, self.value(index)?);
        let t = (time - self.keys[index - 1]) / (self.keys[index] - self.keys[index - 1]);

        Some(match (a, b) {
            (ParameterValue::Quaternion(a), ParameterValue::Quaternion(b)) => {
                ParameterValue::Quaternion(a.slerp(b, t))
            }
            (a, b) => {
                let lerped = a
                    .components()
                    .into_iter()
                    .zip(b.components())
                    .map(|(a, b)| a + (b - a) * t)
                    .collect::<Vec<_>>();
                ParameterValue::from_components(self.ty, &lerped)?
            }
        })
    }
}

/// A static value plus named animation curves overriding it.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    static_value: ParameterValue,
    curves: BTreeMap<String, ParameterCurve>,
}

impl Parameter {
    pub fn new(static_value: ParameterValue) -> Self {
        Self {
            static_value,
            curves: BTreeMap::new(),
        }
    }

    pub fn ty(&self) -> ParameterType {
        self.static_value.ty()
    }

    pub fn static_value(&self) -> &ParameterValue {
        &self.static_value
    }

    /// Returns `false` and keeps the old value if the type differs.
    pub fn set_static_value(&mut self, value: ParameterValue) -> bool {
        if value.ty() != self.ty() {
            return false;
        }
        self.static_value = value;
        true
    }

    /// Returns the curve called `name`, creating an empty one if needed.
    pub fn create_curve(&mut self, name: &str) -> &mut ParameterCurve {
        let ty = self.ty();
        self.curves
            .entry(name.to_owned())
            .or_insert_with(|| ParameterCurve::new(ty))
    }

    pub fn insert_curve(&mut self, name: &str, curve: ParameterCurve) -> bool {
        if curve.ty() != self.ty() {
            return false;
        }
        self.curves.insert(name.to_owned(), curve);
        true
    }

    pub fn curve(&self, name: &str) -> Option<&ParameterCurve> {
        self.curves.get(name)
    }

    /// Curves ordered by name.
    pub fn curves(&self) -> impl Iterator<Item = (&str, &ParameterCurve)> {
        self.curves.iter().map(|(name, curve)| (name.as_str(), curve))
    }

    pub fn curve_count(&self) -> usize {
        self.curves.len()
    }

    /// Value of `curve_name` at `time`, the static value if that curve does not exist or is empty.
    pub fn evaluate(&self, curve_name: &str, time: f32) -> ParameterValue {
        self.curves
            .get(curve_name)
            .and_then(|curve| curve.evaluate(time))
            .unwrap_or_else(|| self.static_value.clone())
    }
}

/// Named parameters ordered by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterBlock {
    parameters: BTreeMap<String, Parameter>,
}

impl ParameterBlock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the parameter called `name`, creating it with `value` when missing.
    pub fn find_or_create(&mut self, name: &str, value: ParameterValue) -> &mut Parameter {
        self.parameters
            .entry(name.to_owned())
            .or_insert_with(|| Parameter::new(value))
    }

    /// Replaces any parameter called `name`, dropping its curves.
    pub fn insert(&mut self, name: &str, parameter: Parameter) {
        self.parameters.insert(name.to_owned(), parameter);
    }

    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.parameters.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Parameter> {
        self.parameters.get_mut(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Parameter)> {
        self.parameters
            .iter()
            .map(|(name, parameter)| (name.as_str(), parameter))
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curve_keeps_keys_sorted_and_replaces_equal_times() {
        let mut curve = ParameterCurve::new(ParameterType::Float);
        assert!(curve.add(2.0, &ParameterValue::Float(20.0)));
        assert!(curve.add(0.0, &ParameterValue::Float(0.0)));
        assert!(curve.add(1.0, &ParameterValue::Float(10.0)));
        assert!(curve.add(1.0, &ParameterValue::Float(11.0)));

        assert_eq!(curve.keys(), &[0.0, 1.0, 2.0]);
        assert_eq!(curve.raw_values(), &[0.0, 11.0, 20.0]);
    }

    #[test]
    fn curve_rejects_mismatched_types() {
        let mut curve = ParameterCurve::new(ParameterType::Float3);
        assert!(!curve.add(0.0, &ParameterValue::Float(1.0)));

        let mut strings = ParameterCurve::new(ParameterType::String);
        assert!(!strings.add(0.0, &ParameterValue::String("a".to_owned())));
        assert!(strings.is_empty());
    }

    #[test]
    fn curve_evaluation_clamps_and_interpolates() {
        let mut curve = ParameterCurve::new(ParameterType::Float3);
        curve.add(1.0, &ParameterValue::Float3(Vec3::ZERO));
        curve.add(3.0, &ParameterValue::Float3(Vec3::new(2.0, 4.0, 6.0)));

        assert_eq!(curve.evaluate(0.0), Some(ParameterValue::Float3(Vec3::ZERO)));
        assert_eq!(
            curve.evaluate(2.0),
            Some(ParameterValue::Float3(Vec3::new(1.0, 2.0, 3.0)))
        );
        assert_eq!(
            curve.evaluate(9.0),
            Some(ParameterValue::Float3(Vec3::new(2.0, 4.0, 6.0)))
        );
        assert_eq!(ParameterCurve::new(ParameterType::Float).evaluate(0.0), None);
    }

    #[test]
    fn quaternion_curves_slerp() {
        let mut curve = ParameterCurve::new(ParameterType::Quaternion);
        curve.add(0.0, &ParameterValue::Quaternion(Quat::IDENTITY));
        curve.add(1.0, &ParameterValue::Quaternion(Quat::from_rotation_y(1.0)));

        let Some(ParameterValue::Quaternion(half)) = curve.evaluate(0.5) else {
            panic!("expected a quaternion");
        };
        assert!(half.abs_diff_eq(Quat::from_rotation_y(0.5), 1e-5));
    }

    #[test]
    fn parameter_falls_back_to_static_value() {
        let mut parameter = Parameter::new(ParameterValue::Float(5.0));
        parameter
            .create_curve("jump")
            .add(0.0, &ParameterValue::Float(1.0));

        assert_eq!(parameter.evaluate("jump", 3.0), ParameterValue::Float(1.0));
        assert_eq!(parameter.evaluate("idle", 3.0), ParameterValue::Float(5.0));
        assert!(!parameter.set_static_value(ParameterValue::Float2(Vec2::ONE)));
    }

    #[test]
    fn block_find_or_create_keeps_existing() {
        let mut block = ParameterBlock::new();
        block.find_or_create("boneLength", ParameterValue::Float(1.0));
        block.find_or_create("boneLength", ParameterValue::Float(2.0));

        assert_eq!(block.len(), 1);
        assert_eq!(
            block.get("boneLength").map(Parameter::static_value),
            Some(&ParameterValue::Float(1.0))
        );
    }

    #[test]
    fn raw_curves_are_validated() {
        let keys = vec![0.0, 1.0];
        let float2 = ParameterType::Float2;
        assert!(ParameterCurve::from_raw(float2, keys.clone(), vec![0.0; 4]).is_some());
        assert!(ParameterCurve::from_raw(float2, keys, vec![0.0; 3]).is_none());
        let unsorted = vec![1.0, 0.0];
        assert!(ParameterCurve::from_raw(ParameterType::Float, unsorted, vec![0.0; 2]).is_none());
    }
}
