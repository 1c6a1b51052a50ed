//! Piecewise-linear transfer functions mapping scalar values to RGBA

use lumen_math::{lerp, Vec3, Vec4};

use crate::error::{EngineError, EngineResult};
use crate::param::Params;

/// Realized transfer function
#[derive(Debug, Clone, PartialEq)]
pub struct TransferFunction {
    colors: Vec<Vec3>,
    opacities: Vec<f32>,
    value_range: [f32; 2],
}

impl TransferFunction {
    /// Create a grayscale ramp over `[0, 1]`
    pub fn new() -> Self {
        Self {
            colors: vec![Vec3::ZERO, Vec3::ONE],
            opacities: vec![0.0, 1.0],
            value_range: [0.0, 1.0],
        }
    }

    pub(crate) fn commit(&mut self, params: &Params) -> EngineResult<()> {
        if let Some(colors) = params.object("colors") {
            let colors = colors.read().data()?.vec3s()?;
            if colors.is_empty() {
                return Err(EngineError::invalid_param("colors", "no color entries"));
            }
            self.colors = colors;
        }
        if let Some(opacities) = params.object("opacities") {
            let opacities = opacities.read().data()?.floats()?;
            if opacities.is_empty() {
                return Err(EngineError::invalid_param("opacities", "no opacity entries"));
            }
            self.opacities = opacities;
        }
        self.value_range = params.float2("valueRange", [0.0, 1.0]);
        Ok(())
    }

    pub fn value_range(&self) -> [f32; 2] {
        self.value_range
    }

    /// Map a scalar value to color and opacity
    pub fn sample(&self, value: f32) -> Vec4 {
        let [lo, hi] = self.value_range;
        let t = if hi > lo { ((value - lo) / (hi - lo)).clamp(0.0, 1.0) } else { 0.0 };

        let color = piecewise(&self.colors, t, |a, b, f| *a + (*b - *a) * f);
        let opacity = piecewise(&self.opacities, t, |a, b, f| lerp(*a, *b, f));
        color.extend(opacity)
    }
}

impl Default for TransferFunction {
    fn default() -> Self {
        Self::new()
    }
}

fn piecewise<T: Copy + Default>(values: &[T], t: f32, mix: impl Fn(&T, &T, f32) -> T) -> T {
    match values {
        [] => T::default(),
        [only] => *only,
        _ => {
            let x = t * (values.len() - 1) as f32;
            let i = (x.floor() as usize).min(values.len() - 2);
            mix(&values[i], &values[i + 1], x - i as f32)
        }
    }
}
