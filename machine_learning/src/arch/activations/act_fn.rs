use super::Tanh;

/// The nonlinearity applied after a dense layer's affine transform.
#[derive(Debug, Clone, Copy)]
pub enum ActFn {
    Tanh(Tanh),
}

impl ActFn {
    pub fn tanh() -> Self {
        Self::Tanh(Tanh)
    }

    pub fn f(&self, x: f32) -> f32 {
        match self {
            Self::Tanh(a) => a.f(x),
        }
    }

    /// The derivative evaluated at the pre-activation `x`.
    pub fn df(&self, x: f32) -> f32 {
        match self {
            Self::Tanh(a) => a.df(x),
        }
    }
}
