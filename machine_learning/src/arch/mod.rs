pub mod activations;
pub mod layers;
pub mod loss;
mod model;
mod sequential;
mod spec;
mod trained;

pub use model::Model;
pub use sequential::Sequential;
pub use spec::{ActFnSpec, LayerSpec, ModelSpec};
pub use trained::TrainedModel;
