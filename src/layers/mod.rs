pub mod conv;
pub mod dense;
pub mod initialization;
pub mod traits;

pub use conv::Conv2DLayer;
pub use dense::DenseLayer;
pub use initialization::WeightInit;
pub use traits::ParameterGroup;
