//! # Activation Functions Module
//!
//! Element-wise non-linearities used by the convolutional torso and the
//! dueling heads of the Q-network.
//!
//! - **ReLU**: `max(0, x)`, used after every convolution
//! - **Linear**: identity, used by the value and advantage heads
//!
//! Both variants work on arrays of any dimensionality, so the same value can
//! be applied to `(batch, features)` matrices and `(channels, positions)`
//! convolution outputs alike.

pub mod functions;

pub use functions::Activation;
