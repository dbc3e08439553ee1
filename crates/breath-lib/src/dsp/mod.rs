pub mod butter;
pub mod derivative;
pub mod interp;
pub mod normalize;

pub use butter::TransferFunction;
pub use derivative::{derivative, derivative_with, differentiate};
pub use interp::{Extrapolation, InterpKind, Interpolant, Interpolator};
pub use normalize::{normalize_filter, normalize_recording};
