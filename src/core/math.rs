pub mod sampling;
pub mod transform;
