pub mod carrier;
pub mod point;
pub mod projection;
pub mod transform;
