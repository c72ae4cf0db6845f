pub mod distance;
pub mod geo_fix;
pub mod session;
