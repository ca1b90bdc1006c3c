pub mod errors;
pub mod helpers;
pub mod math;
pub mod validation;
