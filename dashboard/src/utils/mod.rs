pub mod cancellation;
pub mod constants;
pub mod contracts;
pub mod logger;
pub mod math_helper;
