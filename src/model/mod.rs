pub mod options;
pub mod result;
pub mod shift;
pub mod staff;
