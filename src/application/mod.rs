pub mod analysis;
pub mod boundary;
pub mod ml;
pub mod movements;
pub mod reporting;
