pub mod types;
pub mod classification;

pub use types::ScanhiveError;
pub use classification::ErrorClassification;
