pub mod scan;
pub mod finding;
pub mod log_entry;
pub mod target;

pub use scan::*;
pub use finding::*;
pub use log_entry::*;
pub use target::*;
