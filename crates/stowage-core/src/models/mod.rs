pub mod file;

pub use file::{display_size, FileRecord};
