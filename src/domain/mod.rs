pub mod entry;
pub mod generator;

pub use entry::{Enclosure, EntryLink, RawEntry, TransformedEntry};
pub use generator::Generator;
