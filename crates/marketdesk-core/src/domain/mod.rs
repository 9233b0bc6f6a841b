mod capability;
mod snapshot;
mod symbol;
mod timestamp;

pub use capability::Capability;
pub use snapshot::{Field, FieldMap, Snapshot};
pub use symbol::Symbol;
pub use timestamp::UtcDateTime;
