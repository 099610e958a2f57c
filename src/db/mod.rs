pub mod pool;
pub mod slots;

pub use pool::{create_pool, run_migrations};
pub use slots::{MemorySlots, SlotKind, SlotStore, SqliteSlots};
