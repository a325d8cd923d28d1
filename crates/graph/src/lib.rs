pub mod snapshot;
pub mod store;

pub use snapshot::{EntityExport, GraphSnapshot, RelationExport};
pub use store::GraphStore;
