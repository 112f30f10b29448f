// Variable loading engine
// Turns an ordered list of catalogued files into a lazily evaluated,
// dimension-labelled array; data is read only when the array is forced

mod array;
mod chunks;
mod error;
mod load;
mod options;
pub mod plan;

pub use array::{Coordinate, DataArray, LazyArray, Stats};
pub use chunks::ChunkGrid;
pub use error::{Error, Result};
pub use load::open_variable;
pub use options::{GetVarOptions, parse_chunks, select_files};
pub use plan::{AccessPlan, Packing, Segment};
