//! Output: checkpoints and diagnostics history

pub mod checkpoint;
pub mod history;

pub use checkpoint::{
    checkpoint_base, read_state, write_json, write_state, CheckpointMeta, SimulationRecord, StateFile, TaggedField,
    FIELD_ID,
};
pub use history::DiagnosticsWriter;
