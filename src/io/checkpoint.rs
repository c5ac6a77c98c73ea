//! Checkpoint files
//!
//! Every recorded step produces two files sharing a base name:
//!
//! - `{base}.json`: `{"step": .., "time": ..}` pretty-printed with 4-space indentation
//! - `{base}.bin`: bincode-encoded mesh and the tagged coefficient vector

use std::ffi::OsString;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use serde::{Deserialize, Serialize};
use tracing::debug;
use crate::error::{Result, SimError};
use crate::mesh::Mesh;
use crate::state::{MixedSpace, State};

/// Tag of the composite field in state files
pub const FIELD_ID: &str = "q";

/// Contents of the JSON side file
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CheckpointMeta {
    pub step: u64,
    pub time: f64,
}

/// Coefficient vector tagged with its field name and time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaggedField {
    pub id: String,
    pub time: f64,
    pub values: Vec<f64>,
}

/// Contents of the binary state file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateFile {
    pub mesh: Mesh,
    pub field: TaggedField,
}

/// A checkpoint read back from disk
#[derive(Debug, Clone)]
pub struct SimulationRecord {
    pub space: MixedSpace,
    pub state: State,
    pub step: usize,
    pub time: f64,
}

impl SimulationRecord {
    pub fn mesh(&self) -> &Arc<Mesh> {
        self.space.mesh()
    }
}

/// `{fout}/{prefix}_{k}_{n_steps}_{step}`
pub fn checkpoint_base(fout: &Path, prefix: &str, k: usize, n_steps: usize, step: usize) -> PathBuf {
    fout.join(format!("{}_{}_{}_{}", prefix, k, n_steps, step))
}

/// Append `.ext` to a base name without touching dots already in it
fn with_suffix(base: &Path, ext: &str) -> PathBuf {
    let mut name: OsString = base.as_os_str().to_os_string();
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}

/// Write `value` as pretty JSON with 4-space indentation
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path).map_err(|e| SimError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    {
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut writer, formatter);
        value.serialize(&mut ser)?;
    }
    writer.write_all(b"\n").map_err(|e| SimError::io(path, e))?;
    writer.flush().map_err(|e| SimError::io(path, e))?;
    Ok(())
}

/// Write one simulation record under `base`
pub fn write_state(base: &Path, mesh: &Mesh, state: &State, step: usize, time: f64) -> Result<()> {
    let meta = CheckpointMeta {
        step: step as u64,
        time,
    };
    write_json(&with_suffix(base, "json"), &meta)?;

    let bin_path = with_suffix(base, "bin");
    let file = File::create(&bin_path).map_err(|e| SimError::io(&bin_path, e))?;
    let mut writer = BufWriter::new(file);
    let contents = StateFile {
        mesh: mesh.clone(),
        field: TaggedField {
            id: FIELD_ID.to_string(),
            time,
            values: state.values().to_vec(),
        },
    };
    bincode::serialize_into(&mut writer, &contents)?;
    writer.flush().map_err(|e| SimError::io(&bin_path, e))?;

    debug!("Wrote checkpoint {} (step {}, t = {:.6e})", base.display(), step, time);
    Ok(())
}

/// Read the record stored under `base`
///
/// The field length is checked against the mixed space on the stored mesh.
pub fn read_state(base: &Path) -> Result<SimulationRecord> {
    let json_path = with_suffix(base, "json");
    let file = File::open(&json_path).map_err(|e| SimError::io(&json_path, e))?;
    let meta: CheckpointMeta = serde_json::from_reader(BufReader::new(file))?;

    let bin_path = with_suffix(base, "bin");
    let file = File::open(&bin_path).map_err(|e| SimError::io(&bin_path, e))?;
    let contents: StateFile = bincode::deserialize_from(BufReader::new(file))?;

    if contents.field.id != FIELD_ID {
        return Err(SimError::Config(format!(
            "'{}' holds field '{}', expected '{}'",
            bin_path.display(),
            contents.field.id,
            FIELD_ID
        )));
    }

    let space = MixedSpace::new(Arc::new(contents.mesh))?;
    let state = State::from_values(&space, contents.field.values)?;

    Ok(SimulationRecord {
        space,
        state,
        step: meta.step as usize,
        time: meta.time,
    })
}
