//! Per-step diagnostics table (CSV)

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use crate::error::{Result, SimError};
use crate::physics::StepDiagnostics;

const HEADER: &str = "step,time,newton_iterations,energy,elastic,gravity,mixing,gradient,viscous_dissipation,mobility_dissipation";

/// Appends one row per completed step
pub struct DiagnosticsWriter {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl DiagnosticsWriter {
    /// Start a fresh table, replacing any existing file
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path).map_err(|e| SimError::io(path, e))?;
        let mut out = Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        };
        out.write_line(HEADER)?;
        Ok(out)
    }

    /// Continue an existing table; the header is written only for an empty file
    pub fn append(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| SimError::io(path, e))?;
        let empty = file.metadata().map_err(|e| SimError::io(path, e))?.len() == 0;

        let mut out = Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        };
        if empty {
            out.write_line(HEADER)?;
        }
        Ok(out)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&mut self, d: &StepDiagnostics) -> Result<()> {
        let e = &d.energy;
        let line = format!(
            "{},{:.16e},{},{:.16e},{:.16e},{:.16e},{:.16e},{:.16e},{:.16e},{:.16e}",
            d.step,
            d.time,
            d.newton_iterations,
            e.total(),
            e.elastic,
            e.gravity,
            e.mixing,
            e.gradient,
            d.dissipation.viscous,
            d.dissipation.mobility
        );
        self.write_line(&line)
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        writeln!(self.writer, "{}", line).map_err(|e| SimError::io(&self.path, e))?;
        self.writer.flush().map_err(|e| SimError::io(&self.path, e))
    }
}
