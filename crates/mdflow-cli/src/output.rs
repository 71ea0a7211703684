use crate::error::Result;
use mdflow::core::constants::PS_TO_FS;
use mdflow::engine::physical_data::PhysicalData;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

#[derive(Serialize, Debug, Clone, PartialEq)]
struct EnergyRecord {
    step: u64,
    time_ps: f64,
    temperature_k: f64,
    pressure_bar: f64,
    kinetic_energy: f64,
    coulomb_energy: f64,
    non_coulomb_energy: f64,
    qm_energy: f64,
    potential_energy: f64,
    total_energy: f64,
    momentum: f64,
    volume: f64,
}

impl EnergyRecord {
    fn new(data: &PhysicalData, timestep_fs: f64) -> Self {
        Self {
            step: data.step,
            time_ps: data.step as f64 * timestep_fs / PS_TO_FS,
            temperature_k: data.temperature,
            pressure_bar: data.pressure,
            kinetic_energy: data.kinetic_energy,
            coulomb_energy: data.coulomb_energy,
            non_coulomb_energy: data.non_coulomb_energy,
            qm_energy: data.qm_energy,
            potential_energy: data.potential_energy(),
            total_energy: data.total_energy(),
            momentum: data.momentum,
            volume: data.volume,
        }
    }
}

/// Writes one CSV row of observables per observed step.
pub struct EnergyWriter<W: Write> {
    writer: csv::Writer<W>,
    timestep_fs: f64,
}

impl EnergyWriter<File> {
    pub fn create(path: &Path, timestep_fs: f64) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(Self {
            writer: csv::Writer::from_path(path)?,
            timestep_fs,
        })
    }
}

impl<W: Write> EnergyWriter<W> {
    pub fn from_writer(writer: W, timestep_fs: f64) -> Self {
        Self {
            writer: csv::Writer::from_writer(writer),
            timestep_fs,
        }
    }

    pub fn write(&mut self, data: &PhysicalData) -> Result<()> {
        self.writer
            .serialize(EnergyRecord::new(data, self.timestep_fs))?;
        Ok(())
    }

    pub fn finish(mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
