use std::io::Write;
use std::path::Path;
use std::sync::RwLock;

use log::debug;
use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::core::{DataCollection, DataError};

mod xyz;

pub use xyz::XyzExporter;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("no exporter registered for format '{0}'")]
    UnknownFormat(String),

    #[error("format '{0}' is already registered")]
    DuplicateFormat(String),

    #[error("data collection is missing required member '{0}'")]
    MissingData(&'static str),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Writes a data collection to an output stream in one particular format.
pub trait FileExporter {
    fn export(&self, data: &DataCollection, out: &mut dyn Write) -> Result<(), ExportError>;
}

pub type ExporterFactory = fn() -> Box<dyn FileExporter>;

fn make_xyz() -> Box<dyn FileExporter> {
    Box::new(XyzExporter)
}

// Format registry: built-in formats are registered on first use, plugins
// may add more at startup. Entries are never removed.
static REGISTRY: Lazy<RwLock<FxHashMap<String, ExporterFactory>>> = Lazy::new(|| {
    let mut map = FxHashMap::default();
    map.insert("xyz".to_owned(), make_xyz as ExporterFactory);
    RwLock::new(map)
});

/// Registers an exporter factory under a format name, making the format
/// available to [export_file]. Fails if the name is already taken.
pub fn register_format(format: &str, factory: ExporterFactory) -> Result<(), ExportError> {
    let mut reg = REGISTRY.write().unwrap();
    if reg.contains_key(format) {
        return Err(ExportError::DuplicateFormat(format.to_owned()));
    }
    reg.insert(format.to_owned(), factory);
    Ok(())
}

/// Instantiates the exporter registered for a format name.
pub fn exporter_for(format: &str) -> Result<Box<dyn FileExporter>, ExportError> {
    let reg = REGISTRY.read().unwrap();
    reg.get(format)
        .map(|factory| factory())
        .ok_or_else(|| ExportError::UnknownFormat(format.to_owned()))
}

/// Writes a data collection to a file, dispatching on the format name.
pub fn export_file(
    data: &DataCollection,
    path: impl AsRef<Path>,
    format: &str,
) -> Result<(), ExportError> {
    let exporter = exporter_for(format)?;
    debug!(
        "exporting {} particles to {} as '{}'",
        data.number_of_particles(),
        path.as_ref().display(),
        format
    );
    let mut out = std::io::BufWriter::new(std::fs::File::create(path)?);
    exporter.export(data, &mut out)
}
