use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::{debug, warn};
use zip::write::FileOptions;

use crate::function::{FUNCTION_SOURCE_FILE, FUNCTION_ZIP_FILE};
use crate::generator::TerraformConfig;

pub const TF_CONFIG_FILE: &str = "webhook2lambda2sqs.tf.json";

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Unable to write {0}: {1}")]
    Io(String, #[source] io::Error),

    #[error("Unable to build the function zip: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// Writes the function source, its upload zip and the Terraform
/// configuration into `dir`.
pub fn write(dir: &Path, func_source: &str, tf_config: &TerraformConfig) -> Result<(), Error> {
    let source_path = dir.join(FUNCTION_SOURCE_FILE);
    warn!("Writing lambda function source to: {}", source_path.display());
    write_atomic(&source_path, func_source.as_bytes())?;
    debug!("lambda function written");

    let zip_path = dir.join(FUNCTION_ZIP_FILE);
    warn!("Writing lambda function source zip file to: {}", zip_path.display());
    let zip = zip_source(func_source)?;
    write_atomic(&zip_path, &zip)?;
    debug!("lambda zip written");

    let tf_path = dir.join(TF_CONFIG_FILE);
    warn!("Writing terraform configuration JSON to: {}", tf_path.display());
    write_atomic(&tf_path, tf_config.render().as_bytes())?;
    debug!(
        "terraform configuration written ({} resources)",
        tf_config.graph().qualified_names().len()
    );

    warn!("Completed writing lambda function and TF config.");
    return Ok(());
}

/// Zips the function source under its handler file name. Entries carry a
/// fixed timestamp so the archive, and its hash, only change with the source.
fn zip_source(func_source: &str) -> Result<Vec<u8>, Error> {
    let mut zip = zip::ZipWriter::new(io::Cursor::new(Vec::new()));
    let options = FileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default())
        .unix_permissions(0o644);

    zip.start_file(FUNCTION_SOURCE_FILE, options)?;
    zip.write_all(func_source.as_bytes())
        .map_err(|error| Error::Io(FUNCTION_ZIP_FILE.to_string(), error))?;
    let cursor = zip.finish()?;

    return Ok(cursor.into_inner());
}

/// Replaces `path` in one step, so an interrupted run never leaves a
/// truncated file for terraform to pick up.
fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), Error> {
    let describe = |error: io::Error| Error::Io(path.display().to_string(), error);
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file = NamedTempFile::new_in(dir).map_err(describe)?;
    file.write_all(contents).map_err(describe)?;
    file.persist(path).map_err(|error| describe(error.error))?;

    return Ok(());
}

/// Whether `dir` holds everything terraform needs from a previous [`write`].
pub fn exists(dir: &Path) -> bool {
    [FUNCTION_SOURCE_FILE, FUNCTION_ZIP_FILE, TF_CONFIG_FILE]
        .iter()
        .all(|name| dir.join(name).is_file())
}
