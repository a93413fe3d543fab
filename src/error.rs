use std::path::PathBuf ;
use thiserror::Error ;

use crate::options::OptionsError ;

/// Errors that abort the build of one loader module.
#[derive( Debug, Error )]
pub enum LoaderError {
    /// The artifact, the bootstrap script or the memory manager source could not be read.
    #[error( "Failed to read {}: {source}", .path.display() )]
    ArtifactRead { path: PathBuf, source: std::io::Error },
    /// The source resource path has no file name to derive artifact names from.
    #[error( "Resource has no file name: {}", .0.display() )]
    InvalidResource( PathBuf ),
    /// The build host rejected an emitted file.
    #[error( "Failed to emit {name}: {source}" )]
    Emit { name: String, source: std::io::Error },
    #[error( "Options error: {0}" )]
    Options( #[from] OptionsError ),
}
