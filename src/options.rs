//! Build options supplied by the options resolver.
//!
//! Options are read from a TOML file (conventionally `wasm-loader.toml` next to
//! the source resource). Every field is optional:
//!
//! ```toml
//! wasm = true            # produce the WebAssembly binary when minimizing
//! asm_js = false         # produce legacy fallback code when minimizing
//! fetch = true           # fetch the binary at runtime instead of embedding it
//! target = "web"         # "web" or "node"
//! memory_manager = "mem.js"
//! memory_manager_class = "ASM_Memory"
//! ```

use std::path::{ Path, PathBuf };
use serde::Deserialize ;
use thiserror::Error ;
use tracing::debug ;

use crate::memory::DEFAULT_MANAGER_CLASS ;

/// File name looked up next to a resource when no options file is given.
pub const OPTIONS_FILE_NAME: &str = "wasm-loader.toml" ;

#[derive( Debug, Error )]
pub enum OptionsError {
    #[error( "Failed to read options file {}: {source}", .path.display() )]
    Read { path: PathBuf, source: std::io::Error },
    #[error( "Invalid options: {0}" )]
    Parse( #[from] toml::de::Error ),
}

/// Runtime environment the loader is generated for.
#[derive( Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Deserialize, clap::ValueEnum )]
#[serde( rename_all = "lowercase" )]
pub enum Target {
    #[default] Web,
    Node,
}

#[derive( Debug, Clone, PartialEq, Eq, Deserialize )]
#[serde( default, deny_unknown_fields )]
pub struct LoaderOptions {
    /// Produce the optimized WebAssembly binary.
    pub wasm: bool,
    /// Produce legacy fallback code.
    pub asm_js: bool,
    /// Fetch the binary at runtime rather than embedding it in the loader.
    pub fetch: bool,
    pub target: Target,
    /// JavaScript source of an external memory manager.
    pub memory_manager: Option<PathBuf>,
    /// Class the memory manager source defines.
    pub memory_manager_class: String,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            wasm: true,
            asm_js: false,
            fetch: true,
            target: Target::Web,
            memory_manager: None,
            memory_manager_class: DEFAULT_MANAGER_CLASS.to_string(),
        }
    }
}

/// What a build actually produces once the build mode is known.
#[derive( Debug, Clone, Copy, PartialEq, Eq )]
pub struct BuildMode {
    pub build_wasm: bool,
    pub build_legacy: bool,
}

impl LoaderOptions {

    /// # Errors
    /// Fails on malformed TOML or unknown keys.
    pub fn from_toml_str( source: &str ) -> Result<Self, OptionsError> {
        Ok( toml::from_str( source )? )
    }

    /// # Errors
    /// Fails when the file cannot be read or parsed.
    pub fn load( path: &Path ) -> Result<Self, OptionsError> {
        let source = std::fs::read_to_string( path )
            .map_err(| source | OptionsError::Read { path: path.to_path_buf(), source })?;
        debug!( path = %path.display(), "loaded loader options" );
        Self::from_toml_str( &source )
    }

    /// Loads `wasm-loader.toml` from `directory` if present, defaults otherwise.
    ///
    /// # Errors
    /// Fails when the file exists but cannot be read or parsed.
    pub fn discover( directory: &Path ) -> Result<Self, OptionsError> {
        let path = directory.join( OPTIONS_FILE_NAME );
        match path.is_file() {
            true => Self::load( &path ),
            false => Ok( Self::default() ),
        }
    }

    /// Resolves the two output switches. Non-minimizing builds always produce
    /// the binary and never the legacy fallback.
    pub fn resolve( &self, minimize: bool ) -> BuildMode {
        match minimize {
            true => BuildMode { build_wasm: self.wasm, build_legacy: self.asm_js },
            false => BuildMode { build_wasm: true, build_legacy: false },
        }
    }

}
