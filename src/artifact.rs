//! Build-time inputs: the binary artifact and the optional bootstrap script.
//!
//! For a source resource `dir/name.ext`, the artifact is `dir/name.wasm` and the
//! bootstrap script is `dir/name.js`. Both are read once per compile.

use std::path::{ Path, PathBuf };
use std::sync::LazyLock ;
use pipe_trait::Pipe ;
use regex::Regex ;
use tracing::debug ;

use crate::LoaderError ;
use crate::options::Target ;

/// Raw bytes of a compiled WebAssembly module. Never inspected or validated.
#[derive( Debug, Clone, PartialEq, Eq )]
pub struct BinaryArtifact {
    bytes: Vec<u8>,
}

impl BinaryArtifact {

    pub fn new( bytes: impl Into<Vec<u8>> ) -> Self {
        Self { bytes: bytes.into() }
    }

    /// # Errors
    /// [`LoaderError::ArtifactRead`] when the file cannot be read.
    pub fn read( path: &Path ) -> Result<Self, LoaderError> {
        std::fs::read( path )
            .map_err(| source | LoaderError::ArtifactRead { path: path.to_path_buf(), source })?
            .pipe( Self::new )
            .pipe( Ok )
    }

    #[inline] pub fn bytes( &self ) -> &[u8] { &self.bytes }
    #[inline] pub fn len( &self ) -> usize { self.bytes.len() }
    #[inline] pub fn is_empty( &self ) -> bool { self.bytes.is_empty() }

}

/// Glue code emitted by the toolchain alongside the artifact.
#[derive( Debug, Clone, PartialEq, Eq )]
pub struct BootstrapScript {
    text: String,
}

static MODULE_DECLARATION: LazyLock<Regex> = LazyLock::new(|| Regex::new( r"var Module.+?;" ).expect( "valid regex" ));
static REQUIRE_FS: LazyLock<Regex> = LazyLock::new(|| Regex::new( r"(?i)require\(.fs.\)" ).expect( "valid regex" ));
static REQUIRE_PATH: LazyLock<Regex> = LazyLock::new(|| Regex::new( r"(?i)require\(.path.\)" ).expect( "valid regex" ));

/// Backslash normalization as toolchains emit it; breaks minifiers.
const BACKSLASH_REPLACE: &str = r#".replace(/\\/g,"/")"# ;
const BACKSLASH_REPLACE_PORTABLE: &str = r".split('').map(function(s) { return s === '\\' ? '/' : s; }).join('')" ;

impl BootstrapScript {

    pub fn new( text: impl Into<String> ) -> Self {
        Self { text: text.into() }
    }

    /// Reads the script if it exists. A missing or empty file means there is no
    /// bootstrap script.
    ///
    /// # Errors
    /// [`LoaderError::ArtifactRead`] on any failure other than the file being absent.
    pub fn read_optional( path: &Path ) -> Result<Option<Self>, LoaderError> {
        match std::fs::read_to_string( path ) {
            Ok( text ) if text.is_empty() => Ok( None ),
            Ok( text ) => Ok( Some( Self::new( text ))),
            Err( err ) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!( path = %path.display(), "no bootstrap script" );
                Ok( None )
            }
            Err( source ) => Err( LoaderError::ArtifactRead { path: path.to_path_buf(), source }),
        }
    }

    #[inline] pub fn text( &self ) -> &str { &self.text }

    /// Rewrites the parts of toolchain output that do not survive bundling:
    ///
    /// - the first backslash-normalizing `.replace` becomes a split/map/join,
    /// - every `var Module …;` declaration is dropped, the loader supplies `Module`,
    /// - outside node, `require('fs')` and `require('path')` become `undefined`.
    pub fn clean( self, target: Target ) -> Self {
        let text = self.text
            .replacen( BACKSLASH_REPLACE, BACKSLASH_REPLACE_PORTABLE, 1 )
            .pipe(| text | MODULE_DECLARATION.replace_all( &text, "" ).into_owned() );
        let text = match target {
            Target::Node => text,
            Target::Web => text
                .pipe(| text | REQUIRE_FS.replace_all( &text, "undefined" ).into_owned() )
                .pipe(| text | REQUIRE_PATH.replace_all( &text, "undefined" ).into_owned() ),
        };
        Self { text }
    }

    #[inline] pub fn into_text( self ) -> String { self.text }

}

/// Files involved in compiling one source resource.
#[derive( Debug, Clone, PartialEq, Eq )]
pub struct ResourcePaths {
    /// The binary artifact to read.
    pub artifact: PathBuf,
    /// The optional bootstrap script.
    pub bootstrap: PathBuf,
    /// Name the artifact is emitted under and fetched by at runtime.
    pub emitted_name: String,
    /// Base name for the generated loader.
    pub module_name: String,
}

impl ResourcePaths {

    /// # Errors
    /// [`LoaderError::InvalidResource`] when the path has no file name.
    pub fn for_resource( resource: &Path ) -> Result<Self, LoaderError> {

        let stem = resource.file_stem()
            .and_then(| stem | stem.to_str() )
            .filter(| stem | !stem.is_empty() )
            .ok_or_else(|| LoaderError::InvalidResource( resource.to_path_buf() ))?;
        let directory = resource.parent().unwrap_or( Path::new( "" ));
        let module_name = emitted_base_name( resource )
            .ok_or_else(|| LoaderError::InvalidResource( resource.to_path_buf() ))?;

        Ok( Self {
            artifact: directory.join( format!( "{stem}.wasm" )),
            bootstrap: directory.join( format!( "{stem}.js" )),
            emitted_name: format!( "{module_name}.wasm" ),
            module_name: module_name.to_string(),
        })

    }

}

/// The resource file name up to its first `.`.
fn emitted_base_name( resource: &Path ) -> Option<&str> {
    resource.file_name()?
        .to_str()?
        .split( '.' )
        .next()
        .filter(| name | !name.is_empty() )
}
