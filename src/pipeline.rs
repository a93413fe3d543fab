//! One build-time compile: source resource in, loader module out.

use std::path::{ Path, PathBuf };
use tracing::{ debug, info, warn };

use crate::LoaderError ;
use crate::artifact::{ BinaryArtifact, BootstrapScript, ResourcePaths };
use crate::assemble::LoaderModule ;
use crate::memory::MemoryManagerSource ;
use crate::options::LoaderOptions ;
use crate::splice::{ self, ANCHOR };
use crate::strategy::{ InstantiationPlan, SourceMode };

/// The build pipeline's side of a compile: where emitted files go.
pub trait BuildHost {
    /// Places `bytes` in the build output under `name`.
    ///
    /// # Errors
    /// Any I/O failure of the host.
    fn emit_file( &mut self, name: &str, bytes: &[u8] ) -> std::io::Result<()> ;
}

/// Emits files into a directory on disk, creating it on first use.
#[derive( Debug, Clone )]
pub struct OutputDir {
    root: PathBuf,
}

impl OutputDir {
    pub fn new( root: impl Into<PathBuf> ) -> Self { Self { root: root.into() }}
    #[inline] pub fn root( &self ) -> &Path { &self.root }
}

impl BuildHost for OutputDir {
    fn emit_file( &mut self, name: &str, bytes: &[u8] ) -> std::io::Result<()> {
        std::fs::create_dir_all( &self.root )?;
        std::fs::write( self.root.join( name ), bytes )
    }
}

/// Result of compiling one resource.
#[derive( Debug, Clone, PartialEq, Eq )]
pub struct CompiledModule {
    /// Source of the loader module registered for the resource.
    pub source: String,
    /// Name the binary was emitted under.
    pub emitted_name: String,
    /// Base name to register the loader under.
    pub module_name: String,
    /// Whether a bootstrap script had its extension point spliced.
    pub spliced: bool,
}

/// Compiles the loader for `resource`.
///
/// Reads the artifact and the optional bootstrap script next to it, emits the
/// artifact bytes through `host` and returns the generated loader source.
///
/// # Errors
/// Read failures of any input and emit failures of the host abort the compile.
pub fn compile(
    resource: &Path,
    options: &LoaderOptions,
    minimize: bool,
    host: &mut impl BuildHost,
) -> Result<CompiledModule, LoaderError> {

    let paths = ResourcePaths::for_resource( resource )?;
    let mode = options.resolve( minimize );
    debug!( resource = %resource.display(), ?mode, "compiling loader" );

    if mode.build_legacy {
        warn!( "legacy fallback code was requested but is not produced" );
    }

    let artifact = BinaryArtifact::read( &paths.artifact )?;
    let bootstrap = BootstrapScript::read_optional( &paths.bootstrap )?
        .map(| script | splice::splice( script.clean( options.target ).text(), ANCHOR ));
    let memory_manager = options.memory_manager.as_deref()
        .map(| path | read_memory_manager( path, &options.memory_manager_class ))
        .transpose()?;

    let source_mode = match options.fetch {
        true => SourceMode::Fetch,
        false => SourceMode::Embedded,
    };
    let plan = InstantiationPlan::new( source_mode, paths.emitted_name.clone() );

    let mut module = LoaderModule::new( plan );
    if mode.build_wasm { module = module.with_binary( artifact.bytes() ); }
    if let Some( bootstrap ) = &bootstrap { module = module.with_bootstrap( bootstrap ); }
    if let Some( manager ) = &memory_manager { module = module.with_memory_manager( manager ); }
    let source = module.render();

    host.emit_file( &paths.emitted_name, artifact.bytes() )
        .map_err(| source | LoaderError::Emit { name: paths.emitted_name.clone(), source })?;

    info!( artifact = %paths.emitted_name, bytes = artifact.len(), "emitted artifact" );

    Ok( CompiledModule {
        source,
        emitted_name: paths.emitted_name,
        module_name: paths.module_name,
        spliced: bootstrap.as_ref().is_some_and( splice::Splice::is_spliced ),
    })

}

fn read_memory_manager( path: &Path, class_name: &str ) -> Result<MemoryManagerSource, LoaderError> {
    std::fs::read_to_string( path )
        .map(| source | MemoryManagerSource::new( source, class_name ))
        .map_err(| source | LoaderError::ArtifactRead { path: path.to_path_buf(), source })
}
