//! Native execution of the loader contract on `wasmtime`.
//!
//! [`Loader`] does natively what the generated JavaScript loader does in a
//! browser: it checks the host's capabilities, synthesizes the minimal import
//! environment, binds the memory manager, lets the caller adjust the imports,
//! instantiates along one of the four strategies and hands back an
//! [`ExportEnvelope`] with normalized exports.
//!
//! ```
//! # use wasm_loader::host::{ BufferHost, Loader };
//! # use wasmtime::Engine ;
//! let engine = Engine::default();
//! let wat = r#"(module
//!     (import "env" "memory" (memory 256 256))
//!     (func (export "_add") (param i32 i32) (result i32)
//!         local.get 0 local.get 1 i32.add))"#;
//!
//! let mut envelope = Loader::embedded( &engine, wat.as_bytes() )
//!     .init_default( &BufferHost::new() )
//!     .unwrap();
//!
//! let add = envelope.func( "add" ).unwrap().typed::<( i32, i32 ), i32>( envelope.store() ).unwrap();
//! assert_eq!( add.call( envelope.store_mut(), ( 2, 3 )).unwrap(), 5 );
//! assert_eq!( envelope.memory().len(), 16_777_216 );
//! ```

mod context ;
mod envelope ;
mod fetch ;
mod linker ;

use std::sync::Arc ;
use thiserror::Error ;
use tracing::{ debug, info };
use wasmtime::{ Engine, Instance, Linker, Module, Store };

pub use context::HostContext ;
pub use envelope::ExportEnvelope ;
pub use fetch::{ BufferHost, DirectoryHost, FetchError, Host, Response };

use crate::environment::EnvironmentDescriptor ;
use crate::memory::{ ActiveManager, MemoryManager, NullManager };
use crate::strategy::{ self, Capability, InstantiationPlan, SourceMode, WASM_CONTENT_TYPE };

/// Type passed to the environment hook alongside the linker.
pub const TYPE_TAG: &str = "wasm" ;

/// Reasons `init` fails. Nothing is instantiated once any of these occurs.
#[derive( Debug, Error )]
pub enum InitError {
    #[error( "{}", .0.missing_message() )] MissingCapability( Capability ),
    #[error( "Fetch failed: {0}" )] Fetch( #[from] FetchError ),
    #[error( "Incorrect response MIME type. Expected 'application/wasm', found {0:?}" )] MimeType( Option<String> ),
    #[error( "Environment setup failed: {0}" )] Environment( wasmtime::Error ),
    #[error( "Instantiation failed: {0}" )] Instantiation( wasmtime::Error ),
    #[error( "Instance callback failed: {0}" )] Extension( wasmtime::Error ),
}

/// Where the artifact comes from at runtime.
#[derive( Debug, Clone, PartialEq, Eq )]
pub enum ArtifactSource {
    /// The artifact bytes are carried by the loader.
    Embedded( Arc<[u8]> ),
    /// The artifact is fetched under this name, relative to the host location.
    Fetch( String ),
}

impl ArtifactSource {

    pub fn mode( &self ) -> SourceMode {
        match self {
            ArtifactSource::Embedded( _ ) => SourceMode::Embedded,
            ArtifactSource::Fetch( _ ) => SourceMode::Fetch,
        }
    }

    fn file_name( &self ) -> &str {
        match self {
            ArtifactSource::Embedded( _ ) => "",
            ArtifactSource::Fetch( name ) => name,
        }
    }

}

type ManagerFactory = Arc<dyn Fn( &EnvironmentDescriptor ) -> Box<dyn MemoryManager> + Send + Sync>;
type InstanceCallback = Arc<dyn Fn( &Instance, &mut Store<HostContext> ) -> wasmtime::Result<()> + Send + Sync>;

/// A module ready to be initialized any number of times.
///
/// Every `init` builds a fresh store, so instances never share memory or
/// manager state.
#[derive( Clone )]
pub struct Loader {
    engine: Engine,
    source: ArtifactSource,
    descriptor: EnvironmentDescriptor,
    memory_manager: Option<ManagerFactory>,
    on_instance: Option<InstanceCallback>,
}

impl Loader {

    /// A loader carrying the artifact. Accepts binary or text format.
    pub fn embedded( engine: &Engine, bytes: impl Into<Arc<[u8]>> ) -> Self {
        Self::new( engine, ArtifactSource::Embedded( bytes.into() ))
    }

    /// A loader fetching `file_name` next to the host's location.
    pub fn fetched( engine: &Engine, file_name: impl Into<String> ) -> Self {
        Self::new( engine, ArtifactSource::Fetch( file_name.into() ))
    }

    fn new( engine: &Engine, source: ArtifactSource ) -> Self {
        Self {
            engine: engine.clone(),
            source,
            descriptor: EnvironmentDescriptor::default(),
            memory_manager: None,
            on_instance: None,
        }
    }

    pub fn with_descriptor( mut self, descriptor: EnvironmentDescriptor ) -> Self {
        self.descriptor = descriptor ;
        self
    }

    /// Binds a memory manager built per `init` by `factory`. Managers that report
    /// themselves inactive bind nothing.
    pub fn with_memory_manager<F, M>( mut self, factory: F ) -> Self
    where
        F: Fn( &EnvironmentDescriptor ) -> M + Send + Sync + 'static,
        M: MemoryManager + 'static,
    {
        self.memory_manager = Some( Arc::new( move | descriptor: &EnvironmentDescriptor | -> Box<dyn MemoryManager> {
            Box::new( factory( descriptor ))
        }));
        self
    }

    /// Binds an [`ActiveManager`] over the heap above the static reservations.
    pub fn with_active_memory_manager( self ) -> Self {
        self.with_memory_manager( ActiveManager::for_environment )
    }

    /// Runs `callback` on every fresh instance before its exports are normalized.
    pub fn on_instance<F>( mut self, callback: F ) -> Self
    where F: Fn( &Instance, &mut Store<HostContext> ) -> wasmtime::Result<()> + Send + Sync + 'static {
        self.on_instance = Some( Arc::new( callback ));
        self
    }

    #[inline] pub fn source( &self ) -> &ArtifactSource { &self.source }
    #[inline] pub fn descriptor( &self ) -> &EnvironmentDescriptor { &self.descriptor }

    /// The plan `init` follows on `host`.
    pub fn plan( &self, host: &( impl Host + ?Sized )) -> InstantiationPlan {
        InstantiationPlan::new( self.source.mode(), self.source.file_name() )
            .with_streaming( host.capabilities().streaming )
    }

    /// Instantiates the module on `host`.
    ///
    /// Capabilities are checked before anything else; a missing one fails without
    /// fetching. `adjust_env` receives the completed import linker and
    /// [`TYPE_TAG`] and may redefine any import.
    ///
    /// # Errors
    /// See [`InitError`].
    pub fn init<H, F>( &self, host: &H, adjust_env: F ) -> Result<ExportEnvelope, InitError>
    where
        H: Host + ?Sized,
        F: FnOnce( &mut Linker<HostContext>, &str ) -> wasmtime::Result<()>,
    {

        let plan = self.plan( host );
        host.capabilities().check( &plan ).map_err( InitError::MissingCapability )?;

        let manager: Box<dyn MemoryManager> = match &self.memory_manager {
            Some( factory ) => factory( &self.descriptor ),
            None => Box::new( NullManager ),
        };
        let bind_manager = manager.is_active();

        let mut store = Store::new( &self.engine, HostContext::new( self.descriptor.layout(), manager ));
        let mut linker = Linker::new( &self.engine );
        linker::define_environment( &mut linker, &mut store, &self.descriptor ).map_err( InitError::Environment )?;
        if bind_manager { linker::bind_memory( &mut linker ).map_err( InitError::Environment )?; }
        linker.allow_shadowing( true );
        adjust_env( &mut linker, TYPE_TAG ).map_err( InitError::Environment )?;

        let module = self.compile( host, &plan )?;
        let instance = linker.instantiate( &mut store, &module ).map_err( InitError::Instantiation )?;

        if let Some( callback ) = &self.on_instance {
            callback( &instance, &mut store ).map_err( InitError::Extension )?;
        }

        let stack_top = store.data().layout().stack_top ;
        store.data_mut().memory_manager_mut().mark( stack_top );

        let envelope = ExportEnvelope::new( store, instance );
        info!( strategy = ?plan.strategy(), exports = envelope.exports().len(), "module initialized" );
        Ok( envelope )

    }

    /// [`Loader::init`] with the imports left as synthesized.
    ///
    /// # Errors
    /// See [`InitError`].
    pub fn init_default<H: Host + ?Sized>( &self, host: &H ) -> Result<ExportEnvelope, InitError> {
        self.init( host, |_, _| Ok(()))
    }

    fn compile<H: Host + ?Sized>( &self, host: &H, plan: &InstantiationPlan ) -> Result<Module, InitError> {
        debug!( strategy = ?plan.strategy(), "compiling module" );
        match ( &self.source, plan.streaming_available() ) {
            ( ArtifactSource::Fetch( name ), true ) => {
                let response = host.fetch( &strategy::fetch_url( host.location(), name ))?;
                self.compile_streaming( &response )
            }
            ( ArtifactSource::Fetch( name ), false ) => {
                let bytes = host.fetch( &strategy::fetch_url( host.location(), name ))?.into_body();
                Module::new( &self.engine, bytes ).map_err( InitError::Instantiation )
            }
            ( ArtifactSource::Embedded( bytes ), true ) => {
                self.compile_streaming( &Response::wasm( bytes.to_vec() ))
            }
            ( ArtifactSource::Embedded( bytes ), false ) => {
                Module::new( &self.engine, bytes ).map_err( InitError::Instantiation )
            }
        }
    }

    /// Streaming compilation only accepts responses served as wasm.
    fn compile_streaming( &self, response: &Response ) -> Result<Module, InitError> {
        if response.essence() != Some( WASM_CONTENT_TYPE ) {
            return Err( InitError::MimeType( response.content_type().map( str::to_string )));
        }
        Module::new( &self.engine, response.body() ).map_err( InitError::Instantiation )
    }

}

impl std::fmt::Debug for Loader {
    fn fmt( &self, f: &mut std::fmt::Formatter ) -> std::fmt::Result {
        f.debug_struct( "Loader" )
            .field( "source", &self.source.mode() )
            .field( "descriptor", &self.descriptor )
            .field( "memory_manager", &self.memory_manager.is_some() )
            .field( "on_instance", &self.on_instance.is_some() )
            .finish_non_exhaustive()
    }
}
