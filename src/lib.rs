//! Turns a compiled WebAssembly binary, and optionally the bootstrap script its
//! toolchain emitted alongside it, into a self-contained loader module.
//!
//! The generated module exports a single `init( adjustEnv? )`. Calling it checks
//! the host for the features it needs, builds the import environment, instantiates
//! the binary along the best available path and resolves with the module's
//! exports under canonical names.
//!
//! # Core Concepts
//!
//! - **Bootstrap script**: glue code emitted by the toolchain. When it contains
//!     `function instantiateArrayBuffer`, the body of that function is its
//!     **extension point** and is replaced by the loader's instantiation code
//!     (see [`splice`]).
//!
//! - [`EnvironmentDescriptor`]: the minimal import environment used when there is
//!     no bootstrap script: a fixed 16 MiB memory, a 6-entry table, the static layout
//!     constants and a fixed set of stub functions.
//!
//! - [`MemoryManager`]: an optional allocation service bound into the imports as
//!     `env._mallocjs` and `env._freejs`.
//!
//! - [`Strategy`]: one of four instantiation paths, picked from whether the binary
//!     is fetched or embedded and whether the host compiles from streams.
//!
//! - [`LoaderModule`]: composes all of the above into the loader's source.
//!
//! The same contract runs natively on `wasmtime` through [`host::Loader`], which
//! is what the runtime behaviour of the generated module is tested against.
//!
//! # Example
//!
//! Generating a loader that embeds its binary:
//!
//! ```
//! use wasm_loader::{ InstantiationPlan, LoaderModule, SourceMode };
//!
//! let wasm = [ 0x00, 0x61, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00 ];
//! let plan = InstantiationPlan::new( SourceMode::Embedded, "add.wasm" );
//! let source = LoaderModule::new( plan ).with_binary( &wasm ).render();
//!
//! assert!( source.starts_with( "module.exports = {" ));
//! assert!( source.contains( "[0,97,115,109,1,0,0,0]" ));
//! assert!( !source.contains( "fetch(" ));
//! ```
//!
//! Splicing a bootstrap script:
//!
//! ```
//! use wasm_loader::splice::{ self, ANCHOR };
//!
//! let script = "var a = 1;\nfunction instantiateArrayBuffer(receiver) { if (a) { go(); } }\nrun();";
//! let spliced = splice::splice( script, ANCHOR );
//! assert!( spliced.is_spliced() );
//!
//! let filled = spliced.fill( "return instantiate();" );
//! assert_eq!( filled, "var a = 1;\nreturn instantiate();\nrun();" );
//! ```
//!
//! # Building
//!
//! [`pipeline::compile`] reads the artifact `name.wasm` and the optional bootstrap
//! script `name.js` next to a source resource, emits the binary under its file
//! name through a [`pipeline::BuildHost`] and returns the loader source. The
//! `wasm-loader` binary wraps it:
//!
//! ```text
//! wasm-loader build lib/add.wasm --out-dir dist --embed
//! ```
//!
//! Options are read from `wasm-loader.toml` next to the resource (see [`options`]).
//!
//! # Logging
//!
//! Every component logs through `tracing`. The binary installs a
//! `tracing-subscriber` filter read from `RUST_LOG`, defaulting to
//! `warn,wasm_loader=info`.

pub mod artifact ;
pub mod assemble ;
pub mod environment ;
mod error ;
pub mod exports ;
pub mod host ;
pub mod memory ;
pub mod options ;
pub mod pipeline ;
pub mod splice ;
pub mod strategy ;

#[doc( no_inline )]
pub use wasmtime::Engine ;

pub use error::LoaderError ;
pub use assemble::LoaderModule ;
pub use environment::{ EnvironmentDescriptor, StaticLayout };
pub use memory::{ ActiveManager, MemoryError, MemoryManager, MemoryManagerSource, NullManager };
pub use options::{ LoaderOptions, Target };
pub use splice::{ ExtensionPoint, Splice };
pub use strategy::{ Capabilities, Capability, InstantiationPlan, SourceMode, Strategy };
