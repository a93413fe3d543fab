use std::path::{ Path, PathBuf };
use std::process::ExitCode ;
use clap::{ Parser, Subcommand };
use tracing::{ debug, info };
use tracing_subscriber::EnvFilter ;

use wasm_loader::{ LoaderError, LoaderOptions, Target };
use wasm_loader::pipeline::{ self, BuildHost, OutputDir };

#[derive( Parser )]
#[command( name = "wasm-loader", version, about = "Generate a JavaScript loader module for a WebAssembly binary" )]
struct Cli {
    #[command( subcommand )]
    command: Command,
}

#[derive( Subcommand )]
enum Command {
    /// Emit the binary and its loader module for a source resource.
    Build {
        /// Source resource; `name.wasm` and the optional `name.js` are read next to it.
        resource: PathBuf,

        /// Directory receiving `name.wasm` and `name.loader.js`.
        #[arg( long, short, default_value = "dist" )]
        out_dir: PathBuf,

        /// Options file. Defaults to `wasm-loader.toml` next to the resource.
        #[arg( long, env = "WASM_LOADER_CONFIG" )]
        config: Option<PathBuf>,

        /// Embed the binary in the loader instead of fetching it at runtime.
        #[arg( long )]
        embed: bool,

        #[arg( long, value_enum )]
        target: Option<Target>,

        /// Production build: the options decide which outputs are produced.
        #[arg( long )]
        minimize: bool,

        /// JavaScript source of a memory manager to bind into the imports.
        #[arg( long )]
        memory_manager: Option<PathBuf>,
    },
}

fn main() -> ExitCode {

    tracing_subscriber::fmt()
        .with_env_filter( EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new( "warn,wasm_loader=info" )))
        .with_writer( std::io::stderr )
        .init();

    let cli = Cli::parse();
    match run( cli ) {
        Ok(()) => ExitCode::SUCCESS,
        Err( err ) => {
            eprintln!( "error: {}", err );
            ExitCode::FAILURE
        }
    }

}

fn run( cli: Cli ) -> Result<(), LoaderError> {
    match cli.command {
        Command::Build { resource, out_dir, config, embed, target, minimize, memory_manager } => {

            let mut options = load_options( &resource, config.as_deref() )?;
            if embed { options.fetch = false ; }
            if let Some( target ) = target { options.target = target ; }
            if let Some( memory_manager ) = memory_manager { options.memory_manager = Some( memory_manager ); }

            let mut output = OutputDir::new( out_dir );
            let compiled = pipeline::compile( &resource, &options, minimize, &mut output )?;

            let loader_name = format!( "{}.loader.js", compiled.module_name );
            output.emit_file( &loader_name, compiled.source.as_bytes() )
                .map_err(| source | LoaderError::Emit { name: loader_name.clone(), source })?;

            info!( loader = %output.root().join( &loader_name ).display(), spliced = compiled.spliced, "wrote loader module" );
            Ok(())

        }
    }
}

/// Options from `config`, or from the file next to `resource`. A relative memory
/// manager path is taken relative to the options file.
fn load_options( resource: &Path, config: Option<&Path> ) -> Result<LoaderOptions, LoaderError> {
    let directory = resource.parent().unwrap_or( Path::new( "" ));
    let ( mut options, base ) = match config {
        Some( path ) => ( LoaderOptions::load( path )?, path.parent().unwrap_or( Path::new( "" ))),
        None => ( LoaderOptions::discover( directory )?, directory ),
    };
    if let Some( path ) = options.memory_manager.take() {
        options.memory_manager = Some( base.join( path ));
    }
    debug!( fetch = options.fetch, target = ?options.target, "resolved options" );
    Ok( options )
}
