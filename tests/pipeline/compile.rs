use std::collections::HashMap ;
use std::path::PathBuf ;
use wasm_loader::{ LoaderError, LoaderOptions };
use wasm_loader::pipeline::{ self, BuildHost, OutputDir };

const WASM: [u8; 8] = [ 0x00, 0x61, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00 ];

/// Keeps emitted files in memory.
#[derive( Default )]
struct MemoryHost {
	files: HashMap<String, Vec<u8>>,
}

impl BuildHost for MemoryHost {
	fn emit_file( &mut self, name: &str, bytes: &[u8] ) -> std::io::Result<()> {
		self.files.insert( name.to_string(), bytes.to_vec() );
		Ok(())
	}
}

fn resource_dir() -> ( tempfile::TempDir, PathBuf ) {
	let dir = tempfile::tempdir().expect( "Failed to create temp dir" );
	let resource = dir.path().join( "add.wasm" );
	std::fs::write( &resource, WASM ).expect( "Failed to write artifact" );
	( dir, resource )
}

#[test]
fn emits_the_artifact_bytes_unchanged() {

	let ( dir, resource ) = resource_dir();
	let out = dir.path().join( "dist" );

	let compiled = pipeline::compile( &resource, &LoaderOptions::default(), false, &mut OutputDir::new( &out ))
		.expect( "Failed to compile" );

	assert_eq!( std::fs::read( out.join( "add.wasm" )).expect( "artifact not emitted" ), WASM );
	assert_eq!( compiled.emitted_name, "add.wasm" );
	assert_eq!( compiled.module_name, "add" );
	assert!( !compiled.spliced );
	assert!( compiled.source.contains( "\"add.wasm\"" ));

}

#[test]
fn emitted_name_drops_every_extension() {

	let dir = tempfile::tempdir().expect( "Failed to create temp dir" );
	let resource = dir.path().join( "add.opt.wasm" );
	std::fs::write( &resource, WASM ).expect( "Failed to write artifact" );

	let mut host = MemoryHost::default();
	let compiled = pipeline::compile( &resource, &LoaderOptions::default(), false, &mut host ).expect( "Failed to compile" );

	assert_eq!( compiled.emitted_name, "add.wasm" );
	assert_eq!( host.files.get( "add.wasm" ).map( Vec::as_slice ), Some( &WASM[..] ));

}

#[test]
fn embedded_mode_writes_the_bytes_into_the_loader() {

	let ( _dir, resource ) = resource_dir();
	let options = LoaderOptions { fetch: false, ..LoaderOptions::default() };

	let compiled = pipeline::compile( &resource, &options, false, &mut MemoryHost::default() ).expect( "Failed to compile" );

	assert!( compiled.source.contains( "new Uint8Array([0,97,115,109,1,0,0,0])" ));
	assert!( !compiled.source.contains( "fetch(" ));

}

#[test]
fn minimized_build_without_wasm_rejects_at_runtime() {

	let ( _dir, resource ) = resource_dir();
	let options = LoaderOptions { wasm: false, ..LoaderOptions::default() };

	let minimized = pipeline::compile( &resource, &options, true, &mut MemoryHost::default() ).expect( "Failed to compile" );
	assert!( minimized.source.contains( "No WebAssembly output was built" ));

	let development = pipeline::compile( &resource, &options, false, &mut MemoryHost::default() ).expect( "Failed to compile" );
	assert!( !development.source.contains( "No WebAssembly output was built" ));

}

#[test]
fn memory_manager_source_is_included() {

	let ( dir, resource ) = resource_dir();
	let manager = dir.path().join( "heap.js" );
	std::fs::write( &manager, "function Heap(buffer) {}" ).expect( "Failed to write manager" );
	let options = LoaderOptions {
		memory_manager: Some( manager ),
		memory_manager_class: "Heap".to_string(),
		..LoaderOptions::default()
	};

	let compiled = pipeline::compile( &resource, &options, false, &mut MemoryHost::default() ).expect( "Failed to compile" );

	assert!( compiled.source.contains( "function Heap(buffer) {}" ));
	assert!( compiled.source.contains( "new Heap(Module.buffer)" ));

}

#[test]
fn missing_artifact_aborts_before_emitting() {

	let dir = tempfile::tempdir().expect( "Failed to create temp dir" );
	let mut host = MemoryHost::default();

	match pipeline::compile( &dir.path().join( "absent.wasm" ), &LoaderOptions::default(), false, &mut host ) {
		Err( LoaderError::ArtifactRead { path, .. }) => assert_eq!( path, dir.path().join( "absent.wasm" )),
		other => panic!( "Expected ArtifactRead error, found: {:#?}", other ),
	}
	assert!( host.files.is_empty() );

}

#[test]
fn missing_memory_manager_is_a_read_error() {

	let ( dir, resource ) = resource_dir();
	let options = LoaderOptions { memory_manager: Some( dir.path().join( "absent.js" )), ..LoaderOptions::default() };

	assert!( matches!(
		pipeline::compile( &resource, &options, false, &mut MemoryHost::default() ),
		Err( LoaderError::ArtifactRead { .. }),
	));

}

#[test]
fn options_are_discovered_next_to_the_resource() {

	let ( dir, _resource ) = resource_dir();
	std::fs::write( dir.path().join( "wasm-loader.toml" ), "fetch = false\n" ).expect( "Failed to write options" );

	let options = LoaderOptions::discover( dir.path() ).expect( "Failed to load options" );
	assert!( !options.fetch );

	let empty = tempfile::tempdir().expect( "Failed to create temp dir" );
	assert_eq!( LoaderOptions::discover( empty.path() ).expect( "Failed to load options" ), LoaderOptions::default() );

}
