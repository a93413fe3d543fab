use wasm_loader::Engine ;
use wasm_loader::host::{ BufferHost, DirectoryHost, Loader };
use wasm_loader::{ Capabilities, Strategy };

#[test]
fn embedded_module_instantiates_without_network() {

	let engine = Engine::default();
	let loader = Loader::embedded( &engine, crate::MIXED_EXPORTS.as_bytes() );
	let host = BufferHost::new();

	assert_eq!( loader.plan( &host ).strategy(), Strategy::BufferEmbedded );
	let envelope = loader.init_default( &host ).expect( "Failed to initialize module" );

	assert!( envelope.export( "add" ).is_some() );
	assert!( envelope.memory_manager().is_none() );

}

#[test]
fn embedded_module_streams_from_a_synthetic_response() {

	let engine = Engine::default();
	let loader = Loader::embedded( &engine, crate::MIXED_EXPORTS.as_bytes() );
	let host = crate::CountingHost::new( DirectoryHost::new( "/nonexistent" ));

	assert_eq!( loader.plan( &host ).strategy(), Strategy::StreamEmbedded );
	let mut envelope = loader.init_default( &host ).expect( "Failed to initialize module" );
	assert_eq!( host.fetches(), 0 );

	let add = envelope.func( "add" ).expect( "missing export" )
		.typed::<( i32, i32 ), i32>( envelope.store() )
		.expect( "wrong signature" );
	assert_eq!( add.call( envelope.store_mut(), ( 40, 2 )).expect( "call failed" ), 42 );

}

#[test]
fn every_init_gets_a_fresh_memory() {

	let engine = Engine::default();
	let loader = Loader::embedded( &engine, crate::ENVIRONMENT_PROBE.as_bytes() );
	let host = BufferHost::with_capabilities( Capabilities::BUFFER_ONLY );

	let mut first = loader.init_default( &host ).expect( "Failed to initialize module" );
	let memory = first.host_module().memory().expect( "memory not attached" );
	memory.write( first.store_mut(), 64, b"first" ).expect( "write failed" );

	let second = loader.init_default( &host ).expect( "Failed to initialize module" );
	assert_eq!( &first.memory()[64..69], b"first" );
	assert_eq!( &second.memory()[64..69], &[ 0; 5 ] );

}

#[test]
fn invalid_binary_fails_instantiation() {
	let engine = Engine::default();
	match Loader::embedded( &engine, &b"not a module"[..] ).init_default( &BufferHost::new() ) {
		Err( wasm_loader::host::InitError::Instantiation( _ )) => {}
		other => panic!( "Expected Instantiation error, found: {:#?}", other.map(| _ | ()) ),
	}
}
