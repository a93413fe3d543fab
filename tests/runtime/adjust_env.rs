use std::sync::Arc ;
use std::sync::atomic::{ AtomicUsize, Ordering };
use wasm_loader::Engine ;
use wasm_loader::host::{ BufferHost, InitError, Loader, TYPE_TAG };

#[test]
fn adjust_env_can_add_imports() {

	let engine = Engine::default();
	let mut seen_type = None ;
	let mut envelope = Loader::embedded( &engine, crate::NEEDS_CONSOLE_HOOK.as_bytes() )
		.init( &BufferHost::new(), | linker, kind | {
			seen_type = Some( kind.to_string() );
			linker.func_wrap( "env", "_log_value", | value: i32 | -> i32 { value * 2 })?;
			Ok(())
		})
		.expect( "Failed to initialize module" );

	assert_eq!( seen_type.as_deref(), Some( TYPE_TAG ));
	let log = envelope.func( "log" ).expect( "missing export" )
		.typed::<i32, i32>( envelope.store() ).expect( "wrong signature" );
	assert_eq!( log.call( envelope.store_mut(), 21 ).expect( "call failed" ), 42 );

}

#[test]
fn adjust_env_can_replace_synthesized_imports() {

	let engine = Engine::default();
	let mut envelope = Loader::embedded( &engine, crate::ENVIRONMENT_PROBE.as_bytes() )
		.init( &BufferHost::new(), | linker, _ | {
			linker.func_wrap( "env", "getTotalMemory", || -> i32 { 1024 })?;
			Ok(())
		})
		.expect( "Failed to initialize module" );

	let total = envelope.func( "total_memory" ).expect( "missing export" )
		.typed::<(), i32>( envelope.store() ).expect( "wrong signature" )
		.call( envelope.store_mut(), () ).expect( "call failed" );
	assert_eq!( total, 1024 );

}

#[test]
fn failing_adjust_env_aborts_init() {
	let engine = Engine::default();
	let result = Loader::embedded( &engine, crate::MIXED_EXPORTS.as_bytes() )
		.init( &BufferHost::new(), |_, _| Err( wasmtime::Error::msg( "refused" )));
	assert!( matches!( result, Err( InitError::Environment( _ ))));
}

#[test]
fn instance_callback_runs_once_per_init() {

	let calls = Arc::new( AtomicUsize::new( 0 ));
	let counter = Arc::clone( &calls );
	let engine = Engine::default();
	let loader = Loader::embedded( &engine, crate::MIXED_EXPORTS.as_bytes() )
		.on_instance( move | _instance, _store | {
			counter.fetch_add( 1, Ordering::SeqCst );
			Ok(())
		});

	loader.init_default( &BufferHost::new() ).expect( "Failed to initialize module" );
	loader.init_default( &BufferHost::new() ).expect( "Failed to initialize module" );
	assert_eq!( calls.load( Ordering::SeqCst ), 2 );

}

#[test]
fn failing_instance_callback_is_reported() {
	let engine = Engine::default();
	let result = Loader::embedded( &engine, crate::MIXED_EXPORTS.as_bytes() )
		.on_instance(| _, _ | Err( wasmtime::Error::msg( "rejected" )))
		.init_default( &BufferHost::new() );
	assert!( matches!( result, Err( InitError::Extension( _ ))));
}
