/// Imports the whole minimal environment and exposes each piece through an export.
pub const ENVIRONMENT_PROBE: &str = r#"(module
	(import "env" "memory" (memory 256 256))
	(import "env" "table" (table 6 6 funcref))
	(import "env" "STACKTOP" (global $stack_top i32))
	(import "env" "STACK_MAX" (global $stack_max i32))
	(import "env" "DYNAMICTOP_PTR" (global $dynamic_top i32))
	(import "env" "tempDoublePtr" (global $temp_double i32))
	(import "env" "memoryBase" (global $memory_base i32))
	(import "env" "tableBase" (global $table_base i32))
	(import "env" "___setErrNo" (func $set_errno (param i32)))
	(import "env" "getTotalMemory" (func $total_memory (result i32)))
	(import "env" "enlargeMemory" (func $enlarge (result i32)))
	(import "env" "_emscripten_memcpy_big" (func $memcpy (param i32 i32 i32) (result i32)))
	(import "env" "assert" (func $assert (param i32 i32)))
	(import "env" "abort" (func $abort (param i32)))
	(import "asm2wasm" "f64-rem" (func $rem (param f64 f64) (result f64)))
	(func (export "_stack_top") (result i32) global.get $stack_top)
	(func (export "_stack_max") (result i32) global.get $stack_max)
	(func (export "_dynamic_top") (result i32) global.get $dynamic_top)
	(func (export "_temp_double") (result i32) global.get $temp_double)
	(func (export "_memory_base") (result i32) global.get $memory_base)
	(func (export "_table_base") (result i32) global.get $table_base)
	(func (export "_total_memory") (result i32) call $total_memory)
	(func (export "_enlarge") (result i32) call $enlarge)
	(func (export "_set_errno") (param i32) local.get 0 call $set_errno)
	(func (export "_copy") (param i32 i32 i32) (result i32)
		local.get 0 local.get 1 local.get 2 call $memcpy)
	(func (export "_check") (param i32) local.get 0 i32.const 0 call $assert)
	(func (export "_abort") i32.const 7 call $abort)
	(func (export "_rem") (param f64 f64) (result f64) local.get 0 local.get 1 call $rem))"# ;

/// Forwards to the memory manager imports.
pub const MEMORY_CLIENT: &str = r#"(module
	(import "env" "memory" (memory 256 256))
	(import "env" "_mallocjs" (func $malloc (param i32 i32) (result i32)))
	(import "env" "_freejs" (func $free (param i32 i32 i32)))
	(func (export "_malloc") (param i32 i32) (result i32)
		local.get 0 local.get 1 call $malloc)
	(func (export "_free") (param i32 i32 i32)
		local.get 0 local.get 1 local.get 2 call $free))"# ;

/// Exports under raw names with and without the toolchain's underscore.
pub const MIXED_EXPORTS: &str = r#"(module
	(func (export "_add") (param i32 i32) (result i32) local.get 0 local.get 1 i32.add)
	(func (export "mul") (param i32 i32) (result i32) local.get 0 local.get 1 i32.mul)
	(func (export "_free") (param i32))
	(func (export "_a") (result i32) i32.const 1)
	(func (export "a") (result i32) i32.const 2))"# ;

/// Imports a function the minimal environment does not define.
pub const NEEDS_CONSOLE_HOOK: &str = r#"(module
	(import "env" "_log_value" (func $log (param i32) (result i32)))
	(func (export "_log") (param i32) (result i32) local.get 0 call $log))"# ;

#[derive( Debug, Clone, Default )]
pub struct Recording {
	pub allocations: std::sync::Arc<std::sync::Mutex<Vec<( u32, i32 )>>>,
	pub releases: std::sync::Arc<std::sync::Mutex<Vec<( Vec<u32>, i32 )>>>,
	pub marks: std::sync::Arc<std::sync::Mutex<Vec<u32>>>,
}

/// Hands out fixed addresses and records every call.
#[derive( Debug )]
pub struct RecordingManager {
	recording: Recording,
	next: u32,
}

impl RecordingManager {
	pub fn new( recording: Recording ) -> Self { Self { recording, next: 4096 }}
}

impl wasm_loader::MemoryManager for RecordingManager {

	fn allocate( &mut self, length: u32, type_tag: i32 ) -> Result<wasm_loader::memory::Allocation, wasm_loader::MemoryError> {
		self.recording.allocations.lock().unwrap().push(( length, type_tag ));
		let width = wasm_loader::memory::element_width( type_tag );
		let address = self.next ;
		self.next += 1024 ;
		Ok( wasm_loader::memory::Allocation { address, elements: length.div_ceil( width ), width })
	}

	fn release( &mut self, addresses: &[u32], type_tag: i32 ) -> Result<(), wasm_loader::MemoryError> {
		self.recording.releases.lock().unwrap().push(( addresses.to_vec(), type_tag ));
		Ok(())
	}

	fn mark( &mut self, stack_top: u32 ) {
		self.recording.marks.lock().unwrap().push( stack_top );
	}

}

/// Wraps a host and counts how often it was asked to fetch.
pub struct CountingHost<H> {
	pub inner: H,
	pub fetches: std::sync::atomic::AtomicUsize,
}

impl<H> CountingHost<H> {
	pub fn new( inner: H ) -> Self { Self { inner, fetches: std::sync::atomic::AtomicUsize::new( 0 ) }}
	pub fn fetches( &self ) -> usize { self.fetches.load( std::sync::atomic::Ordering::SeqCst ) }
}

impl<H: wasm_loader::host::Host> wasm_loader::host::Host for CountingHost<H> {
	fn capabilities( &self ) -> wasm_loader::Capabilities { self.inner.capabilities() }
	fn location( &self ) -> &str { self.inner.location() }
	fn fetch( &self, url: &str ) -> Result<wasm_loader::host::Response, wasm_loader::host::FetchError> {
		self.fetches.fetch_add( 1, std::sync::atomic::Ordering::SeqCst );
		self.inner.fetch( url )
	}
}
