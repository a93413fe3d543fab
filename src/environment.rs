//! The minimal import environment used when no bootstrap script is supplied.
//!
//! [`EnvironmentDescriptor`] is the single description of that environment:
//! memory and table shape, the static memory layout, and the fixed set of stub
//! imports. The generated loader renders it to JavaScript through
//! [`emit_minimal_env`] and [`emit_default_imports`]; the native host defines the
//! same imports on a `wasmtime` linker.

use itertools::Itertools ;

use crate::memory::{ self, MemoryManagerSource };

pub const WASM_PAGE_SIZE: u32 = 65_536 ;
pub const TOTAL_MEMORY: u32 = 16_777_216 ;
pub const STATIC_BASE: u32 = 2752 ;
pub const TABLE_SIZE: u32 = 6 ;

/// Addresses reserved at the bottom of linear memory before the heap starts.
#[derive( Debug, Clone, Copy, PartialEq, Eq )]
pub struct StaticLayout {
    /// First free byte after all static reservations.
    pub static_top: u32,
    /// Top of the stack, also the floor handed to the memory manager's `mark`.
    pub stack_top: u32,
    /// 16-byte scratch slot used for float/int punning.
    pub temp_double_ptr: u32,
    /// Address of the word holding the dynamic heap top.
    pub dynamic_top_ptr: u32,
}

impl StaticLayout {

    pub const fn new( static_base: u32 ) -> Self {
        let stack_top = static_base ;
        let temp_double_ptr = static_base ;
        let dynamic_top_ptr = static_base + 16 ;
        Self {
            static_top: static_alloc_end( dynamic_top_ptr, 4 ),
            stack_top,
            temp_double_ptr,
            dynamic_top_ptr,
        }
    }

}

impl Default for StaticLayout {
    fn default() -> Self { Self::new( STATIC_BASE ) }
}

const fn static_alloc_end( top: u32, size: u32 ) -> u32 { ( top + size + 15 ) & !15 }

/// Function imports every synthesized environment provides.
#[derive( Debug, Clone, Copy, PartialEq, Eq, Hash )]
pub enum Stub {
    /// Wall-clock time.
    Time,
    /// Error-number setter; accepts and drops its argument.
    SetErrNo,
    /// Console passthrough.
    Console,
    /// Copies a block of bytes within linear memory.
    MemcpyBig,
    EnlargeMemory,
    GetTotalMemory,
    AbortOnCannotGrowMemory,
    /// Aborts with a message when its condition is false.
    Assert,
    AbortUpper,
    Abort,
    AbortStackOverflow,
    /// Floating point remainder.
    F64Rem,
    Debugger,
}

impl Stub {

    pub const ALL: [Stub; 13] = [
        Stub::Time, Stub::SetErrNo, Stub::Console, Stub::MemcpyBig,
        Stub::EnlargeMemory, Stub::GetTotalMemory, Stub::AbortOnCannotGrowMemory,
        Stub::Assert, Stub::AbortUpper, Stub::Abort, Stub::AbortStackOverflow,
        Stub::F64Rem, Stub::Debugger,
    ];

    /// Import module the stub lives in.
    pub fn module( self ) -> &'static str {
        match self {
            Stub::F64Rem | Stub::Debugger => "asm2wasm",
            _ => "env",
        }
    }

    /// Import name within [`Stub::module`].
    pub fn name( self ) -> &'static str {
        match self {
            Stub::Time => "_time",
            Stub::SetErrNo => "___setErrNo",
            Stub::Console => "_console",
            Stub::MemcpyBig => "_emscripten_memcpy_big",
            Stub::EnlargeMemory => "enlargeMemory",
            Stub::GetTotalMemory => "getTotalMemory",
            Stub::AbortOnCannotGrowMemory => "abortOnCannotGrowMemory",
            Stub::Assert => "assert",
            Stub::AbortUpper => "ABORT",
            Stub::Abort => "abort",
            Stub::AbortStackOverflow => "abortStackOverflow",
            Stub::F64Rem => "f64-rem",
            Stub::Debugger => "debugger",
        }
    }

    fn js_value( self ) -> &'static str {
        match self {
            Stub::Time => "function(ptr) { return Date.now(); }",
            Stub::SetErrNo | Stub::EnlargeMemory | Stub::AbortOnCannotGrowMemory => "noop",
            Stub::Console => "function(n) { console.log(n); }",
            Stub::MemcpyBig => "function(dest, src, num) {\n\
                \tvar heap8 = new Uint8Array(Module.buffer);\n\
                \theap8.set(heap8.subarray(src, src + num), dest);\n\
                \treturn dest;\n\
                }",
            Stub::GetTotalMemory => "function() { return TOTAL_MEMORY; }",
            Stub::Assert => "function(condition, text) { if (!condition) { globalEnv.env.abort(text); } }",
            Stub::AbortUpper | Stub::Abort => "function(err) { throw new Error(err); }",
            Stub::AbortStackOverflow => "function() { throw new Error(\"overflow\"); }",
            Stub::F64Rem => "function(x, y) { return x % y; }",
            Stub::Debugger => "function() { debugger; }",
        }
    }

}

/// Constant `env` imports derived from the static layout.
#[derive( Debug, Clone, Copy, PartialEq, Eq, Hash )]
pub enum Constant {
    DynamicTopPtr,
    TempDoublePtr,
    StackTop,
    StackMax,
    MemoryBase,
    TableBase,
}

impl Constant {

    pub const ALL: [Constant; 6] = [
        Constant::DynamicTopPtr, Constant::TempDoublePtr, Constant::StackTop,
        Constant::StackMax, Constant::MemoryBase, Constant::TableBase,
    ];

    pub fn name( self ) -> &'static str {
        match self {
            Constant::DynamicTopPtr => "DYNAMICTOP_PTR",
            Constant::TempDoublePtr => "tempDoublePtr",
            Constant::StackTop => "STACKTOP",
            Constant::StackMax => "STACK_MAX",
            Constant::MemoryBase => "memoryBase",
            Constant::TableBase => "tableBase",
        }
    }

}

/// Shape of the import object handed to the module at instantiation.
#[derive( Debug, Clone, Copy, PartialEq, Eq )]
pub struct EnvironmentDescriptor {
    memory_pages: u32,
    table_size: u32,
    layout: StaticLayout,
}

impl EnvironmentDescriptor {

    pub fn new() -> Self {
        Self {
            memory_pages: TOTAL_MEMORY / WASM_PAGE_SIZE,
            table_size: TABLE_SIZE,
            layout: StaticLayout::default(),
        }
    }

    /// Overrides the total memory size, in 64 KiB pages. Memory never grows, so
    /// this is both the initial and the maximum size.
    pub fn with_memory_pages( mut self, pages: u32 ) -> Self {
        self.memory_pages = pages ;
        self
    }

    pub fn with_table_size( mut self, size: u32 ) -> Self {
        self.table_size = size ;
        self
    }

    #[inline] pub fn memory_pages( &self ) -> u32 { self.memory_pages }
    #[inline] pub fn total_memory( &self ) -> u64 { u64::from( self.memory_pages ) * u64::from( WASM_PAGE_SIZE ) }
    #[inline] pub fn table_size( &self ) -> u32 { self.table_size }
    #[inline] pub fn layout( &self ) -> StaticLayout { self.layout }

    /// Value of a constant import.
    pub fn constant( &self, constant: Constant ) -> i32 {
        let value = match constant {
            Constant::DynamicTopPtr => self.layout.dynamic_top_ptr,
            Constant::TempDoublePtr => self.layout.temp_double_ptr,
            Constant::StackTop | Constant::TableBase => 0,
            Constant::StackMax => u32::try_from( self.total_memory() ).unwrap_or( u32::MAX ),
            Constant::MemoryBase => STATIC_BASE,
        };
        value.cast_signed()
    }

}

impl Default for EnvironmentDescriptor {
    fn default() -> Self { Self::new() }
}

/// Renders the environment built from scratch when there is no bootstrap
/// script: heap constants, the static layout, a linear memory (or a plain
/// `ArrayBuffer` when the host has no `WebAssembly.Memory`), the memory manager
/// and the `globalEnv` import object.
pub fn emit_minimal_env( descriptor: &EnvironmentDescriptor, manager: Option<&MemoryManagerSource> ) -> String {

    let env_entries = Stub::ALL.iter()
        .filter(| stub | stub.module() == "env" )
        .map(| stub | format!( "{:?}: {}", stub.name(), stub.js_value() ))
        .chain([ Constant::DynamicTopPtr, Constant::TempDoublePtr, Constant::StackTop, Constant::StackMax ]
            .into_iter()
            .map(| constant | format!( "{:?}: {}", constant.name(), js_constant( descriptor, constant ))))
        .join( ",\n" );

    let asm2wasm_entries = Stub::ALL.iter()
        .filter(| stub | stub.module() == "asm2wasm" )
        .map(| stub | format!( "{:?}: {}", stub.name(), stub.js_value() ))
        .join( ",\n" );

    format!( r#"var WASM_PAGE_SIZE = {page_size};
var TOTAL_MEMORY = {total_memory};
var noop = function(v) {{ return v; }};
var staticAlloc = function(size) {{
	var ret = STATICTOP;
	STATICTOP = (STATICTOP + size + 15) & -16;
	return ret;
}};

var STATICTOP = {static_base};
var STACKTOP = STATICTOP;
var tempDoublePtr = STATICTOP; STATICTOP += 16;
var DYNAMICTOP_PTR = staticAlloc(4);

var buffer;
if (typeof WebAssembly === "object" && typeof WebAssembly.Memory === "function") {{
	Module["wasmMemory"] = new WebAssembly.Memory({{
		"initial": TOTAL_MEMORY / WASM_PAGE_SIZE,
		"maximum": TOTAL_MEMORY / WASM_PAGE_SIZE
	}});
	buffer = Module["wasmMemory"].buffer;
}} else {{
	buffer = new ArrayBuffer(TOTAL_MEMORY);
}}
Module.buffer = buffer;

{manager_install}

globalEnv = {{
	"global": (typeof window !== "undefined" ? window : self),
	"env": {{
{env_entries}
	}},
	"asm2wasm": {{
{asm2wasm_entries}
	}},
	"parent": Module
}};"#,
        page_size = WASM_PAGE_SIZE,
        total_memory = descriptor.total_memory(),
        static_base = STATIC_BASE,
        manager_install = memory::emit_manager_install( manager ),
        env_entries = crate::assemble::indent( &env_entries, 2 ),
        asm2wasm_entries = crate::assemble::indent( &asm2wasm_entries, 2 ),
    )

}

fn js_constant( descriptor: &EnvironmentDescriptor, constant: Constant ) -> String {
    match constant {
        Constant::DynamicTopPtr => "DYNAMICTOP_PTR".to_string(),
        Constant::TempDoublePtr => "tempDoublePtr".to_string(),
        _ => descriptor.constant( constant ).to_string(),
    }
}

/// Renders the block that completes an import object with a table, memory and
/// base offsets when any of them is missing. Used when the environment was not
/// taken from a spliced bootstrap script.
pub fn emit_default_imports( descriptor: &EnvironmentDescriptor ) -> String {
    format!( r#"if (!globalEnv.env["table"]) {{
	var TABLE_SIZE = Module["wasmTableSize"] || {table_size};
	var MAX_TABLE_SIZE = Module["wasmMaxTableSize"] || {table_size};
	if (typeof WebAssembly === "object" && typeof WebAssembly.Table === "function") {{
		globalEnv.env["table"] = new WebAssembly.Table({{
			"initial": TABLE_SIZE,
			"maximum": MAX_TABLE_SIZE,
			"element": "anyfunc"
		}});
	}} else {{
		globalEnv.env["table"] = new Array(TABLE_SIZE);
	}}
	Module["wasmTable"] = globalEnv.env["table"];
}}
if (!globalEnv.env["memoryBase"]) {{
	globalEnv.env["memoryBase"] = Module["STATIC_BASE"] || {memory_base};
}}
if (!globalEnv.env["tableBase"]) {{
	globalEnv.env["tableBase"] = {table_base};
}}
if (!globalEnv.env["memory"]) {{
	globalEnv.env["memory"] = Module["wasmMemory"] || new WebAssembly.Memory({{
		"initial": {pages},
		"maximum": {pages}
	}});
}}"#,
        table_size = descriptor.table_size(),
        memory_base = descriptor.constant( Constant::MemoryBase ),
        table_base = descriptor.constant( Constant::TableBase ),
        pages = descriptor.memory_pages(),
    )
}
