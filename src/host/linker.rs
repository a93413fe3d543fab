use wasmtime::{
    Caller, Global, GlobalType, Linker, Memory, MemoryType, Mutability,
    Ref, RefType, Store, Table, TableType, Val, ValType,
};
use tracing::{ debug, info };

use crate::environment::{ Constant, EnvironmentDescriptor, Stub };
use crate::memory ;
use super::HostContext ;



/// Defines the minimal environment on `linker`: a fixed-size memory and table,
/// the layout constants as immutable globals, and every stub import.
pub(crate) fn define_environment(
    linker: &mut Linker<HostContext>,
    store: &mut Store<HostContext>,
    descriptor: &EnvironmentDescriptor,
) -> wasmtime::Result<()> {

    let pages = descriptor.memory_pages();
    let memory = Memory::new( &mut *store, MemoryType::new( pages, Some( pages )))?;
    let table_size = descriptor.table_size();
    let table = Table::new(
        &mut *store,
        TableType::new( RefType::FUNCREF, table_size, Some( table_size )),
        Ref::Func( None ),
    )?;
    store.data_mut().attach( memory, table );
    linker.define( &*store, "env", "memory", memory )?;
    linker.define( &*store, "env", "table", table )?;

    for constant in Constant::ALL {
        let global = Global::new(
            &mut *store,
            GlobalType::new( ValType::I32, Mutability::Const ),
            Val::I32( descriptor.constant( constant )),
        )?;
        linker.define( &*store, "env", constant.name(), global )?;
    }

    let total_memory = descriptor.constant( Constant::StackMax );
    for stub in Stub::ALL { define_stub( linker, stub, total_memory )?; }

    debug!( pages, table_size, "defined minimal environment" );
    Ok(())

}

fn define_stub( linker: &mut Linker<HostContext>, stub: Stub, total_memory: i32 ) -> wasmtime::Result<()> {
    let ( module, name ) = ( stub.module(), stub.name() );
    match stub {
        Stub::Time => linker.func_wrap( module, name, | _ptr: i32 | -> i32 { unix_seconds() })?,
        Stub::SetErrNo => linker.func_wrap( module, name, | mut caller: Caller<'_, HostContext>, errno: i32 | {
            caller.data_mut().set_errno( errno );
        })?,
        Stub::Console => linker.func_wrap( module, name, | value: i32 | {
            info!( target: "wasm_loader::console", "{}", value );
        })?,
        Stub::MemcpyBig => linker.func_wrap( module, name, memcpy_big )?,
        Stub::EnlargeMemory | Stub::AbortOnCannotGrowMemory => linker.func_wrap( module, name, || -> i32 { 0 })?,
        Stub::GetTotalMemory => linker.func_wrap( module, name, move || -> i32 { total_memory })?,
        Stub::Assert => linker.func_wrap( module, name, | condition: i32, text: i32 | -> wasmtime::Result<()> {
            match condition {
                0 => Err( wasmtime::Error::msg( format!( "Assertion failed: {}", text ))),
                _ => Ok(()),
            }
        })?,
        Stub::AbortUpper | Stub::Abort => linker.func_wrap( module, name, | code: i32 | -> wasmtime::Result<()> {
            Err( wasmtime::Error::msg( format!( "abort({})", code )))
        })?,
        Stub::AbortStackOverflow => linker.func_wrap( module, name, | _allocation: i32 | -> wasmtime::Result<()> {
            Err( wasmtime::Error::msg( "overflow" ))
        })?,
        Stub::F64Rem => linker.func_wrap( module, name, | x: f64, y: f64 | -> f64 { x % y })?,
        Stub::Debugger => linker.func_wrap( module, name, || {})?,
    };
    Ok(())
}

fn unix_seconds() -> i32 {
    std::time::SystemTime::now()
        .duration_since( std::time::UNIX_EPOCH )
        .map_or( 0, | elapsed | i32::try_from( elapsed.as_secs() ).unwrap_or( i32::MAX ))
}

fn memcpy_big( mut caller: Caller<'_, HostContext>, dest: i32, src: i32, num: i32 ) -> wasmtime::Result<i32> {
    let memory = caller.data().memory()
        .ok_or_else(|| wasmtime::Error::msg( "memory is not attached" ))?;
    let data = memory.data_mut( &mut caller );
    let ( dest_at, src_at, len ) = ( dest.cast_unsigned() as usize, src.cast_unsigned() as usize, num.cast_unsigned() as usize );
    if src_at.saturating_add( len ) > data.len() || dest_at.saturating_add( len ) > data.len() {
        return Err( wasmtime::Error::msg( "memcpy out of bounds" ));
    }
    data.copy_within( src_at..src_at + len, dest_at );
    Ok( dest )
}

/// Adds `env._mallocjs` and `env._freejs`, forwarding to the store's memory
/// manager. Manager errors trap the calling instruction.
pub(crate) fn bind_memory( linker: &mut Linker<HostContext> ) -> wasmtime::Result<()> {

    linker.func_wrap( "env", "_mallocjs", | mut caller: Caller<'_, HostContext>, length: i32, type_tag: i32 | -> wasmtime::Result<i32> {
        memory::allocate( caller.data_mut().memory_manager_mut(), length.cast_unsigned(), type_tag )
            .map( u32::cast_signed )
            .map_err( wasmtime::Error::new )
    })?;

    linker.func_wrap( "env", "_freejs", | mut caller: Caller<'_, HostContext>, start: i32, length: i32, type_tag: i32 | -> wasmtime::Result<()> {
        let memory_size = caller.data().memory().map_or( 0, | memory | u64::try_from( memory.data_size( &caller )).unwrap_or( u64::MAX ));
        memory::release( caller.data_mut().memory_manager_mut(), start.cast_unsigned(), length.cast_unsigned(), type_tag, memory_size )
            .map_err( wasmtime::Error::new )
    })?;

    Ok(())

}
