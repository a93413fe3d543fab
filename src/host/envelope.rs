use std::collections::HashMap ;
use wasmtime::{ Extern, Func, Instance, Store };

use crate::exports ;
use crate::memory::MemoryManager ;
use super::HostContext ;

/// Result of a successful `init`.
///
/// Holds the store the module lives in, the raw instance, the exports keyed by
/// canonical name, the linear memory, and the memory manager when one is active.
pub struct ExportEnvelope {
    store: Store<HostContext>,
    raw: Instance,
    exports: HashMap<String, Extern>,
}

impl ExportEnvelope {

    pub(crate) fn new( mut store: Store<HostContext>, raw: Instance ) -> Self {
        let raw_exports = raw.exports( &mut store )
            .map(| export | ( export.name().to_string(), export.into_extern() ))
            .collect::<Vec<_>>();
        let exports = exports::normalize( raw_exports );
        Self { store, raw, exports }
    }

    /// The instantiation result as produced by the engine.
    #[inline] pub fn raw( &self ) -> &Instance { &self.raw }

    /// The host-side module object: the store data the imports were built from.
    #[inline] pub fn host_module( &self ) -> &HostContext { self.store.data() }

    #[inline] pub fn exports( &self ) -> &HashMap<String, Extern> { &self.exports }

    /// Export under its canonical name.
    #[inline] pub fn export( &self, name: &str ) -> Option<&Extern> { self.exports.get( name ) }

    /// Function export under its canonical name.
    pub fn func( &self, name: &str ) -> Option<Func> {
        self.export( name ).cloned().and_then( Extern::into_func )
    }

    /// The linear memory buffer. Empty when the module was never given one.
    pub fn memory( &self ) -> &[u8] {
        match self.store.data().memory() {
            Some( memory ) => memory.data( &self.store ),
            None => &[],
        }
    }

    /// The memory manager, when one is active.
    pub fn memory_manager( &self ) -> Option<&dyn MemoryManager> {
        Some( self.store.data().memory_manager() ).filter(| manager | manager.is_active() )
    }

    /// Runs the memory manager's `scan`. Does nothing without an active manager.
    pub fn scan_memory( &mut self ) {
        let manager = self.store.data_mut().memory_manager_mut();
        if manager.is_active() { manager.scan(); }
    }

    #[inline] pub fn store( &self ) -> &Store<HostContext> { &self.store }
    #[inline] pub fn store_mut( &mut self ) -> &mut Store<HostContext> { &mut self.store }

}

impl std::fmt::Debug for ExportEnvelope {
    fn fmt( &self, f: &mut std::fmt::Formatter ) -> std::fmt::Result {
        let mut names = self.exports.keys().collect::<Vec<_>>();
        names.sort();
        f.debug_struct( "ExportEnvelope" )
            .field( "host_module", self.store.data() )
            .field( "exports", &names )
            .finish_non_exhaustive()
    }
}
