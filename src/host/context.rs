use wasmtime::{ Memory, Table };

use crate::environment::StaticLayout ;
use crate::memory::MemoryManager ;

/// Store data of an instantiated module: the imports the host created for it,
/// the memory manager, and the last error number the module set.
pub struct HostContext {
    layout: StaticLayout,
    memory: Option<Memory>,
    table: Option<Table>,
    manager: Box<dyn MemoryManager>,
    errno: i32,
}

impl HostContext {

    pub(crate) fn new( layout: StaticLayout, manager: Box<dyn MemoryManager> ) -> Self {
        Self { layout, memory: None, table: None, manager, errno: 0 }
    }

    pub(crate) fn attach( &mut self, memory: Memory, table: Table ) {
        self.memory = Some( memory );
        self.table = Some( table );
    }

    #[inline] pub fn layout( &self ) -> StaticLayout { self.layout }

    /// The linear memory handed to the module as `env.memory`.
    #[inline] pub fn memory( &self ) -> Option<Memory> { self.memory }

    /// The function table handed to the module as `env.table`.
    #[inline] pub fn table( &self ) -> Option<Table> { self.table }

    #[inline] pub fn memory_manager( &self ) -> &dyn MemoryManager { self.manager.as_ref() }
    #[inline] pub fn memory_manager_mut( &mut self ) -> &mut dyn MemoryManager { self.manager.as_mut() }

    /// Last value passed to `___setErrNo`.
    #[inline] pub fn errno( &self ) -> i32 { self.errno }
    pub(crate) fn set_errno( &mut self, errno: i32 ) { self.errno = errno }

}

impl std::fmt::Debug for HostContext {
    fn fmt( &self, f: &mut std::fmt::Formatter ) -> std::fmt::Result {
        f.debug_struct( "HostContext" )
            .field( "layout", &self.layout )
            .field( "memory", &self.memory )
            .field( "table", &self.table )
            .field( "memory_manager_active", &self.manager.is_active() )
            .field( "errno", &self.errno )
            .finish()
    }
}
