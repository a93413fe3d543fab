use std::collections::{ BTreeSet, HashMap };
use thiserror::Error ;
use tracing::debug ;

use super::element_width ;
use crate::environment::{ EnvironmentDescriptor, StaticLayout };

/// A block handed out by [`MemoryManager::allocate`].
#[derive( Debug, Clone, Copy, PartialEq, Eq )]
pub struct Allocation {
    /// Address of the first element.
    pub address: u32,
    /// Number of elements reserved.
    pub elements: u32,
    /// Byte width of one element.
    pub width: u32,
}

/// Errors reported by a memory manager. Surface as traps of the calling import.
#[derive( Debug, Error, PartialEq, Eq )]
pub enum MemoryError {
    /// No memory manager is configured.
    #[error( "No memory manager available" )] Unavailable,
    /// The heap region cannot fit the requested block.
    #[error( "Out of memory: {requested} bytes requested, {available} available" )]
    OutOfMemory { requested: u64, available: u64 },
    /// The address is outside the heap or not aligned to the element width.
    #[error( "Invalid address: {0:#x}" )] InvalidAddress( u32 ),
    /// The address was already released.
    #[error( "Double release: {0:#x}" )] DoubleRelease( u32 ),
}

/// Allocation service for a module's linear memory.
///
/// `scan` and `mark` are housekeeping hooks. The loader calls `mark` once after
/// instantiation with the stack top; `scan` runs whenever the embedder asks
/// through the export envelope.
pub trait MemoryManager: Send {

    /// Reserves a block of `length` bytes of `type_tag` elements.
    ///
    /// # Errors
    /// Fails when the block cannot be reserved.
    fn allocate( &mut self, length: u32, type_tag: i32 ) -> Result<Allocation, MemoryError> ;

    /// Returns every element address in `addresses` to the manager.
    ///
    /// # Errors
    /// Fails on addresses the manager never handed out.
    fn release( &mut self, addresses: &[u32], type_tag: i32 ) -> Result<(), MemoryError> ;

    /// Reclaims whatever released memory the manager can.
    fn scan( &mut self ) {}

    fn mark( &mut self, _stack_top: u32 ) {}

    /// Whether the allocation imports should be bound at all.
    fn is_active( &self ) -> bool { true }

}

/// The manager used when none is configured: housekeeping does nothing and the
/// allocation imports are not bound.
#[derive( Debug, Default, Clone, Copy )]
pub struct NullManager ;

impl MemoryManager for NullManager {
    fn allocate( &mut self, _length: u32, _type_tag: i32 ) -> Result<Allocation, MemoryError> { Err( MemoryError::Unavailable ) }
    fn release( &mut self, _addresses: &[u32], _type_tag: i32 ) -> Result<(), MemoryError> { Err( MemoryError::Unavailable ) }
    fn is_active( &self ) -> bool { false }
}

/// A slot allocator over the heap region of linear memory.
///
/// Elements are tracked per width. Released addresses go to a free set and are
/// reused when it holds a contiguous run long enough for a request; otherwise
/// the bump pointer advances, aligned to the element width. `scan` gives the
/// released elements just below the bump pointer back to it, never going below
/// the marked stack top.
#[derive( Debug, Clone )]
pub struct ActiveManager {
    heap_start: u32,
    heap_end: u32,
    bump: u32,
    floor: u32,
    free: HashMap<u32, BTreeSet<u32>>,
}

impl ActiveManager {

    /// Manages `[heap_start, heap_end)`.
    pub fn new( heap_start: u32, heap_end: u32 ) -> Self {
        Self { heap_start, heap_end, bump: heap_start, floor: heap_start, free: HashMap::new() }
    }

    /// Manages the memory above the static reservations of `descriptor`, up to
    /// the end of its linear memory.
    pub fn for_environment( descriptor: &EnvironmentDescriptor ) -> Self {
        let StaticLayout { static_top, .. } = descriptor.layout();
        Self::new( static_top, u32::try_from( descriptor.total_memory() ).unwrap_or( u32::MAX ))
    }

    /// Next address the bump pointer would hand out.
    #[inline] pub fn watermark( &self ) -> u32 { self.bump }

    /// Number of released elements of `width` waiting for reuse.
    pub fn free_elements( &self, width: u32 ) -> usize {
        self.free.get( &width ).map_or( 0, BTreeSet::len )
    }

    fn take_run( &mut self, width: u32, elements: u32 ) -> Option<u32> {
        let free = self.free.get_mut( &width )?;
        let start = free.iter().copied().find(| &start |
            ( 1..elements ).all(| index | free.contains( &( start + index * width )))
        )?;
        ( 0..elements ).for_each(| index | { free.remove( &( start + index * width )); });
        Some( start )
    }

}

impl MemoryManager for ActiveManager {

    fn allocate( &mut self, length: u32, type_tag: i32 ) -> Result<Allocation, MemoryError> {

        let width = element_width( type_tag );
        let elements = length.div_ceil( width ).max( 1 );

        if let Some( address ) = self.take_run( width, elements ) {
            return Ok( Allocation { address, elements, width });
        }

        let address = self.bump.next_multiple_of( width );
        let requested = u64::from( elements ) * u64::from( width );
        let end = u64::from( address ) + requested ;
        if end > u64::from( self.heap_end ) {
            return Err( MemoryError::OutOfMemory {
                requested,
                available: u64::from( self.heap_end.saturating_sub( address )),
            });
        }

        self.bump = u32::try_from( end ).unwrap_or( self.heap_end );
        Ok( Allocation { address, elements, width })

    }

    fn release( &mut self, addresses: &[u32], type_tag: i32 ) -> Result<(), MemoryError> {

        let width = element_width( type_tag );
        if let Some( &address ) = addresses.iter().find(| &&address |
            address < self.heap_start || address >= self.bump || address % width != 0
        ) {
            return Err( MemoryError::InvalidAddress( address ));
        }

        let free = self.free.entry( width ).or_default();
        if let Some( &address ) = addresses.iter().find(| &&address | free.contains( &address )) {
            return Err( MemoryError::DoubleRelease( address ));
        }
        free.extend( addresses.iter().copied() );
        Ok(())

    }

    fn scan( &mut self ) {
        let before = self.bump ;
        loop {
            let ( bump, floor ) = ( self.bump, self.floor );
            let reclaimed = self.free.iter_mut().find_map(|( &width, free )| {
                let top = bump.checked_sub( width ).filter(| &top | top >= floor )?;
                free.remove( &top ).then_some( top )
            });
            match reclaimed {
                Some( top ) => self.bump = top,
                None => break,
            }
        }
        if self.bump < before { debug!( from = before, to = self.bump, "reclaimed heap top" ); }
    }

    fn mark( &mut self, stack_top: u32 ) {
        self.bump = self.bump.max( stack_top );
        self.floor = self.floor.max( stack_top );
    }

}
