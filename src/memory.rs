//! Binding of an optional memory manager into the module's imports.
//!
//! A module built against a memory manager imports two functions:
//!
//! - `env._mallocjs( length, type_tag ) -> address`
//! - `env._freejs( start, length, type_tag )`
//!
//! Both take `length` in bytes. `type_tag` encodes the element width: tags up to
//! 4 are the width itself, larger tags are ten times the width (`40` is a 4-byte
//! element, the default when the tag is not positive). Release reconstructs the
//! address of every element in the block and hands the whole list to the manager
//! at once.
//!
//! Without a manager the adapter adds nothing to the import object.

mod manager ;

pub use manager::{ ActiveManager, Allocation, MemoryError, MemoryManager, NullManager };

/// Tag used when the module passes 0 or a negative tag.
pub const DEFAULT_TYPE_TAG: i32 = 40 ;

/// Class constructed by the generated loader when no other name is configured.
pub const DEFAULT_MANAGER_CLASS: &str = "ASM_Memory" ;

/// Byte width of one element for a type tag.
///
/// `tag > 4 ? round( tag / 10 ) : tag`, with non-positive tags replaced by
/// [`DEFAULT_TYPE_TAG`].
pub fn element_width( type_tag: i32 ) -> u32 {
    let tag = effective_tag( type_tag ).cast_unsigned();
    match tag > 4 {
        true => ( tag + 5 ) / 10,
        false => tag,
    }
}

#[inline]
fn effective_tag( type_tag: i32 ) -> i32 {
    if type_tag <= 0 { DEFAULT_TYPE_TAG } else { type_tag }
}

/// Addresses of the elements of a `length`-byte block starting at `start`.
pub fn release_addresses( start: u32, length: u32, type_tag: i32 ) -> Vec<u32> {
    let width = element_width( type_tag );
    ( 0..length.div_ceil( width ))
        .map(| index | start.wrapping_add( index * width ))
        .collect()
}

/// Allocation import: forwards to the manager and keeps only the address.
///
/// # Errors
/// Whatever the manager reports.
pub fn allocate( manager: &mut dyn MemoryManager, length: u32, type_tag: i32 ) -> Result<u32, MemoryError> {
    manager.allocate( length, effective_tag( type_tag )).map(| allocation | allocation.address )
}

/// Release import: rebuilds the element list and releases it in one batch.
///
/// A block reaching past `memory_size` bytes is rejected before the list is
/// built and the manager is never called.
///
/// # Errors
/// [`MemoryError::InvalidAddress`] for a block outside linear memory, otherwise
/// whatever the manager reports.
pub fn release( manager: &mut dyn MemoryManager, start: u32, length: u32, type_tag: i32, memory_size: u64 ) -> Result<(), MemoryError> {
    if u64::from( start ) + u64::from( length ) > memory_size {
        return Err( MemoryError::InvalidAddress( start ));
    }
    let addresses = release_addresses( start, length, type_tag );
    manager.release( &addresses, effective_tag( type_tag ))
}

/// JavaScript source of an external memory manager and the class it defines.
///
/// The class is constructed with the module's memory buffer and must provide
/// `malloc( length, tag ) -> [address, ...]`, `free( addresses, tag )`, `scan()`
/// and `mark( stackTop )`.
#[derive( Debug, Clone, PartialEq, Eq )]
pub struct MemoryManagerSource {
    source: String,
    class_name: String,
}

impl MemoryManagerSource {

    pub fn new( source: impl Into<String>, class_name: impl Into<String> ) -> Self {
        Self { source: source.into(), class_name: class_name.into() }
    }

    #[inline] pub fn source( &self ) -> &str { &self.source }
    #[inline] pub fn class_name( &self ) -> &str { &self.class_name }

}

/// Statement installing `Module.asmClass`: the configured manager bound to the
/// module buffer, or an object whose `scan` and `mark` do nothing.
pub fn emit_manager_install( manager: Option<&MemoryManagerSource> ) -> String {
    match manager {
        Some( manager ) => format!( "Module.asmClass = new {}(Module.buffer);", manager.class_name ),
        None => "Module.asmClass = { scan: function() {}, mark: function() {} };".to_string(),
    }
}

/// Renders `bindMemory( env, memClass, type )`, which adds the two memory
/// imports when a manager is configured and then applies `adjustEnv`.
pub fn emit_bind_memory( manager: Option<&MemoryManagerSource> ) -> String {
    match manager {
        Some( manager ) => format!( r#"{source}
function bindMemory(env, memClass, type) {{
	env._mallocjs = function(len, tag) {{
		return memClass.malloc(len, tag > 0 ? tag : {default_tag})[0];
	}};
	env._freejs = function(start, len, tag) {{
		tag = tag > 0 ? tag : {default_tag};
		var bytes = tag > 4 ? Math.round(tag / 10) : tag;
		var count = Math.ceil(len / bytes);
		var arr = [];
		for (var i = 0; i < count; i++) {{
			arr.push(start + (i * bytes));
		}}
		memClass.free(arr, tag);
	}};
	return adjustEnv(env, type);
}}"#,
            source = manager.source.trim_end(),
            default_tag = DEFAULT_TYPE_TAG,
        ),
        None => "function bindMemory(env, memClass, type) { return adjustEnv(env, type); }".to_string(),
    }
}
