//! Extension-point splicing for toolchain bootstrap scripts.
//!
//! A bootstrap script emitted by the native-to-WebAssembly toolchain defines an
//! `instantiateArrayBuffer` function that performs the instantiation itself. The
//! loader needs to own that step, so the function is cut out of the script and
//! replaced by [`MARKER`], which [`Splice::fill`] later substitutes with generated
//! code.
//!
//! Locating the function is a brace-balance scan over raw text, not a parse.
//! Braces inside string or comment literals are not special-cased; toolchain
//! output is assumed not to contain them inside the extension point.

use std::ops::Range ;
use tracing::{ debug, warn };

/// Signature that opens the replaceable function in toolchain output.
pub const ANCHOR: &str = "function instantiateArrayBuffer" ;

/// Token left in place of the extension point until generated code is filled in.
pub const MARKER: &str = "[custom-loader]" ;

/// A half-open byte span `[start, end)` of a bootstrap script covering one
/// function definition, from its anchor up to and including the closing brace
/// that balances the first opening one.
#[derive( Debug, Clone, Copy, PartialEq, Eq, Hash )]
pub struct ExtensionPoint {
    start: usize,
    end: usize,
}

impl ExtensionPoint {

    /// Byte offset of the anchor.
    #[inline] pub fn start( &self ) -> usize { self.start }

    /// Byte offset immediately after the balancing closing brace.
    #[inline] pub fn end( &self ) -> usize { self.end }

    /// Length of the span in bytes. Never zero.
    #[inline] pub fn len( &self ) -> usize { self.end - self.start }

    #[inline] pub fn is_empty( &self ) -> bool { false }

    #[inline] pub fn range( &self ) -> Range<usize> { self.start..self.end }

}

/// Finds the function introduced by the first occurrence of `anchor`.
///
/// The nesting counter starts at 0 on the anchor, goes up on `{` and down on
/// `}`; the span ends right after the `}` that brings it back to 0. Returns
/// `None` when the anchor is absent or its braces never balance.
pub fn find_extension_point( script: &str, anchor: &str ) -> Option<ExtensionPoint> {

    let start = script.find( anchor )?;
    let mut level: isize = 0 ;

    for ( offset, byte ) in script.as_bytes()[start..].iter().enumerate() {
        match byte {
            b'{' => level += 1,
            b'}' => {
                level -= 1 ;
                if level == 0 { return Some( ExtensionPoint { start, end: start + offset + 1 }) }
            }
            _ => {}
        }
    }

    None

}

/// A bootstrap script with its extension point (if any) replaced by [`MARKER`].
#[derive( Debug, Clone, PartialEq, Eq )]
pub struct Splice {
    script: String,
    extension_point: Option<ExtensionPoint>,
}

impl Splice {

    /// The rewritten script. Identical to the input when nothing was spliced.
    #[inline] pub fn script( &self ) -> &str { &self.script }

    /// Where the extension point was located in the unspliced script.
    #[inline] pub fn extension_point( &self ) -> Option<ExtensionPoint> { self.extension_point }

    #[inline] pub fn is_spliced( &self ) -> bool { self.extension_point.is_some() }

    /// Substitutes the marker with `code`.
    ///
    /// Only the marker written by [`splice`] is replaced, so a script that happens
    /// to contain the marker text elsewhere is left intact. When nothing was
    /// spliced the script is returned unchanged.
    pub fn fill( &self, code: &str ) -> String {
        match self.extension_point {
            Some( point ) => {
                let mut filled = String::with_capacity( self.script.len() - MARKER.len() + code.len() );
                filled.push_str( &self.script[..point.start] );
                filled.push_str( code );
                filled.push_str( &self.script[point.start + MARKER.len()..] );
                filled
            }
            None => self.script.clone(),
        }
    }

    #[inline] pub fn into_script( self ) -> String { self.script }

}

/// Cuts the extension point introduced by `anchor` out of `script`.
///
/// An absent anchor is not an error: the script is kept verbatim and the custom
/// instantiation hook is not wired. A warning is logged since this usually means
/// the toolchain output changed shape.
pub fn splice( script: &str, anchor: &str ) -> Splice {
    match find_extension_point( script, anchor ) {
        Some( point ) => {
            debug!( start = point.start, end = point.end, "located extension point" );
            let mut spliced = String::with_capacity( script.len() - point.len() + MARKER.len() );
            spliced.push_str( &script[..point.start] );
            spliced.push_str( MARKER );
            spliced.push_str( &script[point.end..] );
            Splice { script: spliced, extension_point: Some( point ) }
        }
        None => {
            warn!( anchor, "extension point not found in bootstrap script, instantiation hook not wired" );
            Splice { script: script.to_string(), extension_point: None }
        }
    }
}
