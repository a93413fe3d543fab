//! Selection of how the artifact reaches the WebAssembly compiler.
//!
//! Two inputs decide the strategy: whether the loader fetches the artifact over
//! the network (instead of carrying it embedded) and whether the host can
//! instantiate straight from a response stream.
//!
//! | fetch | streaming | strategy                                   |
//! |-------|-----------|--------------------------------------------|
//! | yes   | yes       | [`Strategy::StreamFetched`]                |
//! | yes   | no        | [`Strategy::BufferFetched`]                |
//! | no    | yes       | [`Strategy::StreamEmbedded`]               |
//! | no    | no        | [`Strategy::BufferEmbedded`]               |

use pipe_trait::Pipe ;

/// Content type a response must carry to be compiled as a stream.
pub const WASM_CONTENT_TYPE: &str = "application/wasm" ;

/// Where the artifact bytes come from at runtime.
#[derive( Debug, Clone, Copy, PartialEq, Eq, Hash )]
pub enum SourceMode {
    /// The bytes are part of the loader itself.
    Embedded,
    /// The bytes are fetched relative to the loading resource.
    Fetch,
}

impl SourceMode {
    #[inline] pub fn is_fetch( self ) -> bool { self == SourceMode::Fetch }
}

/// One of the four mutually exclusive instantiation paths.
#[derive( Debug, Clone, Copy, PartialEq, Eq, Hash )]
pub enum Strategy {
    /// Compile directly from the fetched response.
    StreamFetched,
    /// Fetch to completion, collect the bytes, compile from the buffer.
    BufferFetched,
    /// Wrap the embedded bytes in a synthetic response and compile it as a stream.
    StreamEmbedded,
    /// Compile the embedded bytes directly.
    BufferEmbedded,
}

impl Strategy {

    pub const ALL: [Strategy; 4] = [
        Strategy::StreamFetched, Strategy::BufferFetched,
        Strategy::StreamEmbedded, Strategy::BufferEmbedded,
    ];

    pub fn select( fetch_capable: bool, streaming: bool ) -> Self {
        match ( fetch_capable, streaming ) {
            ( true, true ) => Strategy::StreamFetched,
            ( true, false ) => Strategy::BufferFetched,
            ( false, true ) => Strategy::StreamEmbedded,
            ( false, false ) => Strategy::BufferEmbedded,
        }
    }

    #[inline] pub fn source_mode( self ) -> SourceMode {
        match self {
            Strategy::StreamFetched | Strategy::BufferFetched => SourceMode::Fetch,
            Strategy::StreamEmbedded | Strategy::BufferEmbedded => SourceMode::Embedded,
        }
    }

    #[inline] pub fn is_streaming( self ) -> bool {
        matches!( self, Strategy::StreamFetched | Strategy::StreamEmbedded )
    }

    /// JavaScript statement returning the instantiation promise for this path.
    ///
    /// Fetched paths expect a `path` array holding the loading resource's
    /// directory segments; embedded paths expect `wasmBinary`.
    pub fn emit_js( self, file_name: &str ) -> String {
        let url = format!( r#"path.join("/") + "/" + {}"#, js_string( file_name ));
        match self {
            Strategy::StreamFetched => format!(
                "return WebAssembly.instantiateStreaming(fetch({url}), globalEnv);"
            ),
            Strategy::BufferFetched => format!(
                "return fetch({url}).then(function(r) {{ return r.arrayBuffer(); }}).then(function(bin) {{\n\
                \treturn WebAssembly.instantiate(bin, globalEnv);\n\
                }});"
            ),
            Strategy::StreamEmbedded => format!(
                "return WebAssembly.instantiateStreaming(new Response(wasmBinary, {{\n\
                \theaders: {{ \"content-type\": {} }}\n\
                }}), globalEnv);",
                js_string( WASM_CONTENT_TYPE ),
            ),
            Strategy::BufferEmbedded => "return WebAssembly.instantiate(wasmBinary, globalEnv);".to_string(),
        }
    }

}

/// What the build decided about the artifact's runtime delivery.
#[derive( Debug, Clone, PartialEq, Eq )]
pub struct InstantiationPlan {
    source_mode: SourceMode,
    streaming_available: bool,
    file_name: String,
}

impl InstantiationPlan {

    /// A plan for a host whose streaming support is only known at runtime.
    /// The generated loader probes for it; the native host declares it.
    pub fn new( source_mode: SourceMode, file_name: impl Into<String> ) -> Self {
        Self { source_mode, streaming_available: true, file_name: file_name.into() }
    }

    pub fn with_streaming( mut self, streaming_available: bool ) -> Self {
        self.streaming_available = streaming_available ;
        self
    }

    #[inline] pub fn source_mode( &self ) -> SourceMode { self.source_mode }
    #[inline] pub fn streaming_available( &self ) -> bool { self.streaming_available }
    #[inline] pub fn file_name( &self ) -> &str { &self.file_name }

    #[inline] pub fn strategy( &self ) -> Strategy {
        Strategy::select( self.source_mode.is_fetch(), self.streaming_available )
    }

    /// The streaming and buffered strategies for this plan's source mode.
    pub fn strategies( &self ) -> ( Strategy, Strategy ) {
        let fetch = self.source_mode.is_fetch();
        ( Strategy::select( fetch, true ), Strategy::select( fetch, false ))
    }

    /// Capabilities `init` checks before doing anything else, in check order.
    pub fn required_capabilities( &self ) -> Vec<Capability> {
        let mut required = vec![ Capability::Promise, Capability::ArrayBuffer ];
        if self.source_mode.is_fetch() { required.push( Capability::Fetch ); }
        required
    }

}

/// A host feature the loader depends on.
#[derive( Debug, Clone, Copy, PartialEq, Eq, Hash )]
pub enum Capability {
    Promise,
    ArrayBuffer,
    Fetch,
    WebAssembly,
}

impl Capability {

    /// Global whose absence means the capability is missing.
    pub fn js_global( self ) -> &'static str {
        match self {
            Capability::Promise => "Promise",
            Capability::ArrayBuffer => "ArrayBuffer",
            Capability::Fetch => "fetch",
            Capability::WebAssembly => "WebAssembly",
        }
    }

    /// Message of the error raised when the capability is missing.
    pub fn missing_message( self ) -> &'static str {
        match self {
            Capability::Promise => "No Promise support!",
            Capability::ArrayBuffer => "No ArrayBuffer support!",
            Capability::Fetch => "No Fetch support!",
            Capability::WebAssembly => "No Webassembly support!",
        }
    }

    /// `if ( typeof X === "undefined" ) throw …` for this capability.
    pub fn emit_js_check( self ) -> String {
        format!(
            "if (typeof {} === \"undefined\") {{\n\tthrow new Error({});\n}}",
            self.js_global(),
            js_string( self.missing_message() ),
        )
    }

}

impl std::fmt::Display for Capability {
    fn fmt( &self, f: &mut std::fmt::Formatter ) -> std::fmt::Result { write!( f, "{:?}", self )}
}

/// Features a host declares to the native loader.
#[derive( Debug, Clone, Copy, PartialEq, Eq )]
pub struct Capabilities {
    pub promises: bool,
    pub array_buffer: bool,
    pub webassembly: bool,
    pub fetch: bool,
    pub streaming: bool,
}

impl Capabilities {

    /// Everything available.
    pub const BROWSER: Self = Self { promises: true, array_buffer: true, webassembly: true, fetch: true, streaming: true };

    /// No network access and no streaming compilation.
    pub const BUFFER_ONLY: Self = Self { promises: true, array_buffer: true, webassembly: true, fetch: false, streaming: false };

    pub fn supports( &self, capability: Capability ) -> bool {
        match capability {
            Capability::Promise => self.promises,
            Capability::ArrayBuffer => self.array_buffer,
            Capability::Fetch => self.fetch,
            Capability::WebAssembly => self.webassembly,
        }
    }

    /// First capability `plan` needs that is missing, checked in the same order
    /// as the generated loader, followed by WebAssembly itself.
    ///
    /// # Errors
    /// The missing capability.
    pub fn check( &self, plan: &InstantiationPlan ) -> Result<(), Capability> {
        plan.required_capabilities()
            .into_iter()
            .chain( std::iter::once( Capability::WebAssembly ))
            .find(| &capability | !self.supports( capability ))
            .map_or( Ok(()), Err )
    }

}

impl Default for Capabilities {
    fn default() -> Self { Self::BROWSER }
}

/// Fetch URL for `file_name`: the directory of `location_path` joined with it.
///
/// Mirrors `location.pathname.split( "/" )`, dropping the last segment and
/// joining the rest with `/`.
pub fn fetch_url( location_path: &str, file_name: &str ) -> String {
    let directory = location_path
        .rsplit_once( '/' )
        .map_or( "", |( directory, _ )| directory );
    format!( "{}/{}", directory, file_name )
}

/// Renders the runtime prelude for `plan`: the embedded byte array or the
/// location directory, and the streaming probe.
pub fn emit_source_prelude( plan: &InstantiationPlan, bytes: &[u8] ) -> String {
    let source = match plan.source_mode {
        SourceMode::Embedded => format!( "var wasmBinary = new Uint8Array({});", js_bytes( bytes )),
        SourceMode::Fetch => "var path = typeof location !== \"undefined\" ? location.pathname.split(\"/\") : [];\npath.pop();".to_string(),
    };
    format!( "{source}\nvar hasStreaming = typeof WebAssembly.instantiateStreaming === \"function\";" )
}

/// Renders the expression producing the instantiation promise, choosing between
/// the plan's streaming and buffered paths at runtime.
pub fn emit_instantiate( plan: &InstantiationPlan ) -> String {
    let ( streaming, buffered ) = plan.strategies();
    format!(
        "(function() {{\n\tif (hasStreaming) {{\n{}\n\t}} else {{\n{}\n\t}}\n}})()",
        crate::assemble::indent( &streaming.emit_js( &plan.file_name ), 2 ),
        crate::assemble::indent( &buffered.emit_js( &plan.file_name ), 2 ),
    )
}

/// A JavaScript string literal.
pub(crate) fn js_string( value: &str ) -> String {
    // a str always serializes
    serde_json::to_string( value ).unwrap_or_default()
}

fn js_bytes( bytes: &[u8] ) -> String {
    bytes.pipe( serde_json::to_string ).unwrap_or_else(|_| "[]".to_string() )
}
