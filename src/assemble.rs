//! Composition of the generated loader module.
//!
//! [`LoaderModule`] only arranges what the other components render: capability
//! checks, the memory adapter, the environment (synthesized or spliced), the
//! instantiation prelude and strategy, and the result envelope. The output is a
//! CommonJS module exporting a single `init( adjustEnv? )`.

use itertools::Itertools ;

use crate::environment::{ self, EnvironmentDescriptor };
use crate::exports ;
use crate::memory::{ self, MemoryManagerSource };
use crate::splice::Splice ;
use crate::strategy::{ self, Capability, InstantiationPlan, SourceMode };

/// Builder for the text of a loader module.
#[derive( Debug, Clone )]
#[must_use = "call .render() to produce the module source"]
pub struct LoaderModule<'a> {
    plan: InstantiationPlan,
    descriptor: EnvironmentDescriptor,
    binary: Option<&'a [u8]>,
    bootstrap: Option<&'a Splice>,
    memory_manager: Option<&'a MemoryManagerSource>,
}

impl<'a> LoaderModule<'a> {

    pub fn new( plan: InstantiationPlan ) -> Self {
        Self {
            plan,
            descriptor: EnvironmentDescriptor::new(),
            binary: None,
            bootstrap: None,
            memory_manager: None,
        }
    }

    /// Includes the WebAssembly section. In embedded mode the bytes are written
    /// into the module; in fetch mode only their file name is.
    pub fn with_binary( mut self, bytes: &'a [u8] ) -> Self {
        self.binary = Some( bytes );
        self
    }

    /// Uses a spliced bootstrap script as the environment instead of the
    /// synthesized one.
    pub fn with_bootstrap( mut self, bootstrap: &'a Splice ) -> Self {
        self.bootstrap = Some( bootstrap );
        self
    }

    pub fn with_memory_manager( mut self, manager: &'a MemoryManagerSource ) -> Self {
        self.memory_manager = Some( manager );
        self
    }

    pub fn with_descriptor( mut self, descriptor: EnvironmentDescriptor ) -> Self {
        self.descriptor = descriptor ;
        self
    }

    #[inline] pub fn plan( &self ) -> &InstantiationPlan { &self.plan }

    /// Whether the environment comes from a spliced bootstrap script. A script
    /// without the extension point is still included, but the synthesized
    /// environment is used so memory and table are guaranteed.
    fn uses_bootstrap_env( &self ) -> bool {
        self.bootstrap.is_some_and( Splice::is_spliced )
    }

    pub fn render( &self ) -> String {

        let checks = self.plan.required_capabilities()
            .into_iter()
            .map( Capability::emit_js_check )
            .join( "\n" );

        let module_decl = match self.plan.source_mode() {
            SourceMode::Fetch => "var Module = window.Module = {};",
            SourceMode::Embedded => "var Module = {};",
        };

        let body = [
            ( !self.uses_bootstrap_env() ).then(|| environment::emit_minimal_env( &self.descriptor, self.memory_manager )),
            Some( self.render_wasm() ),
        ].into_iter().flatten().join( "\n\n" );

        format!( r#"module.exports = {{
	init: function(adjustEnv) {{
{checks}

		adjustEnv = typeof adjustEnv === "undefined" ? function(obj) {{ return obj; }} : adjustEnv;

{bind_memory}

		{module_decl}
		var globalEnv = {{}};

		return new Promise(function(resolve, reject) {{
{body}
		}});
	}}
}};
"#,
            checks = indent( &checks, 2 ),
            bind_memory = indent( &memory::emit_bind_memory( self.memory_manager ), 2 ),
            body = indent( &body, 3 ),
        )

    }

    fn render_wasm( &self ) -> String {

        let Some( bytes ) = self.binary else {
            return "reject(new Error(\"No WebAssembly output was built\"));".to_string();
        };

        let environment = match self.bootstrap {
            Some( splice ) if splice.is_spliced() => splice.fill( &self.render_extension_point() ),
            Some( splice ) => format!( "{}\n{}", splice.script(), environment::emit_default_imports( &self.descriptor )),
            None => environment::emit_default_imports( &self.descriptor ),
        };

        let embedded: &[u8] = match self.plan.source_mode() {
            SourceMode::Embedded => bytes,
            SourceMode::Fetch => &[],
        };

        format!( r#"{webassembly_check}

var instanceCallback;

{environment}

{prelude}

globalEnv.env = bindMemory(globalEnv.env, Module.asmClass, "wasm");

{instantiate}.then(function(e) {{
	if (instanceCallback) {{
		instanceCallback(e);
	}}
	Module.asmClass.mark(STACKTOP);
{envelope}
}}).catch(reject);"#,
            webassembly_check = Capability::WebAssembly.emit_js_check(),
            prelude = strategy::emit_source_prelude( &self.plan, embedded ),
            instantiate = strategy::emit_instantiate( &self.plan ),
            envelope = indent( &exports::emit_envelope( self.memory_manager.is_some() ), 1 ),
        )

    }

    /// Code replacing the bootstrap script's own `instantiateArrayBuffer`: adopt
    /// the script's import object and capture the instance callback instead of
    /// instantiating.
    fn render_extension_point( &self ) -> String {
        format!( r#"Module["wasmBinary"] = [];
globalEnv = info;
function instantiateArrayBuffer(receiver) {{
	instanceCallback = receiver;
	{}
}}"#,
            memory::emit_manager_install( self.memory_manager ),
        )
    }

}

/// Indents every non-empty line of `text` by `depth` tabs.
pub(crate) fn indent( text: &str, depth: usize ) -> String {
    let prefix = "\t".repeat( depth );
    text.lines()
        .map(| line | match line.is_empty() {
            true => String::new(),
            false => format!( "{prefix}{line}" ),
        })
        .join( "\n" )
}
