use wasm_loader::{ LoaderOptions, Target };
use wasm_loader::artifact::BootstrapScript ;
use wasm_loader::pipeline::{ self, BuildHost };

struct DiscardHost ;

impl BuildHost for DiscardHost {
	fn emit_file( &mut self, _name: &str, _bytes: &[u8] ) -> std::io::Result<()> { Ok(()) }
}

const SCRIPT: &str = "var Module = typeof Module !== 'undefined' ? Module : {};\n\
	var fs = require('fs');\n\
	var nodePath = REQUIRE(\"path\");\n\
	var name = file.replace(/\\\\/g,\"/\");\n\
	function instantiateArrayBuffer(receiver) { receiver(); }\n" ;

#[test]
fn web_target_drops_node_requires() {
	let cleaned = BootstrapScript::new( SCRIPT ).clean( Target::Web );
	assert!( cleaned.text().contains( "var fs = undefined;" ));
	assert!( cleaned.text().contains( "var nodePath = undefined;" ));
}

#[test]
fn node_target_keeps_requires() {
	let cleaned = BootstrapScript::new( SCRIPT ).clean( Target::Node );
	assert!( cleaned.text().contains( "require('fs')" ));
}

#[test]
fn module_declarations_are_removed() {
	let cleaned = BootstrapScript::new( SCRIPT ).clean( Target::Web );
	assert!( !cleaned.text().contains( "var Module" ));
}

#[test]
fn backslash_replacement_is_made_portable() {
	let cleaned = BootstrapScript::new( SCRIPT ).clean( Target::Web );
	assert!( cleaned.text().contains( "var name = file.split('').map(function(s) { return s === '\\\\' ? '/' : s; }).join('');" ));
	assert!( !cleaned.text().contains( "/g,\"/\")" ));
}

#[test]
fn bootstrap_next_to_the_artifact_is_spliced() {

	let dir = tempfile::tempdir().expect( "Failed to create temp dir" );
	std::fs::write( dir.path().join( "app.wasm" ), [ 0x00, 0x61, 0x73, 0x6d ]).expect( "Failed to write artifact" );
	std::fs::write( dir.path().join( "app.js" ), SCRIPT ).expect( "Failed to write bootstrap" );

	let compiled = pipeline::compile( &dir.path().join( "app.wasm" ), &LoaderOptions::default(), false, &mut DiscardHost )
		.expect( "Failed to compile" );

	assert!( compiled.spliced );
	assert!( compiled.source.contains( "var fs = undefined;" ));
	assert!( compiled.source.contains( "instanceCallback = receiver;" ));

}

#[test]
fn empty_bootstrap_counts_as_absent() {

	let dir = tempfile::tempdir().expect( "Failed to create temp dir" );
	std::fs::write( dir.path().join( "app.wasm" ), [ 0x00, 0x61, 0x73, 0x6d ]).expect( "Failed to write artifact" );
	std::fs::write( dir.path().join( "app.js" ), "" ).expect( "Failed to write bootstrap" );

	let compiled = pipeline::compile( &dir.path().join( "app.wasm" ), &LoaderOptions::default(), false, &mut DiscardHost )
		.expect( "Failed to compile" );

	assert!( !compiled.spliced );
	assert!( compiled.source.contains( "var STATICTOP = 2752;" ));

}
