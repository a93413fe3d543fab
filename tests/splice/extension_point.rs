use wasm_loader::splice::{ self, find_extension_point, ANCHOR, MARKER };

#[test]
fn span_ends_after_the_balancing_brace() {

	let prefix = "var x = 1;\n" ;
	let function = "function instantiateArrayBuffer(x){ if(a){b}else{c} }" ;
	let script = format!( "{prefix}{function}\nrun();" );

	let point = find_extension_point( &script, ANCHOR ).expect( "no extension point" );
	assert_eq!( point.start(), prefix.len() );
	assert_eq!( point.end(), prefix.len() + function.len() );
	assert_eq!( &script[point.range()], function );

}

#[test]
fn only_the_first_anchor_is_used() {
	let script = "function instantiateArrayBuffer(a){ one() }\nfunction instantiateArrayBuffer(b){ two() }" ;
	let spliced = splice::splice( script, ANCHOR );
	assert_eq!( spliced.script(), "[custom-loader]\nfunction instantiateArrayBuffer(b){ two() }" );
}

#[test]
fn absent_anchor_leaves_the_script_untouched() {
	let script = "var Module = {};\nrun();" ;
	let spliced = splice::splice( script, ANCHOR );
	assert!( !spliced.is_spliced() );
	assert_eq!( spliced.extension_point(), None );
	assert_eq!( spliced.script(), script );
}

#[test]
fn unbalanced_function_is_not_spliced() {
	let script = "function instantiateArrayBuffer(x){ if(a){ b }" ;
	let spliced = splice::splice( script, ANCHOR );
	assert!( !spliced.is_spliced() );
	assert!( !spliced.script().contains( MARKER ));
}

#[test]
fn scan_is_not_string_aware() {
	// a brace inside a string literal still counts
	let script = "function instantiateArrayBuffer(x){ log(\"}\"); }" ;
	let point = find_extension_point( script, ANCHOR ).expect( "no extension point" );
	assert_eq!( &script[point.range()], "function instantiateArrayBuffer(x){ log(\"}" );
}

#[test]
fn span_length_matches_the_cut() {
	let script = "a();function instantiateArrayBuffer(){}b();" ;
	let spliced = splice::splice( script, ANCHOR );
	let point = spliced.extension_point().expect( "no extension point" );
	assert_eq!( point.len(), "function instantiateArrayBuffer(){}".len() );
	assert_eq!( spliced.script(), "a();[custom-loader]b();" );
}
