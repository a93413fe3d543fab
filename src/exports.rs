//! Normalization of raw module exports into canonical names.

use std::collections::HashMap ;
use tracing::debug ;

/// Canonical key of a raw export: the name without one leading underscore.
#[inline]
pub fn canonical_name( raw: &str ) -> &str {
    raw.strip_prefix( '_' ).unwrap_or( raw )
}

/// Maps every export to its canonical key, in iteration order.
///
/// Canonical keys may collide (`_a` and `a`); the later export wins. The
/// overwrite is deliberate and only logged.
pub fn normalize<N, V>( exports: impl IntoIterator<Item = ( N, V )> ) -> HashMap<String, V>
where
    N: AsRef<str>,
{
    exports.into_iter().fold( HashMap::new(), | mut normalized, ( raw, value ) | {
        let key = canonical_name( raw.as_ref() );
        if normalized.insert( key.to_string(), value ).is_some() {
            debug!( raw = raw.as_ref(), key, "export overwrites an earlier export with the same canonical name" );
        }
        normalized
    })
}

/// Renders the `resolve( … )` call building the result envelope from the
/// instantiation result `e`.
pub fn emit_envelope( memory_manager: bool ) -> String {
    let manager_entry = match memory_manager {
        true => ",\n\tmemoryManager: Module.asmClass",
        false => "",
    };
    format!( r#"resolve({{
	raw: e,
	emModule: Module,
	exports: Object.keys(e.instance.exports).reduce(function(prev, cur) {{
		prev[cur.replace(/^_/, "")] = e.instance.exports[cur];
		return prev;
	}}, {{}}),
	memory: Module.buffer{manager_entry}
}});"# )
}
