use std::path::{ Component, Path, PathBuf };
use thiserror::Error ;

use crate::strategy::{ Capabilities, WASM_CONTENT_TYPE };

/// A fetched resource: its body and the content type it was served with.
#[derive( Debug, Clone, PartialEq, Eq )]
pub struct Response {
    content_type: Option<String>,
    body: Vec<u8>,
}

impl Response {

    pub fn new( body: impl Into<Vec<u8>>, content_type: Option<String> ) -> Self {
        Self { content_type, body: body.into() }
    }

    /// A response served as `application/wasm`.
    pub fn wasm( body: impl Into<Vec<u8>> ) -> Self {
        Self::new( body, Some( WASM_CONTENT_TYPE.to_string() ))
    }

    #[inline] pub fn content_type( &self ) -> Option<&str> { self.content_type.as_deref() }

    /// The media type without parameters, as streaming compilation checks it.
    pub fn essence( &self ) -> Option<&str> {
        self.content_type().and_then(| value | value.split( ';' ).next() ).map( str::trim )
    }

    #[inline] pub fn body( &self ) -> &[u8] { &self.body }
    #[inline] pub fn into_body( self ) -> Vec<u8> { self.body }

}

#[derive( Debug, Error )]
pub enum FetchError {
    /// The host cannot fetch at all.
    #[error( "Fetch is not supported by this host" )] Unsupported,
    #[error( "Not found: {0}" )] NotFound( String ),
    #[error( "Failed to fetch {url}: {source}" )] Io { url: String, source: std::io::Error },
}

/// The execution context a native loader runs in.
///
/// Declares which capabilities are present, where the loading resource lives,
/// and performs network retrieval. Timing and retries are the host's business;
/// the loader calls [`Host::fetch`] at most once per `init`.
pub trait Host {

    fn capabilities( &self ) -> Capabilities ;

    /// Path of the loading resource; fetched artifacts are resolved against
    /// its directory.
    fn location( &self ) -> &str { "" }

    /// # Errors
    /// Any retrieval failure.
    fn fetch( &self, url: &str ) -> Result<Response, FetchError> ;

}

/// A host without network access. Artifacts must be embedded.
#[derive( Debug, Clone, Copy )]
pub struct BufferHost {
    capabilities: Capabilities,
}

impl BufferHost {
    pub fn new() -> Self { Self { capabilities: Capabilities::BUFFER_ONLY }}
    pub fn with_capabilities( capabilities: Capabilities ) -> Self { Self { capabilities }}
}

impl Default for BufferHost {
    fn default() -> Self { Self::new() }
}

impl Host for BufferHost {
    fn capabilities( &self ) -> Capabilities { self.capabilities }
    fn fetch( &self, _url: &str ) -> Result<Response, FetchError> { Err( FetchError::Unsupported ) }
}

/// Serves fetches from a directory, treating it as the server root.
#[derive( Debug, Clone )]
pub struct DirectoryHost {
    root: PathBuf,
    location: String,
    capabilities: Capabilities,
}

impl DirectoryHost {

    /// The loading resource is `/index.html` under `root`.
    pub fn new( root: impl Into<PathBuf> ) -> Self {
        Self {
            root: root.into(),
            location: "/index.html".to_string(),
            capabilities: Capabilities::BROWSER,
        }
    }

    pub fn with_location( mut self, location: impl Into<String> ) -> Self {
        self.location = location.into();
        self
    }

    pub fn with_capabilities( mut self, capabilities: Capabilities ) -> Self {
        self.capabilities = capabilities ;
        self
    }

    fn resolve( &self, url: &str ) -> Option<PathBuf> {
        let relative = Path::new( url.trim_start_matches( '/' ));
        relative.components()
            .all(| component | matches!( component, Component::Normal( _ ) | Component::CurDir ))
            .then(|| self.root.join( relative ))
    }

}

impl Host for DirectoryHost {

    fn capabilities( &self ) -> Capabilities { self.capabilities }

    fn location( &self ) -> &str { &self.location }

    fn fetch( &self, url: &str ) -> Result<Response, FetchError> {
        let path = self.resolve( url ).ok_or_else(|| FetchError::NotFound( url.to_string() ))?;
        let body = std::fs::read( &path ).map_err(| source | match source.kind() {
            std::io::ErrorKind::NotFound => FetchError::NotFound( url.to_string() ),
            _ => FetchError::Io { url: url.to_string(), source },
        })?;
        let content_type = match path.extension().and_then(| extension | extension.to_str() ) {
            Some( "wasm" ) => WASM_CONTENT_TYPE,
            Some( "js" ) => "text/javascript",
            _ => "application/octet-stream",
        };
        Ok( Response::new( body, Some( content_type.to_string() )))
    }

}
