/// Middleware modules for the API server
///
/// JWT authentication lives next to the router in [`crate::app`]; this
/// module holds the response-side layers.

pub mod security;
