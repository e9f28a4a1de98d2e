//! Squad naming adapters.

mod http_namer;

pub use http_namer::HttpSquadNamer;
