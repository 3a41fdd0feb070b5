//! Crate `cura_paths`: rutas, catálogos y lock de proceso de cura

mod errors;
mod fs_utils;
mod paths;

pub use errors::Error;
pub use paths::CuraPaths;
