//! # Handlers incluidos
//! src/handlers/mod.rs
//!
//! Handlers listos para registrar en el `Router`.
//!
//! - **static_files**: sirve archivos bajo un prefijo (`/static/`)

pub mod static_files;

pub use static_files::StaticFiles;
