pub mod experiments;
pub mod files;
pub mod getvar;
pub mod index;
pub mod info;
pub mod variables;
