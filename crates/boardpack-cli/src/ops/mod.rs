pub mod boards;
pub mod install;
