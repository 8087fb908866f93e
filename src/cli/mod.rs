mod demo;
mod people;
mod root;

pub use root::Cli;
