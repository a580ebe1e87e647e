pub mod api;
pub mod assets;
pub mod controllers;
pub mod util;

#[cfg(test)]
pub mod fixtures;
