pub(crate) mod support;

mod connection;
mod tool;
