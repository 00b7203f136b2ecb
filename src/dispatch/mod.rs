pub mod accumulator;
pub mod constants;
pub mod dispatcher;
pub mod entry;
