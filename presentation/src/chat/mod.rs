//! Interactive chat over an analysis session

mod repl;

pub use repl::ChatRepl;
