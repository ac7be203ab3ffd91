//! Query parsing, boolean execution and snippet extraction

mod executor;
mod parser;
mod snippet;

pub use executor::QueryExecutor;
pub use parser::QueryParser;
pub use snippet::SnippetGenerator;
