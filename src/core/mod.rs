pub mod cadence;
pub mod cleaner;
pub mod config;
pub mod corpus;
pub mod markov;
pub mod pipeline;
pub mod popularity;
pub mod source;
pub mod tokenizer;
