pub mod ast;
pub mod builders;
pub mod generator;
pub mod lower;
pub mod resolve;
pub mod span;
pub mod symbols;
pub mod tac;
