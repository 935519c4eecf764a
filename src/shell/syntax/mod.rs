pub mod lexer;
pub mod redirect;
