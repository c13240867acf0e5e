mod error_handling;
mod replay;
