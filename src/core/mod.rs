pub mod parser;
pub mod process_table;
