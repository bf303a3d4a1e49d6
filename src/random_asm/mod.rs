pub mod asm_maker;
pub mod inst_generator;
pub mod instructions;
pub mod registers;
