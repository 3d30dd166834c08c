pub mod color;
pub mod console;
pub mod prompt;
pub mod talk;
