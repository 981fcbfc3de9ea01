pub mod byte;
pub mod cursor;
