pub mod generation;
pub mod history;
pub mod images;
pub mod styles;
