pub mod chamber;
pub mod daily;
pub mod metamargin;
pub mod models;
pub mod predict;
