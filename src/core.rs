pub mod clipboard;
pub mod features;
