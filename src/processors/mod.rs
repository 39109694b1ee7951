//! Document format processors

pub mod docx;
