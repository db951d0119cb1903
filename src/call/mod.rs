pub mod app;
pub mod report;
