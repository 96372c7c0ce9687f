pub mod aggregator;
pub mod assessment;
pub mod chat_model;
pub mod commands;
pub mod document_parser;
pub mod errors;
pub mod job_posting;
pub mod models;
pub mod ocr;
pub mod pdf;
pub mod prompt;
pub mod response_parser;
pub mod secret_store;
pub mod service;
pub mod settings_store;
