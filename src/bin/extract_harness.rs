use std::path::Path;
use std::sync::Arc;

use resume_screener_lib::core::document_parser::ResumeDocumentParser;
use resume_screener_lib::core::models::SourceDocument;
use resume_screener_lib::core::ocr::TesseractCliOcrService;
use resume_screener_lib::core::pdf::PdfTextExtractor;
use resume_screener_lib::core::settings_store::SettingsStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    resume_screener_lib::init_tracing(false);

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: extract_harness <path-to-resume.pdf|docx>");
        std::process::exit(1);
    }

    let path = &args[1];
    if !Path::new(path).exists() {
        eprintln!("File not found: {path}");
        std::process::exit(2);
    }

    let file_name = Path::new(path)
        .file_name()
        .and_then(|v| v.to_str())
        .unwrap_or("resume.pdf")
        .to_string();

    let bytes = tokio::fs::read(path).await?;

    let settings = SettingsStore::new().load().await?;
    let ocr = TesseractCliOcrService::from_settings(&settings);
    let parser = ResumeDocumentParser::new(PdfTextExtractor::new(Arc::new(ocr)));

    let extracted = parser.extract(&SourceDocument::new(file_name, bytes)).await;
    println!("{}", serde_json::to_string_pretty(&extracted)?);
    Ok(())
}
