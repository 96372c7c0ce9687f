use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::models::RuntimeSettings;

/// Recognizes text on the rendered pages of an image-only PDF.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// One entry per page, in page order.
    async fn recognize_pages(&self, pdf_bytes: &[u8]) -> anyhow::Result<Vec<String>>;
}

/// Renders pages with `pdftoppm` and recognizes each image with `tesseract`.
#[derive(Clone)]
pub struct TesseractCliOcrService {
    pub tesseract_executable_path: String,
    pub pdftoppm_executable_path: String,
    pub language: String,
    pub dpi: u32,
    pub timeout: Duration,
}

impl TesseractCliOcrService {
    pub fn from_settings(settings: &RuntimeSettings) -> Self {
        Self {
            tesseract_executable_path: settings.tesseract_path.clone(),
            pdftoppm_executable_path: settings.pdftoppm_path.clone(),
            language: settings.ocr_language.clone(),
            dpi: settings.ocr_dpi,
            timeout: Duration::from_secs(settings.ocr_timeout_seconds),
        }
    }

    async fn render_pages(&self, pdf_path: &Path, output_dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
        let mut command = Command::new(&self.pdftoppm_executable_path);
        command
            .arg("-png")
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg(pdf_path)
            .arg(output_dir.join("page"));

        let output = self
            .run(command)
            .await
            .context("failed to render PDF pages")?;
        if !output.status.success() {
            anyhow::bail!(
                "pdftoppm exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        let mut pages = Vec::new();
        let mut dir = tokio::fs::read_dir(output_dir).await?;
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "png") {
                pages.push(path);
            }
        }

        // pdftoppm zero-pads page numbers, so lexical order is page order.
        pages.sort();
        Ok(pages)
    }

    async fn recognize_image(&self, image_path: &Path) -> anyhow::Result<String> {
        let mut command = Command::new(&self.tesseract_executable_path);
        command
            .arg(image_path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.language);

        let output = self.run(command).await?;
        if !output.status.success() {
            anyhow::bail!(
                "tesseract exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    async fn run(&self, mut command: Command) -> anyhow::Result<Output> {
        command
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        match timeout(self.timeout, command.output()).await {
            Ok(result) => Ok(result?),
            Err(_) => anyhow::bail!("timed out after {}s", self.timeout.as_secs()),
        }
    }
}

#[async_trait]
impl OcrEngine for TesseractCliOcrService {
    async fn recognize_pages(&self, pdf_bytes: &[u8]) -> anyhow::Result<Vec<String>> {
        let temp_dir = tempfile::Builder::new()
            .prefix("resume-screener-ocr-")
            .tempdir()
            .context("failed to create OCR temp dir")?;

        let input_path = temp_dir.path().join("resume.pdf");
        tokio::fs::write(&input_path, pdf_bytes).await?;

        let images_dir = temp_dir.path().join("pages");
        tokio::fs::create_dir_all(&images_dir).await?;

        let images = self.render_pages(&input_path, &images_dir).await?;
        if images.is_empty() {
            anyhow::bail!("no pages rendered");
        }
        debug!(pages = images.len(), "rendered PDF pages for OCR");

        let mut pages = Vec::with_capacity(images.len());
        let mut last_error = None;
        for (index, image) in images.iter().enumerate() {
            match self.recognize_image(image).await {
                Ok(text) => pages.push(text),
                Err(err) => {
                    warn!(page = index + 1, error = %err, "OCR failed for page");
                    pages.push(String::new());
                    last_error = Some(err);
                }
            }
        }

        if let Some(err) = last_error {
            if pages.iter().all(|page| page.trim().is_empty()) {
                return Err(err.context("OCR failed on every page"));
            }
        }

        Ok(pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_renderer_is_reported_as_error() {
        let service = TesseractCliOcrService::from_settings(&RuntimeSettings {
            pdftoppm_path: "/nonexistent/pdftoppm-for-test".to_string(),
            ocr_timeout_seconds: 5,
            ..RuntimeSettings::default()
        });

        let err = service.recognize_pages(b"%PDF-1.4").await.unwrap_err();
        assert!(format!("{err:#}").contains("failed to render PDF pages"));
    }

    #[test]
    fn from_settings_copies_ocr_options() {
        let settings = RuntimeSettings {
            tesseract_path: "/opt/tesseract".to_string(),
            ocr_language: "deu".to_string(),
            ocr_dpi: 150,
            ocr_timeout_seconds: 30,
            ..RuntimeSettings::default()
        };

        let service = TesseractCliOcrService::from_settings(&settings);
        assert_eq!(service.tesseract_executable_path, "/opt/tesseract");
        assert_eq!(service.pdftoppm_executable_path, "pdftoppm");
        assert_eq!(service.language, "deu");
        assert_eq!(service.dpi, 150);
        assert_eq!(service.timeout, Duration::from_secs(30));
    }
}
