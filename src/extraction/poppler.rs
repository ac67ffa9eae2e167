use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::{PageText, TextExtractor, split_pages};
use crate::config::ExtractionConfig;

const INPUT_FILE_NAME: &str = "input.pdf";
const PAGE_IMAGE_PREFIX: &str = "page";

/// Extractor shelling out to poppler (`pdftotext`, `pdftoppm`) and `tesseract`
#[derive(Debug, Clone)]
pub struct PopplerExtractor {
    config: ExtractionConfig,
}

impl PopplerExtractor {
    #[inline]
    pub fn new(config: ExtractionConfig) -> Self {
        Self { config }
    }

    async fn write_input(bytes: &[u8]) -> Result<(tempfile::TempDir, PathBuf)> {
        let scratch = tempfile::tempdir().context("Failed to create scratch directory")?;
        let input = scratch.path().join(INPUT_FILE_NAME);
        fs::write(&input, bytes)
            .await
            .with_context(|| format!("Failed to write {}", input.display()))?;
        Ok((scratch, input))
    }

    async fn ocr_image(&self, image: &Path) -> Result<String> {
        let output = Command::new(&self.config.tesseract)
            .arg(image)
            .arg("stdout")
            .output()
            .await
            .with_context(|| format!("Failed to run {} (is it installed?)", self.config.tesseract))?;

        if !output.status.success() {
            return Err(anyhow!(
                "{} failed on {}: {}",
                self.config.tesseract,
                image.display(),
                String::from_utf8_lossy(&output.stderr)
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl TextExtractor for PopplerExtractor {
    async fn extract_text(&self, bytes: &[u8]) -> Result<Vec<PageText>> {
        let (_scratch, input) = Self::write_input(bytes).await?;

        let output = Command::new(&self.config.pdftotext)
            .args(["-layout", "-enc", "UTF-8"])
            .arg(&input)
            .arg("-")
            .output()
            .await
            .with_context(|| {
                format!(
                    "Failed to run {} (is poppler installed?)",
                    self.config.pdftotext
                )
            })?;

        if !output.status.success() {
            return Err(anyhow!(
                "{} failed: {}",
                self.config.pdftotext,
                String::from_utf8_lossy(&output.stderr)
            ));
        }

        let text = String::from_utf8_lossy(&output.stdout);
        let pages = split_pages(&text);
        debug!(
            "{} extracted {} characters across {} pages",
            self.config.pdftotext,
            text.len(),
            pages.len()
        );
        Ok(pages)
    }

    async fn extract_ocr(&self, bytes: &[u8]) -> Result<Vec<PageText>> {
        let (scratch, input) = Self::write_input(bytes).await?;
        let prefix = scratch.path().join(PAGE_IMAGE_PREFIX);

        let output = Command::new(&self.config.pdftoppm)
            .arg("-r")
            .arg(self.config.ocr_dpi.to_string())
            .arg("-png")
            .arg(&input)
            .arg(&prefix)
            .output()
            .await
            .with_context(|| {
                format!(
                    "Failed to run {} (is poppler installed?)",
                    self.config.pdftoppm
                )
            })?;

        if !output.status.success() {
            return Err(anyhow!(
                "{} failed: {}",
                self.config.pdftoppm,
                String::from_utf8_lossy(&output.stderr)
            ));
        }

        let images = page_images(scratch.path()).await?;
        info!("Running OCR on {} rendered pages", images.len());

        let texts = run_bounded(&images, self.config.ocr_concurrency, |(_, image): &(u32, PathBuf)| {
            let image = image.clone();
            async move { self.ocr_image(&image).await }
        })
        .await;

        let mut pages = Vec::with_capacity(images.len());
        for ((page_number, image), text) in images.iter().zip(texts) {
            match text {
                Ok(text) => pages.push(PageText::new(*page_number, text)),
                Err(e) => warn!("Skipping page {}: {:#}", image.display(), e),
            }
        }

        Ok(pages)
    }
}

/// Run `task` over `items` with at most `limit` in flight, output in input order
async fn run_bounded<T, F, Fut>(items: &[T], limit: usize, task: F) -> Vec<Fut::Output>
where
    F: FnMut(&T) -> Fut,
    Fut: Future,
{
    stream::iter(items)
        .map(task)
        .buffered(limit.max(1))
        .collect()
        .await
}

/// Rendered page images in page order
async fn page_images(dir: &Path) -> Result<Vec<(u32, PathBuf)>> {
    let mut entries = fs::read_dir(dir)
        .await
        .with_context(|| format!("Failed to list {}", dir.display()))?;

    let mut images = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if let Some(page_number) = page_number_from_image(&path) {
            images.push((page_number, path));
        }
    }

    images.sort_by_key(|(page_number, _)| *page_number);
    Ok(images)
}

/// `page-07.png` -> 7
fn page_number_from_image(path: &Path) -> Option<u32> {
    if path.extension()?.to_str()? != "png" {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    let (prefix, number) = stem.rsplit_once('-')?;
    if prefix != PAGE_IMAGE_PREFIX {
        return None;
    }
    number.parse().ok()
}
