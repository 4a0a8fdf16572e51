use anyhow::Context;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use fs_err as fs;
use std::path::Path;
use tracing::debug;

use crate::errors::BuilderError;
use crate::wire::ImageFile;

/// Reference-image types the model accepts, keyed by file extension.
const IMAGE_TYPES: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("webp", "image/webp"),
];

pub fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    IMAGE_TYPES.iter().find(|(e, _)| *e == ext).map(|(_, mime)| *mime)
}

impl ImageFile {
    pub fn from_bytes(name: impl Into<String>, mime_type: &str, bytes: &[u8]) -> Self {
        Self {
            data: format!("data:{mime_type};base64,{}", STANDARD.encode(bytes)),
            mime_type: mime_type.to_string(),
            name: name.into(),
        }
    }

    /// Load a reference image from disk as a data URL.
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let mime = mime_for_path(path).ok_or_else(|| {
            BuilderError::InvalidInput(format!(
                "Unsupported image type for {}. Use a JPG, PNG or WEBP file.",
                path.display()
            ))
        })?;
        let bytes = fs::read(path).context("reading reference image")?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        debug!(name = %name, mime, bytes = bytes.len(), "attached reference image");
        Ok(Self::from_bytes(name, mime, &bytes))
    }
}

/// The draft the user is about to send: prompt text and at most one image.
#[derive(Debug, Default, Clone)]
pub struct PromptComposer {
    prompt: String,
    image: Option<ImageFile>,
}

impl PromptComposer {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self { prompt: prompt.into(), image: None }
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn image(&self) -> Option<&ImageFile> {
        self.image.as_ref()
    }

    pub fn attach_image(&mut self, image: ImageFile) {
        self.image = Some(image);
    }

    pub fn is_sendable(&self) -> bool {
        !self.prompt.trim().is_empty()
    }

    /// Hand the draft to a generation. The image is consumed; the prompt stays
    /// so it can be reused.
    pub fn take_for_generation(&mut self) -> Result<(String, Option<ImageFile>), BuilderError> {
        if !self.is_sendable() {
            return Err(BuilderError::InvalidInput("Please enter a prompt.".into()));
        }
        Ok((self.prompt.trim().to_string(), self.image.take()))
    }

    /// Replace the prompt only when enhancement succeeded.
    pub fn apply_enhanced(&mut self, result: &Result<String, BuilderError>) -> bool {
        match result {
            Ok(text) => {
                self.prompt = text.clone();
                true
            }
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_is_inferred_from_extension() {
        assert_eq!(mime_for_path(Path::new("a/b/ref.JPG")), Some("image/jpeg"));
        assert_eq!(mime_for_path(Path::new("ref.webp")), Some("image/webp"));
        assert_eq!(mime_for_path(Path::new("ref.gif")), None);
        assert_eq!(mime_for_path(Path::new("noext")), None);
    }

    #[test]
    fn loads_image_as_data_url() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("mock.png");
        fs::write(&path, [0x89, b'P', b'N', b'G']).unwrap();

        let img = ImageFile::from_path(&path).unwrap();
        assert_eq!(img.name, "mock.png");
        assert_eq!(img.mime_type, "image/png");
        assert_eq!(img.data, "data:image/png;base64,iVBORw==");
        assert_eq!(img.base64_payload(), "iVBORw==");
    }

    #[test]
    fn rejects_unsupported_image_types() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("anim.gif");
        fs::write(&path, b"GIF89a").unwrap();
        let err = ImageFile::from_path(&path).unwrap_err();
        assert!(matches!(err.downcast_ref::<BuilderError>(), Some(BuilderError::InvalidInput(_))));
    }

    #[test]
    fn image_is_cleared_after_generation_takes_it() {
        let mut c = PromptComposer::new("  A bakery landing page ");
        c.attach_image(ImageFile::from_bytes("ref.png", "image/png", b"x"));
        let (prompt, image) = c.take_for_generation().unwrap();
        assert_eq!(prompt, "A bakery landing page");
        assert!(image.is_some());
        assert!(c.image().is_none());
        assert_eq!(c.prompt(), "  A bakery landing page ");
    }

    #[test]
    fn empty_prompt_cannot_be_sent() {
        let mut c = PromptComposer::new("   ");
        assert!(matches!(c.take_for_generation(), Err(BuilderError::InvalidInput(_))));
    }

    #[test]
    fn failed_enhancement_keeps_prompt() {
        let mut c = PromptComposer::new("cafe");
        assert!(!c.apply_enhanced(&Err(BuilderError::PromptTooShort)));
        assert_eq!(c.prompt(), "cafe");
        assert!(c.apply_enhanced(&Ok("A cozy cafe site".into())));
        assert_eq!(c.prompt(), "A cozy cafe site");
    }
}
