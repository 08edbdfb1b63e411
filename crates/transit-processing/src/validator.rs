use transit_core::{
    split_file_name, FileHandle, ImageDimensions, RuleViolation, TransitConfig, ValidationError,
};

use crate::traits::Validator;

/// Rule-based file validator
///
/// Every configured rule is checked and all failures are reported together.
/// Empty files are always rejected.
#[derive(Debug, Clone, Default)]
pub struct FileValidator {
    min_file_size: Option<u64>,
    max_file_size: Option<u64>,
    allowed_extensions: Vec<String>,
    allowed_mime_types: Vec<String>,
    require_image: bool,
    min_width: Option<u32>,
    max_width: Option<u32>,
    min_height: Option<u32>,
    max_height: Option<u32>,
}

impl FileValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validator carrying the size, extension and mime limits from configuration
    pub fn from_config(config: &TransitConfig) -> Self {
        Self::new()
            .with_max_size(config.max_file_size_bytes)
            .with_extensions(config.allowed_extensions.clone())
            .with_mime_types(config.allowed_mime_types.clone())
    }

    pub fn with_min_size(mut self, bytes: u64) -> Self {
        self.min_file_size = Some(bytes);
        self
    }

    pub fn with_max_size(mut self, bytes: u64) -> Self {
        self.max_file_size = Some(bytes);
        self
    }

    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_extensions = extensions
            .into_iter()
            .map(|e| e.into().trim_start_matches('.').to_lowercase())
            .collect();
        self
    }

    /// Allowed mime types; `image/*` matches any image subtype
    pub fn with_mime_types<I, S>(mut self, mime_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_mime_types = mime_types
            .into_iter()
            .map(|m| m.into().to_lowercase())
            .collect();
        self
    }

    pub fn require_image(mut self) -> Self {
        self.require_image = true;
        self
    }

    pub fn with_width_range(mut self, min: Option<u32>, max: Option<u32>) -> Self {
        self.min_width = min;
        self.max_width = max;
        self
    }

    pub fn with_height_range(mut self, min: Option<u32>, max: Option<u32>) -> Self {
        self.min_height = min;
        self.max_height = max;
        self
    }

    /// Validate file size
    pub fn validate_file_size(&self, size: u64) -> Result<(), RuleViolation> {
        if size == 0 {
            return Err(RuleViolation::EmptyFile);
        }

        if let Some(min) = self.min_file_size {
            if size < min {
                return Err(RuleViolation::FileTooSmall { size, min });
            }
        }

        if let Some(max) = self.max_file_size {
            if size > max {
                return Err(RuleViolation::FileTooLarge { size, max });
            }
        }

        Ok(())
    }

    /// Validate file extension (case-insensitive)
    pub fn validate_extension(&self, extension: &str) -> Result<(), RuleViolation> {
        if self.allowed_extensions.is_empty() {
            return Ok(());
        }

        let extension = extension.to_lowercase();
        if !self.allowed_extensions.contains(&extension) {
            return Err(RuleViolation::InvalidExtension {
                extension,
                allowed: self.allowed_extensions.clone(),
            });
        }

        Ok(())
    }

    /// Validate mime type against the whitelist
    pub fn validate_mime_type(&self, mime_type: &str) -> Result<(), RuleViolation> {
        if self.allowed_mime_types.is_empty() {
            return Ok(());
        }

        let normalized = mime_type.to_lowercase();
        let matches = self.allowed_mime_types.iter().any(|allowed| {
            match allowed.strip_suffix("/*") {
                Some(prefix) => normalized
                    .split_once('/')
                    .is_some_and(|(kind, _)| kind == prefix),
                None => allowed == "*" || *allowed == normalized,
            }
        });

        if !matches {
            return Err(RuleViolation::InvalidMimeType {
                mime_type: mime_type.to_string(),
                allowed: self.allowed_mime_types.clone(),
            });
        }

        Ok(())
    }

    /// Validate image dimensions; `None` means the file could not be decoded
    pub fn validate_dimensions(&self, dimensions: Option<&ImageDimensions>) -> Vec<RuleViolation> {
        if !self.checks_image() {
            return Vec::new();
        }

        let Some(dims) = dimensions else {
            return vec![RuleViolation::NotAnImage];
        };

        let mut violations = Vec::new();
        if let Some(min) = self.min_width.filter(|min| dims.width < *min) {
            violations.push(RuleViolation::WidthTooSmall {
                actual: dims.width,
                min,
            });
        }
        if let Some(max) = self.max_width.filter(|max| dims.width > *max) {
            violations.push(RuleViolation::WidthTooLarge {
                actual: dims.width,
                max,
            });
        }
        if let Some(min) = self.min_height.filter(|min| dims.height < *min) {
            violations.push(RuleViolation::HeightTooSmall {
                actual: dims.height,
                min,
            });
        }
        if let Some(max) = self.max_height.filter(|max| dims.height > *max) {
            violations.push(RuleViolation::HeightTooLarge {
                actual: dims.height,
                max,
            });
        }
        violations
    }

    fn checks_image(&self) -> bool {
        self.require_image
            || self.min_width.is_some()
            || self.max_width.is_some()
            || self.min_height.is_some()
            || self.max_height.is_some()
    }

    fn check(&self, file: &FileHandle, extension: &str) -> Result<(), ValidationError> {
        let size = file
            .size()
            .map_err(|e| ValidationError::Unreadable(e.to_string()))?;

        let mut violations = Vec::new();
        if let Err(v) = self.validate_file_size(size) {
            violations.push(v);
        }
        if let Err(v) = self.validate_extension(extension) {
            violations.push(v);
        }
        if let Err(v) = self.validate_mime_type(&file.mime_type()) {
            violations.push(v);
        }
        violations.extend(self.validate_dimensions(file.dimensions().as_ref()));

        if violations.is_empty() {
            Ok(())
        } else {
            tracing::debug!(
                path = %file.path().display(),
                violations = violations.len(),
                "File failed validation"
            );
            Err(ValidationError::Rules(violations))
        }
    }
}

impl Validator for FileValidator {
    fn validate(&self, file: &FileHandle) -> Result<(), ValidationError> {
        self.check(file, &file.ext())
    }

    fn validate_upload(&self, file: &FileHandle, client_name: &str) -> Result<(), ValidationError> {
        let (_, extension) = split_file_name(client_name);
        self.check(file, &extension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn write_png(path: &Path, width: u32, height: u32) {
        image::RgbaImage::from_pixel(width, height, image::Rgba([0, 0, 0, 255]))
            .save_with_format(path, image::ImageFormat::Png)
            .unwrap();
    }

    #[test]
    fn test_file_size_limits() {
        let validator = FileValidator::new().with_min_size(10).with_max_size(100);
        assert_eq!(validator.validate_file_size(0), Err(RuleViolation::EmptyFile));
        assert_eq!(
            validator.validate_file_size(5),
            Err(RuleViolation::FileTooSmall { size: 5, min: 10 })
        );
        assert!(validator.validate_file_size(50).is_ok());
        assert_eq!(
            validator.validate_file_size(101),
            Err(RuleViolation::FileTooLarge { size: 101, max: 100 })
        );
    }

    #[test]
    fn test_extension_whitelist() {
        let validator = FileValidator::new().with_extensions([".JPG", "png"]);
        assert!(validator.validate_extension("jpg").is_ok());
        assert!(validator.validate_extension("PNG").is_ok());
        assert!(matches!(
            validator.validate_extension("exe"),
            Err(RuleViolation::InvalidExtension { .. })
        ));

        // no whitelist accepts anything
        assert!(FileValidator::new().validate_extension("exe").is_ok());
    }

    #[test]
    fn test_mime_wildcards() {
        let validator = FileValidator::new().with_mime_types(["image/*", "application/pdf"]);
        assert!(validator.validate_mime_type("image/png").is_ok());
        assert!(validator.validate_mime_type("Image/JPEG").is_ok());
        assert!(validator.validate_mime_type("application/pdf").is_ok());
        assert!(validator.validate_mime_type("text/plain").is_err());
        assert!(validator.validate_mime_type("imagefoo").is_err());
    }

    #[test]
    fn test_dimension_rules() {
        let validator = FileValidator::new()
            .with_width_range(Some(10), Some(100))
            .with_height_range(None, Some(50));
        let dims = ImageDimensions {
            width: 5,
            height: 80,
            mime: "image/png".to_string(),
        };
        let violations = validator.validate_dimensions(Some(&dims));
        assert_eq!(
            violations,
            vec![
                RuleViolation::WidthTooSmall { actual: 5, min: 10 },
                RuleViolation::HeightTooLarge {
                    actual: 80,
                    max: 50
                },
            ]
        );
        assert_eq!(
            validator.validate_dimensions(None),
            vec![RuleViolation::NotAnImage]
        );
        assert!(FileValidator::new().validate_dimensions(None).is_empty());
    }

    #[test]
    fn test_validate_collects_all_violations() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(&path, b"plain text").unwrap();
        let file = FileHandle::new(&path).unwrap();

        let validator = FileValidator::new()
            .with_max_size(4)
            .with_extensions(["jpg"])
            .require_image();

        let err = validator.validate(&file).unwrap_err();
        let violations = err.violations();
        assert_eq!(violations.len(), 3);
        assert!(matches!(violations[0], RuleViolation::FileTooLarge { .. }));
        assert!(matches!(violations[1], RuleViolation::InvalidExtension { .. }));
        assert_eq!(violations[2], RuleViolation::NotAnImage);
    }

    #[test]
    fn test_validate_image_passes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("photo.png");
        write_png(&path, 20, 20);
        let file = FileHandle::new(&path).unwrap();

        let validator = FileValidator::new()
            .with_extensions(["png"])
            .with_mime_types(["image/*"])
            .with_width_range(Some(10), Some(30));
        assert!(validator.validate(&file).is_ok());
    }

    #[test]
    fn test_upload_uses_client_name() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("phpA1b2");
        write_png(&path, 4, 4);
        let file = FileHandle::new(&path).unwrap();

        let validator = FileValidator::new().with_extensions(["png"]);
        assert!(validator.validate(&file).is_err());
        assert!(validator.validate_upload(&file, "avatar.PNG").is_ok());
        assert!(validator.validate_upload(&file, "avatar.gif").is_err());
    }

    #[test]
    fn test_from_config() {
        let config = TransitConfig {
            max_file_size_bytes: 3,
            allowed_extensions: vec!["txt".to_string()],
            ..TransitConfig::default()
        };
        let validator = FileValidator::from_config(&config);
        assert!(validator.validate_file_size(4).is_err());
        assert!(validator.validate_extension("txt").is_ok());
    }
}
