//! The pipeline coordinator.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use transit_core::{FileHandle, TransitConfig, TransitError, TransitResult};
use transit_processing::{FileValidator, Transformer, Validator};
use transit_storage::Transporter;

use crate::import::{Importer, LocalImporter, RemoteImporter, StreamImporter};
use crate::input::Input;
use crate::upload::{check_descriptor, finalize_upload};

const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(30);

/// Drives one file through acquisition, transformation and transport.
///
/// Every step runs to completion before the next one starts. A failed
/// `transform` or `transport` rolls back what it produced before returning.
pub struct Transit {
    input: Input,
    directory: Option<PathBuf>,
    upload_root: Option<PathBuf>,
    remote_timeout: Duration,
    transformers: Vec<Box<dyn Transformer>>,
    self_transformers: Vec<Box<dyn Transformer>>,
    validator: Option<Box<dyn Validator>>,
    transporter: Option<Arc<dyn Transporter>>,
    original: Option<FileHandle>,
    transformed: Vec<FileHandle>,
}

impl Transit {
    pub fn new(input: Input) -> Self {
        Self {
            input,
            directory: None,
            upload_root: None,
            remote_timeout: DEFAULT_REMOTE_TIMEOUT,
            transformers: Vec::new(),
            self_transformers: Vec::new(),
            validator: None,
            transporter: None,
            original: None,
            transformed: Vec::new(),
        }
    }

    /// Coordinator with the target directory, upload root, remote timeout and
    /// validation rules taken from configuration.
    pub fn from_config(input: Input, config: &TransitConfig) -> TransitResult<Self> {
        let mut transit = Self::new(input);
        transit.set_directory(&config.target_dir)?;
        transit.upload_root = config.upload_root.clone();
        transit.remote_timeout = Duration::from_secs(config.remote_timeout_secs);
        transit.set_validator(FileValidator::from_config(config));
        Ok(transit)
    }

    /// Set the target directory, creating it when missing.
    pub fn set_directory(&mut self, dir: impl AsRef<Path>) -> TransitResult<&mut Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)
            .map_err(|e| TransitError::io(format!("Failed to create {}", dir.display()), e))?;
        let dir = dir
            .canonicalize()
            .map_err(|e| TransitError::io(format!("Failed to resolve {}", dir.display()), e))?;
        self.directory = Some(dir);
        Ok(self)
    }

    pub fn directory(&self) -> Option<&Path> {
        self.directory.as_deref()
    }

    /// Restrict uploads to temp files below `root`
    pub fn set_upload_root(&mut self, root: impl Into<PathBuf>) -> &mut Self {
        self.upload_root = Some(root.into());
        self
    }

    pub fn set_remote_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.remote_timeout = timeout;
        self
    }

    /// Add a transformer that derives a new file from the original
    pub fn add_transformer(&mut self, transformer: impl Transformer + 'static) -> &mut Self {
        self.transformers.push(Box::new(transformer));
        self
    }

    /// Add a transformer applied in place to the original
    pub fn add_self_transformer(&mut self, transformer: impl Transformer + 'static) -> &mut Self {
        self.self_transformers.push(Box::new(transformer));
        self
    }

    pub fn set_validator(&mut self, validator: impl Validator + 'static) -> &mut Self {
        self.validator = Some(Box::new(validator));
        self
    }

    pub fn set_transporter(&mut self, transporter: Arc<dyn Transporter>) -> &mut Self {
        self.transporter = Some(transporter);
        self
    }

    pub fn has_transporter(&self) -> bool {
        self.transporter.is_some()
    }

    pub fn original_file(&self) -> Option<&FileHandle> {
        self.original.as_ref()
    }

    pub fn transformed_files(&self) -> &[FileHandle] {
        &self.transformed
    }

    /// Original followed by every transformed file
    pub fn all_files(&self) -> Vec<FileHandle> {
        self.original
            .iter()
            .chain(self.transformed.iter())
            .cloned()
            .collect()
    }

    fn target_dir(&self) -> TransitResult<PathBuf> {
        self.directory
            .clone()
            .ok_or_else(|| TransitError::Configuration("No target directory set".to_string()))
    }

    fn wrong_input(&self, expected: &str) -> TransitError {
        TransitError::Configuration(format!(
            "Expected {} input, got {} input",
            expected,
            self.input.kind()
        ))
    }

    /// Accept a form upload. Returns `true` once the file is in place.
    #[tracing::instrument(skip(self))]
    pub async fn upload(&mut self, overwrite: bool) -> TransitResult<bool> {
        let Input::Upload(ref descriptor) = self.input else {
            return Err(self.wrong_input("upload"));
        };
        let dir = self.target_dir()?;

        let tmp = check_descriptor(descriptor, self.upload_root.as_deref())?;
        if let Some(ref validator) = self.validator {
            let staged = FileHandle::new(&tmp)?;
            validator.validate_upload(&staged, &descriptor.name)?;
        }

        let file = finalize_upload(&tmp, &dir, &descriptor.name, overwrite).await?;
        self.accept(file);
        Ok(true)
    }

    /// Copy a local file into the target directory
    #[tracing::instrument(skip(self))]
    pub async fn import_from_local(
        &mut self,
        overwrite: bool,
        delete_source: bool,
    ) -> TransitResult<FileHandle> {
        let Input::Local(ref source) = self.input else {
            return Err(self.wrong_input("local"));
        };
        let mut importer = LocalImporter::new(source.clone(), delete_source);
        self.acquire(&mut importer, overwrite).await
    }

    /// Download a file into the target directory
    #[tracing::instrument(skip(self))]
    pub async fn import_from_remote(&mut self, overwrite: bool) -> TransitResult<FileHandle> {
        let Input::Remote(ref url) = self.input else {
            return Err(self.wrong_input("remote"));
        };
        let mut importer = RemoteImporter::new(url.clone(), self.remote_timeout);
        self.acquire(&mut importer, overwrite).await
    }

    /// Write the request body into the target directory
    #[tracing::instrument(skip(self))]
    pub async fn import_from_stream(&mut self, overwrite: bool) -> TransitResult<FileHandle> {
        let dir = self.target_dir()?;
        let Input::Stream(ref mut stream) = self.input else {
            return Err(self.wrong_input("stream"));
        };
        let file = run_importer(&mut StreamImporter::new(stream), &dir, overwrite).await?;
        self.check_imported(file)
    }

    async fn acquire(
        &mut self,
        importer: &mut dyn Importer,
        overwrite: bool,
    ) -> TransitResult<FileHandle> {
        let dir = self.target_dir()?;
        let file = run_importer(importer, &dir, overwrite).await?;
        self.check_imported(file)
    }

    /// Run the validator on a freshly imported file, dropping it on failure
    fn check_imported(&mut self, file: FileHandle) -> TransitResult<FileHandle> {
        if let Some(ref validator) = self.validator {
            if let Err(e) = validator.validate(&file) {
                remove_quietly(&file);
                return Err(e.into());
            }
        }
        self.accept(file.clone());
        Ok(file)
    }

    fn accept(&mut self, file: FileHandle) {
        tracing::info!(
            path = %file.path().display(),
            input = self.input.kind(),
            "Original file acquired"
        );
        self.original = Some(file);
        self.transformed.clear();
    }

    /// Run derive transformers on the original, then self transformers on it
    /// in place. On failure every file involved is deleted.
    #[tracing::instrument(skip(self), fields(
        derive = self.transformers.len(),
        in_place = self.self_transformers.len()
    ))]
    pub async fn transform(&mut self) -> TransitResult<()> {
        let original = self.original.clone().ok_or_else(|| {
            TransitError::Configuration("No file to transform; acquire one first".to_string())
        })?;

        let mut derived = Vec::new();
        let mut working = original.clone();
        let outcome = self
            .run_transformers(&original, &mut derived, &mut working)
            .await;

        match outcome {
            Ok(()) => {
                tracing::info!(
                    path = %working.path().display(),
                    derived = derived.len(),
                    "Transformation complete"
                );
                self.original = Some(working);
                self.transformed = derived;
                Ok(())
            }
            Err(message) => {
                tracing::warn!(error = %message, "Transformation failed, rolling back");
                for file in derived.iter().rev() {
                    remove_quietly(file);
                }
                if working != original {
                    remove_quietly(&working);
                }
                remove_quietly(&original);
                self.original = None;
                self.transformed.clear();
                Err(TransitError::Transformation(message))
            }
        }
    }

    async fn run_transformers(
        &self,
        original: &FileHandle,
        derived: &mut Vec<FileHandle>,
        working: &mut FileHandle,
    ) -> Result<(), String> {
        for transformer in &self.transformers {
            let file = transformer
                .transform(original, false)
                .await
                .map_err(|e| format!("{}: {:#}", transformer.name(), e))?;
            tracing::debug!(
                transformer = transformer.name(),
                path = %file.path().display(),
                "Derived file written"
            );
            derived.push(file);
        }

        for transformer in &self.self_transformers {
            let file = transformer
                .transform(working, true)
                .await
                .map_err(|e| format!("{}: {:#}", transformer.name(), e))?;
            if file != *working {
                // wrote elsewhere; the old working copy (possibly the original) is superseded
                remove_quietly(working);
            }
            *working = file;
        }

        Ok(())
    }

    /// Transport the original and every transformed file, in that order.
    ///
    /// Returns one location per file. On failure the locations already
    /// committed are deleted again, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn transport(&mut self) -> TransitResult<Vec<String>> {
        let transporter = self
            .transporter
            .clone()
            .ok_or_else(|| TransitError::Configuration("No transporter configured".to_string()))?;
        if self.original.is_none() {
            return Err(TransitError::Configuration(
                "No files to transport".to_string(),
            ));
        }

        let files = self.all_files();
        let mut committed: Vec<String> = Vec::with_capacity(files.len());

        for file in files {
            let path = file.path().to_path_buf();
            match transporter.transport(file).await {
                Ok(location) => {
                    tracing::debug!(
                        path = %path.display(),
                        location = %location,
                        "File transported"
                    );
                    committed.push(location);
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        path = %path.display(),
                        committed = committed.len(),
                        "Transport failed, rolling back"
                    );
                    for location in committed.iter().rev() {
                        if !transporter.delete(location).await {
                            tracing::warn!(location = %location, "Rollback delete failed");
                        }
                    }
                    return Err(e.into());
                }
            }
        }

        tracing::info!(
            backend = %transporter.backend_type(),
            files = committed.len(),
            "Transport complete"
        );
        Ok(committed)
    }

    /// Delete every local file the pipeline still holds and reset its state
    pub fn cleanup(&mut self) {
        for file in self.all_files().iter().rev() {
            remove_quietly(file);
        }
        self.original = None;
        self.transformed.clear();
    }
}

async fn run_importer(
    importer: &mut dyn Importer,
    dir: &Path,
    overwrite: bool,
) -> TransitResult<FileHandle> {
    tracing::debug!(importer = importer.kind(), dir = %dir.display(), "Importing");
    importer.import(dir, overwrite).await.inspect_err(|e| {
        tracing::warn!(importer = importer.kind(), error = %e, "Import failed");
    })
}

fn remove_quietly(file: &FileHandle) {
    if let Err(e) = file.delete() {
        tracing::warn!(error = %e, path = %file.path().display(), "Cleanup delete failed");
    }
}
