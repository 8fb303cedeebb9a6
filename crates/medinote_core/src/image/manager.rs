//! Image object lifecycle inside a document.
//!
//! # Responsibility
//! - Create images from uploads and place them in the block sequence.
//! - Track the single selected image and gate edits on it.
//! - Apply resize/rotate/reshape/duplicate/delete/reorder.
//!
//! # Invariants
//! - At most one image is selected.
//! - Every operation fully applies or returns an error without mutating.

use crate::content::Document;
use crate::error::{EditorError, EditorResult, NotFound, ValidationError};
use crate::image::upload::ImageUpload;
use crate::model::image::{ImageId, ImageObject, ImageShape, ResizeDelta, ResizeHandle};
use crate::settings::ImageSettings;
use log::{info, warn};

/// Selection and geometry policy for the images of one document.
#[derive(Debug, Clone)]
pub struct ImageManager {
    settings: ImageSettings,
    selected: Option<ImageId>,
}

impl ImageManager {
    pub fn new(settings: ImageSettings) -> Self {
        Self {
            settings,
            selected: None,
        }
    }

    pub fn settings(&self) -> &ImageSettings {
        &self.settings
    }

    pub fn selected(&self) -> Option<ImageId> {
        self.selected
    }

    /// Validates `upload` and inserts it after block `after_block`
    /// (or at the end when `None`).
    ///
    /// # Errors
    /// - `UnsupportedMedia::InvalidFormat` for non-image MIME types.
    /// - `UnsupportedMedia::TooLarge` above `max_upload_bytes`.
    pub fn insert(
        &mut self,
        document: &mut Document,
        upload: &ImageUpload,
        after_block: Option<usize>,
    ) -> EditorResult<ImageId> {
        if let Err(err) = upload.validate(self.settings.max_upload_bytes) {
            warn!(
                "event=image_insert module=image status=rejected size_bytes={} reason={}",
                upload.size(),
                err
            );
            return Err(err.into());
        }

        let natural = upload.intrinsic_size().unwrap_or((1, 1));
        let image = ImageObject::new(
            upload.to_data_uri(),
            natural,
            self.settings.default_width,
            self.settings.min_dimension,
        );
        let id = image.id;
        let index = after_block.map_or(document.blocks().len(), |block| block + 1);
        let position = document.insert_image(index, image);
        info!(
            "event=image_insert module=image status=ok size_bytes={} position={}",
            upload.size(),
            position
        );
        Ok(id)
    }

    /// Marks `id` as the single selected image.
    pub fn select(&mut self, document: &Document, id: ImageId) -> EditorResult<()> {
        ensure_exists(document, id)?;
        self.selected = Some(id);
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn resize(
        &mut self,
        document: &mut Document,
        id: ImageId,
        handle: ResizeHandle,
        delta: ResizeDelta,
        free: bool,
    ) -> EditorResult<()> {
        let min = self.settings.min_dimension;
        self.edit(document, id, |image| image.resize(handle, delta, free, min))
    }

    pub fn rotate(&mut self, document: &mut Document, id: ImageId) -> EditorResult<()> {
        self.edit(document, id, ImageObject::rotate)
    }

    pub fn reshape(
        &mut self,
        document: &mut Document,
        id: ImageId,
        shape: ImageShape,
    ) -> EditorResult<()> {
        let min = self.settings.min_dimension;
        self.edit(document, id, |image| image.reshape(shape, min))
    }

    pub fn set_caption(
        &mut self,
        document: &mut Document,
        id: ImageId,
        caption: &str,
    ) -> EditorResult<()> {
        let caption = caption.trim().to_string();
        self.edit(document, id, |image| image.caption = caption)
    }

    /// Copies the selected image right after itself; the copy is returned.
    pub fn duplicate(&mut self, document: &mut Document, id: ImageId) -> EditorResult<ImageId> {
        self.ensure_selected(document, id)?;
        let position = document.image_position(id).ok_or(NotFound::Image(id))?;
        let copy = document
            .image(id)
            .map(ImageObject::duplicate)
            .ok_or(NotFound::Image(id))?;
        let copy_id = copy.id;
        document.insert_image(position + 1, copy);
        Ok(copy_id)
    }

    /// Removes the selected image and clears the selection.
    pub fn delete(&mut self, document: &mut Document, id: ImageId) -> EditorResult<()> {
        self.ensure_selected(document, id)?;
        document.remove_image(id).ok_or(NotFound::Image(id))?;
        if self.selected == Some(id) {
            self.selected = None;
        }
        Ok(())
    }

    /// Moves the image container to ordinal `target` among blocks.
    ///
    /// Drag-and-drop does not require a prior selection.
    pub fn reorder(
        &mut self,
        document: &mut Document,
        id: ImageId,
        target: usize,
    ) -> EditorResult<usize> {
        let from = document.image_position(id).ok_or(NotFound::Image(id))?;
        let blocks = document.blocks_mut();
        let block = blocks.remove(from);
        let target = target.min(blocks.len());
        blocks.insert(target, block);
        document.normalize();
        document.image_position(id).ok_or_else(|| NotFound::Image(id).into())
    }

    fn ensure_selected(&self, document: &Document, id: ImageId) -> EditorResult<()> {
        ensure_exists(document, id)?;
        if self.selected != Some(id) {
            return Err(ValidationError::ImageNotSelected(id).into());
        }
        Ok(())
    }

    fn edit<F>(&mut self, document: &mut Document, id: ImageId, apply: F) -> EditorResult<()>
    where
        F: FnOnce(&mut ImageObject),
    {
        self.ensure_selected(document, id)?;
        let image = document.image_mut(id).ok_or(NotFound::Image(id))?;
        apply(image);
        Ok(())
    }
}

fn ensure_exists(document: &Document, id: ImageId) -> Result<(), EditorError> {
    if document.image(id).is_none() {
        return Err(NotFound::Image(id).into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::ImageManager;
    use crate::content::Document;
    use crate::error::{EditorError, NotFound, ValidationError};
    use crate::image::upload::ImageUpload;
    use crate::model::image::{ImageShape, ResizeDelta, ResizeHandle};
    use crate::settings::ImageSettings;

    fn png(width: u32, height: u32) -> ImageUpload {
        let mut bytes = b"\x89PNG\r\n\x1a\n\0\0\0\x0dIHDR".to_vec();
        bytes.extend_from_slice(&width.to_be_bytes());
        bytes.extend_from_slice(&height.to_be_bytes());
        ImageUpload::new("scan.png", "image/png", bytes)
    }

    #[test]
    fn edits_require_selection() {
        let mut document = Document::deserialize("text");
        let mut manager = ImageManager::new(ImageSettings::default());
        let id = manager.insert(&mut document, &png(600, 300), None).unwrap();

        let err = manager.rotate(&mut document, id).unwrap_err();
        assert_eq!(err, EditorError::Validation(ValidationError::ImageNotSelected(id)));

        manager.select(&document, id).unwrap();
        manager.rotate(&mut document, id).unwrap();
        assert_eq!(document.image(id).unwrap().rotation_degrees, 90);
    }

    #[test]
    fn selecting_another_image_moves_selection() {
        let mut document = Document::new();
        let mut manager = ImageManager::new(ImageSettings::default());
        let first = manager.insert(&mut document, &png(10, 10), None).unwrap();
        let second = manager.insert(&mut document, &png(10, 10), None).unwrap();
        manager.select(&document, first).unwrap();
        manager.select(&document, second).unwrap();
        assert_eq!(manager.selected(), Some(second));
        assert!(manager.rotate(&mut document, first).is_err());
    }

    #[test]
    fn duplicate_lands_after_source() {
        let mut document = Document::deserialize("<p>a</p><p>b</p>");
        let mut manager = ImageManager::new(ImageSettings::default());
        let id = manager.insert(&mut document, &png(400, 200), Some(0)).unwrap();
        manager.select(&document, id).unwrap();
        manager
            .reshape(&mut document, id, ImageShape::Rounded)
            .unwrap();

        let copy = manager.duplicate(&mut document, id).unwrap();
        assert_ne!(copy, id);
        assert_eq!(document.image_position(id), Some(1));
        assert_eq!(document.image_position(copy), Some(2));
        assert_eq!(document.image(copy).unwrap().shape, ImageShape::Rounded);
    }

    #[test]
    fn delete_clears_selection() {
        let mut document = Document::new();
        let mut manager = ImageManager::new(ImageSettings::default());
        let id = manager.insert(&mut document, &png(10, 10), None).unwrap();
        manager.select(&document, id).unwrap();
        manager.delete(&mut document, id).unwrap();
        assert_eq!(manager.selected(), None);
        assert!(document.is_empty());
        assert_eq!(
            manager.select(&document, id).unwrap_err(),
            EditorError::NotFound(NotFound::Image(id))
        );
    }

    #[test]
    fn reorder_moves_container_only() {
        let mut document = Document::deserialize("<p>a</p><p>b</p>");
        let mut manager = ImageManager::new(ImageSettings::default());
        let id = manager.insert(&mut document, &png(400, 200), None).unwrap();
        let before = document.image(id).cloned();

        assert_eq!(manager.reorder(&mut document, id, 0).unwrap(), 0);
        assert_eq!(document.image(id).cloned(), before);
        assert_eq!(manager.reorder(&mut document, id, 99).unwrap(), 2);
    }

    #[test]
    fn resize_respects_floor() {
        let mut document = Document::new();
        let mut manager = ImageManager::new(ImageSettings::default());
        let id = manager.insert(&mut document, &png(300, 300), None).unwrap();
        manager.select(&document, id).unwrap();
        manager
            .resize(
                &mut document,
                id,
                ResizeHandle::NorthWest,
                ResizeDelta::new(5_000, 5_000),
                false,
            )
            .unwrap();
        let image = document.image(id).unwrap();
        assert_eq!((image.width, image.height), (50, 50));
    }
}
