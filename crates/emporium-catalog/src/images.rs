//! Pending image attachments
//!
//! Files picked for a variant are kept here until uploaded, apart from the
//! variant's persisted `images`, so a preview can tell new from existing.

use std::collections::HashMap;
use uuid::Uuid;

use emporium_api::FilePart;

use crate::product::ProductKey;

#[derive(Debug, Clone, PartialEq)]
pub struct PendingImage {
    pub handle: Uuid,
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl PendingImage {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            handle: Uuid::new_v4(),
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub(crate) fn to_file_part(&self) -> FilePart {
        FilePart {
            file_name: self.file_name.clone(),
            content_type: self.content_type.clone(),
            bytes: self.bytes.clone(),
        }
    }
}

/// Pending images keyed by product and variant index
#[derive(Debug, Default)]
pub(crate) struct PendingImages {
    slots: HashMap<(ProductKey, usize), Vec<PendingImage>>,
}

impl PendingImages {
    pub fn attach(&mut self, key: ProductKey, index: usize, image: PendingImage) {
        self.slots.entry((key, index)).or_default().push(image);
    }

    pub fn get(&self, key: &ProductKey, index: usize) -> &[PendingImage] {
        self.slots
            .get(&(key.clone(), index))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn discard(&mut self, key: &ProductKey, index: usize, handle: Uuid) -> bool {
        let slot = (key.clone(), index);
        let Some(images) = self.slots.get_mut(&slot) else {
            return false;
        };
        let before = images.len();
        images.retain(|image| image.handle != handle);
        let removed = images.len() != before;
        if images.is_empty() {
            self.slots.remove(&slot);
        }
        removed
    }

    /// Drop the slot of a removed variant and move later indices down by one.
    pub fn remove_index(&mut self, key: &ProductKey, index: usize) {
        let slots = std::mem::take(&mut self.slots);
        self.slots = slots
            .into_iter()
            .filter_map(|((k, i), images)| {
                if &k != key {
                    Some(((k, i), images))
                } else if i == index {
                    None
                } else if i > index {
                    Some(((k, i - 1), images))
                } else {
                    Some(((k, i), images))
                }
            })
            .collect();
    }

    /// Re-key every slot of `from` under `to`.
    pub fn migrate(&mut self, from: &ProductKey, to: ProductKey) {
        let slots = std::mem::take(&mut self.slots);
        self.slots = slots
            .into_iter()
            .map(|((k, i), images)| {
                if &k == from {
                    ((to.clone(), i), images)
                } else {
                    ((k, i), images)
                }
            })
            .collect();
    }

    /// Move each slot of `key` to the index `target` maps it to, dropping the
    /// slots it maps to nothing. Returns the number of images dropped.
    pub fn rekey<F>(&mut self, key: &ProductKey, target: F) -> usize
    where
        F: Fn(usize) -> Option<usize>,
    {
        let mut dropped = 0;
        let slots = std::mem::take(&mut self.slots);
        for ((k, index), images) in slots {
            if &k != key {
                self.slots.insert((k, index), images);
                continue;
            }
            match target(index) {
                Some(new_index) => self.slots.entry((k, new_index)).or_default().extend(images),
                None => dropped += images.len(),
            }
        }
        dropped
    }

    pub fn clear_product(&mut self, key: &ProductKey) {
        self.slots.retain(|(k, _), _| k != key);
    }
}
