//! Image pickers: one main image and a small set of sub images.
//!
//! Picked files are previewed through handles from a shared
//! [`PreviewRegistry`]. A handle is released as soon as its image reports
//! loaded, or when the image is replaced or dropped, so repeated picks never
//! accumulate live handles. Restored images use their data URL and hold none.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::persistence::{DebouncedWriter, KeyValueStore};
use crate::widget::{Observers, SubscriptionId};

pub const ACCEPT: &str = ".jpg,.jpeg,.png,image/jpeg,image/png";
const ALLOWED_MIME: [&str; 2] = ["image/jpeg", "image/png"];
const ALLOWED_EXT: [&str; 3] = [".jpg", ".jpeg", ".png"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes,
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.bytes))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageRejected {
    #[error("{name}: only jpeg and png images are accepted (got '{mime}')")]
    UnsupportedType { name: String, mime: String },

    #[error("{name}: {size} bytes exceeds the {limit} byte limit")]
    TooLarge { name: String, size: u64, limit: u64 },
}

/// Type is judged by MIME type or, failing that, by file extension.
pub fn check_image(file: &ImageFile, max_bytes: u64) -> Result<(), ImageRejected> {
    let lower_name = file.name.to_ascii_lowercase();
    let type_ok = ALLOWED_MIME.contains(&file.mime.as_str())
        || ALLOWED_EXT.iter().any(|ext| lower_name.ends_with(ext));
    if !type_ok {
        return Err(ImageRejected::UnsupportedType {
            name: file.name.clone(),
            mime: file.mime.clone(),
        });
    }
    if file.size() > max_bytes {
        return Err(ImageRejected::TooLarge {
            name: file.name.clone(),
            size: file.size(),
            limit: max_bytes,
        });
    }
    Ok(())
}

pub fn is_valid_image(file: &ImageFile, max_bytes: u64) -> bool {
    check_image(file, max_bytes).is_ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PreviewHandle(u64);

impl PreviewHandle {
    pub fn url(self) -> String {
        format!("blob:preview/{}", self.0)
    }
}

/// Temporary preview URLs handed out to image elements.
#[derive(Debug, Default)]
pub struct PreviewRegistry {
    next: AtomicU64,
    live: Mutex<HashSet<PreviewHandle>>,
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&self) -> PreviewHandle {
        let handle = PreviewHandle(self.next.fetch_add(1, Ordering::Relaxed));
        self.live_set().insert(handle);
        handle
    }

    /// Returns false if the handle was already released.
    pub fn release(&self, handle: PreviewHandle) -> bool {
        self.live_set().remove(&handle)
    }

    pub fn live_count(&self) -> usize {
        self.live_set().len()
    }

    fn live_set(&self) -> std::sync::MutexGuard<'_, HashSet<PreviewHandle>> {
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Persisted form of one picked image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSnapshot {
    pub name: String,
    pub mime: String,
    pub data_url: String,
}

impl ImageSnapshot {
    pub fn of(file: &ImageFile) -> Self {
        Self {
            name: file.name.clone(),
            mime: file.mime.clone(),
            data_url: file.data_url(),
        }
    }

    pub fn to_file(&self) -> Option<ImageFile> {
        let (header, payload) = self.data_url.strip_prefix("data:")?.split_once(',')?;
        let mime = header.strip_suffix(";base64")?;
        let bytes = STANDARD.decode(payload).ok()?;
        Some(ImageFile::new(self.name.clone(), mime, bytes))
    }
}

/// A picked image and its preview handle, `None` once the preview has loaded
/// or when the image came from saved state. Dropping it releases the handle.
#[derive(Debug)]
pub struct Preview {
    file: ImageFile,
    handle: Option<PreviewHandle>,
    registry: Arc<PreviewRegistry>,
}

impl Preview {
    fn open(file: ImageFile, registry: &Arc<PreviewRegistry>) -> Self {
        Self {
            file,
            handle: Some(registry.allocate()),
            registry: Arc::clone(registry),
        }
    }

    /// Saved images are shown straight from their data URL.
    fn saved(file: ImageFile, registry: &Arc<PreviewRegistry>) -> Self {
        Self {
            file,
            handle: None,
            registry: Arc::clone(registry),
        }
    }

    fn close(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.registry.release(handle);
        }
    }

    pub fn file(&self) -> &ImageFile {
        &self.file
    }

    pub fn handle(&self) -> Option<PreviewHandle> {
        self.handle
    }

    /// What an `<img src>` shows: the preview URL while it is live, the inline
    /// data URL otherwise.
    pub fn src(&self) -> String {
        self.handle
            .map_or_else(|| self.file.data_url(), PreviewHandle::url)
    }

    fn loaded(&mut self, handle: PreviewHandle) -> bool {
        if self.handle != Some(handle) {
            return false;
        }
        self.close();
        true
    }
}

impl Drop for Preview {
    fn drop(&mut self) {
        self.close();
    }
}

pub struct MainImageInput {
    registry: Arc<PreviewRegistry>,
    max_bytes: u64,
    current: Option<Preview>,
    observers: Observers<Option<ImageSnapshot>>,
}

impl MainImageInput {
    pub fn new(registry: Arc<PreviewRegistry>, max_bytes: u64) -> Self {
        Self {
            registry,
            max_bytes,
            current: None,
            observers: Observers::default(),
        }
    }

    pub fn current(&self) -> Option<&Preview> {
        self.current.as_ref()
    }

    pub fn shows_placeholder(&self) -> bool {
        self.current.is_none()
    }

    pub fn snapshot(&self) -> Option<ImageSnapshot> {
        self.current
            .as_ref()
            .map(|preview| ImageSnapshot::of(&preview.file))
    }

    pub fn subscribe(
        &mut self,
        listener: impl FnMut(&Option<ImageSnapshot>) + Send + 'static,
    ) -> SubscriptionId {
        self.observers.subscribe(listener)
    }


    /// Replaces the current image. A rejected file leaves it untouched.
    pub fn pick(&mut self, file: ImageFile) -> Result<(), ImageRejected> {
        check_image(&file, self.max_bytes)?;
        self.current = Some(Preview::open(file, &self.registry));
        let snapshot = self.snapshot();
        self.observers.emit(&snapshot);
        Ok(())
    }

    pub fn preview_loaded(&mut self, handle: PreviewHandle) -> bool {
        self.current
            .as_mut()
            .is_some_and(|preview| preview.loaded(handle))
    }

    /// Shows a saved image without notifying.
    pub fn restore(&mut self, snapshot: &ImageSnapshot) -> bool {
        match snapshot.to_file() {
            Some(file) => {
                self.current = Some(Preview::saved(file, &self.registry));
                true
            }
            None => {
                warn!(name = %snapshot.name, "saved main image has a malformed data URL");
                false
            }
        }
    }
}

/// One rendered slot of the sub image strip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubSlot {
    Image { index: usize, src: String, alt: String },
    Placeholder,
}

pub struct SubImageInput {
    registry: Arc<PreviewRegistry>,
    max_bytes: u64,
    max_count: usize,
    items: Vec<Preview>,
    observers: Observers<Vec<ImageSnapshot>>,
}

impl SubImageInput {
    pub fn new(registry: Arc<PreviewRegistry>, max_bytes: u64, max_count: usize) -> Self {
        Self {
            registry,
            max_bytes,
            max_count,
            items: Vec::new(),
            observers: Observers::default(),
        }
    }

    pub fn items(&self) -> &[Preview] {
        &self.items
    }

    pub fn max_count(&self) -> usize {
        self.max_count
    }

    pub fn snapshot(&self) -> Vec<ImageSnapshot> {
        self.items
            .iter()
            .map(|preview| ImageSnapshot::of(&preview.file))
            .collect()
    }

    pub fn subscribe(
        &mut self,
        listener: impl FnMut(&Vec<ImageSnapshot>) + Send + 'static,
    ) -> SubscriptionId {
        self.observers.subscribe(listener)
    }

    /// Items first, then a single placeholder while there is room.
    pub fn layout(&self) -> Vec<SubSlot> {
        let mut slots: Vec<SubSlot> = self
            .items
            .iter()
            .enumerate()
            .map(|(index, preview)| SubSlot::Image {
                index,
                src: preview.src(),
                alt: if preview.file.name.is_empty() {
                    "선택한 이미지".to_string()
                } else {
                    preview.file.name.clone()
                },
            })
            .collect();
        if self.items.len() < self.max_count {
            slots.push(SubSlot::Placeholder);
        }
        slots
    }

    /// A new pick replaces the whole set with its valid files, capped at
    /// `max_count`. An empty pick changes nothing. Returns the rejected files.
    pub fn pick(&mut self, picked: Vec<ImageFile>) -> Vec<ImageRejected> {
        if picked.is_empty() {
            return Vec::new();
        }
        let mut accepted = Vec::new();
        let mut rejected = Vec::new();
        for file in picked {
            match check_image(&file, self.max_bytes) {
                Ok(()) => accepted.push(file),
                Err(e) => {
                    debug!(error = %e, "sub image rejected");
                    rejected.push(e);
                }
            }
        }
        accepted.truncate(self.max_count);
        self.items = accepted
            .into_iter()
            .map(|file| Preview::open(file, &self.registry))
            .collect();
        let snapshot = self.snapshot();
        self.observers.emit(&snapshot);
        rejected
    }

    pub fn preview_loaded(&mut self, handle: PreviewHandle) -> bool {
        self.items
            .iter_mut()
            .any(|preview| preview.loaded(handle))
    }

    /// Shows saved images without notifying. Malformed entries are skipped.
    pub fn restore(&mut self, snapshots: &[ImageSnapshot]) -> usize {
        self.items = snapshots
            .iter()
            .filter_map(ImageSnapshot::to_file)
            .take(self.max_count)
            .map(|file| Preview::saved(file, &self.registry))
            .collect();
        self.items.len()
    }
}

fn load_json<T: serde::de::DeserializeOwned>(raw: &str, key: &str) -> Option<T> {
    match serde_json::from_str(raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(key, error = %e, "ignoring malformed saved images");
            None
        }
    }
}

fn persist<T: Serialize>(writer: &mut DebouncedWriter, value: &T) {
    match serde_json::to_string(value) {
        Ok(json) => writer.schedule(json),
        Err(e) => warn!(key = writer.key(), error = %e, "could not serialize images"),
    }
}

pub async fn mount_main_image(
    input: &mut MainImageInput,
    store: Arc<dyn KeyValueStore>,
    key: &str,
    debounce: Duration,
) -> SubscriptionId {
    let saved = store.get(key).await;
    if let Some(snapshot) = saved
        .as_deref()
        .and_then(|raw| load_json::<Option<ImageSnapshot>>(raw, key))
        .flatten()
    {
        input.restore(&snapshot);
    }
    let mut writer = DebouncedWriter::new(store, key, debounce);
    input.subscribe(move |snapshot| persist(&mut writer, snapshot))
}

pub async fn mount_sub_images(
    input: &mut SubImageInput,
    store: Arc<dyn KeyValueStore>,
    key: &str,
    debounce: Duration,
) -> SubscriptionId {
    let saved = store.get(key).await;
    if let Some(snapshots) = saved
        .as_deref()
        .and_then(|raw| load_json::<Vec<ImageSnapshot>>(raw, key))
    {
        input.restore(&snapshots);
    }
    let mut writer = DebouncedWriter::new(store, key, debounce);
    input.subscribe(move |snapshots| persist(&mut writer, snapshots))
}
