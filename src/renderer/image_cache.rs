use egui::Vec2;
use futures::executor::LocalPool;
use futures::task::LocalSpawnExt;
use image::RgbaImage;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use crate::collaborators::ImageFetcher;
use crate::error::ImageLoadError;

/// Load state of one image source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageStatus {
    Pending,
    Ready,
    /// Stays failed until [`ImageCache::reload`] is called for the source.
    Failed,
}

enum Entry {
    Pending,
    Ready(Arc<RgbaImage>),
    Failed,
}

struct Slot {
    entry: Entry,
    last_used: u64,
    /// Distinguishes a reload from the stale load it replaced.
    generation: u64,
}

#[derive(Default)]
struct Shared {
    slots: HashMap<String, Slot>,
    completed: usize,
}

/// Decoded images keyed by source URL.
///
/// Loads are fire-and-forget tasks on a local pool that the owner drains with
/// [`ImageCache::poll`] once per frame. On native targets the decode itself runs on a
/// worker thread, so polling never blocks the frame on a large image. Decoded entries beyond the capacity are evicted
/// least-recently-used first; pending and failed entries are never evicted.
pub struct ImageCache {
    shared: Arc<Mutex<Shared>>,
    pool: LocalPool,
    fetcher: Rc<dyn ImageFetcher>,
    current_frame: u64,
    next_generation: u64,
    max_cache_size: usize,
}

impl std::fmt::Debug for ImageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageCache")
            .field("entries", &self.cache_size())
            .field("max_cache_size", &self.max_cache_size)
            .finish()
    }
}

impl ImageCache {
    pub fn new(fetcher: Rc<dyn ImageFetcher>, max_cache_size: usize) -> Self {
        Self {
            shared: Arc::default(),
            pool: LocalPool::new(),
            fetcher,
            current_frame: 0,
            next_generation: 0,
            max_cache_size: max_cache_size.max(1),
        }
    }

    /// Advances the LRU clock; call once per paint.
    pub fn begin_frame(&mut self) {
        self.current_frame += 1;
    }

    /// Returns the decoded image for `src`, starting a load on first sight.
    pub fn get(&mut self, src: &str) -> Option<Arc<RgbaImage>> {
        {
            let mut shared = self.shared.lock();
            if let Some(slot) = shared.slots.get_mut(src) {
                return match &slot.entry {
                    Entry::Ready(image) => {
                        slot.last_used = self.current_frame;
                        Some(Arc::clone(image))
                    }
                    Entry::Pending | Entry::Failed => None,
                };
            }
        }
        self.start_load(src);
        None
    }

    /// Pixel size of an already decoded image, without touching the LRU clock.
    pub fn natural_size(&self, src: &str) -> Option<Vec2> {
        match &self.shared.lock().slots.get(src)?.entry {
            Entry::Ready(image) => Some(Vec2::new(image.width() as f32, image.height() as f32)),
            Entry::Pending | Entry::Failed => None,
        }
    }

    pub fn status(&self, src: &str) -> Option<ImageStatus> {
        self.shared.lock().slots.get(src).map(|slot| match slot.entry {
            Entry::Pending => ImageStatus::Pending,
            Entry::Ready(_) => ImageStatus::Ready,
            Entry::Failed => ImageStatus::Failed,
        })
    }

    /// Runs pending load tasks as far as they go without blocking. Returns whether any
    /// load finished, in which case the board needs a repaint.
    pub fn poll(&mut self) -> bool {
        self.pool.run_until_stalled();
        let completed = std::mem::take(&mut self.shared.lock().completed);
        if completed > 0 {
            self.prune_cache_if_needed();
        }
        completed > 0
    }

    /// Forgets whatever is cached for `src` and loads it again.
    pub fn reload(&mut self, src: &str) {
        self.shared.lock().slots.remove(src);
        log::debug!("reloading image {src}");
        self.start_load(src);
    }

    /// Whether any load is still in flight.
    pub fn has_pending(&self) -> bool {
        self.shared
            .lock()
            .slots
            .values()
            .any(|slot| matches!(slot.entry, Entry::Pending))
    }

    pub fn clear_cache(&mut self) {
        self.shared.lock().slots.clear();
    }

    pub fn cache_size(&self) -> usize {
        self.shared.lock().slots.len()
    }

    fn start_load(&mut self, src: &str) {
        let generation = self.next_generation;
        self.next_generation += 1;
        self.shared.lock().slots.insert(
            src.to_string(),
            Slot {
                entry: Entry::Pending,
                last_used: self.current_frame,
                generation,
            },
        );

        let fetch = self.fetcher.fetch(src);
        let shared = Arc::clone(&self.shared);
        let key = src.to_string();
        let task = async move {
            let decoded = match fetch.await {
                Ok(bytes) => decode_in_background(bytes).await,
                Err(err) => Err(err),
            };
            let entry = match decoded {
                Ok(image) => {
                    log::debug!("decoded {key} ({}x{})", image.width(), image.height());
                    Entry::Ready(Arc::new(image))
                }
                Err(err) => {
                    log::warn!("image {key} failed to load: {err}");
                    Entry::Failed
                }
            };
            let mut shared = shared.lock();
            if let Some(slot) = shared.slots.get_mut(&key) {
                if slot.generation == generation {
                    slot.entry = entry;
                }
            }
            shared.completed += 1;
        };

        if let Err(err) = self.pool.spawner().spawn_local(task) {
            log::warn!("could not schedule load of {src}: {err:?}");
            if let Some(slot) = self.shared.lock().slots.get_mut(src) {
                slot.entry = Entry::Failed;
            }
        }
    }

    /// Prunes decoded entries if the cache exceeds its capacity
    fn prune_cache_if_needed(&mut self) {
        let mut shared = self.shared.lock();
        let mut ready: Vec<(String, u64)> = shared
            .slots
            .iter()
            .filter(|(_, slot)| matches!(slot.entry, Entry::Ready(_)))
            .map(|(src, slot)| (src.clone(), slot.last_used))
            .collect();
        if ready.len() <= self.max_cache_size {
            return;
        }

        // Oldest first
        ready.sort_by_key(|(_, last_used)| *last_used);
        let to_remove = ready.len() - self.max_cache_size;
        for (src, _) in ready.into_iter().take(to_remove) {
            shared.slots.remove(&src);
            log::debug!("evicted {src} from the image cache");
        }
    }
}

fn decode(bytes: &[u8]) -> Result<RgbaImage, ImageLoadError> {
    Ok(image::load_from_memory(bytes)?.to_rgba8())
}

#[cfg(not(target_arch = "wasm32"))]
async fn decode_in_background(bytes: Vec<u8>) -> Result<RgbaImage, ImageLoadError> {
    let (sender, receiver) = futures::channel::oneshot::channel();
    std::thread::Builder::new()
        .name("image-decode".into())
        .spawn(move || {
            // The receiver is gone when the cache was dropped mid-load.
            let _ = sender.send(decode(&bytes));
        })
        .map_err(|err| ImageLoadError::DecodeWorker(err.to_string()))?;
    receiver
        .await
        .map_err(|_| ImageLoadError::DecodeWorker("worker exited without a result".into()))?
}

// No threads without extra setup on the web; decode inline.
#[cfg(target_arch = "wasm32")]
async fn decode_in_background(bytes: Vec<u8>) -> Result<RgbaImage, ImageLoadError> {
    decode(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::BoxFuture;
    use image::{ImageFormat, Rgba};
    use std::cell::Cell;
    use std::io::Cursor;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let image = RgbaImage::from_pixel(width, height, Rgba([0, 128, 255, 255]));
        let mut bytes = Vec::new();
        image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png).unwrap();
        bytes
    }

    /// Serves a PNG for every source except those starting with "bad".
    #[derive(Default)]
    struct MockFetcher {
        fetches: Cell<usize>,
    }

    impl ImageFetcher for MockFetcher {
        fn fetch(&self, src: &str) -> BoxFuture<'static, Result<Vec<u8>, ImageLoadError>> {
            self.fetches.set(self.fetches.get() + 1);
            let result = if src.starts_with("bad") {
                Ok(b"not an image".to_vec())
            } else {
                Ok(png(3, 2))
            };
            Box::pin(async move { result })
        }
    }

    fn cache(capacity: usize) -> (ImageCache, Rc<MockFetcher>) {
        let fetcher = Rc::new(MockFetcher::default());
        (ImageCache::new(fetcher.clone(), capacity), fetcher)
    }

    /// Polls until no load is in flight. Returns whether any load finished.
    fn settle(cache: &mut ImageCache) -> bool {
        let mut finished = false;
        for _ in 0..500 {
            finished |= cache.poll();
            if !cache.has_pending() {
                return finished;
            }
            std::thread::sleep(std::time::Duration::from_millis(2));
        }
        panic!("image loads did not settle");
    }

    #[test]
    fn test_miss_loads_once_then_hits() {
        let (mut cache, fetcher) = cache(4);
        assert!(cache.get("a.png").is_none());
        assert!(cache.get("a.png").is_none());
        assert_eq!(cache.status("a.png"), Some(ImageStatus::Pending));
        assert!(settle(&mut cache));
        let image = cache.get("a.png").unwrap();
        assert_eq!(image.dimensions(), (3, 2));
        assert_eq!(cache.natural_size("a.png"), Some(Vec2::new(3.0, 2.0)));
        assert_eq!(fetcher.fetches.get(), 1);
        assert!(!cache.poll());
    }

    #[test]
    fn test_failure_is_not_retried_until_reload() {
        let (mut cache, fetcher) = cache(4);
        cache.get("bad.png");
        assert!(settle(&mut cache));
        assert_eq!(cache.status("bad.png"), Some(ImageStatus::Failed));
        assert!(cache.get("bad.png").is_none());
        assert_eq!(fetcher.fetches.get(), 1);

        cache.reload("bad.png");
        assert_eq!(fetcher.fetches.get(), 2);
        assert_eq!(cache.status("bad.png"), Some(ImageStatus::Pending));
    }

    #[test]
    fn test_lru_eviction() {
        let (mut cache, _) = cache(2);
        for src in ["1.png", "2.png", "3.png"] {
            cache.begin_frame();
            cache.get(src);
        }
        settle(&mut cache);

        assert_eq!(cache.cache_size(), 2);
        assert_eq!(cache.status("1.png"), None);
        assert_eq!(cache.status("2.png"), Some(ImageStatus::Ready));
        assert_eq!(cache.status("3.png"), Some(ImageStatus::Ready));
    }

    #[test]
    fn test_background_decode() {
        let image = futures::executor::block_on(decode_in_background(png(5, 4))).unwrap();
        assert_eq!(image.dimensions(), (5, 4));

        let broken = futures::executor::block_on(decode_in_background(b"nope".to_vec()));
        assert!(matches!(broken, Err(ImageLoadError::Decode(_))));
    }
}
