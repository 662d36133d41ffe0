use crate::artwork::Artwork;
use crate::cache::IconCache;
use crate::identity::{CacheKey, IconRequest, PackageIdentity};
use crate::pack::{IconPack, PackInfo, PackLoadError, PackState};
use crate::platform::Platform;
use crate::raster;
use crate::store::{self, CustomIconError, CustomIconStore};
use image::RgbaImage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Resolves icons for package identities, walking a fixed-priority source
/// chain and caching the rasterized results.
///
/// The chain, first hit wins:
///
/// 1. the user-set custom icon,
/// 2. the bundled default icon (synthetic internal entries live here),
/// 3. the active icon pack: its appfilter mapping, else its mask
///    composition applied over the OS icon,
/// 4. the icon the OS reports for the installed application,
/// 5. the host application's own icon, so the UI never shows a broken image.
///
/// Every step is allowed to fail and falls through to the next; nothing in
/// here ever propagates an error into rendering code. Only an absent host
/// icon makes [`resolve`](Self::resolve) return `None`, and callers treat
/// that as "show a placeholder", not as fatal.
pub struct IconResolver {
    platform: Arc<dyn Platform>,
    cache: IconCache,
    custom: CustomIconStore,
    pack: Mutex<PackState>,
}

impl IconResolver {
    /// Build a resolver from its collaborators.
    ///
    /// The resolver is the composition root's to own; construct one per
    /// process (or per test) rather than sharing ambient state.
    pub fn new(platform: Arc<dyn Platform>, cache: IconCache, custom: CustomIconStore) -> Self {
        Self {
            platform,
            cache,
            custom,
            pack: Mutex::new(PackState::Unloaded),
        }
    }

    /// Resolve the icon for a request, consulting the cache first.
    ///
    /// Two requests for the same identity at the same size return the same
    /// bitmap until something invalidates it (custom icon change, pack
    /// switch, eviction under memory pressure).
    pub fn resolve(&self, request: &IconRequest) -> Option<Arc<RgbaImage>> {
        let key = CacheKey::new(request);

        if let Some(hit) = self.cache.get(&key) {
            return Some(hit);
        }

        let bitmap = Arc::new(self.source_bitmap(&request.identity, request.target_size)?);

        self.cache.put(key, Arc::clone(&bitmap));

        Some(bitmap)
    }

    /// Set the custom icon for `identity`, invalidating its cached bitmaps
    /// at every size.
    ///
    /// From here on the custom icon strictly wins over every other source
    /// until removed.
    pub fn set_custom_icon(
        &self,
        identity: &PackageIdentity,
        bytes: &[u8],
    ) -> Result<(), CustomIconError> {
        self.custom.set(identity, bytes)?;
        self.cache.invalidate_identity(identity);

        Ok(())
    }

    /// Remove the custom icon for `identity`, if one is set.
    ///
    /// Returns whether one existed. The identity's cached bitmaps are
    /// dropped so the removed icon can never reappear from cache.
    pub fn remove_custom_icon(&self, identity: &PackageIdentity) -> Result<bool, CustomIconError> {
        let removed = self.custom.remove(identity)?;

        if removed {
            self.cache.invalidate_identity(identity);
        }

        Ok(removed)
    }

    /// Load and activate an icon pack, replacing any previous one wholesale.
    ///
    /// A failed load leaves no pack active. Either way the cache is fully
    /// invalidated: a pack switch may remap any identity, so per-key
    /// invalidation would be unsound.
    pub fn set_icon_pack(&self, info: PackInfo) -> Result<(), PackLoadError> {
        // reset first; only one pack may be loaded at a time
        *self.lock_pack() = PackState::Loading;

        let loaded = IconPack::load(self.platform.as_ref(), info);

        let result = match loaded {
            Ok(pack) => {
                *self.lock_pack() = PackState::Loaded(Arc::new(pack));
                Ok(())
            }
            Err(e) => {
                log::warn!("icon pack failed to load: {e}");
                *self.lock_pack() = PackState::Unloaded;
                Err(e)
            }
        };

        self.cache.invalidate_all();

        result
    }

    /// Deactivate the current icon pack, if any.
    pub fn clear_icon_pack(&self) {
        *self.lock_pack() = PackState::Unloaded;
        self.cache.invalidate_all();
    }

    /// The currently active icon pack.
    pub fn active_icon_pack(&self) -> Option<Arc<IconPack>> {
        self.lock_pack().loaded()
    }

    /// The icon packs installed and selectable on this system.
    pub fn installed_icon_packs(&self) -> Vec<PackInfo> {
        self.platform.installed_icon_packs()
    }

    /// Preview artwork for a selectable pack: the pack application's own icon.
    pub fn pack_preview(&self, info: &PackInfo) -> Option<Artwork> {
        self.platform
            .application_icon(&PackageIdentity::package(info.package.clone()))
    }

    /// Resolve icons for many identities at one size, typically from a
    /// background worker before the UI first binds its rows.
    ///
    /// Advisory and interruptible: the cancel flag is checked between
    /// identities, and everything cached before cancellation stays valid.
    /// Returns how many identities produced an icon.
    pub fn prewarm<I>(&self, identities: I, size: u32, cancel: &AtomicBool) -> usize
    where
        I: IntoIterator<Item = PackageIdentity>,
    {
        let mut warmed = 0;

        for identity in identities {
            if cancel.load(Ordering::Relaxed) {
                break;
            }

            if self.resolve(&IconRequest::sized(identity, size)).is_some() {
                warmed += 1;
            }
        }

        warmed
    }

    /// Access the cache, mainly for introspection and tests.
    pub fn cache(&self) -> &IconCache {
        &self.cache
    }

    fn source_bitmap(&self, identity: &PackageIdentity, size: Option<u32>) -> Option<RgbaImage> {
        // rasterize per source: a source handing back bytes that turn out
        // corrupt has produced nothing, and the walk moves on to the next
        self.rasterized(self.custom.load(identity), size)
            .or_else(|| {
                self.rasterized(store::bundled_default(self.platform.as_ref(), identity), size)
            })
            .or_else(|| self.rasterized(self.pack_artwork(identity), size))
            .or_else(|| self.rasterized(self.os_artwork(identity), size))
            .or_else(|| {
                log::debug!("{identity}: no source produced usable artwork, using the host icon");
                self.rasterized(self.platform.host_icon(), size)
            })
    }

    fn rasterized(&self, artwork: Option<Artwork>, size: Option<u32>) -> Option<RgbaImage> {
        raster::rasterize(artwork?, size)
    }

    fn os_artwork(&self, identity: &PackageIdentity) -> Option<Artwork> {
        // the OS has no record of synthetic entries
        if identity.is_synthetic() {
            return None;
        }

        self.platform.application_icon(identity)
    }

    fn pack_artwork(&self, identity: &PackageIdentity) -> Option<Artwork> {
        let pack = self.active_icon_pack()?;

        if let Some(drawable) = pack.drawable_for(identity) {
            let mapped = self
                .platform
                .resource_bytes(&pack.info.package, "drawable", drawable)
                .map(Artwork::Encoded)
                .and_then(Artwork::decode);

            match mapped {
                Some(bitmap) => return Some(Artwork::Bitmap(bitmap)),
                None => log::debug!(
                    "{identity}: pack maps to `{drawable}` but no usable drawable resolves"
                ),
            }
        }

        let mask = pack.mask.as_ref()?;
        let base = self.os_artwork(identity)?.decode()?;

        match mask.compose(&base, pack.scale) {
            Some(composited) => Some(Artwork::Bitmap(composited)),
            // drawing failed: fall back to the unmodified OS icon
            None => Some(Artwork::Bitmap(base)),
        }
    }

    fn lock_pack(&self) -> std::sync::MutexGuard<'_, PackState> {
        self.pack.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
