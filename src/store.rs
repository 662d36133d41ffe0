use crate::artwork::Artwork;
use crate::identity::PackageIdentity;
use crate::platform::Platform;
use std::fs;
use std::path::PathBuf;

// Read order for icon files named by identity: primary raster format
// first, then the fallback encoding.
const ICON_EXTENSIONS: [&str; 2] = ["png", "jpg"];

/// Asset directory (inside the host package) holding bundled default icons.
const DEFAULT_ICON_DIR: &str = "default_icons";

#[derive(Debug, thiserror::Error)]
pub enum CustomIconError {
    #[error("the supplied image data could not be decoded or re-encoded")]
    Image(#[from] image::ImageError),
    #[error("custom icon storage failed")]
    Io(#[from] std::io::Error),
}

/// Per-identity user icon overrides, stored as one raster file per identity
/// under a dedicated directory.
///
/// Files are named deterministically by identity (`<identity>.png`), so a
/// store can be re-opened over the same directory across runs. A `jpg` with
/// the same stem is also honored on read, for icons placed there by hand.
pub struct CustomIconStore {
    dir: PathBuf,
}

impl CustomIconStore {
    /// Open a store over `dir`. The directory is created lazily on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The conventional store location under the XDG data home, for
    /// composition roots that don't need to pick their own directory.
    pub fn default_location() -> Option<PathBuf> {
        let xdg = xdg::BaseDirectories::with_prefix("appicon");

        xdg.data_home.map(|home| home.join("custom-icons"))
    }

    /// Load the custom icon for `identity`, if one is set and readable.
    pub fn load(&self, identity: &PackageIdentity) -> Option<Artwork> {
        let stem = identity.storage_stem();

        ICON_EXTENSIONS.iter().find_map(|ext| {
            let path = self.dir.join(format!("{stem}.{ext}"));

            fs::read(&path).ok().map(Artwork::Encoded)
        })
    }

    /// Whether a custom icon is currently set for `identity`.
    pub fn contains(&self, identity: &PackageIdentity) -> bool {
        let stem = identity.storage_stem();

        ICON_EXTENSIONS
            .iter()
            .any(|ext| self.dir.join(format!("{stem}.{ext}")).exists())
    }

    /// Set the custom icon for `identity` to the given encoded image.
    ///
    /// The bytes are decoded once up front so an unreadable image is
    /// rejected here instead of silently poisoning later lookups; they are
    /// then re-encoded as the primary format and written out.
    pub fn set(&self, identity: &PackageIdentity, bytes: &[u8]) -> Result<(), CustomIconError> {
        let decoded = image::load_from_memory(bytes)?;

        fs::create_dir_all(&self.dir)?;

        let path = self.dir.join(format!("{}.png", identity.storage_stem()));
        decoded.save_with_format(&path, image::ImageFormat::Png)?;

        Ok(())
    }

    /// Remove the custom icon for `identity`.
    ///
    /// Returns whether an icon existed.
    pub fn remove(&self, identity: &PackageIdentity) -> Result<bool, CustomIconError> {
        let stem = identity.storage_stem();
        let mut removed = false;

        for ext in ICON_EXTENSIONS {
            let path = self.dir.join(format!("{stem}.{ext}"));

            match fs::remove_file(&path) {
                Ok(()) => removed = true,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        Ok(removed)
    }
}

/// Look up the bundled default icon for `identity` in the host package's
/// assets, trying the primary encoding first.
///
/// This is what makes synthetic internal entries (which no OS package
/// database knows) come out with their intended artwork instead of the
/// host fallback.
pub(crate) fn bundled_default(
    platform: &dyn Platform,
    identity: &PackageIdentity,
) -> Option<Artwork> {
    let stem = identity.storage_stem();
    let host = platform.host_package();

    ICON_EXTENSIONS.iter().find_map(|ext| {
        platform
            .asset_bytes(host, &format!("{DEFAULT_ICON_DIR}/{stem}.{ext}"))
            .map(Artwork::Encoded)
    })
}

#[cfg(test)]
mod test {
    use crate::identity::PackageIdentity;
    use crate::platform::test::{FakePlatform, solid_png};
    use crate::store::{CustomIconStore, bundled_default};

    fn fresh_store(name: &str) -> CustomIconStore {
        let dir = std::env::temp_dir()
            .join("appicon-tests")
            .join(format!("{name}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);

        CustomIconStore::new(dir)
    }

    #[test]
    fn test_set_load_remove_roundtrip() {
        let store = fresh_store("roundtrip");
        let id = PackageIdentity::package("com.example.app");

        assert!(store.load(&id).is_none());
        assert!(!store.contains(&id));

        store.set(&id, &solid_png([200, 100, 50, 255], 32)).unwrap();
        assert!(store.contains(&id));

        let loaded = store.load(&id).unwrap().decode().unwrap();
        assert_eq!(loaded.get_pixel(16, 16).0, [200, 100, 50, 255]);

        assert!(store.remove(&id).unwrap());
        assert!(store.load(&id).is_none());
        assert!(!store.remove(&id).unwrap(), "second remove is a no-op");
    }

    #[test]
    fn test_set_rejects_undecodable_bytes() {
        let store = fresh_store("reject");
        let id = PackageIdentity::package("com.example.app");

        assert!(store.set(&id, b"definitely not an image").is_err());
        assert!(!store.contains(&id));
    }

    #[test]
    fn test_component_qualified_identities_get_distinct_files() {
        let store = fresh_store("components");
        let plain = PackageIdentity::package("com.example.app");
        let qualified =
            PackageIdentity::with_component("com.example.app", "com.example.app.Main");

        store.set(&plain, &solid_png([1, 1, 1, 255], 8)).unwrap();
        store.set(&qualified, &solid_png([2, 2, 2, 255], 8)).unwrap();

        let a = store.load(&plain).unwrap().decode().unwrap();
        let b = store.load(&qualified).unwrap().decode().unwrap();
        assert_ne!(a.get_pixel(0, 0), b.get_pixel(0, 0));
    }

    #[test]
    fn test_bundled_default_prefers_primary_encoding() {
        let id = PackageIdentity::package("internal.calcvault");
        let platform = FakePlatform::new().with_asset(
            "com.example.launcher",
            "default_icons/internal.calcvault.png",
            solid_png([7, 7, 7, 255], 16),
        );

        let art = bundled_default(&platform, &id).unwrap().decode().unwrap();
        assert_eq!(art.get_pixel(0, 0).0, [7, 7, 7, 255]);
    }

    #[test]
    fn test_bundled_default_falls_back_to_secondary_encoding() {
        let id = PackageIdentity::package("internal.browser");
        let platform = FakePlatform::new().with_asset(
            "com.example.launcher",
            "default_icons/internal.browser.jpg",
            solid_png([9, 9, 9, 255], 16), // any decodable bytes will do
        );

        assert!(bundled_default(&platform, &id).is_some());
    }

    #[test]
    fn test_bundled_default_missing_is_none() {
        let id = PackageIdentity::package("com.example.app");
        let platform = FakePlatform::new();

        assert!(bundled_default(&platform, &id).is_none());
    }

    #[test]
    fn test_default_location_is_stable() {
        // may be None in odd environments; when present it must be absolute
        if let Some(dir) = CustomIconStore::default_location() {
            assert!(dir.is_absolute());
            assert!(dir.ends_with("custom-icons"));
        }
    }
}
