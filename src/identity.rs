use std::fmt::Display;

/// The packages the launcher presents as apps without them being installed
/// on the system: the calc vault, the in-app browser, and the Stan assistant.
///
/// The OS has no record of these, so the resolver never asks it for their icons.
pub const SYNTHETIC_PACKAGES: [&str; 3] = [
    "internal.calcvault",
    "internal.browser",
    "internal.stan",
];

/// Names an installable or launchable unit: a package, optionally qualified
/// by a component within it.
///
/// Synthetic internal identities (such as `internal.calcvault`) are valid
/// values with no real OS package behind them; see [`PackageIdentity::is_synthetic`].
///
/// # Example
///
/// ```
/// use appicon::PackageIdentity;
///
/// let firefox = PackageIdentity::package("org.mozilla.firefox");
/// let settings = PackageIdentity::with_component("com.android.settings", "com.android.settings.Settings");
///
/// assert_eq!(settings.flat(), "com.android.settings/com.android.settings.Settings");
/// assert!(!firefox.is_synthetic());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageIdentity {
    /// The package name, e.g. `org.mozilla.firefox`.
    pub package: String,
    /// An optional component within the package, e.g. `org.mozilla.firefox.App`.
    pub component: Option<String>,
}

impl PackageIdentity {
    /// Create an identity naming a package without a specific component.
    pub fn package(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            component: None,
        }
    }

    /// Create an identity naming a specific component within a package.
    pub fn with_component(package: impl Into<String>, component: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            component: Some(component.into()),
        }
    }

    /// Whether this identity is one of the launcher's own synthetic entries,
    /// which no OS package database will ever resolve.
    pub fn is_synthetic(&self) -> bool {
        SYNTHETIC_PACKAGES.contains(&self.package.as_str())
            || self.package.starts_with("internal.")
    }

    /// The `package/component` form used by appfilter mappings, or just the
    /// package name when no component is known.
    pub fn flat(&self) -> String {
        match &self.component {
            Some(component) => format!("{}/{}", self.package, component),
            None => self.package.clone(),
        }
    }

    /// A filesystem-safe stem naming this identity, used for custom-icon
    /// files and bundled default assets.
    pub fn storage_stem(&self) -> String {
        self.flat().replace(['/', ':'], "--")
    }
}

impl Display for PackageIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.flat())
    }
}

/// One icon lookup: who to resolve an icon for, and at what size.
///
/// Immutable per lookup. No `target_size` means "the artwork's natural size".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconRequest {
    pub identity: PackageIdentity,
    pub target_size: Option<u32>,
}

impl IconRequest {
    /// Request an icon at its natural size.
    pub fn new(identity: PackageIdentity) -> Self {
        Self {
            identity,
            target_size: None,
        }
    }

    /// Request an icon rasterized to `size`×`size` pixels.
    pub fn sized(identity: PackageIdentity, size: u32) -> Self {
        Self {
            identity,
            target_size: Some(size),
        }
    }
}

/// Addresses one cached bitmap: an identity at one specific size.
///
/// Two requests for the same identity at different sizes are distinct
/// entries, since a bitmap scaled to one size is not reusable at another
/// without quality loss. The `Display` form is the size-qualified string,
/// e.g. `org.mozilla.firefox@48`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub identity: PackageIdentity,
    pub size: Option<u32>,
}

impl CacheKey {
    pub fn new(request: &IconRequest) -> Self {
        Self {
            identity: request.identity.clone(),
            size: request.target_size,
        }
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.size {
            Some(size) => write!(f, "{}@{}", self.identity, size),
            None => write!(f, "{}@native", self.identity),
        }
    }
}

#[cfg(test)]
mod test {
    use crate::identity::{CacheKey, IconRequest, PackageIdentity};

    #[test]
    fn test_flat_forms() {
        let plain = PackageIdentity::package("com.example.app");
        assert_eq!(plain.flat(), "com.example.app");

        let qualified =
            PackageIdentity::with_component("com.example.app", "com.example.app.Main");
        assert_eq!(qualified.flat(), "com.example.app/com.example.app.Main");
    }

    #[test]
    fn test_synthetic_recognition() {
        assert!(PackageIdentity::package("internal.calcvault").is_synthetic());
        assert!(PackageIdentity::package("internal.somethingelse").is_synthetic());
        assert!(!PackageIdentity::package("com.example.app").is_synthetic());
    }

    #[test]
    fn test_storage_stem_is_filesystem_safe() {
        let id = PackageIdentity::with_component("com.example.app", "com.example.app.Main");
        assert!(!id.storage_stem().contains('/'));
    }

    #[test]
    fn test_key_is_size_qualified() {
        let id = PackageIdentity::package("com.example.app");

        let sized = CacheKey::new(&IconRequest::sized(id.clone(), 48));
        let natural = CacheKey::new(&IconRequest::new(id));

        assert_eq!(sized.to_string(), "com.example.app@48");
        assert_eq!(natural.to_string(), "com.example.app@native");
        assert_ne!(sized, natural);
    }

    #[test]
    fn test_same_identity_different_sizes_are_distinct_keys() {
        let id = PackageIdentity::package("com.example.app");
        let a = CacheKey::new(&IconRequest::sized(id.clone(), 48));
        let b = CacheKey::new(&IconRequest::sized(id, 64));

        assert_ne!(a, b);
    }
}
