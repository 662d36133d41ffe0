use crate::artwork::Artwork;
use crate::identity::PackageIdentity;
use crate::pack::PackInfo;

/// The OS surfaces the icon pipeline consumes.
///
/// The pipeline never reaches for ambient platform state; the composition
/// root builds one `Platform` and injects it into the resolver. Every method
/// answers `None`/empty for "the platform has no such thing" — those are
/// expected outcomes, not errors.
pub trait Platform: Send + Sync {
    /// The icon the OS reports for an installed application, if any.
    fn application_icon(&self, identity: &PackageIdentity) -> Option<Artwork>;

    /// The icon of the host (launcher) application itself.
    ///
    /// This is the terminal fallback; a `None` here indicates a broken
    /// installation and surfaces to callers as an absent icon, never a panic.
    fn host_icon(&self) -> Option<Artwork>;

    /// Raw bytes of a resource inside `package`, addressed by the
    /// `(package, resource_type, name)` triple, e.g.
    /// `("org.pack.candy", "drawable", "iconback")`.
    fn resource_bytes(&self, package: &str, resource_type: &str, name: &str) -> Option<Vec<u8>>;

    /// Raw bytes of a bundled asset file inside `package`.
    fn asset_bytes(&self, package: &str, path: &str) -> Option<Vec<u8>>;

    /// The host application's own package name, under whose assets the
    /// bundled default icons live.
    fn host_package(&self) -> &str;

    /// The icon packs installed on the system and selectable by the user.
    fn installed_icon_packs(&self) -> Vec<PackInfo> {
        Vec::new()
    }
}
