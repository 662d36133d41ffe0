use crate::artwork::Artwork;
use crate::identity::PackageIdentity;
use crate::platform::Platform;
use crate::raster;
use image::RgbaImage;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

/// Resource variants under which icon packs publish their appfilter,
/// in lookup priority order. Different launcher ecosystems settled on
/// different names, so all of them are tried before giving up.
const APPFILTER_RESOURCES: [(&str, &str); 4] = [
    ("xml", "appfilter"),
    ("xml", "appmap"),
    ("xml", "theme_resources"),
    ("raw", "appfilter"),
];

/// Asset-file fallback for packs that ship the appfilter outside resources.
const APPFILTER_ASSET: &str = "appfilter.xml";

/// Logical canvas side for mask composition.
pub const COMPOSE_CANVAS: u32 = 192;

/// An installed icon pack as presented to the user for selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackInfo {
    /// Package name of the pack itself.
    pub package: String,
    /// Human-readable name shown in pack pickers.
    pub display_name: String,
}

/// A fully loaded icon pack: its component-to-drawable mapping, the
/// optional mask composition for identities it doesn't map, and the
/// declared icon scale.
///
/// Immutable once loaded; switching packs replaces the whole thing.
pub struct IconPack {
    pub info: PackInfo,
    mapping: HashMap<String, String>,
    pub mask: Option<MaskComposition>,
    pub scale: f32,
}

impl IconPack {
    /// Load a pack from its published appfilter and mask drawables.
    ///
    /// The appfilter resource variants are tried in priority order and the
    /// first one that parses wins; a bundled `appfilter.xml` asset is the
    /// final fallback.
    pub fn load(platform: &dyn Platform, info: PackInfo) -> Result<Self, PackLoadError> {
        let filter = load_appfilter(platform, &info.package)
            .ok_or_else(|| PackLoadError::NoAppFilter(info.package.clone()))?;

        let mask = load_mask(platform, &info.package);

        Ok(Self {
            info,
            mapping: filter.mapping,
            mask,
            scale: filter.scale.unwrap_or(1.0),
        })
    }

    /// The drawable name this pack maps `identity` to, if any.
    ///
    /// Tries the exact `package/component` key when a component is known,
    /// then a package-only key, then the lexicographically smallest mapped
    /// component belonging to the package, so a component-less lookup
    /// settles on the same drawable across reloads and runs.
    pub fn drawable_for(&self, identity: &PackageIdentity) -> Option<&str> {
        if identity.component.is_some()
            && let Some(name) = self.mapping.get(&identity.flat())
        {
            return Some(name);
        }

        if let Some(name) = self.mapping.get(&identity.package) {
            return Some(name);
        }

        let prefix = format!("{}/", identity.package);
        self.mapping
            .iter()
            .filter(|(component, _)| component.starts_with(&prefix))
            .min_by_key(|(component, _)| *component)
            .map(|(_, name)| name.as_str())
    }

    /// Number of component mappings this pack supplies.
    pub fn mapping_len(&self) -> usize {
        self.mapping.len()
    }
}

/// Lifecycle of the active icon pack.
///
/// At most one pack is `Loaded` at a time; loading a new one first resets
/// to `Unloaded`, and a failed load leaves it there.
#[derive(Default)]
pub enum PackState {
    #[default]
    Unloaded,
    Loading,
    Loaded(Arc<IconPack>),
}

impl PackState {
    /// The loaded pack, if the lifecycle is currently in `Loaded`.
    pub fn loaded(&self) -> Option<Arc<IconPack>> {
        match self {
            PackState::Loaded(pack) => Some(Arc::clone(pack)),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PackLoadError {
    #[error("`{0}` publishes no readable appfilter under any known resource name")]
    NoAppFilter(String),
}

#[derive(Debug, thiserror::Error)]
pub enum AppFilterError {
    #[error("appfilter stream is not readable xml")]
    Xml(#[from] quick_xml::Error),
}

/// The parsed contents of an appfilter stream.
#[derive(Debug, Default)]
pub struct AppFilter {
    /// Normalized component identity to drawable resource name.
    pub mapping: HashMap<String, String>,
    /// Declared icon scale factor, if the pack specifies one.
    pub scale: Option<f32>,
}

/// Parse an appfilter element stream.
///
/// Only two element kinds matter: `item` (a `component`/`drawable`
/// attribute pair) and `scale`/`scale_all_icons` (a `factor` attribute).
/// Malformed or partial entries are skipped. A stream that breaks midway
/// keeps the entries parsed so far; it only counts as a failure when it
/// breaks before yielding anything.
pub fn parse_appfilter(bytes: &[u8]) -> Result<AppFilter, AppFilterError> {
    let mut reader = Reader::from_reader(bytes);
    let mut filter = AppFilter::default();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(element)) | Ok(Event::Empty(element)) => {
                read_element(&element, &mut filter)
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                if filter.mapping.is_empty() && filter.scale.is_none() {
                    return Err(e.into());
                }

                log::debug!(
                    "appfilter stream broke after {} entries, keeping them: {e}",
                    filter.mapping.len()
                );
                break;
            }
        }

        buf.clear();
    }

    Ok(filter)
}

fn read_element(element: &BytesStart, filter: &mut AppFilter) {
    match element.name().as_ref() {
        b"item" => {
            let component = attr(element, "component");
            let drawable = attr(element, "drawable");

            if let (Some(component), Some(drawable)) = (component, drawable) {
                filter
                    .mapping
                    .insert(normalize_component(&component).to_owned(), drawable);
            } else {
                log::debug!("skipping appfilter item missing component or drawable");
            }
        }
        b"scale" | b"scale_all_icons" => {
            let factor = attr(element, "factor").and_then(|f| f.parse::<f32>().ok());

            if let Some(factor) = factor {
                filter.scale = Some(factor);
            }
        }
        _ => {}
    }
}

fn attr(element: &BytesStart, name: &str) -> Option<String> {
    let attribute = element.try_get_attribute(name).ok().flatten()?;

    attribute
        .unescape_value()
        .ok()
        .map(|value| value.into_owned())
}

/// Strip the decorative `ComponentInfo{...}` wrapper some packs put around
/// component identities.
pub fn normalize_component(raw: &str) -> &str {
    let raw = raw.trim();

    raw.strip_prefix("ComponentInfo{")
        .and_then(|inner| inner.strip_suffix('}'))
        .unwrap_or(raw)
        .trim()
}

fn load_appfilter(platform: &dyn Platform, package: &str) -> Option<AppFilter> {
    for (resource_type, name) in APPFILTER_RESOURCES {
        let Some(bytes) = platform.resource_bytes(package, resource_type, name) else {
            continue;
        };

        match parse_appfilter(&bytes) {
            Ok(filter) => return Some(filter),
            Err(e) => log::debug!("{package}: resource {resource_type}/{name} did not parse: {e}"),
        }
    }

    let bytes = platform.asset_bytes(package, APPFILTER_ASSET)?;

    match parse_appfilter(&bytes) {
        Ok(filter) => Some(filter),
        Err(e) => {
            log::debug!("{package}: asset {APPFILTER_ASSET} did not parse: {e}");
            None
        }
    }
}

fn load_mask(platform: &dyn Platform, package: &str) -> Option<MaskComposition> {
    let drawable = |name: &str| {
        platform
            .resource_bytes(package, "drawable", name)
            .map(Artwork::Encoded)
            .and_then(Artwork::decode)
    };

    let composition = MaskComposition {
        background: drawable("iconback"),
        mask: drawable("iconmask"),
        upon: drawable("iconupon"),
    };

    (!composition.is_empty()).then_some(composition)
}

/// Background/mask/foreground artwork used to stylize icons the pack does
/// not explicitly map.
#[derive(Debug, Clone, Default)]
pub struct MaskComposition {
    /// Drawn first, under the icon.
    pub background: Option<RgbaImage>,
    /// Alpha shape the composited icon is clipped to (destination-in).
    pub mask: Option<RgbaImage>,
    /// Drawn on top of everything, unconditionally.
    pub upon: Option<RgbaImage>,
}

impl MaskComposition {
    pub fn is_empty(&self) -> bool {
        self.background.is_none() && self.mask.is_none() && self.upon.is_none()
    }

    /// Stylize `base` on a [`COMPOSE_CANVAS`]-sized canvas: background,
    /// then the icon scaled by `scale` and centered, then the mask as an
    /// alpha intersection, then the foreground.
    ///
    /// Returns `None` when nothing can be drawn (degenerate scale or
    /// empty base); callers fall back to the unmodified base icon.
    pub fn compose(&self, base: &RgbaImage, scale: f32) -> Option<RgbaImage> {
        if !scale.is_finite() || scale <= 0.0 {
            return None;
        }

        if base.width() == 0 || base.height() == 0 {
            return None;
        }

        let side = COMPOSE_CANVAS;
        let mut canvas = RgbaImage::new(side, side);

        if let Some(background) = &self.background {
            image::imageops::overlay(&mut canvas, fit(background, side).as_ref(), 0, 0);
        }

        let icon_side = (side as f32 * scale).round() as u32;
        if icon_side == 0 {
            return None;
        }

        let icon = image::imageops::resize(base, icon_side, icon_side, raster::FILTER);
        let offset = (i64::from(side) - i64::from(icon_side)) / 2;
        image::imageops::overlay(&mut canvas, &icon, offset, offset);

        if let Some(mask) = &self.mask {
            apply_mask(&mut canvas, fit(mask, side).as_ref());
        }

        if let Some(upon) = &self.upon {
            image::imageops::overlay(&mut canvas, fit(upon, side).as_ref(), 0, 0);
        }

        Some(canvas)
    }
}

fn fit(bitmap: &RgbaImage, side: u32) -> Cow<'_, RgbaImage> {
    if bitmap.dimensions() == (side, side) {
        Cow::Borrowed(bitmap)
    } else {
        Cow::Owned(image::imageops::resize(bitmap, side, side, raster::FILTER))
    }
}

// destination-in: the canvas keeps only as much alpha as the mask has
fn apply_mask(canvas: &mut RgbaImage, mask: &RgbaImage) {
    for (pixel, mask_pixel) in canvas.pixels_mut().zip(mask.pixels()) {
        let masked = u16::from(pixel.0[3]) * u16::from(mask_pixel.0[3]) / 255;

        pixel.0[3] = masked as u8;
    }
}
