//! A launcher shows hundreds of icons, and almost none of them come from
//! where you'd first think.
//!
//! This crate, `appicon`, implements the icon resolution and caching
//! pipeline of a home-screen launcher: given a package identity and a
//! target size, it produces a cached, size-normalized bitmap, honoring
//! user overrides and icon-pack theming along the way.
//!
//! # Quick start
//!
//! ```
//! # struct NoOs;
//! # impl appicon::Platform for NoOs {
//! #     fn application_icon(&self, _: &appicon::PackageIdentity) -> Option<appicon::Artwork> { None }
//! #     fn host_icon(&self) -> Option<appicon::Artwork> { None }
//! #     fn resource_bytes(&self, _: &str, _: &str, _: &str) -> Option<Vec<u8>> { None }
//! #     fn asset_bytes(&self, _: &str, _: &str) -> Option<Vec<u8>> { None }
//! #     fn host_package(&self) -> &str { "com.example.launcher" }
//! # }
//! use appicon::{CustomIconStore, IconCache, IconRequest, IconResolver, PackageIdentity};
//! use std::sync::Arc;
//!
//! let resolver = IconResolver::new(
//!     Arc::new(NoOs), // your Platform implementation
//!     IconCache::for_max_memory(256 * 1024 * 1024),
//!     CustomIconStore::new(std::env::temp_dir().join("custom-icons")),
//! );
//!
//! let icon = resolver.resolve(&IconRequest::sized(
//!     PackageIdentity::package("org.mozilla.firefox"),
//!     48,
//! ));
//! # assert!(icon.is_none()); // NoOs knows nothing, and has no host icon either
//! ```
//!
//! # High level design
//!
//! Resolution is a fixed-priority walk over icon sources, and each stage
//! is usable on its own for callers that need less than the full pipeline:
//!
//! 1.  *Deciding who supplies the artwork*:
//!
//!     An identity may have a user-set custom icon ([`CustomIconStore`]),
//!     a bundled default (how the launcher's synthetic internal entries
//!     get artwork), a themed icon from the active [`IconPack`], the icon
//!     the OS reports for the installed app, or — when everything else
//!     comes up empty — the host application's own icon, so the UI never
//!     renders a broken image. The first source to produce artwork wins,
//!     and a failing source simply falls through to the next.
//!
//! 2.  *Theming*:
//!
//!     Icon packs publish an appfilter mapping component identities to
//!     their drawables, plus optional mask artwork for everything they
//!     don't map. [`IconPack::load`] parses the mapping (tolerantly: real
//!     packs ship plenty of malformed entries) and [`MaskComposition`]
//!     implements the background/mask/foreground stylization.
//!
//! 3.  *Rasterizing and caching*:
//!
//!     Whatever the source returned is rasterized to the requested square
//!     size ([`rasterize`]) and stored in a byte-budgeted LRU
//!     ([`IconCache`]) keyed by identity **and** size — a bitmap scaled to
//!     one size is not reusable at another. Custom-icon edits invalidate
//!     just that identity; pack switches drop the whole cache.
//!
//! [`IconResolver`] ties the stages together and is the main entrypoint.
//!
//! # Threading
//!
//! The resolver is `Send + Sync`: the cache sits behind one internal lock
//! and the active pack is replaced, never mutated. On-demand lookups from
//! UI code run synchronously; bulk work belongs on a background worker via
//! [`IconResolver::prewarm`], which is cancellable at any point.

mod artwork;
mod cache;
mod identity;
mod pack;
mod platform;
mod raster;
mod resolver;
mod store;

pub use artwork::*;
pub use cache::*;
pub use identity::*;
pub use pack::*;
pub use platform::*;
pub use raster::*;
pub use resolver::*;
pub use store::*;
