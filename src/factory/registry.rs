//! Static format tables.
//!
//! Three ordered tables drive detection: magic numbers at fixed offsets,
//! generic headers, and trailing footers. Order matters: the first parser
//! that accepts and validates a file wins.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use serde::Serialize;

use crate::file::SharedFile;
use crate::formats::{
    DreamcastSave, Dmg, Elf, Exe, GameBoyAdvance, GameCom, Gbs, Lynx, Nes, Nintendo3dsSmdh, Nsf,
    Psf, Sega8Bit, Sid, Sndh, Spc, VirtualBoy, Vgm,
};
use crate::romdata::{DetectionHeader, FormatInfo, RomData, RomDataAttrs, RomDataClass};

/// Acceptance test: `Some(subtype)` or `None`.
pub type IsRomSupportedFn = fn(&DetectionHeader) -> Option<u32>;

/// Constructor.
pub type NewRomDataFn = fn(SharedFile) -> Arc<dyn RomData>;

/// One registry entry.
pub struct RomDataFns {
    pub is_rom_supported: IsRomSupportedFn,
    pub new_rom_data: NewRomDataFn,
    pub info: &'static FormatInfo,
    pub attrs: RomDataAttrs,
    /// Header offset. For magic entries, where the magic sits.
    pub address: u32,
    /// Magic value for magic entries, header length otherwise.
    pub size: u32,
    /// Extensions that allow a targeted re-read (header table, non-zero
    /// address) or a footer read (footer table).
    pub reread_exts: &'static [&'static str],
}

impl RomDataFns {
    pub fn class_name(&self) -> &'static str {
        self.info.class_name
    }

    /// True if this entry offers every capability in `attrs`.
    pub fn matches_attrs(&self, attrs: RomDataAttrs) -> bool {
        self.attrs.contains(attrs)
    }

    pub fn allows_ext(&self, ext: Option<&str>) -> bool {
        ext.is_some_and(|ext| self.reread_exts.contains(&ext))
    }
}

impl std::fmt::Debug for RomDataFns {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RomDataFns")
            .field("class", &self.info.class_name)
            .field("attrs", &self.attrs)
            .field("address", &format_args!("{:#x}", self.address))
            .field("size", &format_args!("{:#x}", self.size))
            .finish()
    }
}

fn construct<T: RomDataClass>(file: SharedFile) -> Arc<dyn RomData> {
    Arc::new(T::new(file))
}

macro_rules! romdata_fns {
    ($ty:ty, $attrs:expr) => {
        romdata_fns!($ty, $attrs, 0, 0, &[])
    };
    ($ty:ty, $attrs:expr, $address:expr, $size:expr) => {
        romdata_fns!($ty, $attrs, $address, $size, &[])
    };
    ($ty:ty, $attrs:expr, $address:expr, $size:expr, $exts:expr) => {
        RomDataFns {
            is_rom_supported: <$ty as RomDataClass>::is_rom_supported,
            new_rom_data: construct::<$ty>,
            info: <$ty as RomDataClass>::INFO,
            attrs: $attrs,
            address: $address,
            size: $size,
            reread_exts: $exts,
        }
    };
}

const NONE: RomDataAttrs = RomDataAttrs::NONE;
const THUMB: RomDataAttrs = RomDataAttrs::HAS_THUMBNAIL;
const META: RomDataAttrs = RomDataAttrs::HAS_METADATA;
const THUMB_META: RomDataAttrs = RomDataAttrs(THUMB.0 | META.0);

/// Capabilities of `DreamcastSave`, shared with the `.vms`/`.vmi` pairing
/// step.
pub const DREAMCAST_SAVE_ATTRS: RomDataAttrs = THUMB_META;

/// Magic numbers: big-endian `u32` at `address` must equal `size`.
pub static ROMDATA_FNS_MAGIC: &[RomDataFns] = &[
    romdata_fns!(Dmg, META, 0x104, 0xCEED_6666),
    romdata_fns!(GameBoyAdvance, META, 0x04, 0x24FF_AE51),
    romdata_fns!(Lynx, META, 0, u32::from_be_bytes(*b"LYNX")),
    romdata_fns!(Nintendo3dsSmdh, THUMB_META, 0, u32::from_be_bytes(*b"SMDH")),
    romdata_fns!(Gbs, META, 0, u32::from_be_bytes(*b"GBS\x01")),
    romdata_fns!(Nsf, META, 0, u32::from_be_bytes(*b"NESM")),
    romdata_fns!(Spc, META, 0, u32::from_be_bytes(*b"SNES")),
    romdata_fns!(Vgm, META, 0, u32::from_be_bytes(*b"Vgm ")),
    romdata_fns!(Elf, NONE, 0, u32::from_be_bytes(*b"\x7FELF")),
];

/// Generic headers. Address-0 entries look at the prefix; others need a
/// targeted read, allowed only for the listed extensions.
pub static ROMDATA_FNS_HEADER: &[RomDataFns] = &[
    romdata_fns!(DreamcastSave, DREAMCAST_SAVE_ATTRS),
    romdata_fns!(Nes, NONE),
    romdata_fns!(Psf, META),
    romdata_fns!(Sndh, META),
    romdata_fns!(Sid, META),
    romdata_fns!(Exe, NONE),
    romdata_fns!(GameCom, THUMB),
    // Non-zero addresses go last.
    romdata_fns!(Sega8Bit, NONE, 0x7FE0, 0x20, &[".sms", ".gg", ".bin"]),
    romdata_fns!(GameCom, THUMB, 0x40000, 0x20, &[".tgc", ".bin"]),
];

/// Footers: the last 1024 bytes of files with a listed extension.
pub static ROMDATA_FNS_FOOTER: &[RomDataFns] = &[romdata_fns!(VirtualBoy, NONE, 0, 0, &[".vb"])];

/// Every registry entry, in detection order.
pub fn all_fns() -> impl Iterator<Item = &'static RomDataFns> {
    ROMDATA_FNS_MAGIC
        .iter()
        .chain(ROMDATA_FNS_HEADER)
        .chain(ROMDATA_FNS_FOOTER)
}

/// A supported extension and the capabilities of the formats that use it.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ExtInfo {
    pub ext: &'static str,
    pub attrs: RomDataAttrs,
}

/// A supported MIME type and the capabilities of the formats that use it.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct MimeInfo {
    pub mime_type: &'static str,
    pub attrs: RomDataAttrs,
}

/// Merge `(key, attrs)` pairs, keeping first-seen order and OR-ing the
/// attributes of duplicates. Keys compare case-insensitively.
fn merge_index(pairs: impl Iterator<Item = (&'static str, RomDataAttrs)>) -> Vec<(&'static str, RomDataAttrs)> {
    let mut out: Vec<(&'static str, RomDataAttrs)> = Vec::new();
    let mut seen: HashMap<String, usize> = HashMap::new();
    for (key, attrs) in pairs {
        match seen.get(&key.to_ascii_lowercase()) {
            Some(&idx) => out[idx].1 |= attrs,
            None => {
                seen.insert(key.to_ascii_lowercase(), out.len());
                out.push((key, attrs));
            }
        }
    }
    out
}

/// All supported extensions, built once.
pub fn supported_file_extensions() -> &'static [ExtInfo] {
    static INDEX: OnceLock<Vec<ExtInfo>> = OnceLock::new();
    INDEX.get_or_init(|| {
        let pairs = all_fns().flat_map(|fns| fns.info.extensions.iter().map(move |&ext| (ext, fns.attrs)));
        merge_index(pairs)
            .into_iter()
            .map(|(ext, attrs)| ExtInfo { ext, attrs })
            .collect()
    })
}

/// All supported MIME types, built once.
pub fn supported_mime_types() -> &'static [MimeInfo] {
    static INDEX: OnceLock<Vec<MimeInfo>> = OnceLock::new();
    INDEX.get_or_init(|| {
        let pairs = all_fns().flat_map(|fns| fns.info.mime_types.iter().map(move |&mime| (mime, fns.attrs)));
        merge_index(pairs)
            .into_iter()
            .map(|(mime_type, attrs)| MimeInfo { mime_type, attrs })
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_index_dedupes_and_merges() {
        let exts = supported_file_extensions();
        let gb: Vec<_> = exts.iter().filter(|e| e.ext == ".gb").collect();
        assert_eq!(gb.len(), 1);

        // GameCom is listed twice; its extension appears once.
        assert_eq!(exts.iter().filter(|e| e.ext == ".tgc").count(), 1);

        // `.bin` is shared by formats with different capabilities.
        let bin = exts.iter().find(|e| e.ext == ".bin").unwrap();
        assert!(bin.attrs.contains(RomDataAttrs::HAS_THUMBNAIL));
    }

    #[test]
    fn test_extension_index_is_stable() {
        let a = supported_file_extensions().as_ptr();
        let b = supported_file_extensions().as_ptr();
        assert_eq!(a, b);
        assert_eq!(supported_file_extensions()[0].ext, ".gb");
    }

    #[test]
    fn test_mime_index() {
        let mimes = supported_mime_types();
        let smdh = mimes.iter().find(|m| m.mime_type == "application/x-nintendo-3ds-smdh").unwrap();
        assert!(smdh.attrs.contains(THUMB_META));
        let mut sorted: Vec<_> = mimes.iter().map(|m| m.mime_type).collect();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), mimes.len());
    }

    #[test]
    fn test_magic_entries_have_magic() {
        for fns in ROMDATA_FNS_MAGIC {
            assert_ne!(fns.size, 0, "{} has no magic", fns.class_name());
        }
        for fns in ROMDATA_FNS_HEADER.iter().filter(|f| f.address != 0) {
            assert!(!fns.reread_exts.is_empty(), "{} cannot be re-read", fns.class_name());
            assert!(fns.size as usize <= crate::factory::PREFIX_SIZE);
        }
    }

    #[test]
    fn test_concurrent_first_access() {
        let handles: Vec<_> = (0..8)
            .map(|_| std::thread::spawn(|| supported_file_extensions().as_ptr() as usize))
            .collect();
        let ptrs: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(ptrs.windows(2).all(|w| w[0] == w[1]));
    }
}
