//! Format detection and dispatch.
//!
//! [`RomDataFactory::create`] reads a prefix of the file once and walks the
//! registry tables in order: `.vms`/`.vmi` pairing, magic numbers, generic
//! headers, then footers. The first parser that accepts the bytes and then
//! constructs as valid wins. Nothing here panics or returns an error; an
//! unsupported or unreadable file yields `None`.

pub mod registry;

use std::path::Path;
use std::sync::Arc;

use crate::file::{file_ext, open_related_file, RpFileStd, SharedFile};
use crate::formats::DreamcastSave;
use crate::romdata::{DetectionHeader, RomData, RomDataAttrs};
use registry::{RomDataFns, DREAMCAST_SAVE_ATTRS, ROMDATA_FNS_FOOTER, ROMDATA_FNS_HEADER, ROMDATA_FNS_MAGIC};

pub use registry::{supported_file_extensions, supported_mime_types, ExtInfo, MimeInfo};

/// Bytes read from offset 0 before any table is consulted.
pub const PREFIX_SIZE: usize = 4096 + 256;

/// Bytes read from the end of the file for footer formats.
pub const FOOTER_SIZE: usize = 1024;

/// Files larger than this never get a footer read.
pub const FOOTER_MAX_FILE_SIZE: u64 = 1 << 30;

/// Entry point for format detection.
pub struct RomDataFactory;

impl RomDataFactory {
    /// Detect the format of `file` and construct its parser.
    ///
    /// Only formats offering every capability in `attrs` are considered.
    /// Returns `None` if no format accepts the file.
    pub fn create(file: &SharedFile, attrs: RomDataAttrs) -> Option<Arc<dyn RomData>> {
        let mut prefix = vec![0u8; PREFIX_SIZE];
        let len = match file.rewind().and_then(|()| file.read_full(&mut prefix)) {
            Ok(0) => {
                tracing::debug!("empty file");
                return None;
            }
            Ok(n) => n,
            Err(e) => {
                tracing::debug!(error = %e, "prefix read failed");
                return None;
            }
        };
        prefix.truncate(len);

        let file_size = match file.size() {
            Ok(size) => size,
            Err(e) => {
                tracing::debug!(error = %e, "could not get file size");
                return None;
            }
        };

        let ext = file
            .filename()
            .and_then(file_ext)
            .map(str::to_ascii_lowercase);
        let ext = ext.as_deref();

        if let Some(rd) = Self::check_dreamcast_pair(file, ext, file_size, attrs) {
            return Some(rd);
        }

        let prefix_info = DetectionHeader {
            address: 0,
            data: &prefix,
            ext,
            file_size,
        };

        Self::check_magic(file, &prefix_info, attrs)
            .or_else(|| Self::check_headers(file, &prefix_info, attrs))
            .or_else(|| Self::check_footers(file, &prefix_info, attrs))
    }

    /// Open `path` read-only and detect its format.
    pub fn create_from_path(path: impl AsRef<Path>, attrs: RomDataAttrs) -> std::io::Result<Option<Arc<dyn RomData>>> {
        let file = RpFileStd::open_shared(path)?;
        Ok(Self::create(&file, attrs))
    }

    /// Every supported extension with the capabilities of its formats.
    pub fn supported_file_extensions() -> &'static [ExtInfo] {
        supported_file_extensions()
    }

    /// Every supported MIME type with the capabilities of its formats.
    pub fn supported_mime_types() -> &'static [MimeInfo] {
        supported_mime_types()
    }

    /// Dreamcast saves come as a `.vms` data file plus a `.vmi` info file.
    /// Only files named `.vms` or `.vmi` get here; the size alone then says
    /// which half this is. When exactly one role fits, try to open the other
    /// half and build a combined parser.
    fn check_dreamcast_pair(
        file: &SharedFile,
        ext: Option<&str>,
        file_size: u64,
        attrs: RomDataAttrs,
    ) -> Option<Arc<dyn RomData>> {
        if !DREAMCAST_SAVE_ATTRS.contains(attrs) {
            return None;
        }
        if !matches!(ext, Some(".vms" | ".vmi")) {
            return None;
        }
        let has_vms = file_size % 512 == 0 || file_size == 160;
        let has_vmi = file_size == 108;
        if has_vms == has_vmi {
            return None;
        }

        let filename = file.filename()?;
        let other_ext = if has_vms { ".vmi" } else { ".vms" };
        let Some(other) = open_related_file(filename, other_ext) else {
            tracing::trace!(filename, other_ext, "no related Dreamcast save file");
            return None;
        };

        let (vms, vmi) = if has_vms {
            (file.clone(), other)
        } else {
            (other, file.clone())
        };
        let rd = DreamcastSave::new_pair(vms, vmi);
        if rd.is_valid() {
            tracing::debug!(filename, "detected Dreamcast VMS/VMI pair");
            return Some(Arc::new(rd));
        }
        None
    }

    fn check_magic(file: &SharedFile, info: &DetectionHeader, attrs: RomDataAttrs) -> Option<Arc<dyn RomData>> {
        ROMDATA_FNS_MAGIC
            .iter()
            .filter(|fns| fns.matches_attrs(attrs))
            .filter(|fns| info.be32_at(fns.address as usize) == Some(fns.size))
            .find_map(|fns| Self::try_candidate(fns, info, file))
    }

    fn check_headers(file: &SharedFile, prefix: &DetectionHeader, attrs: RomDataAttrs) -> Option<Arc<dyn RomData>> {
        let mut scratch = Vec::new();
        for fns in ROMDATA_FNS_HEADER.iter().filter(|fns| fns.matches_attrs(attrs)) {
            let size = fns.size as usize;
            let needs_reread = fns.address != prefix.address || size > prefix.size();
            if !needs_reread {
                if let Some(rd) = Self::try_candidate(fns, prefix, file) {
                    return Some(rd);
                }
                continue;
            }

            if !fns.allows_ext(prefix.ext) {
                tracing::trace!(class = fns.class_name(), "extension does not allow a header re-read");
                continue;
            }
            if size == 0 || size > PREFIX_SIZE {
                continue;
            }
            if u64::from(fns.address) + size as u64 > prefix.file_size {
                continue;
            }

            scratch.resize(size, 0);
            match file.seek_and_read(u64::from(fns.address), &mut scratch) {
                Ok(n) if n == size => {}
                Ok(n) => {
                    tracing::debug!(class = fns.class_name(), wanted = size, got = n, "short header read");
                    continue;
                }
                Err(e) => {
                    tracing::debug!(class = fns.class_name(), error = %e, "header read failed");
                    continue;
                }
            }

            let info = DetectionHeader {
                address: fns.address,
                data: &scratch,
                ext: prefix.ext,
                file_size: prefix.file_size,
            };
            if let Some(rd) = Self::try_candidate(fns, &info, file) {
                return Some(rd);
            }
        }
        None
    }

    fn check_footers(file: &SharedFile, prefix: &DetectionHeader, attrs: RomDataAttrs) -> Option<Arc<dyn RomData>> {
        if prefix.file_size > FOOTER_MAX_FILE_SIZE {
            return None;
        }

        let mut footer: Option<Vec<u8>> = None;
        for fns in ROMDATA_FNS_FOOTER.iter().filter(|fns| fns.matches_attrs(attrs)) {
            if !fns.allows_ext(prefix.ext) {
                continue;
            }

            if footer.is_none() {
                match Self::read_footer(file, prefix) {
                    Some(data) => footer = Some(data),
                    // No point trying the rest.
                    None => return None,
                }
            }
            let Some(data) = footer.as_deref() else {
                return None;
            };

            let info = DetectionHeader {
                address: (prefix.file_size - data.len() as u64) as u32,
                data,
                ext: prefix.ext,
                file_size: prefix.file_size,
            };
            if let Some(rd) = Self::try_candidate(fns, &info, file) {
                return Some(rd);
            }
        }
        None
    }

    fn read_footer(file: &SharedFile, prefix: &DetectionHeader) -> Option<Vec<u8>> {
        if prefix.file_size <= FOOTER_SIZE as u64 {
            // The prefix already holds the whole file.
            return Some(prefix.data.to_vec());
        }

        let mut buf = vec![0u8; FOOTER_SIZE];
        match file.seek_and_read(prefix.file_size - FOOTER_SIZE as u64, &mut buf) {
            Ok(n) if n == FOOTER_SIZE => Some(buf),
            Ok(n) => {
                tracing::debug!(wanted = FOOTER_SIZE, got = n, "short footer read");
                None
            }
            Err(e) => {
                tracing::debug!(error = %e, "footer read failed");
                None
            }
        }
    }

    fn try_candidate(fns: &RomDataFns, info: &DetectionHeader, file: &SharedFile) -> Option<Arc<dyn RomData>> {
        let subtype = (fns.is_rom_supported)(info)?;
        let rd = (fns.new_rom_data)(file.clone());
        if rd.is_valid() {
            tracing::debug!(class = fns.class_name(), subtype, address = info.address, "format detected");
            Some(rd)
        } else {
            tracing::debug!(class = fns.class_name(), subtype, "accepted but failed to construct");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::MemFile;

    #[test]
    fn test_empty_file_is_unsupported() {
        let file = MemFile::new(Vec::new()).into_shared();
        assert!(RomDataFactory::create(&file, RomDataAttrs::NONE).is_none());
    }

    #[test]
    fn test_garbage_is_unsupported() {
        let file = MemFile::new(vec![0x5Au8; 8192]).with_name("noise.bin").into_shared();
        assert!(RomDataFactory::create(&file, RomDataAttrs::NONE).is_none());
    }

    #[test]
    fn test_magic_with_short_header_rejected() {
        // SMDH magic, but nowhere near a full header.
        let mut data = b"SMDH".to_vec();
        data.resize(64, 0);
        let file = MemFile::new(data).into_shared();
        assert!(RomDataFactory::create(&file, RomDataAttrs::NONE).is_none());
    }

    #[test]
    fn test_reread_requires_allowed_extension() {
        // A valid Master System header at 0x7FF0, but the wrong extension.
        let mut data = vec![0u8; 0x8000];
        data[0x7FF0..0x7FF8].copy_from_slice(b"TMR SEGA");
        data[0x7FFF] = 0x4C;
        let wrong = MemFile::new(data.clone()).with_name("game.txt").into_shared();
        assert!(RomDataFactory::create(&wrong, RomDataAttrs::NONE).is_none());

        let right = MemFile::new(data).with_name("game.sms").into_shared();
        let rd = RomDataFactory::create(&right, RomDataAttrs::NONE).unwrap();
        assert_eq!(rd.class_name(), "Sega8Bit");
    }
}
