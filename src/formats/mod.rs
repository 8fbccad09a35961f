//! Format parsers.
//!
//! Each submodule implements one format's acceptance test, constructor,
//! and field/metadata/image loaders. The registry in
//! [`factory::registry`](crate::factory::registry) decides detection order.

pub mod dmg;
pub mod dreamcast_save;
pub mod elf;
pub mod exe;
pub mod game_com;
pub mod gba;
pub mod gbs;
pub mod lynx;
pub mod n3ds_smdh;
pub mod nes;
pub(crate) mod nintendo_publishers;
pub mod nsf;
pub(crate) mod pixels;
pub mod psf;
pub mod sega8bit;
pub mod sid;
pub mod sndh;
pub mod spc;
pub mod vgm;
pub mod virtual_boy;

pub use dmg::Dmg;
pub use dreamcast_save::DreamcastSave;
pub use elf::Elf;
pub use exe::Exe;
pub use game_com::GameCom;
pub use gba::GameBoyAdvance;
pub use gbs::Gbs;
pub use lynx::Lynx;
pub use n3ds_smdh::Nintendo3dsSmdh;
pub use nes::Nes;
pub use nsf::Nsf;
pub use psf::Psf;
pub use sega8bit::Sega8Bit;
pub use sid::Sid;
pub use sndh::Sndh;
pub use spc::Spc;
pub use vgm::Vgm;
pub use virtual_boy::VirtualBoy;

use crate::file::{file_ext, SharedFile};
use crate::{Error, Result};

/// Read exactly `len` bytes at `offset`.
pub(crate) fn read_exact_at(file: &SharedFile, offset: u64, len: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    let n = file.seek_and_read(offset, &mut buf)?;
    Error::check_len(len, n)?;
    Ok(buf)
}

/// Read up to `len` bytes at `offset`.
pub(crate) fn read_up_to(file: &SharedFile, offset: u64, len: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    let n = file.seek_and_read(offset, &mut buf)?;
    buf.truncate(n);
    Ok(buf)
}

/// Lowercase extension of the file, for constructors that re-run their
/// acceptance test.
pub(crate) fn lowercase_ext(file: &SharedFile) -> Option<String> {
    file.filename()
        .and_then(file_ext)
        .map(str::to_ascii_lowercase)
}

/// Format a duration in milliseconds as `m:ss`.
pub(crate) fn format_duration_ms(ms: u64) -> String {
    let secs = ms / 1000;
    format!("{}:{:02}", secs / 60, secs % 60)
}
