//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use romscope::RpFile;

/// Minimal iNES image: 2 PRG banks, 1 CHR bank.
pub fn make_nes() -> Vec<u8> {
    let mut rom = vec![0u8; 16 + 2 * 16384 + 8192];
    rom[0..4].copy_from_slice(b"NES\x1A");
    rom[4] = 2;
    rom[5] = 1;
    rom
}

/// Dreamcast VMS data file with one icon.
pub fn make_vms() -> Vec<u8> {
    let mut data = vec![0u8; 0x400];
    data[0x00..0x08].copy_from_slice(b"SONIC AD");
    data[0x10..0x1F].copy_from_slice(b"Sonic Adventure");
    data[0x30..0x34].copy_from_slice(b"SEGA");
    data[0x40] = 1;
    data[0x48..0x4C].copy_from_slice(&0x200u32.to_le_bytes());
    data
}

/// Dreamcast VMI matching [`make_vms`].
pub fn make_vmi() -> Vec<u8> {
    let mut data = vec![0u8; 108];
    data[0x50..0x58].copy_from_slice(b"SONICADV");
    for i in 0..4 {
        data[i] = data[0x50 + i] & b"SEGA"[i];
    }
    data[0x04..0x0D].copy_from_slice(b"Save data");
    data[0x24..0x28].copy_from_slice(b"SEGA");
    data[0x44..0x46].copy_from_slice(&1999u16.to_le_bytes());
    data[0x46..0x4B].copy_from_slice(&[12, 31, 23, 59, 0]);
    data[0x58..0x64].copy_from_slice(b"SONICADV_SYS");
    data[0x68..0x6C].copy_from_slice(&0x400u32.to_le_bytes());
    data
}

/// 4 KiB Virtual Boy ROM with its header 0x220 bytes from the end.
pub fn make_virtual_boy() -> Vec<u8> {
    let mut rom = vec![0u8; 0x1000];
    let h = rom.len() - 0x220;
    rom[h..h + 11].copy_from_slice(b"MARIO CLASH");
    rom[h + 0x19..h + 0x1B].copy_from_slice(b"01");
    rom[h + 0x1B..h + 0x1F].copy_from_slice(b"VMCE");
    rom
}

/// game.com ROM with its header at 0x40000.
pub fn make_game_com() -> Vec<u8> {
    let mut rom = vec![0u8; 0x50000];
    let h = 0x40000;
    rom[h + 0x02..h + 0x04].copy_from_slice(&0x2010u16.to_le_bytes());
    rom[h + 0x05..h + 0x0E].copy_from_slice(b"TigerDMGC");
    rom[h + 0x0E] = 17;
    rom[h + 0x11..h + 0x1A].copy_from_slice(b"LIGHTSOUT");
    rom
}

/// A huge, all-zero file that records how far anything read into it.
#[derive(Debug)]
pub struct HugeFile {
    pub name: String,
    pub size: u64,
    pos: AtomicU64,
    pub max_read_end: AtomicU64,
    pub reads: AtomicU64,
}

impl HugeFile {
    pub fn new(name: &str, size: u64) -> Self {
        Self {
            name: name.to_string(),
            size,
            pos: AtomicU64::new(0),
            max_read_end: AtomicU64::new(0),
            reads: AtomicU64::new(0),
        }
    }
}

impl RpFile for HugeFile {
    fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        let pos = self.pos.load(Ordering::SeqCst);
        let n = (self.size.saturating_sub(pos)).min(buf.len() as u64) as usize;
        buf[..n].fill(0);
        self.pos.store(pos + n as u64, Ordering::SeqCst);
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.max_read_end.fetch_max(pos + n as u64, Ordering::SeqCst);
        Ok(n)
    }

    fn seek(&self, pos: u64) -> io::Result<()> {
        self.pos.store(pos, Ordering::SeqCst);
        Ok(())
    }

    fn tell(&self) -> io::Result<u64> {
        Ok(self.pos.load(Ordering::SeqCst))
    }

    fn size(&self) -> io::Result<u64> {
        Ok(self.size)
    }

    fn filename(&self) -> Option<&str> {
        Some(&self.name)
    }
}

/// A mostly-empty file: zeros except for the given regions. Reads that
/// start at an offset in `fail_at` return an error.
#[derive(Debug)]
pub struct SparseFile {
    pub name: String,
    pub size: u64,
    regions: Vec<(u64, Vec<u8>)>,
    fail_at: Vec<u64>,
    pos: Mutex<u64>,
    /// Largest single buffer any read asked for.
    pub largest_read: AtomicU64,
    pub failures: AtomicU64,
}

impl SparseFile {
    pub fn new(name: &str, size: u64) -> Self {
        Self {
            name: name.to_string(),
            size,
            regions: Vec::new(),
            fail_at: Vec::new(),
            pos: Mutex::new(0),
            largest_read: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    /// Sparse copy of `data`: only non-zero 256-byte blocks are kept.
    pub fn from_bytes(name: &str, data: &[u8]) -> Self {
        let mut file = Self::new(name, data.len() as u64);
        for (i, block) in data.chunks(256).enumerate() {
            if block.iter().any(|&b| b != 0) {
                file = file.with_region(i as u64 * 256, block);
            }
        }
        file
    }

    pub fn with_region(mut self, offset: u64, bytes: &[u8]) -> Self {
        self.regions.push((offset, bytes.to_vec()));
        self
    }

    pub fn failing_at(mut self, offset: u64) -> Self {
        self.fail_at.push(offset);
        self
    }
}

impl RpFile for SparseFile {
    fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        let mut pos = self.pos.lock().unwrap();
        if self.fail_at.contains(&pos) {
            self.failures.fetch_add(1, Ordering::SeqCst);
            return Err(io::Error::new(io::ErrorKind::Other, "injected read failure"));
        }
        self.largest_read.fetch_max(buf.len() as u64, Ordering::SeqCst);
        let n = self.size.saturating_sub(*pos).min(buf.len() as u64) as usize;
        let (start, end) = (*pos, *pos + n as u64);
        buf[..n].fill(0);
        for (offset, bytes) in &self.regions {
            let lo = start.max(*offset);
            let hi = end.min(offset + bytes.len() as u64);
            if lo < hi {
                buf[(lo - start) as usize..(hi - start) as usize]
                    .copy_from_slice(&bytes[(lo - offset) as usize..(hi - offset) as usize]);
            }
        }
        *pos = end;
        Ok(n)
    }

    fn seek(&self, pos: u64) -> io::Result<()> {
        *self.pos.lock().unwrap() = pos;
        Ok(())
    }

    fn tell(&self) -> io::Result<u64> {
        Ok(*self.pos.lock().unwrap())
    }

    fn size(&self) -> io::Result<u64> {
        Ok(self.size)
    }

    fn filename(&self) -> Option<&str> {
        Some(&self.name)
    }
}
