//! Executable and Linkable Format binaries.
//!
//! The subtype encodes class and byte order. The program header table is
//! scanned once, in the constructor, to find the interpreter and whether
//! the binary links dynamically.

use crate::file::SharedFile;
use crate::romdata::fields::StringFlags;
use crate::romdata::{
    DetectionHeader, FileType, FormatInfo, RomData, RomDataBase, RomDataClass, RomFields, SystemNameType,
};
use crate::util::{end_u16, end_u32, end_u64, u8_at, until_nul};
use crate::{Error, Result};

use super::{read_exact_at, read_up_to};

pub const SUBTYPE_32LSB: u32 = 0;
pub const SUBTYPE_64LSB: u32 = 1;
pub const SUBTYPE_32MSB: u32 = 2;
pub const SUBTYPE_64MSB: u32 = 3;

const IDENT_SIZE: usize = 16;
const HEADER_SIZE_64: usize = 64;
const HEADER_SIZE_32: usize = 52;

const OFF_CLASS: usize = 4;
const OFF_DATA: usize = 5;
const OFF_OSABI: usize = 7;
const OFF_TYPE: usize = 16;
const OFF_MACHINE: usize = 18;
const OFF_ENTRY: usize = 24;

const ET_REL: u16 = 1;
const ET_EXEC: u16 = 2;
const ET_DYN: u16 = 3;
const ET_CORE: u16 = 4;

const PT_DYNAMIC: u32 = 2;
const PT_INTERP: u32 = 3;

const EM_SPARC: u16 = 2;
const EM_MIPS: u16 = 8;
const EM_MIPS_RS3_LE: u16 = 10;
const EM_PARISC: u16 = 15;

const INTERP_MAX: u64 = 256;

fn cpu_name(machine: u16) -> Option<&'static str> {
    Some(match machine {
        0 => "No machine",
        EM_SPARC => "SPARC",
        3 => "Intel i386",
        4 => "Motorola 68000",
        5 => "Motorola 88000",
        7 => "Intel i860",
        EM_MIPS => "MIPS",
        EM_MIPS_RS3_LE => "MIPS R3000 (little-endian)",
        EM_PARISC => "PA-RISC",
        18 => "SPARC32+",
        20 => "PowerPC",
        21 => "PowerPC 64",
        22 => "IBM S/390",
        40 => "ARM",
        42 => "Renesas SuperH",
        43 => "SPARC V9",
        50 => "Intel Itanium",
        62 => "AMD64",
        183 => "ARM64",
        243 => "RISC-V",
        258 => "LoongArch",
        0x9026 => "DEC Alpha",
        _ => return None,
    })
}

fn osabi_name(osabi: u8) -> Option<&'static str> {
    Some(match osabi {
        0 => "UNIX System V",
        1 => "HP-UX",
        2 => "NetBSD",
        3 => "Linux",
        4 => "GNU Hurd",
        6 => "Solaris",
        7 => "AIX",
        8 => "IRIX",
        9 => "FreeBSD",
        10 => "Tru64 UNIX",
        11 => "Novell Modesto",
        12 => "OpenBSD",
        13 => "OpenVMS",
        97 => "ARM EABI",
        255 => "Standalone",
        _ => return None,
    })
}

const FORMAT_NAMES: [&str; 4] = [
    "32-bit Little-Endian",
    "64-bit Little-Endian",
    "32-bit Big-Endian",
    "64-bit Big-Endian",
];

const MIPS_LEVELS: [&str; 11] = [
    "MIPS-I", "MIPS-II", "MIPS-III", "MIPS-IV", "MIPS-V", "MIPS32", "MIPS64", "MIPS32 rel2",
    "MIPS64 rel2", "MIPS32 rel6", "MIPS64 rel6",
];

const MIPS_FLAGS: [&str; 11] = [
    "No Reorder", "PIC", "CPIC", "XGOT", "64-bit Whirl", "ABI2", "ABI ON32", "", "", "FP64", "NaN 2008",
];

const SPARC_MEMORY_ORDER: [&str; 4] = [
    "Total Store Ordering",
    "Partial Store Ordering",
    "Relaxed Memory Ordering",
    "Invalid",
];

const SPARC_FLAGS: [&str; 24] = [
    "", "", "", "", "", "", "", "", "SPARC V8+", "UltraSPARC I", "HaL R1", "UltraSPARC III", "", "",
    "", "", "", "", "", "", "", "", "", "LE Data",
];

/// What the program headers say.
#[derive(Debug, Default)]
struct ProgramInfo {
    interpreter: Option<String>,
    is_dynamic: bool,
    is_pie: bool,
}

/// ELF parser.
pub struct Elf {
    base: RomDataBase,
    header: Vec<u8>,
    subtype: u32,
    program: ProgramInfo,
}

impl Elf {
    fn init(&mut self, file: &SharedFile) -> Result<()> {
        let data = read_up_to(file, 0, HEADER_SIZE_64)?;
        let info = DetectionHeader {
            address: 0,
            data: &data,
            ext: None,
            file_size: file.size()?,
        };
        self.subtype = Self::is_rom_supported(&info).ok_or(Error::BadMagic)?;
        let wanted = if self.is_64() { HEADER_SIZE_64 } else { HEADER_SIZE_32 };
        Error::check_len(wanted, data.len())?;
        self.header = data;

        if let Err(e) = self.scan_program_headers(file) {
            tracing::debug!(error = %e, "ELF program headers not scanned");
        }

        let file_type = match self.u16_at(OFF_TYPE) {
            ET_REL => FileType::RelocatableObject,
            ET_EXEC => FileType::Executable,
            ET_DYN if self.program.is_pie => FileType::Executable,
            ET_DYN => FileType::SharedLibrary,
            ET_CORE => FileType::CoreDump,
            _ => FileType::Unknown,
        };
        self.base.set_valid(file_type);
        Ok(())
    }

    fn is_64(&self) -> bool {
        matches!(self.subtype, SUBTYPE_64LSB | SUBTYPE_64MSB)
    }

    fn is_le(&self) -> bool {
        matches!(self.subtype, SUBTYPE_32LSB | SUBTYPE_64LSB)
    }

    fn u16_at(&self, off: usize) -> u16 {
        end_u16(&self.header, off, self.is_le())
    }

    fn u32_at(&self, off: usize) -> u32 {
        end_u32(&self.header, off, self.is_le())
    }

    /// Word-sized header field: 32 or 64 bits depending on class.
    fn word_at(&self, off32: usize, off64: usize) -> u64 {
        if self.is_64() {
            end_u64(&self.header, off64, self.is_le())
        } else {
            u64::from(self.u32_at(off32))
        }
    }

    fn flags(&self) -> u32 {
        self.u32_at(if self.is_64() { 48 } else { 36 })
    }

    fn scan_program_headers(&mut self, file: &SharedFile) -> Result<()> {
        let le = self.is_le();
        let phoff = self.word_at(28, 32);
        let (phnum, phsize) = if self.is_64() {
            (self.u16_at(56), 56usize)
        } else {
            (self.u16_at(44), 32usize)
        };
        if phoff == 0 || phnum == 0 {
            return Ok(());
        }
        let table = read_up_to(file, phoff, usize::from(phnum) * phsize)?;

        for ph in table.chunks_exact(phsize) {
            match end_u32(ph, 0, le) {
                PT_INTERP => {
                    self.program.is_pie = self.u16_at(OFF_TYPE) == ET_DYN;
                    let (offset, size) = if self.is_64() {
                        (end_u64(ph, 8, le), end_u64(ph, 32, le))
                    } else {
                        (u64::from(end_u32(ph, 4, le)), u64::from(end_u32(ph, 16, le)))
                    };
                    if size > 0 && size <= INTERP_MAX {
                        let buf = read_exact_at(file, offset, size as usize)?;
                        let interp = String::from_utf8_lossy(until_nul(&buf)).into_owned();
                        if !interp.is_empty() {
                            self.program.interpreter = Some(interp);
                        }
                    }
                }
                PT_DYNAMIC => self.program.is_dynamic = true,
                _ => {}
            }
        }
        Ok(())
    }

    fn add_cpu_flag_fields(&self, fields: &mut RomFields) {
        let flags = self.flags();
        match self.u16_at(OFF_MACHINE) {
            EM_SPARC => {
                fields.add_field_string(
                    "Memory Ordering",
                    SPARC_MEMORY_ORDER[(flags & 3) as usize],
                    StringFlags::NONE,
                );
                fields.add_field_bitfield("CPU Flags", &SPARC_FLAGS, 4, flags);
            }
            EM_MIPS | EM_MIPS_RS3_LE => {
                let level = (flags >> 28) as usize;
                match MIPS_LEVELS.get(level) {
                    Some(name) => fields.add_field_string("CPU Level", name, StringFlags::NONE),
                    None => fields.add_field_string("CPU Level", &format!("Unknown (0x{level:02X})"), StringFlags::NONE),
                };
                fields.add_field_bitfield("CPU Flags", &MIPS_FLAGS, 4, flags & !0xF000_0000);
            }
            EM_PARISC => {
                let version = if flags >> 16 == 0x0214 { "2.0" } else { "1.0" };
                let lp64 = if flags & 0x0008 != 0 { " (LP64)" } else { "" };
                fields.add_field_string("PA-RISC Version", &format!("{version}{lp64}"), StringFlags::NONE);
            }
            _ => {}
        }
    }
}

impl RomDataClass for Elf {
    const INFO: &'static FormatInfo = &FormatInfo {
        class_name: "ELF",
        extensions: &[
            ".elf", ".so", ".o", ".ko", ".prx", ".self", ".sprx", ".axf", ".nro", ".nso", ".debug",
        ],
        mime_types: &[
            "application/x-elf",
            "application/x-executable",
            "application/x-sharedlib",
            "application/x-object",
            "application/x-coredump",
        ],
    };

    fn is_rom_supported(info: &DetectionHeader) -> Option<u32> {
        if info.address != 0 || info.size() < IDENT_SIZE || !info.has_magic(0, b"\x7FELF") {
            return None;
        }
        match (info.data[OFF_DATA], info.data[OFF_CLASS]) {
            (1, 1) => Some(SUBTYPE_32LSB),
            (1, 2) => Some(SUBTYPE_64LSB),
            (2, 1) => Some(SUBTYPE_32MSB),
            (2, 2) => Some(SUBTYPE_64MSB),
            _ => None,
        }
    }

    fn new(file: SharedFile) -> Self {
        let mut this = Self {
            base: RomDataBase::new(file.clone()),
            header: Vec::new(),
            subtype: SUBTYPE_32LSB,
            program: ProgramInfo::default(),
        };
        if let Err(e) = this.init(&file) {
            this.base.reject(&e.to_string());
        }
        this
    }
}

impl RomData for Elf {
    fn base(&self) -> &RomDataBase {
        &self.base
    }

    fn class_name(&self) -> &'static str {
        Self::INFO.class_name
    }

    fn system_name(&self, kind: SystemNameType) -> Option<&'static str> {
        self.is_valid().then_some(match kind {
            SystemNameType::Long => "Executable and Linkable Format",
            SystemNameType::Short | SystemNameType::Abbreviation => "ELF",
        })
    }

    fn load_field_data(&self, fields: &mut RomFields) -> Result<()> {
        fields.reserve(9);

        let machine = self.u16_at(OFF_MACHINE);
        match cpu_name(machine) {
            Some(cpu) => fields.add_field_string("CPU", cpu, StringFlags::NONE),
            None => fields.add_field_string("CPU", &format!("Unknown (0x{machine:04X})"), StringFlags::NONE),
        };
        self.add_cpu_flag_fields(fields);

        let osabi = u8_at(&self.header, OFF_OSABI);
        match osabi_name(osabi) {
            Some(name) => fields.add_field_string("OS ABI", name, StringFlags::NONE),
            None => fields.add_field_string("OS ABI", &format!("Unknown ({osabi})"), StringFlags::NONE),
        };
        fields.add_field_string("Format", FORMAT_NAMES[self.subtype as usize], StringFlags::NONE);
        fields.add_field_string(
            "Linkage",
            if self.program.is_dynamic { "Dynamic" } else { "Static" },
            StringFlags::NONE,
        );
        if let Some(interp) = &self.program.interpreter {
            fields.add_field_string("Interpreter", interp, StringFlags::NONE);
        }

        if self.file_type() == FileType::Executable {
            let entry = self.word_at(OFF_ENTRY, OFF_ENTRY);
            let mut s = format!("0x{entry:08X}");
            if self.program.is_pie {
                s.push_str(" (Position-Independent)");
            }
            fields.add_field_string("Entry Point", &s, StringFlags::MONOSPACE);
        }
        Ok(())
    }
}
