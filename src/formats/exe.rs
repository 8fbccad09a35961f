//! DOS and Windows executables: plain MZ, New Executable, Portable
//! Executable, and Linear Executable.
//!
//! Everything starts with an MZ header. Its `e_lfanew` field points to
//! the extended header whose signature picks the subtype.

use crate::file::SharedFile;
use crate::romdata::fields::{Base, DateTimeFlags, ListData, ListDataFlags, StringFlags};
use crate::romdata::{
    DetectionHeader, FileType, FormatInfo, RomData, RomDataBase, RomDataClass, RomFields, SystemNameType,
};
use crate::util::{bytes_at, latin1, le_u16, le_u32, le_u64, u8_at};
use crate::{Error, Result};

use super::{read_exact_at, read_up_to};

pub const SUBTYPE_MZ: u32 = 0;
pub const SUBTYPE_NE: u32 = 1;
pub const SUBTYPE_PE: u32 = 2;
pub const SUBTYPE_LE: u32 = 3;

const MZ_HEADER_SIZE: usize = 0x40;
const OFF_LFANEW: usize = 0x3C;
const OFF_RELOC_TABLE: usize = 0x18;
/// Enough for the PE signature, COFF header, and a PE32+ optional header.
const NT_HEADER_READ: usize = 0x108;

const SECTION_HEADER_SIZE: usize = 40;
const MAX_SECTIONS: usize = 96;

const PE32_MAGIC: u16 = 0x010B;
const PE32PLUS_MAGIC: u16 = 0x020B;

const IMAGE_FILE_DLL: u16 = 0x2000;
const IMAGE_SUBSYSTEM_NATIVE: u16 = 1;
const CLR_DIRECTORY: usize = 14;

const NE_LIBRARY: u16 = 0x8000;
const NE_TARGET_WIN386: u8 = 4;

/// PE `Machine` values.
fn pe_cpu(machine: u16) -> Option<&'static str> {
    Some(match machine {
        0x014C => "Intel i386",
        0x0162 => "MIPS R3000",
        0x0166 => "MIPS R4000",
        0x0168 => "MIPS R10000",
        0x0184 => "DEC Alpha AXP",
        0x01A2 => "Hitachi SH3",
        0x01A6 => "Hitachi SH4",
        0x01C0 => "ARM",
        0x01C2 => "ARM Thumb",
        0x01C4 => "ARM Thumb-2",
        0x01F0 => "PowerPC",
        0x0200 => "Intel Itanium",
        0x0EBC => "EFI Byte Code",
        0x5064 => "RISC-V (64-bit)",
        0x8664 => "AMD64",
        0xAA64 => "ARM64",
        _ => return None,
    })
}

const SUBSYSTEMS: [&str; 15] = [
    "Unknown",
    "Native",
    "Windows",
    "Console",
    "",
    "OS/2 Console",
    "",
    "POSIX Console",
    "Win9x Native Driver",
    "Windows CE",
    "EFI Application",
    "EFI Boot Service Driver",
    "EFI Runtime Driver",
    "EFI ROM Image",
    "Xbox",
];

const PE_FLAGS: [&str; 16] = [
    "Relocations Stripped",
    "Executable",
    "Line Numbers Stripped",
    "Local Symbols Stripped",
    "Aggressive WS Trim",
    "Large Address Aware",
    "",
    "Bytes Reversed (Lo)",
    "32-bit Machine",
    "Debug Info Stripped",
    "Removable Run From Swap",
    "Net Run From Swap",
    "System File",
    "DLL",
    "Uniprocessor Only",
    "Bytes Reversed (Hi)",
];

const DLL_FLAGS: [&str; 16] = [
    "", "", "", "", "", "High Entropy VA", "Dynamic Base", "Force Integrity", "NX Compatible",
    "No Isolation", "No SEH", "No Bind", "AppContainer", "WDM Driver", "Control Flow Guard",
    "TS Aware",
];

const DATA_DIRECTORIES: [&str; 16] = [
    "Export", "Import", "Resource", "Exception", "Security", "Base Relocation", "Debug",
    "Architecture", "Global Pointer", "TLS", "Load Config", "Bound Import", "IAT",
    "Delay Import", "CLR Runtime", "Reserved",
];

const NE_TARGET_OSES: [&str; 6] = [
    "Unknown",
    "IBM OS/2",
    "Microsoft Windows",
    "European MS-DOS 4.x",
    "Microsoft Windows (386)",
    "Borland Operating System Services",
];

const LE_CPUS: [&str; 4] = ["Unknown", "Intel i286", "Intel i386", "Intel i486"];

/// `e_lfanew`, if the MZ header can have an extended header at all.
/// Old-style executables put the relocation table right after the
/// 28-byte header, where `e_lfanew` would be.
fn ext_header_offset(mz: &[u8]) -> Option<u32> {
    let lfanew = le_u32(mz, OFF_LFANEW);
    let has_ext = usize::from(le_u16(mz, OFF_RELOC_TABLE)) >= MZ_HEADER_SIZE && lfanew as usize >= MZ_HEADER_SIZE;
    has_ext.then_some(lfanew)
}

/// Subtype from the signature at `e_lfanew`.
fn ext_subtype(sig: &[u8]) -> u32 {
    match sig {
        [b'P', b'E', 0, 0, ..] => SUBTYPE_PE,
        [b'N', b'E', ..] => SUBTYPE_NE,
        [b'L', b'E' | b'X', ..] => SUBTYPE_LE,
        _ => SUBTYPE_MZ,
    }
}

/// Executable parser.
pub struct Exe {
    base: RomDataBase,
    mz: Vec<u8>,
    /// Extended header at `e_lfanew`. Empty for plain MZ.
    ext_header: Vec<u8>,
    subtype: u32,
}

impl Exe {
    fn init(&mut self, file: &SharedFile) -> Result<()> {
        let mz = read_exact_at(file, 0, MZ_HEADER_SIZE)?;
        let info = DetectionHeader {
            address: 0,
            data: &mz,
            ext: None,
            file_size: file.size()?,
        };
        Self::is_rom_supported(&info).ok_or(Error::BadMagic)?;

        // The extended header can sit anywhere in the file. Read a fixed
        // window there and check its signature in place.
        self.subtype = SUBTYPE_MZ;
        if let Some(lfanew) = ext_header_offset(&mz) {
            let ext_header = read_up_to(file, u64::from(lfanew), NT_HEADER_READ)?;
            self.subtype = ext_subtype(&ext_header);
            if self.subtype != SUBTYPE_MZ {
                self.ext_header = ext_header;
            }
        }
        self.mz = mz;

        let file_type = match self.subtype {
            SUBTYPE_PE if self.pe_characteristics() & IMAGE_FILE_DLL != 0 => FileType::Dll,
            SUBTYPE_PE if self.pe_subsystem() == IMAGE_SUBSYSTEM_NATIVE => FileType::DeviceDriver,
            SUBTYPE_NE if le_u16(&self.ext_header, 0x0C) & NE_LIBRARY != 0 => FileType::Dll,
            SUBTYPE_LE if u8_at(&self.ext_header, 0x0A) == NE_TARGET_WIN386 => FileType::DeviceDriver,
            _ => FileType::Executable,
        };
        self.base.set_valid(file_type);
        Ok(())
    }

    fn pe_characteristics(&self) -> u16 {
        le_u16(&self.ext_header, 22)
    }

    fn pe_magic(&self) -> u16 {
        le_u16(&self.ext_header, 24)
    }

    /// Offset of an optional-header field, which is the same for PE32 and
    /// PE32+ up to the data directories.
    fn opt(off: usize) -> usize {
        24 + off
    }

    fn pe_subsystem(&self) -> u16 {
        le_u16(&self.ext_header, Self::opt(68))
    }

    fn add_mz_fields(&self, fields: &mut RomFields) {
        let mz = &self.mz;
        let cs_ip = format!("{:04X}:{:04X}", le_u16(mz, 0x16), le_u16(mz, 0x14));
        let ss_sp = format!("{:04X}:{:04X}", le_u16(mz, 0x0E), le_u16(mz, 0x10));
        fields.add_field_string("Initial CS:IP", &cs_ip, StringFlags::MONOSPACE);
        fields.add_field_string("Initial SS:SP", &ss_sp, StringFlags::MONOSPACE);
        fields.add_field_string_numeric(
            "# of Relocations",
            u32::from(le_u16(mz, 0x06)),
            Base::Dec,
            0,
            StringFlags::NONE,
        );
        // Paragraphs are 16 bytes.
        let min_mem = u64::from(le_u16(mz, 0x0A)) * 16;
        let max_mem = u64::from(le_u16(mz, 0x0C)) * 16;
        fields.add_field_string("Minimum Memory", &humansize::format_size(min_mem, humansize::BINARY), StringFlags::NONE);
        fields.add_field_string("Maximum Memory", &humansize::format_size(max_mem, humansize::BINARY), StringFlags::NONE);
    }

    fn add_pe_fields(&self, fields: &mut RomFields) -> Result<()> {
        let h = &self.ext_header;
        let machine = le_u16(h, 4);
        match pe_cpu(machine) {
            Some(cpu) => fields.add_field_string("CPU", cpu, StringFlags::NONE),
            None => fields.add_field_string("CPU", &format!("Unknown (0x{machine:04X})"), StringFlags::NONE),
        };

        let os_ver = format!("{}.{}", le_u16(h, Self::opt(40)), le_u16(h, Self::opt(42)));
        fields.add_field_string("OS Version", &os_ver, StringFlags::NONE);

        let subsystem = self.pe_subsystem();
        let subsys_name = SUBSYSTEMS
            .get(usize::from(subsystem))
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .unwrap_or_else(|| format!("Unknown (0x{subsystem:02X})"));
        let subsys_ver = format!("{}.{}", le_u16(h, Self::opt(48)), le_u16(h, Self::opt(50)));
        fields.add_field_string("Subsystem", &format!("{subsys_name} {subsys_ver}"), StringFlags::NONE);

        fields.add_field_bitfield("PE Flags", &PE_FLAGS, 3, u32::from(self.pe_characteristics()));
        fields.add_field_bitfield("DLL Flags", &DLL_FLAGS, 3, u32::from(le_u16(h, Self::opt(70))));

        let timestamp = le_u32(h, 8);
        if timestamp != 0 {
            fields.add_field_date_time(
                "Timestamp",
                Some(i64::from(timestamp)),
                DateTimeFlags::HAS_DATE | DateTimeFlags::HAS_TIME | DateTimeFlags::IS_UTC,
            );
        } else {
            fields.add_field_string("Timestamp", "Not set", StringFlags::NONE);
        }

        let (image_base, dirs_off) = match self.pe_magic() {
            PE32PLUS_MAGIC => (le_u64(h, Self::opt(24)), Self::opt(112)),
            _ => (u64::from(le_u32(h, Self::opt(28))), Self::opt(96)),
        };
        fields.add_field_string("Image Base", &format!("0x{image_base:08X}"), StringFlags::MONOSPACE);
        let entry = le_u32(h, Self::opt(16));
        fields.add_field_string_numeric("Entry Point", entry, Base::Hex, 8, StringFlags::MONOSPACE);
        let clr_size = le_u32(h, dirs_off + CLR_DIRECTORY * 8 + 4);
        if clr_size != 0 {
            fields.add_field_string("Runtime", ".NET", StringFlags::NONE);
        }

        // NumberOfRvaAndSizes sits right before the directories.
        let dir_count = (le_u32(h, dirs_off - 4) as usize).min(DATA_DIRECTORIES.len());
        let mut present = 0u32;
        let mut dirs = Vec::with_capacity(dir_count);
        for (i, name) in DATA_DIRECTORIES.iter().take(dir_count).enumerate() {
            let rva = le_u32(h, dirs_off + i * 8);
            let size = le_u32(h, dirs_off + i * 8 + 4);
            if size != 0 {
                present |= 1 << i;
            }
            dirs.push(vec![name.to_string(), format!("0x{rva:08X}"), format!("0x{size:08X}")]);
        }
        if !dirs.is_empty() {
            fields.add_field_list_data(
                "Data Directories",
                ListData::new(Some(&["Directory", "RVA", "Size"]), dirs).with_checkboxes(present),
            );
        }

        let sections = self.load_sections()?;
        if !sections.is_empty() {
            fields.add_field_list_data(
                "Sections",
                ListData::new(Some(&["Name", "Virtual Address", "Virtual Size", "Raw Size"]), sections)
                    .with_flags(ListDataFlags::SEPARATE_ROW)
                    .with_rows_visible(8),
            );
        }
        Ok(())
    }

    /// Read the PE section table as list rows.
    fn load_sections(&self) -> Result<Vec<Vec<String>>> {
        let h = &self.ext_header;
        let count = usize::from(le_u16(h, 6)).min(MAX_SECTIONS);
        if count == 0 {
            return Ok(Vec::new());
        }
        let lfanew = u64::from(le_u32(&self.mz, OFF_LFANEW));
        let table_off = lfanew + 24 + u64::from(le_u16(h, 20));
        let file = self.base.require_file()?;
        let table = read_up_to(&file, table_off, count * SECTION_HEADER_SIZE)?;
        Ok(table
            .chunks_exact(SECTION_HEADER_SIZE)
            .map(|s| {
                vec![
                    latin1(bytes_at(s, 0, 8)),
                    format!("0x{:08X}", le_u32(s, 12)),
                    format!("0x{:08X}", le_u32(s, 8)),
                    format!("0x{:08X}", le_u32(s, 16)),
                ]
            })
            .collect())
    }

    fn add_ne_fields(&self, fields: &mut RomFields) {
        let h = &self.ext_header;
        let target = u8_at(h, 0x36);
        let os = match target {
            0x81 => NE_TARGET_OSES[1],
            0x82 => NE_TARGET_OSES[2],
            t => NE_TARGET_OSES.get(usize::from(t)).copied().unwrap_or(""),
        };
        if os.is_empty() {
            fields.add_field_string("Target OS", &format!("Unknown (0x{target:02X})"), StringFlags::NONE);
        } else {
            fields.add_field_string("Target OS", os, StringFlags::NONE);
        }
        fields.add_field_string(
            "Linker Version",
            &format!("{}.{}", u8_at(h, 2), u8_at(h, 3)),
            StringFlags::NONE,
        );
        if target == 2 || target == NE_TARGET_WIN386 {
            fields.add_field_string(
                "Windows Version",
                &format!("{}.{}", u8_at(h, 0x3F), u8_at(h, 0x3E)),
                StringFlags::NONE,
            );
        }
    }

    fn add_le_fields(&self, fields: &mut RomFields) {
        let h = &self.ext_header;
        let cpu = le_u16(h, 0x08);
        match LE_CPUS.get(usize::from(cpu)) {
            Some(name) => fields.add_field_string("CPU", name, StringFlags::NONE),
            None => fields.add_field_string("CPU", &format!("Unknown (0x{cpu:04X})"), StringFlags::NONE),
        };
        let target = le_u16(h, 0x0A);
        match NE_TARGET_OSES.get(usize::from(target)) {
            Some(os) => fields.add_field_string("Target OS", os, StringFlags::NONE),
            None => fields.add_field_string("Target OS", &format!("Unknown (0x{target:04X})"), StringFlags::NONE),
        };
    }
}

impl RomDataClass for Exe {
    const INFO: &'static FormatInfo = &FormatInfo {
        class_name: "EXE",
        extensions: &[
            ".exe", ".dll", ".com", ".drv", ".sys", ".tlb", ".ocx", ".cpl", ".scr", ".vxd", ".386",
            ".efi", ".mui",
        ],
        mime_types: &[
            "application/x-dosexec",
            "application/x-ms-dos-executable",
            "application/vnd.microsoft.portable-executable",
        ],
    };

    fn is_rom_supported(info: &DetectionHeader) -> Option<u32> {
        if info.address != 0 || info.size() < MZ_HEADER_SIZE {
            return None;
        }
        if !info.has_magic(0, b"MZ") && !info.has_magic(0, b"ZM") {
            return None;
        }

        // Headers past the prefix are resolved by the constructor.
        let subtype = ext_header_offset(info.data)
            .and_then(|lfanew| info.bytes_at(lfanew as usize, 4))
            .map_or(SUBTYPE_MZ, ext_subtype);
        Some(subtype)
    }

    fn new(file: SharedFile) -> Self {
        let mut this = Self {
            base: RomDataBase::new(file.clone()),
            mz: Vec::new(),
            ext_header: Vec::new(),
            subtype: SUBTYPE_MZ,
        };
        if let Err(e) = this.init(&file) {
            this.base.reject(&e.to_string());
        }
        this
    }
}

impl RomData for Exe {
    fn base(&self) -> &RomDataBase {
        &self.base
    }

    fn class_name(&self) -> &'static str {
        Self::INFO.class_name
    }

    fn system_name(&self, kind: SystemNameType) -> Option<&'static str> {
        if !self.is_valid() {
            return None;
        }
        Some(match (self.subtype, kind) {
            (SUBTYPE_MZ, SystemNameType::Long) => "Microsoft MS-DOS",
            (SUBTYPE_MZ, _) => "MS-DOS",
            (SUBTYPE_NE, SystemNameType::Long) => "16-bit Microsoft Windows",
            (SUBTYPE_NE, _) => "Win16",
            (SUBTYPE_LE, SystemNameType::Long) => "Microsoft Windows 386",
            (SUBTYPE_LE, _) => "Win386",
            (_, SystemNameType::Long) => "Microsoft Win32",
            (_, _) => "Win32",
        })
    }

    fn load_field_data(&self, fields: &mut RomFields) -> Result<()> {
        fields.reserve(16);
        fields.set_tab_name(0, "DOS");

        let kind = match self.subtype {
            SUBTYPE_NE => "16-bit New Executable",
            SUBTYPE_LE => "Mixed-Mode Linear Executable",
            SUBTYPE_PE if self.pe_magic() == PE32PLUS_MAGIC => "64-bit Portable Executable (PE32+)",
            SUBTYPE_PE if self.pe_magic() == PE32_MAGIC => "32-bit Portable Executable",
            SUBTYPE_PE => "Portable Executable",
            _ => "MS-DOS Executable",
        };
        fields.add_field_string("Type", kind, StringFlags::NONE);
        self.add_mz_fields(fields);

        match self.subtype {
            SUBTYPE_PE => {
                fields.add_tab("PE");
                self.add_pe_fields(fields)?;
            }
            SUBTYPE_NE => {
                fields.add_tab("NE");
                self.add_ne_fields(fields);
            }
            SUBTYPE_LE => {
                fields.add_tab("LE");
                self.add_le_fields(fields);
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::file::MemFile;
    use crate::romdata::fields::{FieldData, ListExtra};

    fn mz_header(lfanew: u32) -> Vec<u8> {
        let mut data = vec![0u8; 0x80];
        data[0..2].copy_from_slice(b"MZ");
        data[0x06] = 2;
        data[0x0A] = 0x10;
        data[0x0C..0x0E].copy_from_slice(&0xFFFFu16.to_le_bytes());
        data[0x14..0x16].copy_from_slice(&0x0100u16.to_le_bytes());
        data[OFF_RELOC_TABLE..OFF_RELOC_TABLE + 2].copy_from_slice(&0x40u16.to_le_bytes());
        data[OFF_LFANEW..OFF_LFANEW + 4].copy_from_slice(&lfanew.to_le_bytes());
        data
    }

    /// A PE32 DLL for i386 with two sections.
    pub(crate) fn make_pe() -> Vec<u8> {
        let mut data = mz_header(0x80);
        let mut nt = vec![0u8; 24 + 0xE0];
        nt[0..4].copy_from_slice(b"PE\0\0");
        nt[4..6].copy_from_slice(&0x014Cu16.to_le_bytes());
        nt[6..8].copy_from_slice(&2u16.to_le_bytes());
        nt[8..12].copy_from_slice(&0x3A00_0000u32.to_le_bytes());
        nt[20..22].copy_from_slice(&0xE0u16.to_le_bytes());
        nt[22..24].copy_from_slice(&(0x0102u16 | IMAGE_FILE_DLL).to_le_bytes());
        nt[24..26].copy_from_slice(&PE32_MAGIC.to_le_bytes());
        nt[24 + 16..24 + 20].copy_from_slice(&0x1234u32.to_le_bytes());
        nt[24 + 28..24 + 32].copy_from_slice(&0x1000_0000u32.to_le_bytes());
        nt[24 + 40..24 + 42].copy_from_slice(&5u16.to_le_bytes());
        nt[24 + 48..24 + 50].copy_from_slice(&5u16.to_le_bytes());
        nt[24 + 50..24 + 52].copy_from_slice(&1u16.to_le_bytes());
        nt[24 + 68..24 + 70].copy_from_slice(&2u16.to_le_bytes());
        nt[24 + 70..24 + 72].copy_from_slice(&0x0140u16.to_le_bytes());
        nt[24 + 92..24 + 96].copy_from_slice(&16u32.to_le_bytes());
        // Import directory only.
        nt[24 + 104..24 + 108].copy_from_slice(&0x2000u32.to_le_bytes());
        nt[24 + 108..24 + 112].copy_from_slice(&0x50u32.to_le_bytes());
        data.extend(nt);

        for (name, va) in [(&b".text\0\0\0"[..], 0x1000u32), (&b".rdata\0\0"[..], 0x2000)] {
            let mut s = vec![0u8; SECTION_HEADER_SIZE];
            s[0..8].copy_from_slice(name);
            s[8..12].copy_from_slice(&0x0800u32.to_le_bytes());
            s[12..16].copy_from_slice(&va.to_le_bytes());
            s[16..20].copy_from_slice(&0x0A00u32.to_le_bytes());
            data.extend(s);
        }
        data.resize(0x400, 0);
        data
    }

    #[test]
    fn test_pe_dll() {
        let exe = Exe::new(MemFile::new(make_pe()).into_shared());
        assert!(exe.is_valid());
        assert_eq!(exe.file_type(), FileType::Dll);
        assert_eq!(exe.system_name(SystemNameType::Short), Some("Win32"));

        let fields = exe.fields();
        assert_eq!(fields.tab_count(), 2);
        assert_eq!(fields.tab_name(1), Some("PE"));
        let get = |name: &str| fields.iter().find(|f| f.name == name).and_then(|f| f.as_str());
        assert_eq!(get("Type"), Some("32-bit Portable Executable"));
        assert_eq!(get("CPU"), Some("Intel i386"));
        assert_eq!(get("Subsystem"), Some("Windows 5.1"));
        assert_eq!(get("Image Base"), Some("0x10000000"));
        assert_eq!(get("Entry Point"), Some("0x00001234"));
        assert_eq!(get("Initial CS:IP"), Some("0000:0100"));

        let sections = fields.iter().find(|f| f.name == "Sections").unwrap();
        let FieldData::ListData(list) = &sections.data else {
            panic!("not a list");
        };
        let rows = list.rows.default_rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][0], ".rdata");
        assert_eq!(rows[1][1], "0x00002000");
        assert!(list.flags.contains(ListDataFlags::SEPARATE_ROW));
        assert_eq!(list.rows_visible, 8);

        let dirs = fields.iter().find(|f| f.name == "Data Directories").unwrap();
        let FieldData::ListData(list) = &dirs.data else {
            panic!("not a list");
        };
        assert_eq!(list.rows.default_rows().len(), 16);
        assert_eq!(list.rows.default_rows()[1][1], "0x00002000");
        assert!(matches!(list.extra, ListExtra::Checkboxes(0b10)));
    }

    #[test]
    fn test_ne_and_le_signatures() {
        let mut ne = mz_header(0x80);
        ne.resize(0x100, 0);
        ne[0x80..0x82].copy_from_slice(b"NE");
        ne[0x80 + 0x36] = 2;
        ne[0x80 + 0x3E] = 10;
        ne[0x80 + 0x3F] = 3;
        let exe = Exe::new(MemFile::new(ne).into_shared());
        assert_eq!(exe.file_type(), FileType::Executable);
        let fields = exe.fields();
        let get = |name: &str| fields.iter().find(|f| f.name == name).and_then(|f| f.as_str());
        assert_eq!(get("Type"), Some("16-bit New Executable"));
        assert_eq!(get("Target OS"), Some("Microsoft Windows"));
        assert_eq!(get("Windows Version"), Some("3.10"));

        let mut le = mz_header(0x80);
        le.resize(0x100, 0);
        le[0x80..0x82].copy_from_slice(b"LE");
        le[0x88] = 2;
        le[0x8A] = NE_TARGET_WIN386;
        let exe = Exe::new(MemFile::new(le).into_shared());
        assert_eq!(exe.file_type(), FileType::DeviceDriver);
    }

    #[test]
    fn test_plain_mz() {
        let mut data = mz_header(0);
        data[OFF_RELOC_TABLE] = 0x1C;
        let info = DetectionHeader { address: 0, data: &data, ext: None, file_size: data.len() as u64 };
        assert_eq!(Exe::is_rom_supported(&info), Some(SUBTYPE_MZ));
        let exe = Exe::new(MemFile::new(data).into_shared());
        assert!(exe.is_valid());
        assert_eq!(exe.fields().tab_count(), 1);
        let fields = exe.fields();
        let get = |name: &str| fields.iter().find(|f| f.name == name).and_then(|f| f.as_str());
        assert_eq!(get("Minimum Memory"), Some("256 B"));
    }

    #[test]
    fn test_ext_header_past_prefix() {
        // The acceptance test only sees MZ; the constructor finds the NE header.
        let mut data = mz_header(0x2000);
        data.resize(0x2100, 0);
        data[0x2000..0x2002].copy_from_slice(b"NE");
        let prefix = &data[..0x1100];
        let info = DetectionHeader { address: 0, data: prefix, ext: None, file_size: data.len() as u64 };
        assert_eq!(Exe::is_rom_supported(&info), Some(SUBTYPE_MZ));

        let exe = Exe::new(MemFile::new(data).into_shared());
        assert!(exe.is_valid());
        assert_eq!(exe.system_name(SystemNameType::Short), Some("Win16"));
    }

    #[test]
    fn test_ext_subtype_signatures() {
        assert_eq!(ext_subtype(b"PE\0\0"), SUBTYPE_PE);
        assert_eq!(ext_subtype(b"PE"), SUBTYPE_MZ);
        assert_eq!(ext_subtype(b"LX"), SUBTYPE_LE);
        assert_eq!(ext_subtype(b""), SUBTYPE_MZ);
    }
}
