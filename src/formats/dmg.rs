//! Game Boy / Game Boy Color ROM images.

use crate::file::SharedFile;
use crate::romdata::fields::{Base, StringFlags};
use crate::romdata::{
    DetectionHeader, FileType, FormatInfo, Property, RomData, RomDataBase, RomDataClass,
    RomFields, RomMetaData, SystemNameType,
};
use crate::util::{be_u16, bytes_at, is_upper_alnum, latin1, u8_at};
use crate::{Error, Result};

use super::nintendo_publishers;
use super::read_exact_at;

const HEADER_ADDRESS: usize = 0x100;
const HEADER_SIZE: usize = 0x50;

/// Boot logo, first 0x18 bytes.
pub const NINTENDO_LOGO: [u8; 0x18] = [
    0xCE, 0xED, 0x66, 0x66, 0xCC, 0x0D, 0x00, 0x0B, 0x03, 0x73, 0x00, 0x83, 0x00, 0x0C, 0x00, 0x0D,
    0x00, 0x08, 0x11, 0x1F, 0x88, 0x89, 0x00, 0x0E,
];

// Offsets within the 0x50-byte header.
const OFF_ENTRY: usize = 0x00;
const OFF_LOGO: usize = 0x04;
const OFF_TITLE: usize = 0x34;
const OFF_CGB_FLAG: usize = 0x43;
const OFF_NEW_PUBLISHER: usize = 0x44;
const OFF_SGB_FLAG: usize = 0x46;
const OFF_CART_TYPE: usize = 0x47;
const OFF_ROM_SIZE: usize = 0x48;
const OFF_RAM_SIZE: usize = 0x49;
const OFF_REGION: usize = 0x4A;
const OFF_OLD_PUBLISHER: usize = 0x4B;
const OFF_VERSION: usize = 0x4C;
const OFF_HEADER_CHECKSUM: usize = 0x4D;
const OFF_ROM_CHECKSUM: usize = 0x4E;

/// Format subtypes.
pub const ROM_DMG: u32 = 0;
pub const ROM_CGB: u32 = 1;

const FEAT_RAM: u32 = 1 << 0;
const FEAT_BATTERY: u32 = 1 << 1;
const FEAT_TIMER: u32 = 1 << 2;
const FEAT_RUMBLE: u32 = 1 << 3;

/// Cartridge hardware by type byte.
const CART_TYPES: &[(u8, &str, u32)] = &[
    (0x00, "ROM", 0),
    (0x01, "MBC1", 0),
    (0x02, "MBC1", FEAT_RAM),
    (0x03, "MBC1", FEAT_RAM | FEAT_BATTERY),
    (0x05, "MBC2", 0),
    (0x06, "MBC2", FEAT_BATTERY),
    (0x08, "ROM", FEAT_RAM),
    (0x09, "ROM", FEAT_RAM | FEAT_BATTERY),
    (0x0B, "MMM01", 0),
    (0x0C, "MMM01", FEAT_RAM),
    (0x0D, "MMM01", FEAT_RAM | FEAT_BATTERY),
    (0x0F, "MBC3", FEAT_TIMER | FEAT_BATTERY),
    (0x10, "MBC3", FEAT_TIMER | FEAT_RAM | FEAT_BATTERY),
    (0x11, "MBC3", 0),
    (0x12, "MBC3", FEAT_RAM),
    (0x13, "MBC3", FEAT_RAM | FEAT_BATTERY),
    (0x19, "MBC5", 0),
    (0x1A, "MBC5", FEAT_RAM),
    (0x1B, "MBC5", FEAT_RAM | FEAT_BATTERY),
    (0x1C, "MBC5", FEAT_RUMBLE),
    (0x1D, "MBC5", FEAT_RUMBLE | FEAT_RAM),
    (0x1E, "MBC5", FEAT_RUMBLE | FEAT_RAM | FEAT_BATTERY),
    (0x20, "MBC6", FEAT_RAM | FEAT_BATTERY),
    (0x22, "MBC7", FEAT_RUMBLE | FEAT_RAM | FEAT_BATTERY),
    (0xFC, "Pocket Camera", FEAT_RAM | FEAT_BATTERY),
    (0xFD, "Bandai TAMA5", FEAT_BATTERY),
    (0xFE, "HuC3", FEAT_RAM | FEAT_BATTERY | FEAT_TIMER),
    (0xFF, "HuC1", FEAT_RAM | FEAT_BATTERY),
];

/// Game Boy ROM parser.
pub struct Dmg {
    base: RomDataBase,
    subtype: u32,
    header: Vec<u8>,
}

impl Dmg {
    fn init(&mut self, file: &SharedFile) -> Result<()> {
        let data = read_exact_at(file, 0, HEADER_ADDRESS + HEADER_SIZE)?;
        let info = DetectionHeader {
            address: 0,
            data: &data,
            ext: None,
            file_size: file.size()?,
        };
        self.subtype = Self::is_rom_supported(&info).ok_or(Error::BadMagic)?;
        self.header = data[HEADER_ADDRESS..].to_vec();
        self.base.set_valid(FileType::RomImage);
        Ok(())
    }

    fn is_cgb(&self) -> bool {
        self.subtype == ROM_CGB
    }

    /// Title and, for newer CGB carts, the four-character game ID.
    fn title_and_id(&self) -> (String, Option<String>) {
        let h = &self.header;
        if self.is_cgb() {
            let id = bytes_at(h, OFF_TITLE + 11, 4);
            if id.iter().all(|&c| is_upper_alnum(c)) {
                return (latin1(bytes_at(h, OFF_TITLE, 11)), Some(latin1(id)));
            }
            return (latin1(bytes_at(h, OFF_TITLE, 15)), None);
        }
        (latin1(bytes_at(h, OFF_TITLE, 16)), None)
    }

    fn publisher(&self) -> String {
        let h = &self.header;
        let old = u8_at(h, OFF_OLD_PUBLISHER);
        if old == 0x33 {
            return nintendo_publishers::describe_new(bytes_at(h, OFF_NEW_PUBLISHER, 2));
        }
        match nintendo_publishers::lookup_old(old) {
            Some(name) => name.to_string(),
            None => format!("Unknown (0x{old:02X})"),
        }
    }

    fn cart_type(&self) -> Option<(&'static str, u32)> {
        let code = u8_at(&self.header, OFF_CART_TYPE);
        CART_TYPES
            .iter()
            .find(|(c, _, _)| *c == code)
            .map(|&(_, name, features)| (name, features))
    }

    /// Header checksum over the title..version range.
    fn calc_header_checksum(&self) -> u8 {
        bytes_at(&self.header, OFF_TITLE, OFF_HEADER_CHECKSUM - OFF_TITLE)
            .iter()
            .fold(0u8, |x, &b| x.wrapping_sub(b).wrapping_sub(1))
    }
}

impl RomDataClass for Dmg {
    const INFO: &'static FormatInfo = &FormatInfo {
        class_name: "DMG",
        extensions: &[".gb", ".sgb", ".gbc", ".cgb"],
        mime_types: &["application/x-gameboy-rom", "application/x-gameboy-color-rom"],
    };

    fn is_rom_supported(info: &DetectionHeader) -> Option<u32> {
        if info.address != 0 || info.size() < HEADER_ADDRESS + HEADER_SIZE {
            return None;
        }
        if !info.has_magic(HEADER_ADDRESS + OFF_LOGO, &NINTENDO_LOGO) {
            return None;
        }
        if info.data[HEADER_ADDRESS + OFF_CGB_FLAG] & 0x80 != 0 {
            Some(ROM_CGB)
        } else {
            Some(ROM_DMG)
        }
    }

    fn new(file: SharedFile) -> Self {
        let mut this = Self {
            base: RomDataBase::new(file.clone()),
            subtype: ROM_DMG,
            header: Vec::new(),
        };
        if let Err(e) = this.init(&file) {
            this.base.reject(&e.to_string());
        }
        this
    }
}

impl RomData for Dmg {
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
        let names = if self.is_cgb() {
            ["Nintendo Game Boy Color", "Game Boy Color", "GBC"]
        } else {
            ["Nintendo Game Boy", "Game Boy", "GB"]
        };
        Some(match kind {
            SystemNameType::Long => names[0],
            SystemNameType::Short => names[1],
            SystemNameType::Abbreviation => names[2],
        })
    }

    fn load_field_data(&self, fields: &mut RomFields) -> Result<()> {
        let h = &self.header;
        fields.reserve(12);

        let (title, game_id) = self.title_and_id();
        fields.add_field_string("Title", &title, StringFlags::TRIM_END);
        fields.add_field_string("Game ID", game_id.as_deref().unwrap_or("Unknown"), StringFlags::NONE);

        let cgb_flag = u8_at(h, OFF_CGB_FLAG);
        let mut systems = 0;
        if cgb_flag != 0xC0 {
            systems |= 1 << 0;
        }
        if u8_at(h, OFF_SGB_FLAG) == 0x03 {
            systems |= 1 << 1;
        }
        if cgb_flag & 0x80 != 0 {
            systems |= 1 << 2;
        }
        fields.add_field_bitfield("System", &["DMG", "SGB", "CGB"], 0, systems);

        let entry = bytes_at(h, OFF_ENTRY, 4);
        match entry {
            [0x00, 0xC3, lo, hi] | [0xC3, lo, hi, _] => {
                let target = u16::from_le_bytes([*lo, *hi]);
                fields.add_field_string("Entry Point", &format!("JP 0x{target:04X}"), StringFlags::MONOSPACE);
            }
            [0x18, rel, ..] => {
                let target = (0x102i32 + i32::from(*rel as i8)) as u16;
                fields.add_field_string("Entry Point", &format!("JR 0x{target:04X}"), StringFlags::MONOSPACE);
            }
            _ => {
                fields.add_field_string_hexdump("Entry Point", entry, StringFlags::MONOSPACE);
            }
        }

        fields.add_field_string("Publisher", &self.publisher(), StringFlags::NONE);

        let (hardware, features) = match self.cart_type() {
            Some(t) => t,
            None => ("Unknown", 0),
        };
        fields.add_field_string("Hardware", hardware, StringFlags::NONE);
        fields.add_field_bitfield("Features", &["RAM", "Battery", "Timer", "Rumble"], 0, features);

        let rom_size = u8_at(h, OFF_ROM_SIZE);
        let rom_kib_banks = match rom_size {
            0..=8 => Some((32u32 << rom_size, 2u32 << rom_size)),
            0x52 => Some((1152, 72)),
            0x53 => Some((1280, 80)),
            0x54 => Some((1536, 96)),
            _ => None,
        };
        let rom_str = match rom_kib_banks {
            Some((kib, banks)) => format!("{kib} KiB ({banks} banks)"),
            None => "Unknown".to_string(),
        };
        fields.add_field_string("ROM Size", &rom_str, StringFlags::NONE);

        let ram_str = match (u8_at(h, OFF_RAM_SIZE), hardware) {
            (0, "MBC2") => "512 x 4 bits".to_string(),
            (0, _) => "No RAM".to_string(),
            (1, _) => "2 KiB".to_string(),
            (2, _) => "8 KiB (1 bank)".to_string(),
            (3, _) => "32 KiB (4 banks)".to_string(),
            (4, _) => "128 KiB (16 banks)".to_string(),
            (5, _) => "64 KiB (8 banks)".to_string(),
            _ => "Unknown".to_string(),
        };
        fields.add_field_string("RAM Size", &ram_str, StringFlags::NONE);

        let region = if u8_at(h, OFF_REGION) == 0 { "Japanese" } else { "Non-Japanese" };
        fields.add_field_string("Region Code", region, StringFlags::NONE);

        fields.add_field_string_numeric("Revision", u32::from(u8_at(h, OFF_VERSION)), Base::Dec, 2, StringFlags::NONE);

        let stored = u8_at(h, OFF_HEADER_CHECKSUM);
        let calc = self.calc_header_checksum();
        if stored == calc {
            fields.add_field_string("Checksum", &format!("0x{stored:02X} (valid)"), StringFlags::MONOSPACE);
        } else {
            fields.add_field_string(
                "Checksum",
                &format!("0x{stored:02X} (INVALID; should be 0x{calc:02X})"),
                StringFlags::MONOSPACE | StringFlags::WARNING,
            );
        }
        fields.add_field_string_numeric(
            "ROM Checksum",
            u32::from(be_u16(h, OFF_ROM_CHECKSUM)),
            Base::Hex,
            4,
            StringFlags::MONOSPACE,
        );
        Ok(())
    }

    fn load_metadata(&self, metadata: &mut RomMetaData) -> Result<()> {
        let (title, _) = self.title_and_id();
        metadata.add_string(Property::Title, &title);
        metadata.add_string(Property::Publisher, &self.publisher());
        Ok(())
    }
}
