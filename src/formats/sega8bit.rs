//! Sega Master System and Game Gear ROM images.
//!
//! The "TMR SEGA" header sits at 0x7FF0. Homebrew may also carry an SDSC
//! header at 0x7FE0, whose string pointers refer to offsets in the ROM.

use crate::file::SharedFile;
use crate::romdata::fields::{Base, DateTimeFlags, StringFlags};
use crate::romdata::{
    DetectionHeader, FileType, FormatInfo, Property, RomData, RomDataBase, RomDataClass, RomFields,
    RomMetaData, SystemNameType,
};
use crate::util::{bcd, le_u16, u8_at};
use crate::{Error, Result};

use super::{read_exact_at, read_up_to};

/// Where the combined SDSC/TMR block is read from.
pub const HEADER_ADDRESS: u32 = 0x7FE0;
pub const HEADER_SIZE: usize = 0x20;

const TMR_MAGIC: &[u8] = b"TMR SEGA";
const SDSC_MAGIC: &[u8] = b"SDSC";

// Offsets within the 0x20-byte block.
const OFF_SDSC_VERSION: usize = 0x04;
const OFF_SDSC_DATE: usize = 0x06;
const OFF_SDSC_AUTHOR: usize = 0x0A;
const OFF_SDSC_NAME: usize = 0x0C;
const OFF_SDSC_DESC: usize = 0x0E;
const OFF_TMR: usize = 0x10;
const OFF_CHECKSUM: usize = 0x1A;
const OFF_PRODUCT_CODE: usize = 0x1C;
const OFF_VERSION: usize = 0x1E;
const OFF_REGION_SIZE: usize = 0x1F;

/// Longest SDSC string read from the ROM.
const SDSC_STRING_MAX: usize = 255;

pub const SUBTYPE_SMS: u32 = 0;
pub const SUBTYPE_GG: u32 = 1;

/// Sega 8-bit ROM parser.
pub struct Sega8Bit {
    base: RomDataBase,
    header: Vec<u8>,
    subtype: u32,
}

impl Sega8Bit {
    fn init(&mut self, file: &SharedFile) -> Result<()> {
        let data = read_exact_at(file, u64::from(HEADER_ADDRESS), HEADER_SIZE)?;
        let info = DetectionHeader {
            address: HEADER_ADDRESS,
            data: &data,
            ext: None,
            file_size: file.size()?,
        };
        self.subtype = Self::is_rom_supported(&info).ok_or(Error::BadMagic)?;
        self.header = data;
        self.base.set_valid(FileType::RomImage);
        Ok(())
    }

    fn has_sdsc(&self) -> bool {
        self.header.starts_with(SDSC_MAGIC)
    }

    /// NUL-terminated string at a ROM offset. `0xFFFF` means absent.
    fn sdsc_string(&self, ptr_off: usize) -> Option<String> {
        let ptr = le_u16(&self.header, ptr_off);
        if ptr == 0xFFFF || !self.has_sdsc() {
            return None;
        }
        let file = self.base.file()?;
        let buf = read_up_to(&file, u64::from(ptr), SDSC_STRING_MAX).ok()?;
        let s = crate::util::latin1(&buf);
        (!s.is_empty()).then_some(s)
    }

    fn region(&self) -> &'static str {
        match u8_at(&self.header, OFF_REGION_SIZE) >> 4 {
            3 => "SMS Japan",
            4 => "SMS Export",
            5 => "GG Japan",
            6 => "GG Export",
            7 => "GG International",
            _ => "Unknown",
        }
    }

    fn rom_size_kib(&self) -> Option<u32> {
        Some(match u8_at(&self.header, OFF_REGION_SIZE) & 0x0F {
            0xA => 8,
            0xB => 16,
            0xC => 32,
            0xD => 48,
            0xE => 64,
            0xF => 128,
            0x0 => 256,
            0x1 => 512,
            0x2 => 1024,
            _ => return None,
        })
    }

    fn product_code(&self) -> Option<u32> {
        let h = &self.header;
        let lo = bcd(u8_at(h, OFF_PRODUCT_CODE))?;
        let mid = bcd(u8_at(h, OFF_PRODUCT_CODE + 1))?;
        let hi = u8_at(h, OFF_VERSION) >> 4;
        Some(u32::from(lo) + u32::from(mid) * 100 + u32::from(hi) * 10_000)
    }

    /// SDSC release date as a Unix timestamp at midnight UTC.
    fn sdsc_date(&self) -> Option<i64> {
        let h = &self.header;
        let day = bcd(u8_at(h, OFF_SDSC_DATE))?;
        let month = bcd(u8_at(h, OFF_SDSC_DATE + 1))?;
        let year = u32::from(bcd(u8_at(h, OFF_SDSC_DATE + 3))?) * 100 + u32::from(bcd(u8_at(h, OFF_SDSC_DATE + 2))?);
        let date = chrono::NaiveDate::from_ymd_opt(year as i32, u32::from(month), u32::from(day))?;
        Some(date.and_hms_opt(0, 0, 0)?.and_utc().timestamp())
    }
}

impl RomDataClass for Sega8Bit {
    const INFO: &'static FormatInfo = &FormatInfo {
        class_name: "Sega8Bit",
        extensions: &[".sms", ".gg"],
        mime_types: &["application/x-sms-rom", "application/x-gamegear-rom"],
    };

    fn is_rom_supported(info: &DetectionHeader) -> Option<u32> {
        if info.address != HEADER_ADDRESS || info.size() < HEADER_SIZE || !info.has_magic(OFF_TMR, TMR_MAGIC) {
            return None;
        }
        match info.data[OFF_REGION_SIZE] >> 4 {
            5..=7 => Some(SUBTYPE_GG),
            _ => Some(SUBTYPE_SMS),
        }
    }

    fn new(file: SharedFile) -> Self {
        let mut this = Self {
            base: RomDataBase::new(file.clone()),
            header: Vec::new(),
            subtype: SUBTYPE_SMS,
        };
        if let Err(e) = this.init(&file) {
            this.base.reject(&e.to_string());
        }
        this
    }
}

impl RomData for Sega8Bit {
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
            (SUBTYPE_GG, SystemNameType::Long) => "Sega Game Gear",
            (SUBTYPE_GG, SystemNameType::Short) => "Game Gear",
            (SUBTYPE_GG, SystemNameType::Abbreviation) => "GG",
            (_, SystemNameType::Long) => "Sega Master System",
            (_, SystemNameType::Short) => "Master System",
            (_, SystemNameType::Abbreviation) => "SMS",
        })
    }

    fn load_field_data(&self, fields: &mut RomFields) -> Result<()> {
        let h = &self.header;
        fields.reserve(10);

        match self.product_code() {
            Some(code) => fields.add_field_string("Product Code", &code.to_string(), StringFlags::NONE),
            None => fields.add_field_string("Product Code", "Unknown", StringFlags::WARNING),
        };
        fields.add_field_string_numeric("Version", u32::from(u8_at(h, OFF_VERSION) & 0x0F), Base::Dec, 0, StringFlags::NONE);
        fields.add_field_string("Region", self.region(), StringFlags::NONE);
        fields.add_field_string_numeric("Checksum", u32::from(le_u16(h, OFF_CHECKSUM)), Base::Hex, 4, StringFlags::MONOSPACE);
        match self.rom_size_kib() {
            Some(kib) => fields.add_field_string("ROM Size", &format!("{kib} KiB"), StringFlags::NONE),
            None => fields.add_field_string("ROM Size", "Unknown", StringFlags::NONE),
        };

        if self.has_sdsc() {
            fields.add_tab("SDSC");
            let major = bcd(u8_at(h, OFF_SDSC_VERSION)).unwrap_or(0);
            let minor = bcd(u8_at(h, OFF_SDSC_VERSION + 1)).unwrap_or(0);
            fields.add_field_string("Version", &format!("{major}.{minor:02}"), StringFlags::NONE);
            fields.add_field_date_time("Build Date", self.sdsc_date(), DateTimeFlags::HAS_DATE | DateTimeFlags::IS_UTC);
            for (name, off) in [("Author", OFF_SDSC_AUTHOR), ("Name", OFF_SDSC_NAME), ("Description", OFF_SDSC_DESC)] {
                if let Some(s) = self.sdsc_string(off) {
                    fields.add_field_string(name, &s, StringFlags::NONE);
                }
            }
        }
        Ok(())
    }

    fn load_metadata(&self, metadata: &mut RomMetaData) -> Result<()> {
        if let Some(name) = self.sdsc_string(OFF_SDSC_NAME) {
            metadata.add_string(Property::Title, &name);
        }
        if let Some(author) = self.sdsc_string(OFF_SDSC_AUTHOR) {
            metadata.add_string(Property::Author, &author);
        }
        if let Some(desc) = self.sdsc_string(OFF_SDSC_DESC) {
            metadata.add_string(Property::Description, &desc);
        }
        Ok(())
    }
}
