//! Game Boy Sound System music files.

use crate::file::SharedFile;
use crate::romdata::fields::{Base, StringFlags};
use crate::romdata::{
    DetectionHeader, FileType, FormatInfo, Property, RomData, RomDataBase, RomDataClass, RomFields,
    RomMetaData, SystemNameType,
};
use crate::util::{bytes_at, latin1, le_u16, u8_at};
use crate::{Error, Result};

use super::read_exact_at;

const HEADER_SIZE: usize = 0x70;

const OFF_VERSION: usize = 0x03;
const OFF_TRACK_COUNT: usize = 0x04;
const OFF_DEFAULT_TRACK: usize = 0x05;
const OFF_LOAD: usize = 0x06;
const OFF_INIT: usize = 0x08;
const OFF_PLAY: usize = 0x0A;
const OFF_STACK: usize = 0x0C;
const OFF_TIMER_MODULO: usize = 0x0E;
const OFF_TIMER_CONTROL: usize = 0x0F;
const OFF_TITLE: usize = 0x10;
const OFF_COMPOSER: usize = 0x30;
const OFF_COPYRIGHT: usize = 0x50;

/// GBS music parser.
pub struct Gbs {
    base: RomDataBase,
    header: Vec<u8>,
}

impl Gbs {
    fn init(&mut self, file: &SharedFile) -> Result<()> {
        let data = read_exact_at(file, 0, HEADER_SIZE)?;
        let info = DetectionHeader {
            address: 0,
            data: &data,
            ext: None,
            file_size: file.size()?,
        };
        Self::is_rom_supported(&info).ok_or(Error::BadMagic)?;
        self.header = data;
        self.base.set_valid(FileType::AudioFile);
        Ok(())
    }

    fn text(&self, off: usize) -> String {
        latin1(bytes_at(&self.header, off, 32))
    }
}

impl RomDataClass for Gbs {
    const INFO: &'static FormatInfo = &FormatInfo {
        class_name: "GBS",
        extensions: &[".gbs"],
        mime_types: &["audio/x-gbs"],
    };

    fn is_rom_supported(info: &DetectionHeader) -> Option<u32> {
        if info.address != 0 || info.size() < HEADER_SIZE || !info.has_magic(0, b"GBS\x01") {
            return None;
        }
        Some(0)
    }

    fn new(file: SharedFile) -> Self {
        let mut this = Self {
            base: RomDataBase::new(file.clone()),
            header: Vec::new(),
        };
        if let Err(e) = this.init(&file) {
            this.base.reject(&e.to_string());
        }
        this
    }
}

impl RomData for Gbs {
    fn base(&self) -> &RomDataBase {
        &self.base
    }

    fn class_name(&self) -> &'static str {
        Self::INFO.class_name
    }

    fn system_name(&self, kind: SystemNameType) -> Option<&'static str> {
        self.is_valid().then_some(match kind {
            SystemNameType::Long => "Game Boy Sound System",
            SystemNameType::Short | SystemNameType::Abbreviation => "GBS",
        })
    }

    fn load_field_data(&self, fields: &mut RomFields) -> Result<()> {
        let h = &self.header;
        fields.reserve(12);

        fields.add_field_string_numeric("Version", u32::from(u8_at(h, OFF_VERSION)), Base::Dec, 0, StringFlags::NONE);
        for (name, off) in [("Title", OFF_TITLE), ("Composer", OFF_COMPOSER), ("Copyright", OFF_COPYRIGHT)] {
            fields.add_field_string(name, &self.text(off), StringFlags::NONE);
        }
        fields.add_field_string_numeric("Track Count", u32::from(u8_at(h, OFF_TRACK_COUNT)), Base::Dec, 0, StringFlags::NONE);
        fields.add_field_string_numeric(
            "Default Track #",
            u32::from(u8_at(h, OFF_DEFAULT_TRACK)),
            Base::Dec,
            0,
            StringFlags::NONE,
        );
        for (name, off) in [
            ("Load Address", OFF_LOAD),
            ("Init Address", OFF_INIT),
            ("Play Address", OFF_PLAY),
            ("Stack Pointer", OFF_STACK),
        ] {
            fields.add_field_string_numeric(name, u32::from(le_u16(h, off)), Base::Hex, 4, StringFlags::MONOSPACE);
        }
        fields.add_field_string_numeric(
            "Timer Modulo",
            u32::from(u8_at(h, OFF_TIMER_MODULO)),
            Base::Hex,
            2,
            StringFlags::MONOSPACE,
        );
        fields.add_field_string_numeric(
            "Timer Control",
            u32::from(u8_at(h, OFF_TIMER_CONTROL)),
            Base::Hex,
            2,
            StringFlags::MONOSPACE,
        );
        Ok(())
    }

    fn load_metadata(&self, metadata: &mut RomMetaData) -> Result<()> {
        metadata.add_string(Property::Title, &self.text(OFF_TITLE));
        metadata.add_string(Property::Composer, &self.text(OFF_COMPOSER));
        metadata.add_string(Property::Copyright, &self.text(OFF_COPYRIGHT));
        Ok(())
    }
}
