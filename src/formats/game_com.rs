//! Tiger game.com ROM images.
//!
//! The header normally lives at 0x40000; some dumps have it at 0. The
//! icon is a 64x64 2bpp tile inside a 256x256 graphics bank, stored
//! column-major.

use image::{Rgba, RgbaImage};

use crate::file::SharedFile;
use crate::romdata::fields::{Base, StringFlags};
use crate::romdata::{
    DetectionHeader, FileType, FormatInfo, ImageFlags, ImageType, Property, RomData, RomDataBase,
    RomDataClass, RomFields, RomMetaData, SystemNameType,
};
use crate::util::{bytes_at, latin1, le_u16, u8_at};
use crate::{Error, Result};

use super::read_exact_at;

pub const HEADER_ADDRESS: u32 = 0x40000;
pub const HEADER_ADDRESS_ALT: u32 = 0;
pub const HEADER_SIZE: usize = 0x20;

const SYS_ID: &[u8] = b"TigerDMGC";

const OFF_ENTRY_POINT: usize = 0x02;
const OFF_SYS_ID: usize = 0x05;
const OFF_ICON_BANK: usize = 0x0E;
const OFF_ICON_X: usize = 0x0F;
const OFF_ICON_Y: usize = 0x10;
const OFF_TITLE: usize = 0x11;
const OFF_GAME_ID: usize = 0x1A;

const ICON_W: u32 = 64;
const ICON_H: u32 = 64;
const BANK_W: u32 = 256;
const BANK_H: u32 = 256;
const BANK_SIZE: i64 = 16384;

const PALETTE: [Rgba<u8>; 4] = [
    Rgba([0xFF, 0xFF, 0xFF, 0xFF]),
    Rgba([0xC0, 0xC0, 0xC0, 0xFF]),
    Rgba([0x80, 0x80, 0x80, 0xFF]),
    Rgba([0x00, 0x00, 0x00, 0xFF]),
];

/// Tiger game.com ROM parser.
pub struct GameCom {
    base: RomDataBase,
    header: Vec<u8>,
    /// Added to bank offsets; negative when the header is at 0.
    addr_adj: i64,
}

impl GameCom {
    fn init(&mut self, file: &SharedFile) -> Result<()> {
        for address in [HEADER_ADDRESS, HEADER_ADDRESS_ALT] {
            let Ok(data) = read_exact_at(file, u64::from(address), HEADER_SIZE) else {
                continue;
            };
            let info = DetectionHeader { address, data: &data, ext: None, file_size: 0 };
            if Self::is_rom_supported(&info).is_some() {
                self.header = data;
                self.addr_adj = i64::from(address) - i64::from(HEADER_ADDRESS);
                self.base.set_valid(FileType::RomImage);
                return Ok(());
            }
        }
        Err(Error::BadMagic)
    }

    fn title(&self) -> String {
        latin1(bytes_at(&self.header, OFF_TITLE, 9))
    }
}

impl RomDataClass for GameCom {
    const INFO: &'static FormatInfo = &FormatInfo {
        class_name: "GameCom",
        extensions: &[".tgc", ".bin"],
        mime_types: &["application/x-game-com-rom"],
    };

    fn is_rom_supported(info: &DetectionHeader) -> Option<u32> {
        if info.address != HEADER_ADDRESS && info.address != HEADER_ADDRESS_ALT {
            return None;
        }
        if info.size() < HEADER_SIZE || !info.has_magic(OFF_SYS_ID, SYS_ID) {
            return None;
        }
        Some(0)
    }

    fn new(file: SharedFile) -> Self {
        let mut this = Self {
            base: RomDataBase::new(file.clone()),
            header: Vec::new(),
            addr_adj: 0,
        };
        if let Err(e) = this.init(&file) {
            this.base.reject(&e.to_string());
        }
        this
    }
}

impl RomData for GameCom {
    fn base(&self) -> &RomDataBase {
        &self.base
    }

    fn class_name(&self) -> &'static str {
        Self::INFO.class_name
    }

    fn system_name(&self, kind: SystemNameType) -> Option<&'static str> {
        self.is_valid().then_some(match kind {
            SystemNameType::Long => "Tiger game.com",
            SystemNameType::Short | SystemNameType::Abbreviation => "game.com",
        })
    }

    fn load_field_data(&self, fields: &mut RomFields) -> Result<()> {
        let h = &self.header;
        fields.reserve(3);
        fields.add_field_string("Title", &self.title(), StringFlags::NONE);
        fields.add_field_string_numeric("Game ID", u32::from(le_u16(h, OFF_GAME_ID)), Base::Hex, 4, StringFlags::NONE);
        fields.add_field_string_numeric(
            "Entry Point",
            u32::from(le_u16(h, OFF_ENTRY_POINT)),
            Base::Hex,
            4,
            StringFlags::MONOSPACE,
        );
        Ok(())
    }

    fn load_metadata(&self, metadata: &mut RomMetaData) -> Result<()> {
        metadata.add_string(Property::Title, &self.title());
        Ok(())
    }

    fn supported_image_types(&self) -> &'static [ImageType] {
        &[ImageType::IntIcon]
    }

    fn image_flags(&self, _image_type: ImageType) -> ImageFlags {
        ImageFlags::RESCALE_NEAREST
    }

    fn load_internal_image(&self, image_type: ImageType) -> Result<RgbaImage> {
        if image_type != ImageType::IntIcon {
            return Err(Error::NotSupported);
        }
        let h = &self.header;
        let (bank, x, y) = (u8_at(h, OFF_ICON_BANK), u8_at(h, OFF_ICON_X), u8_at(h, OFF_ICON_Y));
        if u32::from(x) > BANK_W - ICON_W || u32::from(y) > BANK_H - ICON_H {
            return Err(Error::InvalidField("icon position"));
        }

        let offset = self.addr_adj
            + i64::from(bank) * BANK_SIZE
            + i64::from(y) / 4
            + i64::from(x) * i64::from(BANK_W) / 4;
        let offset = u64::try_from(offset).map_err(|_| Error::InvalidField("icon bank"))?;
        let len = ((BANK_W * (ICON_H - 1) + ICON_W) / 4) as usize;
        let data = read_exact_at(&self.base.require_file()?, offset, len)?;
        Ok(decode_icon(&data))
    }
}

/// Decode the column-major 2bpp icon. Each source row of the bank
/// becomes one destination column.
fn decode_icon(data: &[u8]) -> RgbaImage {
    let mut img = RgbaImage::new(ICON_W, ICON_H);
    let stride = (BANK_W / 4) as usize;
    for y in 0..ICON_H {
        let row = &data[y as usize * stride..];
        for x in (0..ICON_W).step_by(4) {
            let b = row[(x / 4) as usize];
            for k in 0..4u32 {
                let px = (b >> (6 - 2 * k)) & 0x03;
                img.put_pixel(y, x + k, PALETTE[px as usize]);
            }
        }
    }
    img
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::file::MemFile;

    /// A ROM with its header at `address` and one black icon pixel at the
    /// icon's top-left corner.
    pub(crate) fn make_rom(address: u32) -> Vec<u8> {
        const ICON_BANK: u8 = 17;
        let mut rom = vec![0u8; HEADER_ADDRESS as usize + 0x10000];
        let h = address as usize;
        rom[h + OFF_ENTRY_POINT..h + OFF_ENTRY_POINT + 2].copy_from_slice(&0x2010u16.to_le_bytes());
        rom[h + OFF_SYS_ID..h + OFF_SYS_ID + SYS_ID.len()].copy_from_slice(SYS_ID);
        rom[h + OFF_ICON_BANK] = ICON_BANK;
        rom[h + OFF_TITLE..h + OFF_TITLE + 9].copy_from_slice(b"LIGHTSOUT");
        rom[h + OFF_GAME_ID..h + OFF_GAME_ID + 2].copy_from_slice(&0x0021u16.to_le_bytes());

        let bank_base = (i64::from(address) - i64::from(HEADER_ADDRESS) + i64::from(ICON_BANK) * BANK_SIZE) as usize;
        rom[bank_base] = 0b1100_0000;
        rom
    }

    #[test]
    fn test_header_at_standard_address() {
        let gcom = GameCom::new(MemFile::new(make_rom(HEADER_ADDRESS)).into_shared());
        assert!(gcom.is_valid());
        let fields = gcom.fields();
        let get = |name: &str| fields.iter().find(|f| f.name == name).and_then(|f| f.as_str());
        assert_eq!(get("Title"), Some("LIGHTSOUT"));
        assert_eq!(get("Game ID"), Some("0x0021"));
        assert_eq!(get("Entry Point"), Some("0x2010"));
    }

    #[test]
    fn test_icon_from_alt_header() {
        let gcom = GameCom::new(MemFile::new(make_rom(HEADER_ADDRESS_ALT)).into_shared());
        assert!(gcom.is_valid());
        let icon = gcom.image(ImageType::IntIcon).unwrap();
        assert_eq!(icon.dimensions(), (64, 64));
        assert_eq!(*icon.get_pixel(0, 0), PALETTE[3]);
        assert_eq!(*icon.get_pixel(0, 1), PALETTE[0]);
    }

    #[test]
    fn test_rejects_other_addresses() {
        let rom = make_rom(HEADER_ADDRESS);
        let h = HEADER_ADDRESS as usize;
        let info = DetectionHeader { address: 0x100, data: &rom[h..h + HEADER_SIZE], ext: None, file_size: 0 };
        assert_eq!(GameCom::is_rom_supported(&info), None);
        let info = DetectionHeader { address: HEADER_ADDRESS, ..info };
        assert_eq!(GameCom::is_rom_supported(&info), Some(0));
    }

    #[test]
    fn test_column_major_decode() {
        let mut data = vec![0u8; ((BANK_W * (ICON_H - 1) + ICON_W) / 4) as usize];
        // Second source row, first byte: pixels 3,2,1,0 down column 1.
        data[(BANK_W / 4) as usize] = 0b1110_0100;
        let img = decode_icon(&data);
        assert_eq!(*img.get_pixel(1, 0), PALETTE[3]);
        assert_eq!(*img.get_pixel(1, 1), PALETTE[2]);
        assert_eq!(*img.get_pixel(1, 2), PALETTE[1]);
        assert_eq!(*img.get_pixel(1, 3), PALETTE[0]);
    }
}
