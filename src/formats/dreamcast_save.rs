//! Sega Dreamcast VMU save files.
//!
//! A save comes as a `.vms` data file, usually with a 108-byte `.vmi`
//! info file next to it. Either can be opened on its own; the detection
//! engine pairs them when both are present. Game files put the VMS
//! header at 0x200, data files at 0. A 160-byte `.vms` is an ICONDATA
//! file holding a monochrome VMU icon.

use image::{Rgba, RgbaImage};

use crate::file::SharedFile;
use crate::romdata::fields::{DateTimeFlags, StringFlags};
use crate::romdata::{
    DetectionHeader, FileType, FormatInfo, ImageFlags, ImageType, Property, RomData, RomDataBase,
    RomDataClass, RomFields, RomMetaData, SystemNameType,
};
use crate::util::{bytes_at, latin1, le_u16, le_u32, u8_at};
use crate::{Error, Result};

use super::pixels::{argb4444, decode_ci4, decode_mono};
use super::{lowercase_ext, read_exact_at, read_up_to};

pub const VMI_SIZE: usize = 108;
pub const ICONDATA_SIZE: usize = 160;
const VMS_HEADER_SIZE: usize = 0x80;
/// Offset of the VMS header in game files.
const GAME_HEADER_ADDRESS: u64 = 0x200;

pub const SUBTYPE_VMS: u32 = 0;
pub const SUBTYPE_VMI: u32 = 1;
pub const SUBTYPE_ICONDATA: u32 = 2;

mod vmi {
    pub const CHECKSUM: usize = 0x00;
    pub const DESCRIPTION: usize = 0x04;
    pub const COPYRIGHT: usize = 0x24;
    pub const CTIME: usize = 0x44;
    pub const VERSION: usize = 0x4C;
    pub const FILE_NUMBER: usize = 0x4E;
    pub const RESOURCE_NAME: usize = 0x50;
    pub const FILENAME: usize = 0x58;
    pub const MODE: usize = 0x64;
    pub const FILESIZE: usize = 0x68;

    pub const MODE_GAME: u16 = 1 << 1;
}

mod vms {
    pub const DESCRIPTION: usize = 0x00;
    pub const DC_DESCRIPTION: usize = 0x10;
    pub const APPLICATION: usize = 0x30;
    pub const ICON_COUNT: usize = 0x40;
    pub const ANIM_SPEED: usize = 0x42;
    pub const EYECATCH_TYPE: usize = 0x44;
    pub const CRC: usize = 0x46;
    pub const DATA_SIZE: usize = 0x48;
    pub const PALETTE: usize = 0x60;

    pub const ICON_DIM: u32 = 32;
    pub const ICON_BYTES: usize = 32 * 32 / 2;
    pub const EYECATCH_W: u32 = 72;
    pub const EYECATCH_H: u32 = 56;
}

mod icondata {
    pub const DESCRIPTION: usize = 0x00;
    pub const MONO_ICON: usize = 0x10;
    pub const MONO_ICON_BYTES: usize = 32 * 32 / 8;
}

const EYECATCH_NAMES: [&str; 4] = ["None", "ARGB4444", "256-color", "16-color"];

/// Plausibility check for a VMS header.
fn is_vms_header(h: &[u8]) -> bool {
    if h.len() < VMS_HEADER_SIZE {
        return false;
    }
    let icon_count = le_u16(h, vms::ICON_COUNT);
    let eyecatch = le_u16(h, vms::EYECATCH_TYPE);
    if !(1..=3).contains(&icon_count) || eyecatch > 3 {
        return false;
    }
    let text = bytes_at(h, vms::DESCRIPTION, vms::APPLICATION + 16);
    text.iter().all(|&c| c == 0 || c >= 0x20)
}

/// A VMI's checksum is its resource name ANDed with "SEGA".
fn is_vmi(h: &[u8]) -> bool {
    if h.len() < VMI_SIZE {
        return false;
    }
    (0..4).all(|i| h[vmi::CHECKSUM + i] == h[vmi::RESOURCE_NAME + i] & b"SEGA"[i])
}

fn is_icondata(h: &[u8]) -> bool {
    if h.len() < ICONDATA_SIZE {
        return false;
    }
    let mono = le_u32(h, icondata::MONO_ICON) as usize;
    mono >= 0x18 && mono + icondata::MONO_ICON_BYTES <= ICONDATA_SIZE
}

/// Dreamcast save parser.
pub struct DreamcastSave {
    base: RomDataBase,
    subtype: u32,
    /// VMS header and where it was found.
    vms: Option<(Vec<u8>, u64)>,
    vmi: Option<Vec<u8>>,
    icondata: Option<Vec<u8>>,
}

impl DreamcastSave {
    fn empty(file: SharedFile) -> Self {
        Self {
            base: RomDataBase::new(file),
            subtype: SUBTYPE_VMS,
            vms: None,
            vmi: None,
            icondata: None,
        }
    }

    /// Build from a `.vms` file and its `.vmi` companion. The VMS file is
    /// the one kept open for image loading.
    pub fn new_pair(vms_file: SharedFile, vmi_file: SharedFile) -> Self {
        let mut this = Self::empty(vms_file.clone());
        if let Err(e) = this.init_pair(&vms_file, &vmi_file) {
            this.base.reject(&e.to_string());
        }
        this
    }

    fn init_pair(&mut self, vms_file: &SharedFile, vmi_file: &SharedFile) -> Result<()> {
        let vmi = read_exact_at(vmi_file, 0, VMI_SIZE)?;
        if !is_vmi(&vmi) {
            return Err(Error::BadMagic);
        }
        let is_game = le_u16(&vmi, vmi::MODE) & vmi::MODE_GAME != 0;
        self.vmi = Some(vmi);

        if vms_file.size()? == ICONDATA_SIZE as u64 {
            let data = read_exact_at(vms_file, 0, ICONDATA_SIZE)?;
            if !is_icondata(&data) {
                return Err(Error::BadMagic);
            }
            self.icondata = Some(data);
            self.subtype = SUBTYPE_ICONDATA;
            self.base.set_valid(FileType::IconFile);
            return Ok(());
        }

        let offsets: &[u64] = if is_game { &[GAME_HEADER_ADDRESS] } else { &[0] };
        self.load_vms(vms_file, offsets)?;
        self.subtype = SUBTYPE_VMS;
        self.base.set_valid(FileType::SaveFile);
        Ok(())
    }

    fn init(&mut self, file: &SharedFile) -> Result<()> {
        let ext = lowercase_ext(file);
        let prefix = read_up_to(file, 0, GAME_HEADER_ADDRESS as usize + VMS_HEADER_SIZE)?;
        let info = DetectionHeader {
            address: 0,
            data: &prefix,
            ext: ext.as_deref(),
            file_size: file.size()?,
        };
        self.subtype = Self::is_rom_supported(&info).ok_or(Error::BadMagic)?;
        match self.subtype {
            SUBTYPE_VMI => {
                self.vmi = Some(prefix[..VMI_SIZE].to_vec());
                self.base.set_valid(FileType::SaveFile);
            }
            SUBTYPE_ICONDATA => {
                self.icondata = Some(prefix[..ICONDATA_SIZE].to_vec());
                self.base.set_valid(FileType::IconFile);
            }
            _ => {
                self.load_vms(file, &[0, GAME_HEADER_ADDRESS])?;
                self.base.set_valid(FileType::SaveFile);
            }
        }
        Ok(())
    }

    fn load_vms(&mut self, file: &SharedFile, offsets: &[u64]) -> Result<()> {
        for &offset in offsets {
            let Ok(header) = read_exact_at(file, offset, VMS_HEADER_SIZE) else {
                continue;
            };
            if is_vms_header(&header) {
                self.vms = Some((header, offset));
                return Ok(());
            }
        }
        Err(Error::InvalidField("VMS header"))
    }

    fn vms_header(&self) -> Option<&[u8]> {
        self.vms.as_ref().map(|(h, _)| h.as_slice())
    }

    /// VMI creation time. Stored as local time; returned as if UTC.
    fn vmi_ctime(&self) -> Option<i64> {
        let v = self.vmi.as_deref()?;
        let t = vmi::CTIME;
        let date = chrono::NaiveDate::from_ymd_opt(
            i32::from(le_u16(v, t)),
            u32::from(u8_at(v, t + 2)),
            u32::from(u8_at(v, t + 3)),
        )?;
        let time = date.and_hms_opt(
            u32::from(u8_at(v, t + 4)),
            u32::from(u8_at(v, t + 5)),
            u32::from(u8_at(v, t + 6)),
        )?;
        Some(time.and_utc().timestamp())
    }

    fn title(&self) -> Option<String> {
        if let Some(h) = self.vms_header() {
            return Some(latin1(bytes_at(h, vms::DC_DESCRIPTION, 32)));
        }
        if let Some(v) = self.vmi.as_deref() {
            return Some(latin1(bytes_at(v, vmi::DESCRIPTION, 32)));
        }
        self.icondata
            .as_deref()
            .map(|d| latin1(bytes_at(d, icondata::DESCRIPTION, 16)))
    }

    fn add_vms_fields(&self, fields: &mut RomFields, h: &[u8], offset: u64) {
        fields.add_field_string("VMS Description", &latin1(bytes_at(h, vms::DESCRIPTION, 16)), StringFlags::NONE);
        fields.add_field_string("DC Description", &latin1(bytes_at(h, vms::DC_DESCRIPTION, 32)), StringFlags::NONE);
        fields.add_field_string("Application", &latin1(bytes_at(h, vms::APPLICATION, 16)), StringFlags::NONE);
        fields.add_field_string(
            "File Type",
            if offset == GAME_HEADER_ADDRESS { "Game" } else { "Data" },
            StringFlags::NONE,
        );
        let icon_count = le_u16(h, vms::ICON_COUNT);
        fields.add_field_string("Icon Count", &icon_count.to_string(), StringFlags::NONE);
        if icon_count > 1 {
            fields.add_field_string(
                "Animation Speed",
                &le_u16(h, vms::ANIM_SPEED).to_string(),
                StringFlags::NONE,
            );
        }
        let eyecatch = usize::from(le_u16(h, vms::EYECATCH_TYPE));
        fields.add_field_string("Eyecatch", EYECATCH_NAMES[eyecatch.min(3)], StringFlags::NONE);
        if offset == GAME_HEADER_ADDRESS {
            // Game files do not use the CRC.
            fields.add_field_string("CRC", "N/A", StringFlags::NONE);
        } else {
            fields.add_field_string(
                "CRC",
                &format!("0x{:04X}", le_u16(h, vms::CRC)),
                StringFlags::MONOSPACE,
            );
        }
        fields.add_field_string(
            "Data Size",
            &humansize::format_size(u64::from(le_u32(h, vms::DATA_SIZE)), humansize::BINARY),
            StringFlags::NONE,
        );
    }

    fn add_vmi_fields(&self, fields: &mut RomFields, v: &[u8]) {
        fields.add_field_string("Description", &latin1(bytes_at(v, vmi::DESCRIPTION, 32)), StringFlags::NONE);
        fields.add_field_string("Copyright", &latin1(bytes_at(v, vmi::COPYRIGHT, 32)), StringFlags::NONE);
        fields.add_field_date_time("Creation Time", self.vmi_ctime(), DateTimeFlags::HAS_DATE | DateTimeFlags::HAS_TIME);
        fields.add_field_string("VMS Filename", &latin1(bytes_at(v, vmi::FILENAME, 12)), StringFlags::MONOSPACE);
        fields.add_field_string("Resource Name", &latin1(bytes_at(v, vmi::RESOURCE_NAME, 8)), StringFlags::MONOSPACE);
        fields.add_field_string(
            "Version",
            &format!("{} (file {})", le_u16(v, vmi::VERSION), le_u16(v, vmi::FILE_NUMBER)),
            StringFlags::NONE,
        );
        fields.add_field_bitfield("Mode", &["Copy Protect", "Game"], 0, u32::from(le_u16(v, vmi::MODE)));
        let size = le_u32(v, vmi::FILESIZE);
        fields.add_field_string("File Size", &format!("{} blocks", size.div_ceil(512)), StringFlags::NONE);
    }

    fn palette(h: &[u8]) -> [Rgba<u8>; 16] {
        let mut palette = [Rgba([0, 0, 0, 0]); 16];
        for (i, entry) in palette.iter_mut().enumerate() {
            *entry = argb4444(le_u16(h, vms::PALETTE + i * 2));
        }
        palette
    }

    fn load_icon(&self) -> Result<RgbaImage> {
        if let Some(d) = self.icondata.as_deref() {
            let off = le_u32(d, icondata::MONO_ICON) as usize;
            return decode_mono(vms::ICON_DIM, vms::ICON_DIM, bytes_at(d, off, icondata::MONO_ICON_BYTES));
        }
        let (h, offset) = self.vms.as_ref().ok_or(Error::NotSupported)?;
        let file = self.base.require_file()?;
        let bitmap = read_exact_at(&file, offset + VMS_HEADER_SIZE as u64, vms::ICON_BYTES)?;
        decode_ci4(vms::ICON_DIM, vms::ICON_DIM, &bitmap, &Self::palette(h))
    }

    fn load_eyecatch(&self) -> Result<RgbaImage> {
        let (h, offset) = self.vms.as_ref().ok_or(Error::NotSupported)?;
        let icons = usize::from(le_u16(h, vms::ICON_COUNT)) * vms::ICON_BYTES;
        let start = offset + (VMS_HEADER_SIZE + icons) as u64;
        let (w, hgt) = (vms::EYECATCH_W, vms::EYECATCH_H);
        let px = (w * hgt) as usize;
        let file = self.base.require_file()?;

        match le_u16(h, vms::EYECATCH_TYPE) {
            1 => {
                let data = read_exact_at(&file, start, px * 2)?;
                Ok(RgbaImage::from_fn(w, hgt, |x, y| {
                    let i = ((y * w + x) * 2) as usize;
                    argb4444(u16::from_le_bytes([data[i], data[i + 1]]))
                }))
            }
            2 => {
                let data = read_exact_at(&file, start, 512 + px)?;
                Ok(RgbaImage::from_fn(w, hgt, |x, y| {
                    let idx = data[512 + (y * w + x) as usize] as usize;
                    argb4444(u16::from_le_bytes([data[idx * 2], data[idx * 2 + 1]]))
                }))
            }
            3 => {
                let data = read_exact_at(&file, start, 32 + px / 2)?;
                let mut palette = [Rgba([0, 0, 0, 0]); 16];
                for (i, entry) in palette.iter_mut().enumerate() {
                    *entry = argb4444(le_u16(&data, i * 2));
                }
                decode_ci4(w, hgt, &data[32..], &palette)
            }
            _ => Err(Error::NotSupported),
        }
    }
}

impl RomDataClass for DreamcastSave {
    const INFO: &'static FormatInfo = &FormatInfo {
        class_name: "DreamcastSave",
        extensions: &[".vms", ".vmi", ".dci"],
        mime_types: &["application/x-dreamcast-vms", "application/x-dreamcast-vmi"],
    };

    fn is_rom_supported(info: &DetectionHeader) -> Option<u32> {
        if info.address != 0 {
            return None;
        }
        match info.ext? {
            ".vmi" if info.file_size == VMI_SIZE as u64 && is_vmi(info.data) => Some(SUBTYPE_VMI),
            ".vms" if info.file_size == ICONDATA_SIZE as u64 => {
                is_icondata(info.data).then_some(SUBTYPE_ICONDATA)
            }
            ".vms" => {
                let at_zero = is_vms_header(info.data);
                let at_game = info
                    .bytes_at(GAME_HEADER_ADDRESS as usize, VMS_HEADER_SIZE)
                    .is_some_and(is_vms_header);
                (at_zero || at_game).then_some(SUBTYPE_VMS)
            }
            _ => None,
        }
    }

    fn new(file: SharedFile) -> Self {
        let mut this = Self::empty(file.clone());
        if let Err(e) = this.init(&file) {
            this.base.reject(&e.to_string());
        }
        this
    }
}

impl RomData for DreamcastSave {
    fn base(&self) -> &RomDataBase {
        &self.base
    }

    fn class_name(&self) -> &'static str {
        Self::INFO.class_name
    }

    fn system_name(&self, kind: SystemNameType) -> Option<&'static str> {
        self.is_valid().then_some(match kind {
            SystemNameType::Long => "Sega Dreamcast",
            SystemNameType::Short => "Dreamcast",
            SystemNameType::Abbreviation => "DC",
        })
    }

    fn load_field_data(&self, fields: &mut RomFields) -> Result<()> {
        fields.reserve(16);
        if let Some((h, offset)) = &self.vms {
            fields.set_tab_name(0, "VMS");
            self.add_vms_fields(fields, h, *offset);
        } else if let Some(d) = self.icondata.as_deref() {
            fields.set_tab_name(0, "ICONDATA");
            fields.add_field_string("Description", &latin1(bytes_at(d, icondata::DESCRIPTION, 16)), StringFlags::NONE);
        }

        if let Some(v) = self.vmi.as_deref() {
            if self.vms.is_some() || self.icondata.is_some() {
                fields.add_tab("VMI");
            } else {
                fields.set_tab_name(0, "VMI");
            }
            self.add_vmi_fields(fields, v);
        }
        Ok(())
    }

    fn load_metadata(&self, metadata: &mut RomMetaData) -> Result<()> {
        if let Some(title) = self.title() {
            metadata.add_string(Property::Title, &title);
        }
        if let Some(h) = self.vms_header() {
            metadata.add_string(Property::Description, &latin1(bytes_at(h, vms::DESCRIPTION, 16)));
        }
        if let Some(v) = self.vmi.as_deref() {
            metadata.add_string(Property::Copyright, &latin1(bytes_at(v, vmi::COPYRIGHT, 32)));
        }
        if let Some(ts) = self.vmi_ctime() {
            metadata.add_timestamp(Property::CreationDate, ts);
        }
        Ok(())
    }

    fn supported_image_types(&self) -> &'static [ImageType] {
        match self.subtype {
            SUBTYPE_VMI => &[],
            SUBTYPE_ICONDATA => &[ImageType::IntIcon],
            _ => &[ImageType::IntIcon, ImageType::IntBanner],
        }
    }

    fn image_flags(&self, image_type: ImageType) -> ImageFlags {
        let animated = self
            .vms_header()
            .is_some_and(|h| le_u16(h, vms::ICON_COUNT) > 1);
        match image_type {
            ImageType::IntIcon if animated => ImageFlags::RESCALE_NEAREST | ImageFlags::ICON_ANIMATED,
            ImageType::IntIcon | ImageType::IntBanner => ImageFlags::RESCALE_NEAREST,
            _ => ImageFlags::NONE,
        }
    }

    fn load_internal_image(&self, image_type: ImageType) -> Result<RgbaImage> {
        match image_type {
            ImageType::IntIcon => self.load_icon(),
            ImageType::IntBanner => self.load_eyecatch(),
            _ => Err(Error::NotSupported),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::file::MemFile;
    use crate::romdata::fields::FieldData;

    /// A data-file VMS with one icon whose palette entry 1 is opaque red
    /// and whose first pixel uses it.
    pub(crate) fn make_vms() -> Vec<u8> {
        let mut data = vec![0u8; 0x400];
        data[vms::DESCRIPTION..vms::DESCRIPTION + 8].copy_from_slice(b"SONIC AD");
        data[vms::DC_DESCRIPTION..vms::DC_DESCRIPTION + 15].copy_from_slice(b"Sonic Adventure");
        data[vms::APPLICATION..vms::APPLICATION + 4].copy_from_slice(b"SEGA");
        data[vms::ICON_COUNT] = 1;
        data[vms::CRC..vms::CRC + 2].copy_from_slice(&0x1234u16.to_le_bytes());
        data[vms::DATA_SIZE..vms::DATA_SIZE + 4].copy_from_slice(&0x200u32.to_le_bytes());
        data[vms::PALETTE + 2..vms::PALETTE + 4].copy_from_slice(&0xFF00u16.to_le_bytes());
        data[VMS_HEADER_SIZE] = 0x10;
        data
    }

    pub(crate) fn make_vmi() -> Vec<u8> {
        let mut data = vec![0u8; VMI_SIZE];
        data[vmi::RESOURCE_NAME..vmi::RESOURCE_NAME + 8].copy_from_slice(b"SONICADV");
        for i in 0..4 {
            data[vmi::CHECKSUM + i] = data[vmi::RESOURCE_NAME + i] & b"SEGA"[i];
        }
        data[vmi::DESCRIPTION..vmi::DESCRIPTION + 9].copy_from_slice(b"Save data");
        data[vmi::COPYRIGHT..vmi::COPYRIGHT + 4].copy_from_slice(b"SEGA");
        data[vmi::CTIME..vmi::CTIME + 2].copy_from_slice(&1999u16.to_le_bytes());
        data[vmi::CTIME + 2..vmi::CTIME + 7].copy_from_slice(&[12, 31, 23, 59, 0]);
        data[vmi::FILENAME..vmi::FILENAME + 12].copy_from_slice(b"SONICADV_SYS");
        data[vmi::FILESIZE..vmi::FILESIZE + 4].copy_from_slice(&0x400u32.to_le_bytes());
        data
    }

    #[test]
    fn test_standalone_vms() {
        let file = MemFile::new(make_vms()).with_name("SONIC.VMS").into_shared();
        let dc = DreamcastSave::new(file);
        assert!(dc.is_valid());
        assert_eq!(dc.file_type(), FileType::SaveFile);
        let fields = dc.fields();
        assert_eq!(fields.tab_name(0), Some("VMS"));
        let get = |name: &str| fields.iter().find(|f| f.name == name).and_then(|f| f.as_str());
        assert_eq!(get("DC Description"), Some("Sonic Adventure"));
        assert_eq!(get("File Type"), Some("Data"));
        assert_eq!(get("CRC"), Some("0x1234"));

        let icon = dc.image(ImageType::IntIcon).unwrap();
        assert_eq!(icon.get_pixel(0, 0).0, [0xFF, 0, 0, 0xFF]);
        // No eyecatch.
        assert!(dc.image(ImageType::IntBanner).is_none());
    }

    #[test]
    fn test_standalone_vmi() {
        let file = MemFile::new(make_vmi()).with_name("sonic.vmi").into_shared();
        let dc = DreamcastSave::new(file);
        assert!(dc.is_valid());
        let fields = dc.fields();
        assert_eq!(fields.tab_name(0), Some("VMI"));
        let ctime = fields.iter().find(|f| f.name == "Creation Time").unwrap();
        let FieldData::DateTime { timestamp, .. } = ctime.data else {
            panic!("expected date");
        };
        // 1999-12-31 23:59:00
        assert_eq!(timestamp, Some(946_684_740));
        let size = fields.iter().find(|f| f.name == "File Size").unwrap();
        assert_eq!(size.as_str(), Some("2 blocks"));
    }

    #[test]
    fn test_vmi_checksum_required() {
        let mut data = make_vmi();
        data[vmi::CHECKSUM] ^= 0xFF;
        let info = DetectionHeader { address: 0, data: &data, ext: Some(".vmi"), file_size: VMI_SIZE as u64 };
        assert_eq!(DreamcastSave::is_rom_supported(&info), None);
    }

    #[test]
    fn test_pair_merges_tabs() {
        let vms = MemFile::new(make_vms()).with_name("SONIC.VMS").into_shared();
        let vmi = MemFile::new(make_vmi()).with_name("SONIC.VMI").into_shared();
        let dc = DreamcastSave::new_pair(vms, vmi);
        assert!(dc.is_valid());
        let fields = dc.fields();
        assert_eq!(fields.tab_count(), 2);
        assert_eq!(fields.tab_name(1), Some("VMI"));
        assert!(fields.fields_in_tab(1).any(|f| f.name == "Copyright"));
        assert_eq!(
            dc.metadata().get(Property::Title).and_then(|v| v.as_str()),
            Some("Sonic Adventure")
        );
    }

    #[test]
    fn test_game_file_header_offset() {
        let mut game = vec![0u8; GAME_HEADER_ADDRESS as usize];
        game.extend(make_vms());
        let mut vmi = make_vmi();
        vmi[vmi::MODE] = vmi::MODE_GAME as u8;
        let dc = DreamcastSave::new_pair(
            MemFile::new(game).with_name("GAME.VMS").into_shared(),
            MemFile::new(vmi).into_shared(),
        );
        assert!(dc.is_valid());
        let fields = dc.fields();
        let get = |name: &str| fields.iter().find(|f| f.name == name).and_then(|f| f.as_str());
        assert_eq!(get("File Type"), Some("Game"));
        assert_eq!(get("CRC"), Some("N/A"));
    }

    #[test]
    fn test_icondata_mono_icon() {
        let mut data = vec![0u8; ICONDATA_SIZE];
        data[..8].copy_from_slice(b"MY ICON!");
        data[icondata::MONO_ICON..icondata::MONO_ICON + 4].copy_from_slice(&0x20u32.to_le_bytes());
        data[0x20] = 0x80;
        let dc = DreamcastSave::new(MemFile::new(data).with_name("ICONDATA.VMS").into_shared());
        assert!(dc.is_valid());
        assert_eq!(dc.file_type(), FileType::IconFile);
        let icon = dc.image(ImageType::IntIcon).unwrap();
        assert_eq!(icon.get_pixel(0, 0).0, [0, 0, 0, 0xFF]);
        assert_eq!(icon.get_pixel(1, 0).0, [0xFF, 0xFF, 0xFF, 0xFF]);
    }
}
