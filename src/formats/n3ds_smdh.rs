//! Nintendo 3DS SMDH icon/title files.
//!
//! An SMDH is 0x36C0 bytes: a header with sixteen UTF-16 title slots and
//! per-region settings, followed by a 24x24 and a 48x48 icon in tiled
//! RGB565.

use std::collections::BTreeMap;

use image::RgbaImage;

use crate::file::SharedFile;
use crate::romdata::fields::{age, lang_code, AgeRatings, ListData, StringFlags};
use crate::romdata::{
    DetectionHeader, FileType, FormatInfo, ImageFlags, ImageType, Property, RomData, RomDataBase,
    RomDataClass, RomFields, RomMetaData, SystemNameType,
};
use crate::util::{bytes_at, le_u32, utf16le};
use crate::{Error, Result};

use super::pixels::decode_n3ds_tiled_rgb565;
use super::read_exact_at;

/// Smallest header the acceptance test looks at.
const MIN_DETECT_SIZE: usize = 512;
/// Full file size.
pub const SMDH_SIZE: usize = 0x36C0;

const OFF_TITLES: usize = 0x0008;
const TITLE_SLOT_SIZE: usize = 0x200;
const TITLE_SHORT_LEN: usize = 0x80;
const TITLE_LONG_LEN: usize = 0x100;
const TITLE_PUBLISHER_LEN: usize = 0x80;
const OFF_RATINGS: usize = 0x2008;
const OFF_REGION_CODE: usize = 0x2018;
const OFF_FLAGS: usize = 0x2028;
const OFF_ICON_LARGE: usize = 0x24C0;
const ICON_LARGE_DIM: u32 = 48;

/// Which rating slots the 3DS uses.
const VALID_RATINGS: u16 = 0x07DB;

const LANGUAGES: [&[u8]; 12] = [
    b"ja", b"en", b"fr", b"de", b"it", b"es", b"hans", b"ko", b"nl", b"pt", b"ru", b"hant",
];
const LANG_JAPANESE: usize = 0;
const LANG_ENGLISH: usize = 1;

struct Title {
    short: String,
    long: String,
    publisher: String,
}

/// Nintendo 3DS SMDH parser.
pub struct Nintendo3dsSmdh {
    base: RomDataBase,
    data: Vec<u8>,
}

impl Nintendo3dsSmdh {
    fn init(&mut self, file: &SharedFile) -> Result<()> {
        let data = read_exact_at(file, 0, SMDH_SIZE)?;
        let info = DetectionHeader {
            address: 0,
            data: &data,
            ext: None,
            file_size: file.size()?,
        };
        Self::is_rom_supported(&info).ok_or(Error::BadMagic)?;
        self.data = data;
        self.base.set_valid(FileType::IconFile);
        Ok(())
    }

    fn title(&self, lang: usize) -> Title {
        let slot = OFF_TITLES + lang * TITLE_SLOT_SIZE;
        Title {
            short: utf16le(bytes_at(&self.data, slot, TITLE_SHORT_LEN)),
            long: utf16le(bytes_at(&self.data, slot + TITLE_SHORT_LEN, TITLE_LONG_LEN)),
            publisher: utf16le(bytes_at(
                &self.data,
                slot + TITLE_SHORT_LEN + TITLE_LONG_LEN,
                TITLE_PUBLISHER_LEN,
            )),
        }
    }

    /// English if present, otherwise Japanese.
    fn default_title(&self) -> Title {
        let en = self.title(LANG_ENGLISH);
        if en.short.is_empty() {
            self.title(LANG_JAPANESE)
        } else {
            en
        }
    }

    fn age_ratings(&self) -> AgeRatings {
        let mut ratings: AgeRatings = [0; 16];
        for (i, rating) in ratings.iter_mut().enumerate() {
            if VALID_RATINGS & (1 << i) == 0 {
                continue;
            }
            let raw = self.data[OFF_RATINGS + i];
            *rating = if raw & 0x80 == 0 {
                0
            } else if raw & 0x40 != 0 {
                age::ACTIVE | age::PENDING
            } else if raw & 0x20 != 0 {
                age::ACTIVE | age::NO_RESTRICTION
            } else {
                age::ACTIVE | u16::from(raw & 0x1F)
            };
        }
        ratings
    }
}

impl RomDataClass for Nintendo3dsSmdh {
    const INFO: &'static FormatInfo = &FormatInfo {
        class_name: "Nintendo3DS_SMDH",
        extensions: &[".smdh"],
        mime_types: &["application/x-nintendo-3ds-smdh"],
    };

    fn is_rom_supported(info: &DetectionHeader) -> Option<u32> {
        if info.address != 0 || info.size() < MIN_DETECT_SIZE || !info.has_magic(0, b"SMDH") {
            return None;
        }
        Some(0)
    }

    fn new(file: SharedFile) -> Self {
        let mut this = Self {
            base: RomDataBase::new(file.clone()),
            data: Vec::new(),
        };
        if let Err(e) = this.init(&file) {
            this.base.reject(&e.to_string());
        }
        this
    }
}

impl RomData for Nintendo3dsSmdh {
    fn base(&self) -> &RomDataBase {
        &self.base
    }

    fn class_name(&self) -> &'static str {
        Self::INFO.class_name
    }

    fn system_name(&self, kind: SystemNameType) -> Option<&'static str> {
        self.is_valid().then_some(match kind {
            SystemNameType::Long => "Nintendo 3DS",
            SystemNameType::Short => "Nintendo 3DS",
            SystemNameType::Abbreviation => "3DS",
        })
    }

    fn load_field_data(&self, fields: &mut RomFields) -> Result<()> {
        fields.reserve(7);
        fields.set_tab_name(0, "SMDH");

        let title = self.default_title();
        if !title.short.is_empty() {
            fields.add_field_string("Title", &title.short, StringFlags::NONE);
        }
        if !title.long.is_empty() {
            fields.add_field_string("Full Title", &title.long, StringFlags::NONE);
        }
        if !title.publisher.is_empty() {
            fields.add_field_string("Publisher", &title.publisher, StringFlags::NONE);
        }

        let mut per_lang = BTreeMap::new();
        for (i, code) in LANGUAGES.iter().enumerate() {
            let t = self.title(i);
            if t.short.is_empty() {
                continue;
            }
            per_lang.insert(lang_code(code), vec![vec![t.short, t.long, t.publisher]]);
        }
        if per_lang.len() > 1 {
            fields.add_field_list_data(
                "All Titles",
                ListData::new_multi(Some(&["Title", "Full Title", "Publisher"]), per_lang),
            );
        }

        fields.add_field_bitfield(
            "Region Code",
            &["Japan", "USA", "Europe", "Australia", "China", "South Korea", "Taiwan"],
            3,
            le_u32(&self.data, OFF_REGION_CODE),
        );

        fields.add_field_bitfield(
            "Flags",
            &[
                "Visible",
                "Auto-Boot",
                "Allow 3D",
                "Require EULA",
                "Autosave on Exit",
                "Extended Banner",
                "Rating Required",
                "Uses Save Data",
                "Record Usage",
                "",
                "No Save Backups",
                "",
                "New3DS Exclusive",
            ],
            3,
            le_u32(&self.data, OFF_FLAGS),
        );

        fields.add_field_age_ratings("Age Ratings", &self.age_ratings());
        Ok(())
    }

    fn load_metadata(&self, metadata: &mut RomMetaData) -> Result<()> {
        let title = self.default_title();
        let main = if title.long.is_empty() { &title.short } else { &title.long };
        metadata.add_string(Property::Title, main);
        metadata.add_string(Property::Publisher, &title.publisher);
        Ok(())
    }

    fn supported_image_types(&self) -> &'static [ImageType] {
        &[ImageType::IntIcon]
    }

    fn image_flags(&self, image_type: ImageType) -> ImageFlags {
        match image_type {
            ImageType::IntIcon => ImageFlags::RESCALE_NEAREST,
            _ => ImageFlags::NONE,
        }
    }

    fn load_internal_image(&self, image_type: ImageType) -> Result<RgbaImage> {
        if image_type != ImageType::IntIcon {
            return Err(Error::NotSupported);
        }
        let size = (ICON_LARGE_DIM * ICON_LARGE_DIM * 2) as usize;
        decode_n3ds_tiled_rgb565(
            ICON_LARGE_DIM,
            ICON_LARGE_DIM,
            bytes_at(&self.data, OFF_ICON_LARGE, size),
        )
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::file::MemFile;
    use crate::romdata::fields::FieldData;

    fn put_utf16(buf: &mut [u8], off: usize, s: &str) {
        for (i, unit) in s.encode_utf16().enumerate() {
            buf[off + i * 2..off + i * 2 + 2].copy_from_slice(&unit.to_le_bytes());
        }
    }

    pub(crate) fn make_smdh() -> Vec<u8> {
        let mut data = vec![0u8; SMDH_SIZE];
        data[0..4].copy_from_slice(b"SMDH");
        let en = OFF_TITLES + LANG_ENGLISH * TITLE_SLOT_SIZE;
        put_utf16(&mut data, en, "Puzzle");
        put_utf16(&mut data, en + TITLE_SHORT_LEN, "Puzzle Deluxe");
        put_utf16(&mut data, en + TITLE_SHORT_LEN + TITLE_LONG_LEN, "Homebrew Inc.");
        let ja = OFF_TITLES + LANG_JAPANESE * TITLE_SLOT_SIZE;
        put_utf16(&mut data, ja, "\u{30D1}\u{30BA}\u{30EB}");
        // CERO B, ESRB pending.
        data[OFF_RATINGS] = 0x80 | 12;
        data[OFF_RATINGS + 1] = 0x80 | 0x40;
        data[OFF_REGION_CODE] = 0x07;
        // Red top-left pixel of the large icon.
        data[OFF_ICON_LARGE..OFF_ICON_LARGE + 2].copy_from_slice(&0xF800u16.to_le_bytes());
        data
    }

    #[test]
    fn test_fields_and_ratings() {
        let smdh = Nintendo3dsSmdh::new(MemFile::new(make_smdh()).into_shared());
        assert!(smdh.is_valid());
        assert_eq!(smdh.file_type(), FileType::IconFile);

        let fields = smdh.fields();
        assert_eq!(fields.tab_name(0), Some("SMDH"));
        let title = fields.iter().find(|f| f.name == "Title").unwrap();
        assert_eq!(title.as_str(), Some("Puzzle"));

        let ratings = fields.iter().find(|f| f.name == "Age Ratings").unwrap();
        let FieldData::AgeRatings(r) = &ratings.data else {
            panic!("expected age ratings");
        };
        assert_eq!(age::decode_all(r, false), "CERO=B, ESRB=RP");

        let titles = fields.iter().find(|f| f.name == "All Titles").unwrap();
        let FieldData::ListData(list) = &titles.data else {
            panic!("expected list data");
        };
        assert_eq!(list.rows.default_rows()[0][1], "Puzzle Deluxe");
    }

    #[test]
    fn test_icon() {
        let smdh = Nintendo3dsSmdh::new(MemFile::new(make_smdh()).into_shared());
        let icon = smdh.image(ImageType::IntIcon).unwrap();
        assert_eq!(icon.dimensions(), (48, 48));
        assert_eq!(icon.get_pixel(0, 0).0, [0xFF, 0, 0, 0xFF]);
        // Cached.
        assert!(std::sync::Arc::ptr_eq(&icon, &smdh.image(ImageType::IntIcon).unwrap()));
        assert!(smdh.image(ImageType::IntBanner).is_none());
    }

    #[test]
    fn test_truncated_file_accepted_but_invalid() {
        let mut data = make_smdh();
        data.truncate(0x400);
        let info = DetectionHeader { address: 0, data: &data, ext: None, file_size: 0x400 };
        assert_eq!(Nintendo3dsSmdh::is_rom_supported(&info), Some(0));
        let smdh = Nintendo3dsSmdh::new(MemFile::new(data).into_shared());
        assert!(!smdh.is_valid());
    }
}
