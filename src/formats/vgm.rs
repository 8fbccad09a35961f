//! Video Game Music logs.
//!
//! The GD3 tag block is located through a relative offset in the header
//! and read lazily, each time fields or metadata are built.

use crate::file::SharedFile;
use crate::romdata::fields::{Base, StringFlags};
use crate::romdata::{
    DetectionHeader, FileType, FormatInfo, Property, RomData, RomDataBase, RomDataClass, RomFields,
    RomMetaData, SystemNameType,
};
use crate::util::{le_u16, le_u32, u8_at, utf16le};
use crate::{Error, Result};

use super::{format_duration_ms, read_exact_at, read_up_to};

const MIN_HEADER_SIZE: usize = 0x40;
const HEADER_SIZE: usize = 0x100;
const SAMPLE_RATE: u64 = 44100;

const OFF_VERSION: usize = 0x08;
const OFF_SN76489_CLK: usize = 0x0C;
const OFF_YM2413_CLK: usize = 0x10;
const OFF_GD3: usize = 0x14;
const OFF_SAMPLE_COUNT: usize = 0x18;
const OFF_LOOP_OFFSET: usize = 0x1C;
const OFF_LOOP_SAMPLES: usize = 0x20;
const OFF_FRAME_RATE: usize = 0x24;
const OFF_SN76489_LFSR: usize = 0x28;
const OFF_SN76489_WIDTH: usize = 0x2A;
const OFF_YM2612_CLK: usize = 0x2C;
const OFF_YM2151_CLK: usize = 0x30;

const GD3_MAGIC: &[u8] = b"Gd3 ";
const GD3_HEADER_SIZE: usize = 12;
const GD3_MAX_LENGTH: usize = 16 * 1024;

/// GD3 string slots, English and Japanese alternating.
mod gd3 {
    pub const TRACK: usize = 0;
    pub const GAME: usize = 2;
    pub const SYSTEM: usize = 4;
    pub const COMPOSER: usize = 6;
    pub const RELEASE_DATE: usize = 8;
    pub const RIPPER: usize = 9;
    pub const NOTES: usize = 10;
}

fn samples_to_ms(samples: u32) -> u64 {
    u64::from(samples) * 1000 / SAMPLE_RATE
}

/// Clock rate with a unit, e.g. `3.579545 MHz`.
fn format_clock_rate(hz: u32) -> String {
    match hz {
        1_000_000.. => format!("{}.{:06} MHz", hz / 1_000_000, hz % 1_000_000),
        1_000.. => format!("{}.{:03} kHz", hz / 1_000, hz % 1_000),
        _ => format!("{hz} Hz"),
    }
}

/// VGM parser.
pub struct Vgm {
    base: RomDataBase,
    header: Vec<u8>,
}

impl Vgm {
    fn init(&mut self, file: &SharedFile) -> Result<()> {
        let data = read_up_to(file, 0, HEADER_SIZE)?;
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

    fn version(&self) -> u32 {
        le_u32(&self.header, OFF_VERSION)
    }

    /// Header fields past the one a file's version defines read as zero.
    fn field_u32(&self, off: usize, min_version: u32) -> u32 {
        if self.version() < min_version {
            return 0;
        }
        le_u32(&self.header, off)
    }

    /// Read the GD3 strings. An empty vector means no usable tags.
    fn load_gd3(&self) -> Result<Vec<String>> {
        let rel = le_u32(&self.header, OFF_GD3);
        if rel == 0 {
            return Ok(Vec::new());
        }
        let addr = u64::from(rel) + OFF_GD3 as u64;
        let file = self.base.require_file()?;

        let hdr = read_exact_at(&file, addr, GD3_HEADER_SIZE)?;
        if &hdr[..4] != GD3_MAGIC || le_u32(&hdr, 4) < 0x0100 {
            return Err(Error::BadMagic);
        }
        let length = le_u32(&hdr, 8) as usize;
        if length % 2 != 0 || length < 11 * 2 || length > GD3_MAX_LENGTH {
            return Err(Error::InvalidField("GD3 length"));
        }
        let data = read_exact_at(&file, addr + GD3_HEADER_SIZE as u64, length)?;
        if data[length - 2..] != [0, 0] {
            return Err(Error::InvalidField("GD3 terminator"));
        }

        let mut strings = Vec::with_capacity(11);
        let mut start = 0;
        for (i, unit) in data.chunks_exact(2).enumerate() {
            if unit == [0, 0] {
                strings.push(utf16le(&data[start..i * 2]));
                start = (i + 1) * 2;
            }
        }
        Ok(strings)
    }
}

impl RomDataClass for Vgm {
    const INFO: &'static FormatInfo = &FormatInfo {
        class_name: "VGM",
        extensions: &[".vgm", ".vgz"],
        mime_types: &["audio/x-vgm"],
    };

    fn is_rom_supported(info: &DetectionHeader) -> Option<u32> {
        if info.address != 0 || info.size() < MIN_HEADER_SIZE || !info.has_magic(0, b"Vgm ") {
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

impl RomData for Vgm {
    fn base(&self) -> &RomDataBase {
        &self.base
    }

    fn class_name(&self) -> &'static str {
        Self::INFO.class_name
    }

    fn system_name(&self, kind: SystemNameType) -> Option<&'static str> {
        self.is_valid().then_some(match kind {
            SystemNameType::Long => "Video Game Music",
            SystemNameType::Short | SystemNameType::Abbreviation => "VGM",
        })
    }

    fn load_field_data(&self, fields: &mut RomFields) -> Result<()> {
        let h = &self.header;
        let version = self.version();
        fields.reserve(16);

        fields.add_field_string(
            "VGM Version",
            &format!("{:x}.{:02x}", version >> 8, version & 0xFF),
            StringFlags::NONE,
        );

        match self.load_gd3() {
            Ok(gd3) => {
                for (name, slot) in [
                    ("Track Name", gd3::TRACK),
                    ("Game Name", gd3::GAME),
                    ("System Name", gd3::SYSTEM),
                    ("Composer", gd3::COMPOSER),
                    ("Release Date", gd3::RELEASE_DATE),
                    ("VGM Ripper", gd3::RIPPER),
                    ("Notes", gd3::NOTES),
                ] {
                    if let Some(s) = gd3.get(slot).filter(|s| !s.is_empty()) {
                        fields.add_field_string(name, s, StringFlags::NONE);
                    }
                }
            }
            Err(e) => tracing::debug!(error = %e, "GD3 tags not loaded"),
        }

        fields.add_field_string(
            "Duration",
            &format_duration_ms(samples_to_ms(le_u32(h, OFF_SAMPLE_COUNT))),
            StringFlags::NONE,
        );
        let loop_offset = le_u32(h, OFF_LOOP_OFFSET);
        if loop_offset != 0 {
            fields.add_field_string_numeric(
                "Loop Offset",
                loop_offset.wrapping_add(OFF_LOOP_OFFSET as u32),
                Base::Hex,
                8,
                StringFlags::MONOSPACE,
            );
            fields.add_field_string(
                "Loop Length",
                &format_duration_ms(samples_to_ms(le_u32(h, OFF_LOOP_SAMPLES))),
                StringFlags::NONE,
            );
        }

        let frame_rate = self.field_u32(OFF_FRAME_RATE, 0x0101);
        if frame_rate != 0 {
            fields.add_field_string_numeric("Frame Rate", frame_rate, Base::Dec, 0, StringFlags::NONE);
        }

        let sn76489 = le_u32(h, OFF_SN76489_CLK);
        if sn76489 != 0 {
            let chip = if sn76489 & 0xC000_0000 == 0xC000_0000 { "T6W28" } else { "SN76489" };
            fields.add_field_string(
                &format!("{chip} Clock Rate"),
                &format_clock_rate(sn76489 & !0xC000_0000),
                StringFlags::NONE,
            );
            let (mut feedback, mut width) = (0x0009u16, 16u8);
            if version >= 0x0110 {
                let f = le_u16(h, OFF_SN76489_LFSR);
                if f != 0 {
                    feedback = f;
                }
                let w = u8_at(h, OFF_SN76489_WIDTH);
                if w != 0 {
                    width = w;
                }
            }
            fields.add_field_string_numeric(
                &format!("{chip} LFSR Pattern"),
                u32::from(feedback),
                Base::Hex,
                4,
                StringFlags::MONOSPACE,
            );
            fields.add_field_string_numeric(&format!("{chip} LFSR Width"), u32::from(width), Base::Dec, 0, StringFlags::NONE);
        }

        for (chip, clock) in [
            ("YM2413", le_u32(h, OFF_YM2413_CLK)),
            ("YM2612", self.field_u32(OFF_YM2612_CLK, 0x0110)),
            ("YM2151", self.field_u32(OFF_YM2151_CLK, 0x0110)),
        ] {
            if clock != 0 {
                fields.add_field_string(&format!("{chip} Clock Rate"), &format_clock_rate(clock), StringFlags::NONE);
            }
        }
        Ok(())
    }

    fn load_metadata(&self, metadata: &mut RomMetaData) -> Result<()> {
        metadata.add_integer(
            Property::Duration,
            samples_to_ms(le_u32(&self.header, OFF_SAMPLE_COUNT)) as i64,
        );

        let gd3 = self.load_gd3()?;
        let get = |slot: usize| gd3.get(slot).map(String::as_str).unwrap_or("");
        metadata.add_string(Property::Title, get(gd3::TRACK));
        metadata.add_string(Property::Album, get(gd3::GAME));
        metadata.add_string(Property::Composer, get(gd3::COMPOSER));
        let year = get(gd3::RELEASE_DATE).get(..4).and_then(|y| y.parse::<u64>().ok());
        if let Some(year) = year {
            metadata.add_unsigned(Property::ReleaseYear, year);
        }
        metadata.add_string(Property::Comment, get(gd3::NOTES));
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::file::MemFile;

    fn push_utf16(out: &mut Vec<u8>, s: &str) {
        for unit in s.encode_utf16() {
            out.extend_from_slice(&unit.to_le_bytes());
        }
        out.extend_from_slice(&[0, 0]);
    }

    /// A v1.10 VGM with 90 seconds of samples, an SN76489 and a GD3 block.
    pub(crate) fn make_vgm() -> Vec<u8> {
        let mut data = vec![0u8; 0x100];
        data[0..4].copy_from_slice(b"Vgm ");
        data[OFF_VERSION..OFF_VERSION + 4].copy_from_slice(&0x0110u32.to_le_bytes());
        data[OFF_SN76489_CLK..OFF_SN76489_CLK + 4].copy_from_slice(&3_579_545u32.to_le_bytes());
        data[OFF_SAMPLE_COUNT..OFF_SAMPLE_COUNT + 4].copy_from_slice(&(90 * 44100u32).to_le_bytes());
        let gd3_rel = (0x100 - OFF_GD3) as u32;
        data[OFF_GD3..OFF_GD3 + 4].copy_from_slice(&gd3_rel.to_le_bytes());

        let mut strings = Vec::new();
        for s in [
            "Green Hill Zone", "", "Sonic the Hedgehog", "", "Sega Master System", "", "Yuzo Koshiro", "",
            "1991/10/25", "ripper", "",
        ] {
            push_utf16(&mut strings, s);
        }
        data.extend_from_slice(GD3_MAGIC);
        data.extend_from_slice(&0x0100u32.to_le_bytes());
        data.extend_from_slice(&(strings.len() as u32).to_le_bytes());
        data.extend(strings);
        data
    }

    #[test]
    fn test_fields_with_gd3() {
        let vgm = Vgm::new(MemFile::new(make_vgm()).into_shared());
        assert!(vgm.is_valid());
        let fields = vgm.fields();
        let get = |name: &str| fields.iter().find(|f| f.name == name).and_then(|f| f.as_str());
        assert_eq!(get("VGM Version"), Some("1.10"));
        assert_eq!(get("Track Name"), Some("Green Hill Zone"));
        assert_eq!(get("Notes"), None);
        assert_eq!(get("Duration"), Some("1:30"));
        assert_eq!(get("SN76489 Clock Rate"), Some("3.579545 MHz"));
        assert_eq!(get("SN76489 LFSR Width"), Some("16"));
    }

    #[test]
    fn test_metadata() {
        let vgm = Vgm::new(MemFile::new(make_vgm()).into_shared());
        let md = vgm.metadata();
        assert_eq!(md.get(Property::Album).and_then(|v| v.as_str()), Some("Sonic the Hedgehog"));
        assert_eq!(
            md.get(Property::ReleaseYear),
            Some(&crate::romdata::metadata::PropertyValue::UnsignedInteger(1991))
        );
    }

    #[test]
    fn test_bad_gd3_keeps_header_fields() {
        let mut data = make_vgm();
        data[0x100] = b'X';
        let vgm = Vgm::new(MemFile::new(data).into_shared());
        let fields = vgm.fields();
        assert!(fields.iter().all(|f| f.name != "Track Name"));
        assert!(fields.iter().any(|f| f.name == "Duration"));
    }

    #[test]
    fn test_clock_rate_format() {
        assert_eq!(format_clock_rate(7_670_453), "7.670453 MHz");
        assert_eq!(format_clock_rate(32_768), "32.768 kHz");
        assert_eq!(format_clock_rate(60), "60 Hz");
    }

    #[test]
    fn test_magic_without_full_header() {
        let data = make_vgm();
        let accepts = |len: usize| {
            let info = DetectionHeader { address: 0, data: &data[..len], ext: None, file_size: len as u64 };
            Vgm::is_rom_supported(&info)
        };
        assert_eq!(accepts(MIN_HEADER_SIZE - 1), None);
        assert_eq!(accepts(MIN_HEADER_SIZE), Some(0));
    }
}
