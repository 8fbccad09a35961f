//! The parser contract.
//!
//! Every format implements [`RomData`] (the instance side: validity,
//! fields, metadata, images) and [`RomDataClass`] (the static side:
//! acceptance test, constructor, extensions, MIME types). The detection
//! engine only ever sees the static side through
//! [`RomDataFns`](crate::factory::registry::RomDataFns) descriptors and
//! hands callers `Arc<dyn RomData>`.

pub mod fields;
pub(crate) mod flags;
pub mod metadata;

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use image::RgbaImage;
use parking_lot::Mutex;

use crate::file::SharedFile;
use crate::{Error, Result};
use flags::flags_newtype;

pub use fields::RomFields;
pub use metadata::{Property, RomMetaData};

flags_newtype!(RomDataAttrs(u32) # "Capabilities a format advertises." {
    /// Can produce a thumbnail image.
    HAS_THUMBNAIL = 1 << 0;
    /// Can produce a "dangerous permissions" overlay.
    HAS_DPOVERLAY = 1 << 1;
    /// Provides reduced metadata properties.
    HAS_METADATA = 1 << 2;
});

impl RomDataAttrs {
    /// Parse a capability name as used on the command line and in config.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "thumbnail" | "thumb" => Some(Self::HAS_THUMBNAIL),
            "dpoverlay" => Some(Self::HAS_DPOVERLAY),
            "metadata" => Some(Self::HAS_METADATA),
            _ => None,
        }
    }
}

flags_newtype!(ImageFlags(u32) # "Hints for displaying an internal image." {
    /// Scale with nearest-neighbour; the image is pixel art.
    RESCALE_NEAREST = 1 << 0;
    /// The image is animated; only the first frame is returned.
    ICON_ANIMATED = 1 << 1;
});

/// The slice of a file a format's acceptance test looks at.
#[derive(Clone, Copy, Debug)]
pub struct DetectionHeader<'a> {
    /// File offset `data` was read from.
    pub address: u32,
    /// Bytes read; may be shorter than requested near EOF.
    pub data: &'a [u8],
    /// Lowercase extension with leading dot.
    pub ext: Option<&'a str>,
    pub file_size: u64,
}

impl<'a> DetectionHeader<'a> {
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// `len` bytes at `off`, if all of them are present.
    pub fn bytes_at(&self, off: usize, len: usize) -> Option<&'a [u8]> {
        self.data.get(off..off.checked_add(len)?)
    }

    /// Big-endian `u32` at `off`, if present.
    pub fn be32_at(&self, off: usize) -> Option<u32> {
        self.bytes_at(off, 4)
            .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// True if `magic` appears at `off`.
    pub fn has_magic(&self, off: usize, magic: &[u8]) -> bool {
        self.bytes_at(off, magic.len()) == Some(magic)
    }

    pub fn ext_is(&self, ext: &str) -> bool {
        self.ext == Some(ext)
    }
}

/// What kind of file a parser found.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum FileType {
    #[default]
    Unknown,
    RomImage,
    DiscImage,
    SaveFile,
    IconFile,
    BannerFile,
    AudioFile,
    Executable,
    Dll,
    DeviceDriver,
    ResourceLibrary,
    RelocatableObject,
    SharedLibrary,
    CoreDump,
}

impl FileType {
    pub fn name(self) -> &'static str {
        match self {
            FileType::Unknown => "(unknown file type)",
            FileType::RomImage => "ROM Image",
            FileType::DiscImage => "Disc Image",
            FileType::SaveFile => "Save File",
            FileType::IconFile => "Icon File",
            FileType::BannerFile => "Banner File",
            FileType::AudioFile => "Audio File",
            FileType::Executable => "Executable",
            FileType::Dll => "Dynamic Link Library",
            FileType::DeviceDriver => "Device Driver",
            FileType::ResourceLibrary => "Resource Library",
            FileType::RelocatableObject => "Relocatable Object File",
            FileType::SharedLibrary => "Shared Library",
            FileType::CoreDump => "Core Dump",
        }
    }
}

/// Which form of the system name to return.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SystemNameType {
    Long,
    Short,
    Abbreviation,
}

/// Image slots a parser may provide.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageType {
    IntIcon,
    IntBanner,
    IntMedia,
    IntImage,
    ExtMedia,
    ExtCover,
    ExtCover3d,
    ExtCoverFull,
    ExtBox,
    ExtTitleScreen,
}

impl ImageType {
    pub const ALL: [ImageType; 10] = [
        ImageType::IntIcon,
        ImageType::IntBanner,
        ImageType::IntMedia,
        ImageType::IntImage,
        ImageType::ExtMedia,
        ImageType::ExtCover,
        ImageType::ExtCover3d,
        ImageType::ExtCoverFull,
        ImageType::ExtBox,
        ImageType::ExtTitleScreen,
    ];

    pub fn is_internal(self) -> bool {
        matches!(
            self,
            ImageType::IntIcon | ImageType::IntBanner | ImageType::IntMedia | ImageType::IntImage
        )
    }

    /// Short name, as used by `--extract`.
    pub fn name(self) -> &'static str {
        match self {
            ImageType::IntIcon => "icon",
            ImageType::IntBanner => "banner",
            ImageType::IntMedia => "media",
            ImageType::IntImage => "image",
            ImageType::ExtMedia => "ext-media",
            ImageType::ExtCover => "ext-cover",
            ImageType::ExtCover3d => "ext-cover3d",
            ImageType::ExtCoverFull => "ext-coverfull",
            ImageType::ExtBox => "ext-box",
            ImageType::ExtTitleScreen => "ext-titlescreen",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.to_ascii_lowercase();
        Self::ALL.into_iter().find(|t| t.name() == name)
    }
}

/// Where an external image can be fetched from. No I/O is done here.
#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize)]
pub struct ExtUrl {
    pub url: String,
    pub cache_key: String,
}

/// Static description of a format.
#[derive(Debug)]
pub struct FormatInfo {
    pub class_name: &'static str,
    /// Lowercase, with leading dot.
    pub extensions: &'static [&'static str],
    pub mime_types: &'static [&'static str],
}

/// State every parser carries.
pub struct RomDataBase {
    file: Mutex<Option<SharedFile>>,
    is_valid: bool,
    file_type: FileType,
    fields: OnceLock<RomFields>,
    metadata: OnceLock<RomMetaData>,
    images: Mutex<HashMap<ImageType, Arc<RgbaImage>>>,
}

impl RomDataBase {
    /// Start out invalid, holding a reference to `file`.
    pub fn new(file: SharedFile) -> Self {
        Self {
            file: Mutex::new(Some(file)),
            is_valid: false,
            file_type: FileType::Unknown,
            fields: OnceLock::new(),
            metadata: OnceLock::new(),
            images: Mutex::new(HashMap::new()),
        }
    }

    /// Mark the parser as having accepted the file.
    pub fn set_valid(&mut self, file_type: FileType) {
        self.is_valid = true;
        self.file_type = file_type;
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    pub fn file_type(&self) -> FileType {
        self.file_type
    }

    /// The file, unless it has been released.
    pub fn file(&self) -> Option<SharedFile> {
        self.file.lock().clone()
    }

    /// Like [`file`](Self::file), but as an error for loaders.
    pub fn require_file(&self) -> Result<SharedFile> {
        self.file().ok_or(Error::NotSupported)
    }

    /// Release the file reference. Cached data stays available.
    pub fn close(&self) {
        self.file.lock().take();
    }

    /// Mark invalid and release the file.
    pub fn reject(&mut self, reason: &str) {
        tracing::debug!(reason, "parser rejected file");
        self.is_valid = false;
        self.close();
    }
}

impl std::fmt::Debug for RomDataBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RomDataBase")
            .field("is_valid", &self.is_valid)
            .field("file_type", &self.file_type)
            .finish()
    }
}

/// Instance side of a format parser.
pub trait RomData: Send + Sync {
    fn base(&self) -> &RomDataBase;

    fn class_name(&self) -> &'static str;

    fn system_name(&self, kind: SystemNameType) -> Option<&'static str>;

    /// Fill `fields`. Called at most once, only on valid parsers.
    fn load_field_data(&self, fields: &mut RomFields) -> Result<()>;

    /// Fill `metadata`. Called at most once, only on valid parsers.
    fn load_metadata(&self, _metadata: &mut RomMetaData) -> Result<()> {
        Ok(())
    }

    fn supported_image_types(&self) -> &'static [ImageType] {
        &[]
    }

    fn image_flags(&self, _image_type: ImageType) -> ImageFlags {
        ImageFlags::NONE
    }

    /// Decode an internal image. Results are cached by [`image`](Self::image).
    fn load_internal_image(&self, _image_type: ImageType) -> Result<RgbaImage> {
        Err(Error::NotSupported)
    }

    /// URLs for external images of `image_type`.
    fn ext_urls(&self, _image_type: ImageType) -> Vec<ExtUrl> {
        Vec::new()
    }

    fn is_valid(&self) -> bool {
        self.base().is_valid()
    }

    fn file_type(&self) -> FileType {
        self.base().file_type()
    }

    /// Fields, loaded on first access.
    fn fields(&self) -> &RomFields {
        self.base().fields.get_or_init(|| {
            let mut fields = RomFields::new();
            if self.is_valid() {
                if let Err(e) = self.load_field_data(&mut fields) {
                    tracing::debug!(class = self.class_name(), error = %e, "field loading stopped early");
                }
            }
            fields
        })
    }

    /// Metadata properties, loaded on first access.
    fn metadata(&self) -> &RomMetaData {
        self.base().metadata.get_or_init(|| {
            let mut metadata = RomMetaData::new();
            if self.is_valid() {
                if let Err(e) = self.load_metadata(&mut metadata) {
                    tracing::debug!(class = self.class_name(), error = %e, "metadata loading stopped early");
                }
            }
            metadata
        })
    }

    /// Internal image, decoded on first access and cached.
    fn image(&self, image_type: ImageType) -> Option<Arc<RgbaImage>> {
        if !self.is_valid() || !self.supported_image_types().contains(&image_type) {
            return None;
        }
        let base = self.base();
        if let Some(img) = base.images.lock().get(&image_type) {
            return Some(img.clone());
        }
        match self.load_internal_image(image_type) {
            Ok(img) => {
                let img = Arc::new(img);
                base.images.lock().insert(image_type, img.clone());
                Some(img)
            }
            Err(e) => {
                tracing::debug!(class = self.class_name(), ?image_type, error = %e, "image not loaded");
                None
            }
        }
    }

    /// Release the file reference.
    fn close(&self) {
        self.base().close();
    }
}

/// Static side of a format parser.
pub trait RomDataClass: RomData + Sized + 'static {
    const INFO: &'static FormatInfo;

    /// Check whether `info` looks like this format.
    ///
    /// Returns the format subtype, or `None` to reject. Must not allocate
    /// or do I/O, and must bounds-check `info.data`.
    fn is_rom_supported(info: &DetectionHeader) -> Option<u32>;

    /// Construct from `file`. Check [`RomData::is_valid`] afterwards.
    fn new(file: SharedFile) -> Self;
}
