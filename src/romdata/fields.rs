//! Typed, tab-grouped metadata fields.
//!
//! A parser fills a [`RomFields`] once through the `add_field_*` builders;
//! consumers then walk it generically without knowing the format. Every
//! field carries the index of the tab it belongs to; tabs are append-only
//! and the current tab only moves forward while fields are being added.

use std::collections::BTreeMap;
use std::sync::Arc;

use image::RgbaImage;

use super::flags::flags_newtype;

flags_newtype!(StringFlags(u32) # "Formatting flags for string fields." {
    /// Render with a monospace font.
    MONOSPACE = 1 << 0;
    /// Highlight as a warning.
    WARNING = 1 << 1;
    /// Trim trailing whitespace when the field is added.
    TRIM_END = 1 << 3;
    /// Lowercase hex digits in numeric/hexdump helpers.
    HEX_LOWER = 1 << 4;
    /// No spaces between bytes in hexdumps.
    HEXDUMP_NO_SPACES = 1 << 5;
});

flags_newtype!(ListDataFlags(u32) # "Layout flags for list-data fields." {
    /// Show the field on its own row below the label.
    SEPARATE_ROW = 1 << 0;
    /// First column carries a checkbox.
    CHECKBOXES = 1 << 1;
    /// First column carries an icon.
    ICONS = 1 << 2;
    /// Rows are keyed by language code.
    MULTI = 1 << 3;
});

flags_newtype!(DateTimeFlags(u32) # "What part of a timestamp is meaningful." {
    HAS_DATE = 1 << 0;
    HAS_TIME = 1 << 1;
    /// The timestamp is UTC; otherwise it is local time stored as UTC.
    IS_UTC = 1 << 2;
    /// Ignore the year.
    NO_YEAR = 1 << 3;
});

/// Radix for [`RomFields::add_field_string_numeric`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Base {
    #[default]
    Dec,
    Hex,
    Oct,
}

/// Per-body age ratings, indexed by [`age::Country`].
pub type AgeRatings = [u16; 16];

/// Age rating bits and decoding.
pub mod age {
    use super::AgeRatings;

    pub const MIN_AGE_MASK: u16 = 0x001F;
    pub const ACTIVE: u16 = 0x0020;
    pub const PENDING: u16 = 0x0040;
    pub const NO_RESTRICTION: u16 = 0x0080;
    pub const ONLINE_PLAY: u16 = 0x0100;
    pub const PROHIBITED: u16 = 0x0200;

    /// Rating bodies, by slot.
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    #[repr(usize)]
    pub enum Country {
        Japan = 0,
        Usa = 1,
        Germany = 3,
        Europe = 4,
        Finland = 5,
        Portugal = 6,
        England = 7,
        Australia = 8,
        SouthKorea = 9,
        Taiwan = 10,
    }

    const ABBREVS: [&str; 16] = [
        "CERO", "ESRB", "", "USK", "PEGI", "MEKU", "PEGI-PT", "BBFC", "ACB", "GRB", "CGSRR", "",
        "", "", "", "",
    ];

    /// Abbreviation of the rating body in slot `country`.
    pub fn abbrev(country: usize) -> Option<&'static str> {
        ABBREVS.get(country).copied().filter(|s| !s.is_empty())
    }

    /// Decode one rating, without the body name. Inactive ratings decode
    /// to an empty string.
    pub fn decode(country: usize, rating: u16) -> String {
        if rating & ACTIVE == 0 {
            return String::new();
        }

        let min_age = rating & MIN_AGE_MASK;
        let special = if rating & PROHIBITED != 0 {
            Some("No")
        } else if rating & PENDING != 0 {
            Some("RP")
        } else if rating & NO_RESTRICTION != 0 {
            Some("All")
        } else {
            None
        };

        let named = special.or_else(|| match country {
            c if c == Country::Japan as usize => match min_age {
                0 => Some("A"),
                12 => Some("B"),
                15 => Some("C"),
                17 => Some("D"),
                18 => Some("Z"),
                _ => None,
            },
            c if c == Country::Usa as usize => match min_age {
                3 => Some("eC"),
                6 => Some("E"),
                10 => Some("E10+"),
                13 => Some("T"),
                17 => Some("M"),
                18 => Some("AO"),
                _ => None,
            },
            c if c == Country::Australia as usize => match min_age {
                0 => Some("G"),
                7 => Some("PG"),
                14 => Some("M"),
                15 => Some("MA15+"),
                18 => Some("R18+"),
                _ => None,
            },
            _ => None,
        });

        let mut out = match named {
            Some(s) => s.to_string(),
            None => min_age.to_string(),
        };
        if rating & ONLINE_PLAY != 0 {
            out.push('\u{00B0}');
        }
        out
    }

    /// Decode every active rating as `ABBR=value`, comma separated.
    /// With `newlines`, a line break follows every fourth rating.
    pub fn decode_all(ratings: &AgeRatings, newlines: bool) -> String {
        let mut out = String::new();
        let mut count = 0usize;
        for (country, &rating) in ratings.iter().enumerate() {
            if rating & ACTIVE == 0 {
                continue;
            }
            if count > 0 {
                out.push_str(if newlines && count % 4 == 0 { ",\n" } else { ", " });
            }
            match abbrev(country) {
                Some(a) => out.push_str(a),
                None => out.push_str(&country.to_string()),
            }
            out.push('=');
            out.push_str(&decode(country, rating));
            count += 1;
        }
        if count == 0 {
            return "None".to_string();
        }
        out
    }
}

/// Table rows, either a single set or one set per language code.
#[derive(Clone, Debug, PartialEq)]
pub enum ListRows {
    Single(Vec<Vec<String>>),
    Multi(BTreeMap<u32, Vec<Vec<String>>>),
}

impl ListRows {
    /// Rows for the default language. For per-language data this is the
    /// English set if present, else the first.
    pub fn default_rows(&self) -> &[Vec<String>] {
        match self {
            ListRows::Single(rows) => rows,
            ListRows::Multi(map) => map
                .get(&lang_code(b"en"))
                .or_else(|| map.values().next())
                .map(Vec::as_slice)
                .unwrap_or(&[]),
        }
    }
}

/// Pack a two or three letter language code, e.g. `b"en"` into `0x656E`.
pub const fn lang_code(code: &[u8]) -> u32 {
    let mut out = 0u32;
    let mut i = 0;
    while i < code.len() {
        out = (out << 8) | code[i] as u32;
        i += 1;
    }
    out
}

/// Render a packed language code back into text.
pub fn lang_code_str(lc: u32) -> String {
    lc.to_be_bytes()
        .iter()
        .filter(|&&b| b != 0)
        .map(|&b| b as char)
        .collect()
}

/// Per-row decoration in the first column.
#[derive(Clone, Debug, Default)]
pub enum ListExtra {
    #[default]
    None,
    /// Checkbox state, one bit per row.
    Checkboxes(u32),
    /// One optional icon per row. Icons are shared, the vector is owned.
    Icons(Vec<Option<Arc<RgbaImage>>>),
}

/// A table payload.
#[derive(Clone, Debug)]
pub struct ListData {
    pub headers: Option<Vec<String>>,
    pub rows: ListRows,
    pub flags: ListDataFlags,
    /// Rows to show without scrolling; 0 means no preference.
    pub rows_visible: u32,
    pub extra: ListExtra,
}

impl ListData {
    pub fn new(headers: Option<&[&str]>, rows: Vec<Vec<String>>) -> Self {
        Self {
            headers: headers.map(|h| h.iter().map(|s| s.to_string()).collect()),
            rows: ListRows::Single(rows),
            flags: ListDataFlags::NONE,
            rows_visible: 0,
            extra: ListExtra::None,
        }
    }

    pub fn new_multi(headers: Option<&[&str]>, rows: BTreeMap<u32, Vec<Vec<String>>>) -> Self {
        Self {
            rows: ListRows::Multi(rows),
            ..Self::new(headers, Vec::new())
        }
    }

    pub fn with_flags(mut self, flags: ListDataFlags) -> Self {
        self.flags |= flags;
        self
    }

    pub fn with_rows_visible(mut self, rows: u32) -> Self {
        self.rows_visible = rows;
        self
    }

    pub fn with_checkboxes(mut self, checked: u32) -> Self {
        self.flags |= ListDataFlags::CHECKBOXES;
        self.extra = ListExtra::Checkboxes(checked);
        self
    }

    pub fn with_icons(mut self, icons: Vec<Option<Arc<RgbaImage>>>) -> Self {
        self.flags |= ListDataFlags::ICONS;
        self.extra = ListExtra::Icons(icons);
        self
    }

    /// Make flags and payload agree.
    fn normalize(&mut self, field_name: &str) {
        if self.flags.contains(ListDataFlags::CHECKBOXES | ListDataFlags::ICONS) {
            tracing::warn!(field = field_name, "list field has both checkboxes and icons; dropping both");
            self.flags.remove(ListDataFlags::CHECKBOXES | ListDataFlags::ICONS);
            self.extra = ListExtra::None;
        }
        match self.extra {
            ListExtra::Icons(_) if !self.flags.contains(ListDataFlags::ICONS) => {
                self.extra = ListExtra::None
            }
            ListExtra::Checkboxes(_) if !self.flags.contains(ListDataFlags::CHECKBOXES) => {
                self.extra = ListExtra::None
            }
            _ => {}
        }
        if self.flags.contains(ListDataFlags::ICONS) && !matches!(self.extra, ListExtra::Icons(_)) {
            self.flags.remove(ListDataFlags::ICONS);
        }
        if self.flags.contains(ListDataFlags::CHECKBOXES)
            && !matches!(self.extra, ListExtra::Checkboxes(_))
        {
            self.extra = ListExtra::Checkboxes(0);
        }
        match self.rows {
            ListRows::Multi(_) => self.flags |= ListDataFlags::MULTI,
            ListRows::Single(_) => self.flags.remove(ListDataFlags::MULTI),
        }
    }
}

/// Field payload.
#[derive(Clone, Debug)]
pub enum FieldData {
    String {
        value: Option<String>,
        flags: StringFlags,
    },
    Bitfield {
        /// One name per bit; empty names are skipped bits.
        names: Vec<String>,
        elems_per_row: u32,
        value: u32,
    },
    ListData(ListData),
    DateTime {
        /// Seconds since the Unix epoch; `None` if unknown.
        timestamp: Option<i64>,
        flags: DateTimeFlags,
    },
    AgeRatings(AgeRatings),
    /// Width, height, depth; trailing zeros are unused dimensions.
    Dimensions([u32; 3]),
}

/// Field kind, derived from the payload.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    String,
    Bitfield,
    ListData,
    DateTime,
    AgeRatings,
    Dimensions,
}

impl FieldType {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Bitfield => "bitfield",
            FieldType::ListData => "list_data",
            FieldType::DateTime => "date_time",
            FieldType::AgeRatings => "age_ratings",
            FieldType::Dimensions => "dimensions",
        }
    }
}

/// One named field.
#[derive(Clone, Debug)]
pub struct Field {
    pub name: String,
    pub tab_idx: usize,
    pub is_valid: bool,
    pub data: FieldData,
}

impl Field {
    pub fn field_type(&self) -> FieldType {
        match self.data {
            FieldData::String { .. } => FieldType::String,
            FieldData::Bitfield { .. } => FieldType::Bitfield,
            FieldData::ListData(_) => FieldType::ListData,
            FieldData::DateTime { .. } => FieldType::DateTime,
            FieldData::AgeRatings(_) => FieldType::AgeRatings,
            FieldData::Dimensions(_) => FieldType::Dimensions,
        }
    }

    /// String value, if this is a string field with a value.
    pub fn as_str(&self) -> Option<&str> {
        match &self.data {
            FieldData::String { value, .. } => value.as_deref(),
            _ => None,
        }
    }
}

/// Where merged fields land, see [`RomFields::add_fields_from`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TabOffset {
    /// Shift every source tab index by this amount.
    Offset(usize),
    /// Put everything in the current tab.
    Ignore,
    /// Append the source's tabs after the existing ones.
    AddTabs,
}

/// Ordered collection of fields plus tab names.
#[derive(Clone, Debug, Default)]
pub struct RomFields {
    fields: Vec<Field>,
    tab_names: Vec<String>,
    tab_idx: usize,
}

impl RomFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field(&self, idx: usize) -> Option<&Field> {
        self.fields.get(idx)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Field> {
        self.fields.iter()
    }

    /// Fields that belong to `tab`.
    pub fn fields_in_tab(&self, tab: usize) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(move |f| f.tab_idx == tab)
    }

    pub fn reserve(&mut self, n: usize) {
        self.fields.reserve(n);
    }

    // Tabs

    /// Number of tabs; at least 1.
    pub fn tab_count(&self) -> usize {
        self.tab_names.len().max(1)
    }

    /// Tab name, or `None` if unnamed (hidden).
    pub fn tab_name(&self, idx: usize) -> Option<&str> {
        self.tab_names
            .get(idx)
            .map(String::as_str)
            .filter(|s| !s.is_empty())
    }

    pub fn current_tab(&self) -> usize {
        self.tab_idx
    }

    /// Select the tab new fields go into, growing the tab list as needed.
    pub fn set_tab_index(&mut self, idx: usize) {
        debug_assert!(
            idx >= self.tab_idx || self.fields.is_empty(),
            "tab index may only move forward once fields exist"
        );
        self.tab_idx = idx;
        if self.tab_names.len() < idx + 1 {
            self.tab_names.resize(idx + 1, String::new());
        }
    }

    /// Name a tab. An empty name hides it.
    pub fn set_tab_name(&mut self, idx: usize, name: &str) {
        if self.tab_names.len() < idx + 1 {
            self.tab_names.resize(idx + 1, String::new());
        }
        self.tab_names[idx] = name.to_string();
    }

    /// Append a tab and select it.
    pub fn add_tab(&mut self, name: &str) -> usize {
        self.tab_names.push(name.to_string());
        self.tab_idx = self.tab_names.len() - 1;
        self.tab_idx
    }

    // Builders

    fn push(&mut self, name: &str, data: FieldData) -> Option<usize> {
        debug_assert!(!name.is_empty(), "field name must not be empty");
        if name.is_empty() {
            return None;
        }
        let idx = self.fields.len();
        self.fields.push(Field {
            name: name.to_string(),
            tab_idx: self.tab_idx,
            is_valid: true,
            data,
        });
        Some(idx)
    }

    /// Add a string field.
    pub fn add_field_string(&mut self, name: &str, value: &str, flags: StringFlags) -> Option<usize> {
        let value = if flags.contains(StringFlags::TRIM_END) {
            value.trim_end()
        } else {
            value
        };
        self.push(
            name,
            FieldData::String {
                value: Some(value.to_string()),
                flags,
            },
        )
    }

    /// Add a string field with no value.
    pub fn add_field_string_empty(&mut self, name: &str, flags: StringFlags) -> Option<usize> {
        self.push(name, FieldData::String { value: None, flags })
    }

    /// Add a number formatted as a string, zero-padded to `digits`.
    pub fn add_field_string_numeric(
        &mut self,
        name: &str,
        value: u32,
        base: Base,
        digits: usize,
        flags: StringFlags,
    ) -> Option<usize> {
        let lower = flags.contains(StringFlags::HEX_LOWER);
        let s = match base {
            Base::Dec => format!("{value:0digits$}"),
            Base::Hex if lower => format!("0x{value:0digits$x}"),
            Base::Hex => format!("0x{value:0digits$X}"),
            Base::Oct => format!("0{value:0digits$o}"),
        };
        self.add_field_string(name, &s, flags)
    }

    /// Add bytes formatted as a hex dump.
    pub fn add_field_string_hexdump(&mut self, name: &str, buf: &[u8], flags: StringFlags) -> Option<usize> {
        if buf.is_empty() {
            return self.add_field_string_empty(name, flags);
        }
        let mut s = if flags.contains(StringFlags::HEX_LOWER) {
            hex::encode(buf)
        } else {
            hex::encode_upper(buf)
        };
        if !flags.contains(StringFlags::HEXDUMP_NO_SPACES) {
            s = s
                .as_bytes()
                .chunks(2)
                .map(|pair| String::from_utf8_lossy(pair).into_owned())
                .collect::<Vec<_>>()
                .join(" ");
        }
        self.add_field_string(name, &s, flags)
    }

    /// Add an address range, `0xSTART - 0xEND` plus an optional suffix.
    pub fn add_field_string_address_range(
        &mut self,
        name: &str,
        start: u32,
        end: u32,
        suffix: Option<&str>,
        digits: usize,
        flags: StringFlags,
    ) -> Option<usize> {
        let digits = digits.min(16);
        let mut s = if flags.contains(StringFlags::HEX_LOWER) {
            format!("0x{start:0digits$x} - 0x{end:0digits$x}")
        } else {
            format!("0x{start:0digits$X} - 0x{end:0digits$X}")
        };
        if let Some(suffix) = suffix.filter(|s| !s.is_empty()) {
            s.push(' ');
            s.push_str(suffix);
        }
        self.add_field_string(name, &s, flags)
    }

    /// Add a bitfield. Empty names mark unused bits.
    pub fn add_field_bitfield(
        &mut self,
        name: &str,
        bit_names: &[&str],
        elems_per_row: u32,
        value: u32,
    ) -> Option<usize> {
        self.push(
            name,
            FieldData::Bitfield {
                names: bit_names.iter().map(|s| s.to_string()).collect(),
                elems_per_row,
                value,
            },
        )
    }

    /// Add a table.
    pub fn add_field_list_data(&mut self, name: &str, mut list: ListData) -> Option<usize> {
        list.normalize(name);
        self.push(name, FieldData::ListData(list))
    }

    /// Add a timestamp.
    pub fn add_field_date_time(
        &mut self,
        name: &str,
        timestamp: Option<i64>,
        flags: DateTimeFlags,
    ) -> Option<usize> {
        self.push(name, FieldData::DateTime { timestamp, flags })
    }

    /// Add age ratings. The array is copied.
    pub fn add_field_age_ratings(&mut self, name: &str, ratings: &AgeRatings) -> Option<usize> {
        self.push(name, FieldData::AgeRatings(*ratings))
    }

    /// Add image dimensions. Pass 0 for unused dimensions.
    pub fn add_field_dimensions(&mut self, name: &str, x: u32, y: u32, z: u32) -> Option<usize> {
        self.push(name, FieldData::Dimensions([x, y, z]))
    }

    // Merge

    /// Deep-copy every field of `other` into this collection.
    ///
    /// Returns the index of the first copied field, or `None` if `other`
    /// is empty.
    pub fn add_fields_from(&mut self, other: &RomFields, offset: TabOffset) -> Option<usize> {
        let first = self.fields.len();

        let shift = match offset {
            TabOffset::Offset(n) => {
                let needed = n + other.tab_count();
                if self.tab_names.len() < needed && needed > 1 {
                    self.tab_names.resize(needed, String::new());
                }
                Some(n)
            }
            TabOffset::Ignore => None,
            TabOffset::AddTabs => {
                let base = if self.fields.is_empty() && self.tab_names.is_empty() {
                    0
                } else {
                    self.tab_names.len().max(self.tab_idx + 1)
                };
                self.tab_names.resize(base, String::new());
                self.tab_names.extend(other.tab_names.iter().cloned());
                self.tab_names.resize(base + other.tab_count(), String::new());
                self.tab_idx = self.tab_names.len() - 1;
                Some(base)
            }
        };

        self.fields.reserve(other.fields.len());
        for src in &other.fields {
            let mut field = src.clone();
            field.tab_idx = match shift {
                Some(n) => src.tab_idx + n,
                None => self.tab_idx,
            };
            self.fields.push(field);
        }

        (self.fields.len() > first).then_some(first)
    }
}

impl<'a> IntoIterator for &'a RomFields {
    type Item = &'a Field;
    type IntoIter = std::slice::Iter<'a, Field>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}
