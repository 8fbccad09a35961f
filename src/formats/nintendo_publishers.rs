//! Nintendo licensee codes shared by the Game Boy family.

const NEW_CODES: &[(&[u8; 2], &str)] = &[
    (b"00", "None"),
    (b"01", "Nintendo"),
    (b"08", "Capcom"),
    (b"13", "Electronic Arts"),
    (b"18", "Hudson Soft"),
    (b"20", "KSS"),
    (b"24", "PCM Complete"),
    (b"28", "Kemco"),
    (b"31", "Nintendo"),
    (b"34", "Konami"),
    (b"41", "Ubisoft"),
    (b"4F", "Eidos"),
    (b"51", "Acclaim"),
    (b"52", "Activision"),
    (b"54", "Konami"),
    (b"5D", "Midway"),
    (b"69", "Electronic Arts"),
    (b"70", "Infogrames"),
    (b"78", "THQ"),
    (b"8P", "Sega"),
    (b"A4", "Konami"),
    (b"AF", "Namco"),
    (b"B2", "Bandai"),
    (b"C8", "Koei"),
    (b"E9", "Natsume"),
];

const OLD_CODES: &[(u8, &str)] = &[
    (0x00, "None"),
    (0x01, "Nintendo"),
    (0x08, "Capcom"),
    (0x09, "Hot-B"),
    (0x0A, "Jaleco"),
    (0x13, "Electronic Arts"),
    (0x18, "Hudson Soft"),
    (0x1F, "Virgin"),
    (0x28, "Kemco"),
    (0x31, "Nintendo"),
    (0x41, "Ubisoft"),
    (0x51, "Acclaim"),
    (0x52, "Activision"),
    (0x69, "Electronic Arts"),
    (0x70, "Infogrames"),
    (0x78, "THQ"),
    (0xA4, "Konami"),
    (0xAF, "Namco"),
    (0xB2, "Bandai"),
    (0xC0, "Taito"),
    (0xC8, "Koei"),
];

/// Publisher for a two-character licensee code.
pub(crate) fn lookup_new(code: &[u8]) -> Option<&'static str> {
    NEW_CODES
        .iter()
        .find(|(c, _)| c.as_slice() == code)
        .map(|(_, name)| *name)
}

/// Publisher for a one-byte licensee code. `0x33` means "see the new code".
pub(crate) fn lookup_old(code: u8) -> Option<&'static str> {
    OLD_CODES.iter().find(|(c, _)| *c == code).map(|(_, name)| *name)
}

/// `Name` or `Unknown (CODE)`.
pub(crate) fn describe_new(code: &[u8]) -> String {
    match lookup_new(code) {
        Some(name) => name.to_string(),
        None => format!("Unknown ({})", crate::util::latin1(code)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        assert_eq!(lookup_new(b"01"), Some("Nintendo"));
        assert_eq!(lookup_old(0xA4), Some("Konami"));
        assert_eq!(describe_new(b"ZZ"), "Unknown (ZZ)");
    }
}
