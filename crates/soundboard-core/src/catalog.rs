//! The bundled clip catalog. Adding a clip means adding a row here and
//! shipping the file in the assets directory.

use crate::Clip;

pub static CATALOG: &[Clip] = &[
    Clip::new("amen", "amen.mp3"),
    Clip::new("trap-loop", "trap-loop.mp3"),
    Clip::new("dramaticEntrance", "drramaticEntrance.mp3"),
    Clip::new("TechUpbeat", "TechUpbeat.mp3"),
    Clip::new("GuitarWop", "GuitarWop.mp3"),
];

/// Look up a bundled clip by its display name.
pub fn find_clip(name: &str) -> Option<&'static Clip> {
    CATALOG.iter().find(|clip| clip.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_names_in_order() {
        let names: Vec<_> = CATALOG.iter().map(|clip| clip.name).collect();
        assert_eq!(
            names,
            ["amen", "trap-loop", "dramaticEntrance", "TechUpbeat", "GuitarWop"]
        );
    }

    #[test]
    fn test_find_clip() {
        let clip = find_clip("amen").unwrap();
        assert_eq!(clip.handle.file_name(), "amen.mp3");
        assert!(find_clip("missing").is_none());
    }

    #[test]
    fn test_dramatic_entrance_uses_shipped_file_name() {
        let clip = find_clip("dramaticEntrance").unwrap();
        assert_eq!(clip.handle.file_name(), "drramaticEntrance.mp3");
    }
}
