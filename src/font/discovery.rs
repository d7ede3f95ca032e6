//! Best-effort system font discovery, for the demo and for tests that want
//! a real face. The library itself never loads fonts on its own.

use std::path::PathBuf;

use log::debug;

use crate::font::face::FontdueFace;

/// Family names tried first, in order.
const PREFERRED: [&str; 6] = [
    "DejaVuSans",
    "LiberationSans",
    "NotoSans-Regular",
    "FreeSans",
    "Arial",
    "Helvetica",
];

fn font_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    #[cfg(target_os = "linux")]
    {
        dirs.push(PathBuf::from("/usr/share/fonts"));
        dirs.push(PathBuf::from("/usr/local/share/fonts"));
        if let Ok(home) = std::env::var("HOME") {
            dirs.push(PathBuf::from(&home).join(".local/share/fonts"));
            dirs.push(PathBuf::from(&home).join(".fonts"));
        }
    }
    #[cfg(target_os = "macos")]
    {
        dirs.push(PathBuf::from("/System/Library/Fonts"));
        dirs.push(PathBuf::from("/Library/Fonts"));
        if let Ok(home) = std::env::var("HOME") {
            dirs.push(PathBuf::from(&home).join("Library/Fonts"));
        }
    }
    #[cfg(target_os = "windows")]
    {
        if let Ok(windir) = std::env::var("WINDIR") {
            dirs.push(PathBuf::from(windir).join("Fonts"));
        }
    }
    dirs
}

fn collect(dir: &std::path::Path, depth: u32, out: &mut Vec<PathBuf>) {
    if depth > 4 {
        return;
    }
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect(&path, depth + 1, out);
        } else if matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("ttf" | "otf")
        ) {
            out.push(path);
        }
    }
}

/// Every `.ttf`/`.otf` found under the platform's font directories,
/// preferred families first.
pub fn candidates() -> Vec<PathBuf> {
    let mut found = Vec::new();
    for dir in font_dirs() {
        collect(&dir, 0, &mut found);
    }
    found.sort_by_key(|path| {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        PREFERRED
            .iter()
            .position(|name| stem == *name)
            .unwrap_or(PREFERRED.len())
    });
    found
}

/// First system face both parsers accept, or `None` on fontless systems.
pub fn load_any() -> Option<FontdueFace> {
    for path in candidates() {
        if let Some(face) = FontdueFace::from_file(&path) {
            debug!("discovered system font {}", path.display());
            return Some(face);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::RasterFace;

    #[test]
    fn discovered_face_rasterizes() {
        // Skips on systems without fonts.
        let Some(face) = load_any() else {
            return;
        };
        let idx = face.glyph_index(u32::from('A'));
        assert_ne!(idx, 0);
        let bitmap = face.rasterize(idx, 16.0);
        assert!(bitmap.width > 0 && bitmap.height > 0);
        assert_eq!(
            bitmap.coverage.len(),
            (bitmap.width * bitmap.height) as usize
        );
        let metrics = face.metrics(16.0);
        assert!(metrics.ascent > 0);
        assert!(metrics.descent <= 0);
        assert!(metrics.line_height > 0);
    }
}
