use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
};

use walkdir::{DirEntry, WalkDir};

pub const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "png", "bmp"];

/// Collects every jpg/png/bmp file below `dirs`. Missing directories are skipped.
pub fn discover_images(dirs: &[PathBuf]) -> BTreeSet<PathBuf> {
    let mut images = BTreeSet::new();

    for dir in dirs {
        if !dir.is_dir() {
            continue;
        }

        let walker = WalkDir::new(dir)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry));

        for entry in walker.filter_map(Result::ok) {
            if entry.file_type().is_file() && has_image_extension(entry.path()) {
                images.insert(entry.into_path());
            }
        }
    }

    images
}

pub fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

// Glob patterns never match dot-prefixed names.
fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.'))
}
