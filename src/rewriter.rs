use std::{fs, path::Path};

use image::{ImageReader, ImageResult, RgbImage};

use crate::{
    color::Color,
    debug, error,
    error::{is_permission_denied, RunError},
    logging::Logger,
    privileged::PrivilegedOps,
};

pub const LEGACY_BACKGROUND_SIZE: (u32, u32) = (1920, 1080);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    Rewritten { width: u32, height: u32 },
    Skipped,
}

/// Image file access used by [`rewrite_image`].
pub trait ImageIo: Send + Sync {
    /// Reads only the header. The decoder is picked from the file contents.
    fn dimensions(&self, path: &Path) -> ImageResult<(u32, u32)>;

    /// Encodes in the format named by the extension of `path`.
    fn save(&self, image: &RgbImage, path: &Path) -> ImageResult<()>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FsImages;

impl ImageIo for FsImages {
    fn dimensions(&self, path: &Path) -> ImageResult<(u32, u32)> {
        ImageReader::open(path)?.with_guessed_format()?.into_dimensions()
    }

    fn save(&self, image: &RgbImage, path: &Path) -> ImageResult<()> {
        image.save(path)
    }
}

/// Replaces `path` with a solid `color` image of the same size and format.
///
/// Ownership and ACL failures are fatal. Access denied while reading or
/// writing the image is logged and reported as [`FileOutcome::Skipped`].
pub fn rewrite_image(
    ops: &dyn PrivilegedOps,
    images: &dyn ImageIo,
    path: &Path,
    color: Color,
    log: &Logger,
) -> Result<FileOutcome, RunError> {
    ops.take_ownership(path)?;
    ops.grant_full_control(path)?;

    let (width, height) = match images.dimensions(path) {
        Ok(dims) => dims,
        Err(e) if is_permission_denied(&e) => {
            error!(log, "permission error accessing {}. {e}", path.display());
            return Ok(FileOutcome::Skipped);
        }
        Err(source) => {
            return Err(RunError::Image {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let solid = RgbImage::from_pixel(width, height, color.to_pixel());
    match images.save(&solid, path) {
        Ok(()) => {}
        Err(e) if is_permission_denied(&e) => {
            error!(log, "permission error accessing {}. {e}", path.display());
            return Ok(FileOutcome::Skipped);
        }
        Err(source) => {
            return Err(RunError::Image {
                path: path.to_path_buf(),
                source,
            })
        }
    }

    debug!(log, "rewrote {} ({width}x{height})", path.display());
    Ok(FileOutcome::Rewritten { width, height })
}

/// Writes the 1920x1080 OOBE default background used by Windows 7 logon.
pub fn write_legacy_background(dir: &Path, file: &Path, color: Color) -> Result<(), RunError> {
    fs::create_dir_all(dir).map_err(|source| RunError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let (width, height) = LEGACY_BACKGROUND_SIZE;
    let background = RgbImage::from_pixel(width, height, color.to_pixel());

    background.save(file).map_err(|source| {
        if is_permission_denied(&source) {
            RunError::LegacyBackground {
                path: file.to_path_buf(),
                source,
            }
        } else {
            RunError::Image {
                path: file.to_path_buf(),
                source,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use std::{
        collections::{BTreeSet, HashSet},
        io,
        path::PathBuf,
    };

    use image::{ImageError, ImageFormat, Rgb};
    use tempfile::TempDir;

    use super::*;
    use crate::{
        batch::{BatchExecutor, BatchReport},
        privileged::fake::FakeOps,
    };

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| Rgb([x as u8, y as u8, 200]))
    }

    /// Disk access that reports access denied for chosen paths.
    #[derive(Default)]
    struct LockedImages {
        locked_reads: HashSet<PathBuf>,
        locked_writes: HashSet<PathBuf>,
    }

    fn access_denied() -> ImageError {
        ImageError::IoError(io::Error::from(io::ErrorKind::PermissionDenied))
    }

    impl ImageIo for LockedImages {
        fn dimensions(&self, path: &Path) -> ImageResult<(u32, u32)> {
            if self.locked_reads.contains(path) {
                return Err(access_denied());
            }
            FsImages.dimensions(path)
        }

        fn save(&self, image: &RgbImage, path: &Path) -> ImageResult<()> {
            if self.locked_writes.contains(path) {
                return Err(access_denied());
            }
            FsImages.save(image, path)
        }
    }

    #[test]
    fn test_png_keeps_size_and_becomes_solid() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("user-192.png");
        gradient(64, 48).save(&path).unwrap();

        let ops = FakeOps::elevated();
        let color = Color::new(17, 34, 51);
        let outcome = rewrite_image(&ops, &FsImages, &path, color, &Logger::disabled()).unwrap();

        assert_eq!(outcome, FileOutcome::Rewritten { width: 64, height: 48 });
        assert_eq!(ImageFormat::from_path(&path).unwrap(), ImageFormat::Png);
        let written = image::open(&path).unwrap().to_rgb8();
        assert_eq!(written.dimensions(), (64, 48));
        assert!(written.pixels().all(|p| *p == Rgb([17, 34, 51])));
    }

    #[test]
    fn test_bmp_format_is_preserved() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("guest.bmp");
        gradient(10, 7).save(&path).unwrap();

        let ops = FakeOps::elevated();
        rewrite_image(&ops, &FsImages, &path, Color::new(1, 2, 3), &Logger::disabled()).unwrap();

        let bytes = fs::read(&path).unwrap();
        assert_eq!(&bytes[..2], b"BM");
        let written = image::open(&path).unwrap().to_rgb8();
        assert_eq!(written.dimensions(), (10, 7));
        assert!(written.pixels().all(|p| *p == Rgb([1, 2, 3])));
    }

    #[test]
    fn test_jpg_is_rewritten_as_jpeg() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("img0.jpg");
        gradient(32, 16).save(&path).unwrap();

        let ops = FakeOps::elevated();
        rewrite_image(&ops, &FsImages, &path, Color::new(0, 0, 0), &Logger::disabled()).unwrap();

        let bytes = fs::read(&path).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        assert_eq!(image::image_dimensions(&path).unwrap(), (32, 16));
    }

    #[test]
    fn test_ownership_and_acl_precede_the_write() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a.png");
        gradient(2, 2).save(&path).unwrap();

        let ops = FakeOps::elevated();
        rewrite_image(&ops, &FsImages, &path, Color::new(9, 9, 9), &Logger::disabled()).unwrap();

        assert_eq!(
            ops.calls(),
            vec![
                format!("takeown {}", path.display()),
                format!("icacls {}", path.display()),
            ]
        );
    }

    #[test]
    fn test_ownership_failure_is_fatal_and_leaves_file_alone() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a.png");
        gradient(4, 4).save(&path).unwrap();
        let before = fs::read(&path).unwrap();

        let ops = FakeOps {
            elevated: true,
            fail_ownership_for: HashSet::from([path.clone()]),
            ..FakeOps::default()
        };
        let err = rewrite_image(&ops, &FsImages, &path, Color::new(0, 0, 0), &Logger::disabled()).unwrap_err();

        assert!(matches!(err, RunError::Privileged(_)));
        assert!(err.is_fatal());
        assert_eq!(fs::read(&path).unwrap(), before);
    }

    #[test]
    fn test_undecodable_image_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.png");
        fs::write(&path, b"not an image").unwrap();

        let ops = FakeOps::elevated();
        let err = rewrite_image(&ops, &FsImages, &path, Color::new(0, 0, 0), &Logger::disabled()).unwrap_err();

        assert!(matches!(err, RunError::Image { .. }));
    }

    #[test]
    fn test_format_is_detected_from_contents() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("img0.jpg");
        gradient(12, 9).save_with_format(&path, ImageFormat::Png).unwrap();

        let ops = FakeOps::elevated();
        let outcome = rewrite_image(&ops, &FsImages, &path, Color::new(0, 0, 0), &Logger::disabled()).unwrap();

        assert_eq!(outcome, FileOutcome::Rewritten { width: 12, height: 9 });
        let bytes = fs::read(&path).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        assert_eq!(image::image_dimensions(&path).unwrap(), (12, 9));
    }

    #[test]
    fn test_denied_read_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("locked.png");
        gradient(4, 4).save(&path).unwrap();
        let before = fs::read(&path).unwrap();

        let images = LockedImages {
            locked_reads: HashSet::from([path.clone()]),
            ..LockedImages::default()
        };
        let outcome =
            rewrite_image(&FakeOps::elevated(), &images, &path, Color::new(0, 0, 0), &Logger::disabled()).unwrap();

        assert_eq!(outcome, FileOutcome::Skipped);
        assert_eq!(fs::read(&path).unwrap(), before);
    }

    #[test]
    fn test_denied_write_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("locked.bmp");
        gradient(4, 4).save(&path).unwrap();
        let before = fs::read(&path).unwrap();

        let images = LockedImages {
            locked_writes: HashSet::from([path.clone()]),
            ..LockedImages::default()
        };
        let outcome =
            rewrite_image(&FakeOps::elevated(), &images, &path, Color::new(0, 0, 0), &Logger::disabled()).unwrap();

        assert_eq!(outcome, FileOutcome::Skipped);
        assert_eq!(fs::read(&path).unwrap(), before);
    }

    #[test]
    fn test_denied_file_does_not_stop_the_batch() {
        let temp_dir = TempDir::new().unwrap();
        let locked = temp_dir.path().join("a.png");
        let open = temp_dir.path().join("b.png");
        gradient(6, 6).save(&locked).unwrap();
        gradient(6, 6).save(&open).unwrap();

        let ops = FakeOps::elevated();
        let images = LockedImages {
            locked_reads: HashSet::from([locked.clone()]),
            ..LockedImages::default()
        };
        let log = Logger::disabled();
        let files: BTreeSet<PathBuf> = [locked, open.clone()].into_iter().collect();

        let report = BatchExecutor::new(Some(2))
            .run(&files, |path| rewrite_image(&ops, &images, path, Color::new(5, 6, 7), &log))
            .unwrap();

        assert_eq!(report, BatchReport { rewritten: 1, skipped: 1 });
        let written = image::open(&open).unwrap().to_rgb8();
        assert!(written.pixels().all(|p| *p == Rgb([5, 6, 7])));
    }

    #[test]
    fn test_legacy_background_is_full_hd_and_solid() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("oobe").join("info").join("backgrounds");
        let file = dir.join("backgroundDefault.jpg");

        write_legacy_background(&dir, &file, Color::new(255, 0, 0)).unwrap();

        let written = image::open(&file).unwrap().to_rgb8();
        assert_eq!(written.dimensions(), (1920, 1080));
        // JPEG may round a channel by one step
        assert!(written.pixels().all(|p| {
            p[0] >= 250 && p[1] <= 5 && p[2] <= 5
        }));
    }

    #[test]
    fn test_legacy_background_overwrites_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().to_path_buf();
        let file = dir.join("backgroundDefault.jpg");
        gradient(20, 20).save(&file).unwrap();

        write_legacy_background(&dir, &file, Color::new(0, 0, 255)).unwrap();

        assert_eq!(image::image_dimensions(&file).unwrap(), LEGACY_BACKGROUND_SIZE);
    }
}
