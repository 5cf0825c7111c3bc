//! Dataset discovery.
//!
//! The dataset is a torchvision-style image folder: one subdirectory per
//! class, each holding the image files of that class. Class labels are
//! assigned by sorted directory name.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{Error, Result};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tif", "tiff"];

/// Which of the named dataset roots a run trains against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatasetVariant {
    /// Train on `Train_set/`, validate on `Val_set/`
    Full,
    /// Smoke-test on `Mini_set/` for both phases
    Mini,
}

impl DatasetVariant {
    /// Resolve the train/val roots once, at startup.
    pub fn roots(&self, base: &Path) -> DatasetRoots {
        match self {
            DatasetVariant::Full => DatasetRoots {
                train: base.join("Train_set"),
                val: base.join("Val_set"),
            },
            DatasetVariant::Mini => {
                let mini = base.join("Mini_set");
                DatasetRoots {
                    train: mini.clone(),
                    val: mini,
                }
            }
        }
    }
}

impl FromStr for DatasetVariant {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "full" => Ok(DatasetVariant::Full),
            "mini" => Ok(DatasetVariant::Mini),
            other => Err(Error::Config(format!(
                "unknown dataset variant '{other}', expected 'full' or 'mini'"
            ))),
        }
    }
}

impl std::fmt::Display for DatasetVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatasetVariant::Full => write!(f, "full"),
            DatasetVariant::Mini => write!(f, "mini"),
        }
    }
}

/// Resolved dataset root directories.
#[derive(Debug, Clone)]
pub struct DatasetRoots {
    pub train: PathBuf,
    pub val: PathBuf,
}

/// A labeled image on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageSample {
    /// Path to the image file
    pub path: PathBuf,
    /// Class label index
    pub label: usize,
    /// Class name (directory name)
    pub class_name: String,
}

/// Labeled images discovered from a class-per-subdirectory layout.
#[derive(Debug, Clone)]
pub struct ImageFolder {
    /// Root directory of this split
    pub root: PathBuf,
    /// All samples found under the root
    pub samples: Vec<ImageSample>,
    /// Class names in label order
    pub classes: Vec<String>,
    /// Mapping from class name to label index
    pub class_to_idx: HashMap<String, usize>,
}

impl ImageFolder {
    /// Discover all labeled images under `root`.
    ///
    /// A missing root or a root without any image is a fatal startup error.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        info!("Loading image folder from {:?}", root);

        if !root.is_dir() {
            return Err(Error::Dataset(format!(
                "dataset directory does not exist: {root:?}"
            )));
        }

        let mut classes: Vec<String> = Vec::new();
        for entry in std::fs::read_dir(&root)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    classes.push(name.to_string());
                }
            }
        }
        classes.sort();

        if classes.is_empty() {
            return Err(Error::Dataset(format!(
                "no class subdirectories found under {root:?}"
            )));
        }

        let class_to_idx: HashMap<String, usize> = classes
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.clone(), idx))
            .collect();

        let mut samples = Vec::new();
        for class_name in &classes {
            let class_dir = root.join(class_name);
            let label = class_to_idx[class_name];

            for entry in WalkDir::new(&class_dir)
                .min_depth(1)
                .max_depth(1)
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let path = entry.path().to_path_buf();
                if is_image_file(&path) {
                    samples.push(ImageSample {
                        path,
                        label,
                        class_name: class_name.clone(),
                    });
                }
            }

            debug!("Class '{}' mapped to label {}", class_name, label);
        }

        if samples.is_empty() {
            return Err(Error::Dataset(format!(
                "no images found under {root:?}"
            )));
        }

        info!(
            "Found {} samples across {} classes",
            samples.len(),
            classes.len()
        );

        Ok(Self {
            root,
            samples,
            classes,
            class_to_idx,
        })
    }

    /// Number of samples in this split.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Number of classes discovered.
    pub fn num_classes(&self) -> usize {
        self.classes.len()
    }

    /// Per-class statistics for this split.
    pub fn stats(&self) -> DatasetStats {
        let mut class_counts = vec![0usize; self.num_classes()];
        for sample in &self.samples {
            class_counts[sample.label] += 1;
        }

        DatasetStats {
            total_samples: self.samples.len(),
            num_classes: self.num_classes(),
            class_counts,
            class_names: self.classes.clone(),
        }
    }
}

fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Statistics about one dataset split.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetStats {
    pub total_samples: usize,
    pub num_classes: usize,
    pub class_counts: Vec<usize>,
    pub class_names: Vec<String>,
}

impl DatasetStats {
    /// Print statistics to the console.
    pub fn print(&self) {
        println!("Dataset statistics:");
        println!("  Total samples: {}", self.total_samples);
        println!("  Classes: {}", self.num_classes);
        for (idx, name) in self.class_names.iter().enumerate() {
            let count = self.class_counts[idx];
            let bar_len = if self.total_samples > 0 {
                (count as f32 / self.total_samples as f32 * 40.0) as usize
            } else {
                0
            };
            let bar: String = "#".repeat(bar_len);
            println!("    {:3}. {:24} {:5} {}", idx, name, count, bar);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "bach_cnn_loader_{name}_{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    fn touch(path: &Path) {
        std::fs::write(path, b"").unwrap();
    }

    #[test]
    fn test_open_discovers_sorted_classes() {
        let root = scratch_dir("sorted");
        for class in ["invasive", "benign", "normal"] {
            std::fs::create_dir_all(root.join(class)).unwrap();
            touch(&root.join(class).join("a.png"));
            touch(&root.join(class).join("b.jpg"));
        }
        // non-image files are ignored
        touch(&root.join("benign").join("notes.txt"));

        let folder = ImageFolder::open(&root).unwrap();
        assert_eq!(folder.classes, vec!["benign", "invasive", "normal"]);
        assert_eq!(folder.num_classes(), 3);
        assert_eq!(folder.len(), 6);
        assert_eq!(folder.class_to_idx["benign"], 0);
        assert_eq!(folder.class_to_idx["normal"], 2);

        let stats = folder.stats();
        assert_eq!(stats.class_counts, vec![2, 2, 2]);

        std::fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let root = scratch_dir("missing");
        assert!(ImageFolder::open(&root).is_err());
    }

    #[test]
    fn test_empty_root_is_fatal() {
        let root = scratch_dir("empty");
        std::fs::create_dir_all(&root).unwrap();
        assert!(ImageFolder::open(&root).is_err());

        // class directories without images are also fatal
        std::fs::create_dir_all(root.join("benign")).unwrap();
        assert!(ImageFolder::open(&root).is_err());

        std::fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn test_variant_resolves_named_roots() {
        let base = PathBuf::from("/data/bach");

        let full = DatasetVariant::Full.roots(&base);
        assert_eq!(full.train, base.join("Train_set"));
        assert_eq!(full.val, base.join("Val_set"));

        let mini = DatasetVariant::Mini.roots(&base);
        assert_eq!(mini.train, base.join("Mini_set"));
        assert_eq!(mini.val, base.join("Mini_set"));
    }

    #[test]
    fn test_variant_from_str() {
        assert_eq!(
            "full".parse::<DatasetVariant>().unwrap(),
            DatasetVariant::Full
        );
        assert_eq!(
            "Mini".parse::<DatasetVariant>().unwrap(),
            DatasetVariant::Mini
        );
        assert!("tiny".parse::<DatasetVariant>().is_err());
    }
}
