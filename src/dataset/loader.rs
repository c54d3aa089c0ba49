//! Split-Tree Loader
//!
//! Scans a directory whose immediate subdirectories are class names and
//! builds the sample list for one split (train or test). The label
//! vocabulary is the sorted list of subdirectory names, so labels are
//! stable across runs and across splits.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::dataset::has_image_extension;
use crate::utils::error::{DinoError, Result};

/// A single image sample with its label and metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageSample {
    /// Path to the image file
    pub path: PathBuf,
    /// Class label index into the sorted vocabulary
    pub label: usize,
    /// Class name (e.g. "dinosaur")
    pub class_name: String,
}

/// One split of the dataset, loaded lazily from a directory tree
#[derive(Debug, Clone)]
pub struct ImageFolder {
    /// Root directory of this split
    pub root: PathBuf,
    /// All samples found under the root
    pub samples: Vec<ImageSample>,
    /// Label vocabulary, sorted lexicographically
    pub classes: Vec<String>,
}

impl ImageFolder {
    /// Scan a split root.
    ///
    /// A missing root is fatal. Empty class directories are kept in the
    /// vocabulary (so labels stay aligned across splits) but surface a
    /// warning.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        info!("loading image folder from {:?}", root);

        if !root.exists() {
            return Err(DinoError::PathNotFound(root));
        }

        let mut classes: Vec<String> = std::fs::read_dir(&root)?
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .filter_map(|e| e.file_name().to_str().map(|s| s.to_string()))
            .collect();
        classes.sort();

        if classes.is_empty() {
            return Err(DinoError::Dataset(format!(
                "no class directories found under {:?}",
                root
            )));
        }

        let mut samples = Vec::new();
        for (label, class_name) in classes.iter().enumerate() {
            let class_dir = root.join(class_name);
            let before = samples.len();

            for entry in WalkDir::new(&class_dir)
                .min_depth(1)
                .max_depth(1)
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let path = entry.path().to_path_buf();
                if has_image_extension(&path) {
                    samples.push(ImageSample {
                        path,
                        label,
                        class_name: class_name.clone(),
                    });
                }
            }

            let count = samples.len() - before;
            if count == 0 {
                warn!("class '{}' is empty under {:?}", class_name, root);
            } else {
                debug!("class '{}' (label {}): {} samples", class_name, label, count);
            }
        }

        info!("loaded {} samples across {} classes", samples.len(), classes.len());

        Ok(Self {
            root,
            samples,
            classes,
        })
    }

    /// Get the number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if the split is empty
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Get the number of classes
    pub fn num_classes(&self) -> usize {
        self.classes.len()
    }

    /// Look up the label index for a class name
    pub fn class_index(&self, name: &str) -> Option<usize> {
        self.classes.iter().position(|c| c == name)
    }

    /// Per-class sample counts, indexed by label
    pub fn class_counts(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.classes.len()];
        for sample in &self.samples {
            counts[sample.label] += 1;
        }
        counts
    }

    /// Get statistics about this split
    pub fn stats(&self) -> DatasetStats {
        DatasetStats {
            total_samples: self.samples.len(),
            classes: self
                .classes
                .iter()
                .cloned()
                .zip(self.class_counts())
                .collect(),
        }
    }
}

/// Statistics about one split
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetStats {
    pub total_samples: usize,
    pub classes: Vec<(String, usize)>,
}

impl DatasetStats {
    /// Print statistics to console
    pub fn print(&self) {
        println!("  Total samples: {}", self.total_samples);
        for (name, count) in &self.classes {
            let bar_len = if self.total_samples > 0 {
                (*count as f32 / self.total_samples as f32 * 40.0) as usize
            } else {
                0
            };
            let bar: String = "█".repeat(bar_len);
            println!("    {:16} {:5} {}", name, count, bar);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn make_split(classes: &[(&str, usize)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (class, count) in classes {
            let class_dir = dir.path().join(class);
            fs::create_dir_all(&class_dir).unwrap();
            for i in 0..*count {
                fs::write(class_dir.join(format!("{:04}.jpg", i)), b"").unwrap();
            }
        }
        dir
    }

    #[test]
    fn test_vocabulary_is_sorted() {
        // Creation order must not affect label assignment
        let dir = make_split(&[("not_dinosaur", 2), ("dinosaur", 3)]);
        let folder = ImageFolder::open(dir.path()).unwrap();

        assert_eq!(folder.classes, vec!["dinosaur", "not_dinosaur"]);
        assert_eq!(folder.class_index("dinosaur"), Some(0));
        assert_eq!(folder.class_index("not_dinosaur"), Some(1));
        assert_eq!(folder.class_counts(), vec![3, 2]);
        assert_eq!(folder.len(), 5);
    }

    #[test]
    fn test_labels_match_class_dirs() {
        let dir = make_split(&[("dinosaur", 1), ("not_dinosaur", 1)]);
        let folder = ImageFolder::open(dir.path()).unwrap();

        for sample in &folder.samples {
            assert_eq!(folder.classes[sample.label], sample.class_name);
        }
    }

    #[test]
    fn test_non_image_files_ignored() {
        let dir = make_split(&[("dinosaur", 2)]);
        fs::write(dir.path().join("dinosaur/notes.txt"), b"hello").unwrap();

        let folder = ImageFolder::open(dir.path()).unwrap();
        assert_eq!(folder.len(), 2);
    }

    #[test]
    fn test_empty_class_kept_in_vocabulary() {
        let dir = make_split(&[("dinosaur", 2), ("not_dinosaur", 0)]);
        let folder = ImageFolder::open(dir.path()).unwrap();

        assert_eq!(folder.num_classes(), 2);
        assert_eq!(folder.class_counts(), vec![2, 0]);
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let result = ImageFolder::open("/nonexistent/split/train");
        assert!(matches!(result, Err(DinoError::PathNotFound(_))));
    }

    #[test]
    fn test_stats() {
        let dir = make_split(&[("dinosaur", 4), ("not_dinosaur", 6)]);
        let folder = ImageFolder::open(dir.path()).unwrap();
        let stats = folder.stats();

        assert_eq!(stats.total_samples, 10);
        assert_eq!(stats.classes[0], ("dinosaur".to_string(), 4));
        assert_eq!(stats.classes[1], ("not_dinosaur".to_string(), 6));
    }
}
