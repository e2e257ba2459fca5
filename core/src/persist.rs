use crate::error::Result;
use crate::merge::CanonicalSet;
use crate::records::{is_question_block, CanonicalQuestion, LegacyExport};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fs::{create_dir_all, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// One canonical content file: a list of blocks, only some of which are
/// questions. Blocks are kept as raw JSON so everything we do not touch is
/// written back as it was read.
#[derive(Debug, Clone)]
pub struct ContentFile {
    pub path: PathBuf,
    pub blocks: Vec<Value>,
}

impl ContentFile {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let blocks = load_json(&path)?;
        Ok(Self { path, blocks })
    }

    /// Question blocks with their position in the file.
    pub fn questions(&self) -> Result<Vec<(usize, CanonicalQuestion)>> {
        let mut out = Vec::new();
        for (i, block) in self.blocks.iter().enumerate() {
            if is_question_block(block) {
                out.push((i, serde_json::from_value(block.clone())?));
            }
        }
        Ok(out)
    }

    /// Overwrite block `slot` with `question`. Keys the block held as explicit
    /// `null` stay `null` even though the record serializes them as absent.
    pub fn replace_block(&mut self, slot: usize, question: &CanonicalQuestion) -> Result<()> {
        let Some(block) = self.blocks.get_mut(slot) else {
            return Ok(());
        };
        let mut value = serde_json::to_value(question)?;
        if let (Value::Object(old), Value::Object(new)) = (&*block, &mut value) {
            for (key, v) in old {
                if v.is_null() && !new.contains_key(key) {
                    new.insert(key.clone(), Value::Null);
                }
            }
        }
        *block = value;
        Ok(())
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        save_json(path, &self.blocks)
    }
}

/// Several content files merged into one canonical set. A `rustID` declared in
/// more than one file resolves to the block of the last file loaded.
#[derive(Debug, Clone, Default)]
pub struct ContentLibrary {
    files: Vec<ContentFile>,
    slots: HashMap<String, (usize, usize)>,
}

impl ContentLibrary {
    pub fn load<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut library = Self::default();
        for path in paths {
            library.push(ContentFile::load(path)?)?;
        }
        Ok(library)
    }

    pub fn push(&mut self, file: ContentFile) -> Result<()> {
        let file_no = self.files.len();
        for (slot, q) in file.questions()? {
            if let Some((prev, _)) = self.slots.insert(q.rust_id.clone(), (file_no, slot)) {
                let shadowed = self.files.get(prev).map_or(&file.path, |f| &f.path);
                tracing::warn!(rust_id = %q.rust_id, shadowed = %shadowed.display(), file = %file.path.display(), "question declared twice");
            }
        }
        self.files.push(file);
        Ok(())
    }

    pub fn files(&self) -> &[ContentFile] {
        &self.files
    }

    pub fn canonical_set(&self) -> Result<CanonicalSet> {
        let mut set = CanonicalSet::new();
        for (rust_id, &(file_no, slot)) in &self.slots {
            let q = serde_json::from_value(self.files[file_no].blocks[slot].clone())?;
            set.insert(rust_id.clone(), q);
        }
        Ok(set)
    }

    /// Write the records of `set` back into the blocks they came from.
    pub fn store(&mut self, set: &CanonicalSet) -> Result<()> {
        for (rust_id, q) in set {
            if let Some(&(file_no, slot)) = self.slots.get(rust_id) {
                self.files[file_no].replace_block(slot, q)?;
            }
        }
        Ok(())
    }
}

pub fn load_legacy<P: AsRef<Path>>(path: P) -> Result<LegacyExport> {
    load_json(path)
}

/// Rows of a courselets or generic error model export.
pub fn load_rows<P: AsRef<Path>>(path: P) -> Result<Vec<Vec<Value>>> {
    load_json(path)
}

pub fn load_json<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
    let f = File::open(path)?;
    let value = serde_json::from_reader(BufReader::new(f))?;
    Ok(value)
}

pub fn save_json<T: Serialize + ?Sized, P: AsRef<Path>>(path: P, data: &T) -> Result<()> {
    let path = path.as_ref();
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        create_dir_all(dir)?;
    }
    let mut f = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut f, data)?;
    f.write_all(b"\n")?;
    f.flush()?;
    Ok(())
}

/// `dir/unit1.json` -> `dir/unit1merge.json`
pub fn merged_path(path: &Path) -> PathBuf {
    sibling_with_stem(path, "merge.json")
}

/// `dir/unit1merge.json` -> `dir/unit1merge.csv`
pub fn csv_path(path: &Path) -> PathBuf {
    sibling_with_stem(path, ".csv")
}

fn sibling_with_stem(path: &Path, suffix: &str) -> PathBuf {
    let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    path.with_file_name(format!("{stem}{suffix}"))
}
