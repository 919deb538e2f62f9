//! Source-file manifest: a TSV listing every input and output with its
//! SHA-1, written under the destination as `.meta/src_files`.

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::Result;
use crate::excel::{stringify_with_tabs, Eol};

pub const META_DIR: &str = ".meta";
pub const META_SRC_FILE: &str = ".meta/src_files";

/// Row type markers. Sorted order in the manifest is I < M < X.
const TYPE_INCLUDE: &str = "I";
const TYPE_MOCK: &str = "M";
const TYPE_EXCEL: &str = "X";

pub struct MetaCalculator {
    eol: Eol,
}

impl MetaCalculator {
    pub fn new(eol: Eol) -> Self {
        MetaCalculator { eol }
    }

    /// Render the manifest text from the managers' hash maps. Rows are
    /// ordered by type then path, paths use forward slashes.
    pub fn build(
        &self,
        excel_files: &BTreeMap<String, Option<String>>,
        mocks: &BTreeMap<String, Option<String>>,
        includes: &BTreeMap<String, Option<String>>,
    ) -> String {
        let mut rows: Vec<Vec<String>> = Vec::new();
        collect_rows(&mut rows, TYPE_INCLUDE, includes);
        collect_rows(&mut rows, TYPE_MOCK, mocks);
        collect_rows(&mut rows, TYPE_EXCEL, excel_files);
        rows.sort();

        let columns = [
            "type".to_string(),
            "src_file".to_string(),
            "sha1".to_string(),
        ];
        stringify_with_tabs(&columns, &rows, self.eol, true)
    }

    /// Render and write the manifest under `dest_dir`.
    pub fn build_and_save(
        &self,
        dest_dir: &Path,
        excel_files: &BTreeMap<String, Option<String>>,
        mocks: &BTreeMap<String, Option<String>>,
        includes: &BTreeMap<String, Option<String>>,
    ) -> Result<()> {
        let text = self.build(excel_files, mocks, includes);
        std::fs::create_dir_all(dest_dir.join(META_DIR))?;
        std::fs::write(dest_dir.join(META_SRC_FILE), text.as_bytes())?;
        Ok(())
    }
}

fn collect_rows(
    rows: &mut Vec<Vec<String>>,
    row_type: &str,
    map: &BTreeMap<String, Option<String>>,
) {
    for (path, hash) in map {
        rows.push(vec![
            row_type.to_string(),
            path.replace('\\', "/"),
            hash.clone().unwrap_or_default(),
        ]);
    }
}
