//! Directory-backed element declarations

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use elements_core::models::{CategoryDeclaration, ElementDeclaration};
use elements_core::traits::RegistrySource;
use elements_core::utils::strip_json_comments;
use elements_core::{ElementsError, ElementsResult};
use tracing::{debug, info, instrument};

/// Reads `<dir>/<category>.json` files
///
/// Each file holds a JSON array of declarations and may contain `//` or
/// `/* */` comments. Files are read in name order; other extensions are
/// ignored. A missing directory is created and yields no categories.
#[derive(Debug, Clone)]
pub struct FileRegistrySource {
    dir: PathBuf,
}

impl FileRegistrySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn category_files(&self) -> ElementsResult<Vec<PathBuf>> {
        let mut files = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_json = path.extension().is_some_and(|ext| ext == "json");
            if is_json && entry.file_type().await?.is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    async fn read_category(&self, path: &Path) -> ElementsResult<CategoryDeclaration> {
        let category = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| {
                ElementsError::configuration(format!("无效的元素声明文件名: {}", path.display()))
            })?
            .to_string();

        let raw = tokio::fs::read_to_string(path).await?;
        let elements: Vec<ElementDeclaration> = serde_json::from_str(&strip_json_comments(&raw))
            .map_err(|e| {
                ElementsError::configuration(format!("解析元素声明文件失败 {}: {}", path.display(), e))
            })?;

        debug!("Loaded {} declarations for category {}", elements.len(), category);
        Ok(CategoryDeclaration { category, elements })
    }
}

#[async_trait]
impl RegistrySource for FileRegistrySource {
    #[instrument(skip(self), fields(dir = %self.dir.display()))]
    async fn load_categories(&self) -> ElementsResult<Vec<CategoryDeclaration>> {
        if !tokio::fs::try_exists(&self.dir).await? {
            info!("Elements directory does not exist, creating it: {}", self.dir.display());
            tokio::fs::create_dir_all(&self.dir).await?;
            return Ok(Vec::new());
        }

        let mut categories = Vec::new();
        for path in self.category_files().await? {
            categories.push(self.read_category(&path).await?);
        }
        Ok(categories)
    }

    fn describe(&self) -> String {
        format!("file:{}", self.dir.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use elements_core::models::CacheSetting;

    #[tokio::test]
    async fn test_missing_directory_is_created() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("elements");
        let source = FileRegistrySource::new(&dir);

        let categories = source.load_categories().await.unwrap();
        assert!(categories.is_empty());
        assert!(dir.is_dir());
    }

    #[tokio::test]
    async fn test_reads_commented_files_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("news.json"),
            r#"[
                // latest headlines
                {"name": "list", "file": "list", "cache": {"ttl": 30}},
                /* detail page */
                {"name": "detail", "file": "detail", "action": "show", "esi": true, "config": {"url": "http://x/y"}}
            ]"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("core.json"), r#"[{"name": "logo", "file": "logo"}]"#).unwrap();
        std::fs::write(dir.path().join("README.md"), "not a category").unwrap();

        let categories = FileRegistrySource::new(dir.path()).load_categories().await.unwrap();
        let names: Vec<&str> = categories.iter().map(|c| c.category.as_str()).collect();
        assert_eq!(names, vec!["core", "news"]);

        let news = &categories[1].elements;
        assert_eq!(news.len(), 2);
        assert!(matches!(news[0].cache, Some(CacheSetting::Policy(ref p)) if p.ttl == 30));
        assert_eq!(news[1].action.as_deref(), Some("show"));
        assert!(news[1].esi);
        assert_eq!(news[1].config["url"], "http://x/y");
    }

    #[tokio::test]
    async fn test_malformed_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.json"), "[{").unwrap();

        let err = FileRegistrySource::new(dir.path())
            .load_categories()
            .await
            .unwrap_err();
        assert!(err.to_string().contains("broken.json"));
    }
}
