use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

pub struct TestProject {
    pub root: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        Self { root }
    }

    /// site.kdl を書き込み、そのパスを返す
    pub fn write_site_kdl(&self, content: &str) -> PathBuf {
        let path = self.root.path().join("site.kdl");
        fs::write(&path, content).unwrap();
        path
    }

    #[allow(dead_code)]
    pub fn path(&self) -> PathBuf {
        self.root.path().to_path_buf()
    }
}

pub const VALID_SITE: &str = r#"
site "marketing" {
    domain "example.com"
    region "eu-west-1"
    source "./dist"
    tags team="web"
}
"#;
