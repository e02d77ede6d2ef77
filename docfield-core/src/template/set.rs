use std::env::{self, VarError};
use std::fs;
use std::path::Path;

use snafu::ResultExt;
use tracing::*;

use crate::{
    consts::TEMPLATE_DIR_ENV_NAME,
    error::{DocfieldError, EnvNotFoundSnafu, IoReadSnafu, JsonSnafu},
};

use super::{Template, builtin::builtin_templates};

/// Ordered, validated collection of templates.
///
/// Order is classification priority. Inserting a template whose id is
/// already present replaces it in place.
#[derive(Clone, Debug, Default)]
pub struct TemplateSet {
    templates: Vec<Template>,
}

impl TemplateSet {
    pub fn new(templates: Vec<Template>) -> Result<Self, DocfieldError> {
        let mut set = Self::default();
        for template in templates {
            set.insert(template)?;
        }
        Ok(set)
    }

    pub fn builtin() -> Result<Self, DocfieldError> {
        Self::new(builtin_templates()?)
    }

    /// Built-in templates plus the directory named by `DOCFIELD_TEMPLATE_DIR`,
    /// when that variable is set.
    pub fn from_env() -> Result<Self, DocfieldError> {
        let mut set = Self::builtin()?;
        match env::var(TEMPLATE_DIR_ENV_NAME) {
            Ok(dir) => {
                set.load_dir(&dir)?;
            }
            Err(VarError::NotPresent) => {
                debug!("{} not set, using built-in templates only.", TEMPLATE_DIR_ENV_NAME);
            }
            Err(source) => {
                return Err(source).context(EnvNotFoundSnafu {
                    name: TEMPLATE_DIR_ENV_NAME,
                });
            }
        }
        Ok(set)
    }

    pub fn insert(&mut self, template: Template) -> Result<(), DocfieldError> {
        template.validate()?;
        match self.templates.iter_mut().find(|t| t.id == template.id) {
            Some(slot) => {
                info!("Replacing template `{}` (v{}).", template.id, template.version);
                *slot = template;
            }
            None => self.templates.push(template),
        }
        Ok(())
    }

    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Template, DocfieldError> {
        let path = path.as_ref();
        let path_name = path.display().to_string();
        let content = fs::read_to_string(path).context(IoReadSnafu { path: &path_name })?;
        let template: Template =
            serde_json::from_str(&content).context(JsonSnafu { path: &path_name })?;
        template.validate()?;
        Ok(template)
    }

    /// Loads every `*.json` file of `dir` in file-name order. Returns how many
    /// templates were loaded.
    pub fn load_dir<P: AsRef<Path>>(&mut self, dir: P) -> Result<usize, DocfieldError> {
        let dir = dir.as_ref();
        let dir_name = dir.display().to_string();

        let mut paths = Vec::new();
        for entry in fs::read_dir(dir).context(IoReadSnafu { path: &dir_name })? {
            let path = entry.context(IoReadSnafu { path: &dir_name })?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        for path in &paths {
            let template = Self::load_file(path)?;
            debug!("Loaded template `{}` from {}.", template.id, path.display());
            self.insert(template)?;
        }

        info!("Loaded {} templates from {}.", paths.len(), dir_name);
        Ok(paths.len())
    }

    pub fn get(&self, id: &str) -> Option<&Template> {
        self.templates.iter().find(|t| t.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Template> {
        self.templates.iter()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VISA: &str = r#"{
        "id": "visa",
        "version": 2,
        "orientation": [["签证"], ["姓名"]],
        "fields": [{"name": "name", "anchors": [{"keywords": ["姓名"]}]}]
    }"#;

    const FRONT_OVERRIDE: &str = r#"{
        "id": "id_card_front",
        "version": 3,
        "orientation": [["姓名"], ["性别"]],
        "fields": [{"name": "name", "anchors": [{"keywords": ["姓名"]}]}]
    }"#;

    #[test]
    fn test_builtin_set() {
        let set = TemplateSet::builtin().unwrap();
        assert_eq!(set.len(), 7);
        assert!(set.get("id_card_front").is_some());
        assert!(set.get("visa").is_none());
    }

    #[test]
    fn test_load_dir_appends_and_replaces() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a_visa.json"), VISA).unwrap();
        fs::write(dir.path().join("b_front.json"), FRONT_OVERRIDE).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mut set = TemplateSet::builtin().unwrap();
        let loaded = set.load_dir(dir.path()).unwrap();
        assert_eq!(loaded, 2);
        assert_eq!(set.len(), 8);

        // Replaced in place, custom template appended after the built-ins
        let ids: Vec<_> = set.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids[6], "id_card_front");
        assert_eq!(ids[7], "visa");
        assert_eq!(set.get("id_card_front").unwrap().version, 3);
    }

    #[test]
    fn test_load_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let broken = dir.path().join("broken.json");
        fs::write(&broken, "{ not json").unwrap();
        assert!(matches!(
            TemplateSet::load_file(&broken),
            Err(DocfieldError::Json { .. })
        ));

        let missing = dir.path().join("missing.json");
        assert!(matches!(
            TemplateSet::load_file(&missing),
            Err(DocfieldError::IoRead { .. })
        ));

        let invalid = dir.path().join("invalid.json");
        fs::write(
            &invalid,
            r#"{"id": "x", "orientation": [["a"]], "fields": [{"name": "n"}]}"#,
        )
        .unwrap();
        assert!(matches!(
            TemplateSet::load_file(&invalid),
            Err(DocfieldError::InvalidTemplate { .. })
        ));
    }
}
