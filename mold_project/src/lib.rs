use std::{
    collections::BTreeMap,
    fmt::{Display, Formatter},
    fs,
    path::Path,
};
use toml::Value;

pub const PROJECT_FILE: &str = "mold.toml";

pub const DEFAULT_POSITION_THRESHOLD: f32 = 0.001;
pub const DEFAULT_ROTATION_THRESHOLD: f32 = 0.1;
pub const DEFAULT_SCALE_THRESHOLD: f32 = 0.001;
pub const DEFAULT_CLONE_MARKER: &str = "(Clone)";

/// Raw threshold values as written in `mold.toml`. Positivity is checked by the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdConfig {
    pub position: f32,
    /// Degrees.
    pub rotation: f32,
    pub scale: f32,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            position: DEFAULT_POSITION_THRESHOLD,
            rotation: DEFAULT_ROTATION_THRESHOLD,
            scale: DEFAULT_SCALE_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectConfig {
    pub name: String,
    pub scene: String,
    /// Canonical template name -> template locator.
    pub catalog: BTreeMap<String, String>,
    pub thresholds: ThresholdConfig,
    pub clone_marker: String,
}

impl ProjectConfig {
    pub fn default_for_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scene: "res://main.scn".to_string(),
            catalog: BTreeMap::new(),
            thresholds: ThresholdConfig::default(),
            clone_marker: DEFAULT_CLONE_MARKER.to_string(),
        }
    }
}

#[derive(Debug)]
pub enum ProjectError {
    Io(std::io::Error),
    ParseToml(toml::de::Error),
    MissingField(&'static str),
    InvalidField(&'static str, String),
}

impl Display for ProjectError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "{err}"),
            Self::ParseToml(err) => write!(f, "{err}"),
            Self::MissingField(field) => write!(f, "missing required field `{field}`"),
            Self::InvalidField(field, reason) => write!(f, "invalid field `{field}`: {reason}"),
        }
    }
}

impl std::error::Error for ProjectError {}

impl From<std::io::Error> for ProjectError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<toml::de::Error> for ProjectError {
    fn from(value: toml::de::Error) -> Self {
        Self::ParseToml(value)
    }
}

pub fn load_project_toml(root: &Path) -> Result<ProjectConfig, ProjectError> {
    let project_toml = fs::read_to_string(root.join(PROJECT_FILE))?;
    parse_project_toml(&project_toml)
}

pub fn parse_project_toml(contents: &str) -> Result<ProjectConfig, ProjectError> {
    let value: Value = contents.parse::<Value>()?;
    let project_table = value
        .get("project")
        .and_then(Value::as_table)
        .ok_or(ProjectError::MissingField("project"))?;

    let name = project_table
        .get("name")
        .and_then(Value::as_str)
        .ok_or(ProjectError::MissingField("project.name"))?
        .to_string();

    let scene = project_table
        .get("scene")
        .and_then(Value::as_str)
        .ok_or(ProjectError::MissingField("project.scene"))?
        .to_string();
    validate_res_path("project.scene", &scene)?;

    let mut catalog = BTreeMap::new();
    if let Some(raw) = value.get("catalog") {
        let table = raw.as_table().ok_or(ProjectError::InvalidField(
            "catalog",
            "expected a table of `Name = \"locator\"` entries".to_string(),
        ))?;
        for (template, locator) in table {
            let locator = locator.as_str().ok_or_else(|| {
                ProjectError::InvalidField(
                    "catalog",
                    format!("locator for `{template}` must be a string"),
                )
            })?;
            catalog.insert(template.clone(), locator.to_string());
        }
    }

    let mut thresholds = ThresholdConfig::default();
    if let Some(table) = value.get("thresholds").and_then(Value::as_table) {
        if let Some(v) = table.get("position") {
            thresholds.position = read_number("thresholds.position", v)?;
        }
        if let Some(v) = table.get("rotation") {
            thresholds.rotation = read_number("thresholds.rotation", v)?;
        }
        if let Some(v) = table.get("scale") {
            thresholds.scale = read_number("thresholds.scale", v)?;
        }
    }

    let clone_marker = match value
        .get("scan")
        .and_then(Value::as_table)
        .and_then(|t| t.get("clone_marker"))
    {
        Some(raw) => raw
            .as_str()
            .ok_or(ProjectError::InvalidField(
                "scan.clone_marker",
                "must be a string".to_string(),
            ))?
            .to_string(),
        None => DEFAULT_CLONE_MARKER.to_string(),
    };

    Ok(ProjectConfig {
        name,
        scene,
        catalog,
        thresholds,
        clone_marker,
    })
}

/// Accepts both `0.5` and `1` so integer literals in hand-written files still parse.
fn read_number(field: &'static str, value: &Value) -> Result<f32, ProjectError> {
    match value {
        Value::Float(f) => Ok(*f as f32),
        Value::Integer(i) => Ok(*i as f32),
        _ => Err(ProjectError::InvalidField(field, "must be a number".to_string())),
    }
}

fn validate_res_path(field: &'static str, path: &str) -> Result<(), ProjectError> {
    if path.starts_with("res://") {
        return Ok(());
    }
    Err(ProjectError::InvalidField(
        field,
        "must start with `res://`".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_project_toml_reads_catalog_and_thresholds() {
        let toml = r#"
[project]
name = "Armory"
scene = "res://armory.scn"

[catalog]
Katana = "res://templates/katana.scn"
Pistol = "res://templates/pistol.scn"

[thresholds]
position = 0.5
rotation = 2

[scan]
clone_marker = " (Copy)"
"#;

        let parsed = parse_project_toml(toml).expect("failed to parse mold.toml");
        assert_eq!(parsed.name, "Armory");
        assert_eq!(parsed.scene, "res://armory.scn");
        assert_eq!(
            parsed.catalog.get("Katana").map(String::as_str),
            Some("res://templates/katana.scn")
        );
        assert_eq!(parsed.catalog.len(), 2);
        assert_eq!(parsed.thresholds.position, 0.5);
        assert_eq!(parsed.thresholds.rotation, 2.0);
        assert_eq!(parsed.thresholds.scale, DEFAULT_SCALE_THRESHOLD);
        assert_eq!(parsed.clone_marker, " (Copy)");
    }

    #[test]
    fn parse_project_toml_applies_defaults() {
        let toml = r#"
[project]
name = "Armory"
scene = "res://armory.scn"
"#;

        let parsed = parse_project_toml(toml).expect("failed to parse mold.toml");
        assert!(parsed.catalog.is_empty());
        assert_eq!(parsed.thresholds, ThresholdConfig::default());
        assert_eq!(parsed.clone_marker, DEFAULT_CLONE_MARKER);
    }

    #[test]
    fn parse_project_toml_requires_scene() {
        let toml = r#"
[project]
name = "Armory"
"#;

        let err = parse_project_toml(toml).expect_err("expected parse failure");
        assert!(matches!(err, ProjectError::MissingField("project.scene")));
    }

    #[test]
    fn parse_project_toml_rejects_non_string_locator() {
        let toml = r#"
[project]
name = "Armory"
scene = "res://armory.scn"

[catalog]
Katana = 3
"#;

        let err = parse_project_toml(toml).expect_err("expected parse failure");
        assert!(matches!(err, ProjectError::InvalidField("catalog", _)));
    }

    #[test]
    fn parse_project_toml_rejects_non_numeric_threshold() {
        let toml = r#"
[project]
name = "Armory"
scene = "res://armory.scn"

[thresholds]
scale = "tiny"
"#;

        let err = parse_project_toml(toml).expect_err("expected parse failure");
        assert!(matches!(
            err,
            ProjectError::InvalidField("thresholds.scale", _)
        ));
    }

    #[test]
    fn parse_project_toml_rejects_non_res_scene() {
        let toml = r#"
[project]
name = "Armory"
scene = "./armory.scn"
"#;

        let err = parse_project_toml(toml).expect_err("expected parse failure");
        assert!(matches!(err, ProjectError::InvalidField("project.scene", _)));
    }

    #[test]
    fn default_for_name_uses_engine_defaults() {
        let config = ProjectConfig::default_for_name("Armory");
        assert_eq!(config.thresholds.rotation, DEFAULT_ROTATION_THRESHOLD);
        assert_eq!(config.scene, "res://main.scn");
    }
}
