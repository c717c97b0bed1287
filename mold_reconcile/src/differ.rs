use mold_project::ThresholdConfig;
use mold_structs::Transform3D;
use serde::Serialize;

use crate::{
    catalog::{Catalog, Template, TemplateCache, TemplateSource},
    error::{CatalogError, ThresholdError},
    scanner::Candidate,
};

/// Per-dimension tolerances. A delta counts as a difference only when strictly greater.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Thresholds {
    position: f32,
    rotation_deg: f32,
    scale: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            position: 0.001,
            rotation_deg: 0.1,
            scale: 0.001,
        }
    }
}

impl Thresholds {
    pub fn new(position: f32, rotation_deg: f32, scale: f32) -> Result<Self, ThresholdError> {
        Ok(Self {
            position: checked("position", position)?,
            rotation_deg: checked("rotation", rotation_deg)?,
            scale: checked("scale", scale)?,
        })
    }

    pub fn position(&self) -> f32 {
        self.position
    }

    pub fn rotation_deg(&self) -> f32 {
        self.rotation_deg
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }
}

impl TryFrom<ThresholdConfig> for Thresholds {
    type Error = ThresholdError;

    fn try_from(config: ThresholdConfig) -> Result<Self, Self::Error> {
        Self::new(config.position, config.rotation, config.scale)
    }
}

fn checked(field: &'static str, value: f32) -> Result<f32, ThresholdError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ThresholdError::InvalidThreshold { field, value })
    }
}

/// Placement diff between one candidate and the template it matched.
/// Only meaningful until the next structural edit or scan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub candidate: Candidate,
    pub template: String,
    pub canonical: Transform3D,
    pub position_delta: f32,
    /// Shortest-arc angle, degrees.
    pub rotation_delta: f32,
    pub scale_delta: f32,
    pub position_differs: bool,
    pub rotation_differs: bool,
    pub scale_differs: bool,
    pub selected: bool,
}

impl Comparison {
    pub fn has_differences(&self) -> bool {
        self.position_differs || self.rotation_differs || self.scale_differs
    }

    pub fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }
}

pub fn compare(candidate: &Candidate, template: &Template, thresholds: &Thresholds) -> Comparison {
    let live = &candidate.transform;
    let canonical = template.canonical;

    let position_delta = live.position.distance(canonical.position);
    let rotation_delta = live.rotation.angle_to_degrees(canonical.rotation);
    let scale_delta = live.scale.distance(canonical.scale);

    let position_differs = position_delta > thresholds.position;
    let rotation_differs = rotation_delta > thresholds.rotation_deg;
    let scale_differs = scale_delta > thresholds.scale;
    let flagged = position_differs || rotation_differs || scale_differs;

    Comparison {
        candidate: candidate.clone(),
        template: template.canonical_name.clone(),
        canonical,
        position_delta,
        rotation_delta,
        scale_delta,
        position_differs,
        rotation_differs,
        scale_differs,
        selected: flagged,
    }
}

/// Result of comparing one candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum CompareOutcome {
    Compared(Comparison),
    /// Capability-only candidate with no catalog entry.
    Unmatched(Candidate),
    TemplateUnresolvable {
        candidate: Candidate,
        error: CatalogError,
    },
}

impl CompareOutcome {
    pub fn comparison(&self) -> Option<&Comparison> {
        match self {
            Self::Compared(c) => Some(c),
            _ => None,
        }
    }

    pub fn candidate(&self) -> &Candidate {
        match self {
            Self::Compared(c) => &c.candidate,
            Self::Unmatched(c) => c,
            Self::TemplateUnresolvable { candidate, .. } => candidate,
        }
    }
}

/// Compare every candidate. Each template is loaded at most once per call.
pub fn compare_all<S: TemplateSource>(
    candidates: &[Candidate],
    catalog: &Catalog<S>,
    thresholds: &Thresholds,
) -> Vec<CompareOutcome> {
    let mut cache = TemplateCache::new(catalog);
    candidates
        .iter()
        .map(|candidate| {
            let Some(name) = candidate.matched.as_deref() else {
                return CompareOutcome::Unmatched(candidate.clone());
            };
            match cache.get(name) {
                Ok(template) => CompareOutcome::Compared(compare(candidate, template, thresholds)),
                Err(error) => {
                    log::warn!("{}: {error}", candidate.display_name);
                    CompareOutcome::TemplateUnresolvable {
                        candidate: candidate.clone(),
                        error,
                    }
                }
            }
        })
        .collect()
}

/// Keep only the successful comparisons.
pub fn comparisons(outcomes: Vec<CompareOutcome>) -> Vec<Comparison> {
    outcomes
        .into_iter()
        .filter_map(|o| match o {
            CompareOutcome::Compared(c) => Some(c),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{catalog::MemorySource, scanner::MatchKind};
    use mold_ids::NodeID;
    use mold_nodes::Capabilities;
    use mold_scene::Scene;
    use mold_structs::{Quaternion, Vector3};

    fn template(canonical: Transform3D) -> Template {
        Template {
            canonical_name: "Crate".to_string(),
            locator: "res://crate.scn".to_string(),
            scene: Scene::default(),
            canonical,
        }
    }

    fn candidate(transform: Transform3D) -> Candidate {
        Candidate {
            node: NodeID::from_parts(1, 0),
            display_name: "Crate".to_string(),
            matched: Some("Crate".to_string()),
            via: MatchKind::Name,
            capabilities: Capabilities::empty(),
            transform,
            parent: NodeID::nil(),
            sibling_index: 0,
        }
    }

    #[test]
    fn thresholds_reject_non_positive_and_non_finite() {
        assert!(Thresholds::new(0.5, 1.0, 0.5).is_ok());
        assert_eq!(
            Thresholds::new(0.0, 1.0, 0.5),
            Err(ThresholdError::InvalidThreshold {
                field: "position",
                value: 0.0
            })
        );
        assert!(Thresholds::new(0.5, -1.0, 0.5).is_err());
        assert!(Thresholds::new(0.5, 1.0, f32::NAN).is_err());
        assert!(Thresholds::new(f32::INFINITY, 1.0, 0.5).is_err());
    }

    #[test]
    fn distance_equal_to_threshold_is_not_a_difference() {
        let thresholds = Thresholds::new(0.5, 0.1, 0.5).unwrap();
        let result = compare(
            &candidate(Transform3D::from_position(Vector3::new(0.5, 0.0, 0.0))),
            &template(Transform3D::default()),
            &thresholds,
        );
        assert_eq!(result.position_delta, 0.5);
        assert!(!result.position_differs);
        assert!(!result.has_differences());
        assert!(!result.selected);
    }

    #[test]
    fn each_dimension_is_classified_independently() {
        let thresholds = Thresholds::default();
        let mut live = Transform3D::default();
        live.rotation = Quaternion::from_euler_degrees(0.0, 5.0, 0.0);
        live.scale = Vector3::new(1.0, 2.0, 1.0);
        let result = compare(&candidate(live), &template(Transform3D::default()), &thresholds);

        assert!(!result.position_differs);
        assert!(result.rotation_differs);
        assert!((result.rotation_delta - 5.0).abs() < 1e-3);
        assert!(result.scale_differs);
        assert!(result.selected);
    }

    #[test]
    fn compare_all_reports_unmatched_and_unresolvable() {
        let catalog = Catalog::new(
            [("Crate", "res://crate.scn"), ("Barrel", "res://barrel.scn")],
            MemorySource::new().with("res://crate.scn", "[crate]\n[/crate]\n"),
        );
        let mut unmapped = candidate(Transform3D::default());
        unmapped.matched = None;
        unmapped.via = MatchKind::Capability;
        let mut barrel = candidate(Transform3D::default());
        barrel.matched = Some("Barrel".to_string());

        let outcomes = compare_all(
            &[candidate(Transform3D::default()), unmapped, barrel],
            &catalog,
            &Thresholds::default(),
        );
        assert!(matches!(outcomes[0], CompareOutcome::Compared(ref c) if !c.has_differences()));
        assert!(matches!(outcomes[1], CompareOutcome::Unmatched(_)));
        assert!(matches!(
            outcomes[2],
            CompareOutcome::TemplateUnresolvable {
                error: CatalogError::TemplateUnresolvable { .. },
                ..
            }
        ));
        assert_eq!(comparisons(outcomes).len(), 1);
    }
}
