//! JSON interchange documents.
//!
//! An organized print is written as nested objects keyed `layer_<i>` and
//! `path_<j>`:
//!
//! ```json
//! {"layer_0": {"path_0": [{"point": [0.0, 0.0, 0.25], "layer_height": 0.5, ...}]}}
//! ```
//!
//! Slice results use serde's tagged form, `{"layer_type": "horizontal",
//! "layers": [...]}`.

use std::collections::BTreeMap;

use serde::de::Error as _;
use tracing::debug;

use crate::error::{Result, SlicerError};
use crate::geometry::{PathKey, PrintPoint};
use crate::organize::OrganizedPrint;
use crate::slicer::SliceResult;

type Document = BTreeMap<String, BTreeMap<String, Vec<PrintPoint>>>;

fn parse_index(key: &str, prefix: &str) -> Result<usize> {
    key.strip_prefix(prefix)
        .and_then(|i| i.parse().ok())
        .ok_or_else(|| {
            SlicerError::Json(serde_json::Error::custom(format!(
                "expected key '{prefix}<index>', got '{key}'"
            )))
        })
}

impl OrganizedPrint {
    /// Check that every printpoint has its extruder toggle and velocity.
    pub fn check_complete(&self) -> Result<()> {
        for (key, points) in self.paths() {
            for (index, p) in points.iter().enumerate() {
                let attribute = if p.extruder_toggle.is_none() {
                    "extruder_toggle"
                } else if p.velocity.is_none() {
                    "velocity"
                } else {
                    continue;
                };
                return Err(SlicerError::IncompleteAttributes {
                    layer: key.layer,
                    path: key.path,
                    index,
                    attribute,
                });
            }
        }
        Ok(())
    }

    /// Interchange document. Fails if any printpoint is incomplete.
    pub fn to_json_value(&self) -> Result<serde_json::Value> {
        self.check_complete()?;
        let mut doc = Document::new();
        for (key, points) in self.paths() {
            doc.entry(format!("layer_{}", key.layer))
                .or_default()
                .insert(format!("path_{}", key.path), points.to_vec());
        }
        Ok(serde_json::to_value(doc)?)
    }

    /// Interchange document as pretty-printed JSON text.
    pub fn to_json(&self) -> Result<String> {
        let value = self.to_json_value()?;
        Ok(serde_json::to_string_pretty(&value)?)
    }

    /// Read an interchange document. Parents are restored from the keys.
    pub fn from_json(text: &str) -> Result<Self> {
        let doc: Document = serde_json::from_str(text)?;
        let mut print = Self::new();
        for (layer_key, paths) in doc {
            let layer = parse_index(&layer_key, "layer_")?;
            for (path_key, points) in paths {
                let path = parse_index(&path_key, "path_")?;
                print.insert(PathKey::new(layer, path), points);
            }
        }
        debug!(paths = print.number_of_paths(), "organized print loaded");
        Ok(print)
    }
}

impl SliceResult {
    /// Tagged JSON text of the layers or segments.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Read a slice result written by [`SliceResult::to_json`].
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use stratum_math::{Point3, Vec3};

    fn complete_print() -> OrganizedPrint {
        let mut print = OrganizedPrint::new();
        for (layer, path) in [(0, 0), (0, 1), (2, 0), (10, 0)] {
            let key = PathKey::new(layer, path);
            let points = (0..3)
                .map(|i| {
                    let mut p = PrintPoint::new(
                        Point3::new(i as f64 * 0.1, 1.0 / 3.0, layer as f64 * 0.7),
                        0.7,
                        Vec3::z(),
                        key,
                    );
                    p.extruder_toggle = Some(i != 2);
                    p.velocity = Some(25.0);
                    p.blend_radius = 0.21;
                    p.attributes.insert("temperature".into(), 200.5);
                    p
                })
                .collect();
            print.insert(key, points);
        }
        print
    }

    #[test]
    fn test_document_layout() {
        let value = complete_print().to_json_value().unwrap();
        let first = &value["layer_0"]["path_1"][0];
        assert_eq!(first["extruder_toggle"], true);
        assert_eq!(first["velocity"], 25.0);
        assert_eq!(first["attributes"]["temperature"], 200.5);
        assert!(first.get("parent").is_none());
        assert!(value["layer_10"]["path_0"].is_array());
    }

    #[test]
    fn test_round_trip() {
        let print = complete_print();
        let back = OrganizedPrint::from_json(&print.to_json().unwrap()).unwrap();

        assert_eq!(back.number_of_paths(), print.number_of_paths());
        let keys: Vec<PathKey> = back.paths().map(|(k, _)| k).collect();
        let expected: Vec<PathKey> = print.paths().map(|(k, _)| k).collect();
        assert_eq!(keys, expected);
        for (a, b) in print.points().zip(back.points()) {
            assert_relative_eq!(a.point, b.point, epsilon = 1e-12);
            assert_eq!(a.extruder_toggle, b.extruder_toggle);
            assert_eq!(a.velocity, b.velocity);
            assert_eq!(a.attributes, b.attributes);
            assert_eq!(a.parent, b.parent);
        }
    }

    #[test]
    fn test_incomplete_print_is_rejected() {
        let mut print = complete_print();
        print.get_mut(PathKey::new(2, 0)).unwrap()[1].velocity = None;
        assert!(matches!(
            print.to_json(),
            Err(SlicerError::IncompleteAttributes { layer: 2, path: 0, index: 1, attribute: "velocity" })
        ));
    }

    #[test]
    fn test_bad_keys() {
        assert!(matches!(
            OrganizedPrint::from_json(r#"{"layer_x": {}}"#),
            Err(SlicerError::Json(_))
        ));
        assert!(matches!(
            OrganizedPrint::from_json(r#"{"layer_0": {"p0": []}}"#),
            Err(SlicerError::Json(_))
        ));
    }
}
