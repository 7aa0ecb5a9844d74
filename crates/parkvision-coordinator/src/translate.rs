// SPDX-License-Identifier: Apache-2.0
//! Translate vision-provider primitives into domain artifacts (spec §4.8
//! `Compute`: "dispatch to C3 then C5/C6 as appropriate"). Primitives are
//! upstream-shaped (`RawObject`, `RawFace`); artifacts are domain-shaped and
//! carry derived fields (`center`, `area_pct`) the provider doesn't send.

use parkvision_types::{Detection, Face, Landmark, RawFace, RawObject};

/// Assign stable, response-local sequential ids and derive `center`/`area_pct`
/// for each localized object (spec §3 `Detection`).
pub fn detections_from_objects(objects: &[RawObject]) -> Vec<Detection> {
    objects
        .iter()
        .enumerate()
        .map(|(index, object)| {
            let bbox = object.bbox.clamped();
            Detection {
                object_id: index as u32,
                class_name: object.name.clone(),
                confidence: object.confidence,
                bbox,
                center: bbox.center(),
                area_pct: bbox.area_pct(),
            }
        })
        .collect()
}

/// Assign stable, response-local sequential ids to each detected face (spec
/// §3 `Face`).
pub fn faces_from_raw(raw_faces: &[RawFace]) -> Vec<Face> {
    raw_faces
        .iter()
        .enumerate()
        .map(|(index, raw)| Face {
            face_id: index as u32,
            bbox: raw.bbox.clamped(),
            landmarks: raw
                .landmarks
                .iter()
                .map(|&(kind, x, y)| Landmark { kind, x, y })
                .collect(),
            anger: raw.anger,
            joy: raw.joy,
            sorrow: raw.sorrow,
            surprise: raw.surprise,
            blurred: raw.blurred,
            headwear: raw.headwear,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use parkvision_types::{BoundingBox, Likelihood};

    #[test]
    fn detections_get_sequential_ids_and_derived_geometry() {
        let objects = vec![
            RawObject {
                name: "tree".into(),
                confidence: 0.9,
                bbox: BoundingBox { x: 0.0, y: 0.0, w: 0.5, h: 0.5 },
            },
            RawObject {
                name: "bench".into(),
                confidence: 0.8,
                bbox: BoundingBox { x: 0.5, y: 0.5, w: 0.2, h: 0.2 },
            },
        ];
        let detections = detections_from_objects(&objects);
        assert_eq!(detections[0].object_id, 0);
        assert_eq!(detections[1].object_id, 1);
        assert_eq!(detections[0].center, (0.25, 0.25));
        assert!((detections[0].area_pct - 25.0).abs() < 1e-4);
    }

    #[test]
    fn faces_preserve_expression_fields() {
        let raw = vec![RawFace {
            bbox: BoundingBox { x: 0.1, y: 0.1, w: 0.3, h: 0.3 },
            landmarks: vec![("left_eye", 0.2, 0.2)],
            anger: Likelihood::Unlikely,
            joy: Likelihood::VeryLikely,
            sorrow: Likelihood::VeryUnlikely,
            surprise: Likelihood::Possible,
            blurred: false,
            headwear: true,
        }];
        let faces = faces_from_raw(&raw);
        assert_eq!(faces[0].face_id, 0);
        assert_eq!(faces[0].joy, Likelihood::VeryLikely);
        assert_eq!(faces[0].landmarks[0].kind, "left_eye");
        assert!(faces[0].headwear);
    }
}
