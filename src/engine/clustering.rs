//! Seed-based grouping of unassigned faces into candidate identities.

use rayon::prelude::*;
use tracing::info;

use super::similarity::face_similarity;
use super::SIMILARITY_THRESHOLD;
use crate::db::Face;
use crate::error::Result;
use crate::store::FaceStore;

/// A candidate identity: one seed face plus every unplaced face that
/// scored at or above the threshold against that seed.
///
/// Membership is judged only against the seed, never against other
/// members, so which faces get to act as seeds decides the grouping.
#[derive(Debug, Clone)]
pub struct FaceCluster {
    pub seed_face_id: i64,
    /// Member faces, seed first, each with its similarity to the seed.
    pub members: Vec<(Face, f32)>,
}

impl FaceCluster {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Member faces without their scores, seed first.
    pub fn faces(&self) -> Vec<&Face> {
        self.members.iter().map(|(face, _)| face).collect()
    }
}

/// Group an owner's unassigned faces into candidate identities.
///
/// Single greedy pass in store order: each not-yet-placed face seeds a
/// group and absorbs the remaining unplaced faces scoring at or above
/// [`SIMILARITY_THRESHOLD`] against it. Groups that end below two
/// members are discarded; their faces stay unassigned and absent from
/// the output. Existing people are never consulted and nothing is
/// written back to the store.
///
/// Deterministic for a fixed store order; a different order can seed
/// different groups from the same embeddings.
pub fn cluster_unassigned<S: FaceStore>(store: &S, owner_id: i64) -> Result<Vec<FaceCluster>> {
    let faces = store.unassigned_faces(owner_id)?;
    if faces.is_empty() {
        return Ok(Vec::new());
    }

    info!(
        "clustering {} unassigned faces for owner {}",
        faces.len(),
        owner_id
    );

    let mut placed = vec![false; faces.len()];
    let mut clusters = Vec::new();

    for i in 0..faces.len() {
        if placed[i] {
            continue;
        }

        let seed = &faces[i];
        placed[i] = true;

        // Each candidate is judged against the fixed seed only, so the
        // scores are independent and the scan can run in parallel.
        let scored: Vec<(usize, f32)> = ((i + 1)..faces.len())
            .into_par_iter()
            .filter(|&j| !placed[j])
            .map(|j| (j, face_similarity(seed, &faces[j])))
            .collect();

        let mut members = vec![(seed.clone(), 1.0)];
        for (j, score) in scored {
            if score >= SIMILARITY_THRESHOLD {
                placed[j] = true;
                members.push((faces[j].clone(), score));
            }
        }

        if members.len() >= 2 {
            clusters.push(FaceCluster {
                seed_face_id: seed.id,
                members,
            });
        }
    }

    info!("created {} face clusters", clusters.len());
    Ok(clusters)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{BoundingBox, Database};

    fn test_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn add_face(db: &Database, media_id: i64, embedding: Option<&[f32]>) -> i64 {
        let bbox = BoundingBox {
            x: 0,
            y: 0,
            width: 32,
            height: 32,
        };
        db.store_face(media_id, &bbox, Some(0.9), embedding).unwrap()
    }

    #[test]
    fn identical_embeddings_form_one_group() {
        let db = test_db();
        let media = db.add_media(1, "/photos/a.jpg").unwrap();
        let f1 = add_face(&db, media, Some(&[1.0, 0.0, 0.0]));
        let f2 = add_face(&db, media, Some(&[1.0, 0.0, 0.0]));

        let clusters = cluster_unassigned(&db, 1).unwrap();
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].len(), 2);
        assert_eq!(clusters[0].seed_face_id, f1);

        let ids: Vec<i64> = clusters[0].faces().iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![f1, f2]);
        assert!((clusters[0].members[1].1 - 1.0).abs() < 0.0001);
    }

    #[test]
    fn orthogonal_embeddings_never_cluster() {
        let db = test_db();
        let media = db.add_media(1, "/photos/a.jpg").unwrap();
        add_face(&db, media, Some(&[1.0, 0.0]));
        add_face(&db, media, Some(&[0.0, 1.0]));

        // Both would-be groups stay singletons and are dropped.
        let clusters = cluster_unassigned(&db, 1).unwrap();
        assert!(clusters.is_empty());
    }

    #[test]
    fn no_group_has_fewer_than_two_faces() {
        let db = test_db();
        let media = db.add_media(1, "/photos/a.jpg").unwrap();
        add_face(&db, media, Some(&[1.0, 0.0]));
        add_face(&db, media, Some(&[1.0, 0.1]));
        add_face(&db, media, Some(&[0.0, 1.0])); // matches nothing

        let clusters = cluster_unassigned(&db, 1).unwrap();
        assert_eq!(clusters.len(), 1);
        for cluster in &clusters {
            assert!(cluster.len() >= 2);
        }
    }

    #[test]
    fn grouping_depends_on_store_order() {
        // a and c are dissimilar; b bridges both. Which face seeds first
        // decides whether c joins the group.
        let a = [1.0_f32, 0.0];
        let b = [1.0_f32, 1.0];
        let c = [0.0_f32, 1.0];

        let db1 = test_db();
        let media = db1.add_media(1, "/photos/a.jpg").unwrap();
        add_face(&db1, media, Some(&a));
        add_face(&db1, media, Some(&b));
        add_face(&db1, media, Some(&c));

        let clusters = cluster_unassigned(&db1, 1).unwrap();
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].len(), 2); // a absorbs b; c left out

        let db2 = test_db();
        let media = db2.add_media(1, "/photos/a.jpg").unwrap();
        add_face(&db2, media, Some(&b));
        add_face(&db2, media, Some(&a));
        add_face(&db2, media, Some(&c));

        let clusters = cluster_unassigned(&db2, 1).unwrap();
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].len(), 3); // b as seed absorbs both
    }

    #[test]
    fn faces_without_embeddings_never_cluster() {
        let db = test_db();
        let media = db.add_media(1, "/photos/a.jpg").unwrap();
        add_face(&db, media, None);
        add_face(&db, media, None);
        add_face(&db, media, Some(&[1.0, 0.0]));

        let clusters = cluster_unassigned(&db, 1).unwrap();
        assert!(clusters.is_empty());
    }

    #[test]
    fn assigned_faces_are_not_considered() {
        let db = test_db();
        let media = db.add_media(1, "/photos/a.jpg").unwrap();
        let assigned = add_face(&db, media, Some(&[1.0, 0.0, 0.0]));
        add_face(&db, media, Some(&[1.0, 0.0, 0.0]));
        add_face(&db, media, Some(&[1.0, 0.0, 0.0]));

        let person = db.create_person(1, "Ada", None).unwrap();
        let mut face = db.face_by_id(assigned).unwrap().unwrap();
        face.person_id = Some(person);
        db.save_face(&face).unwrap();

        let clusters = cluster_unassigned(&db, 1).unwrap();
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].len(), 2);
        assert!(clusters[0].faces().iter().all(|f| f.id != assigned));
    }
}
