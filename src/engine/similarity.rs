//! Cosine similarity between face embeddings.

use crate::db::Face;

/// Cosine similarity of two embeddings, in [-1.0, 1.0].
///
/// Mismatched lengths, empty inputs, and zero vectors all score 0.0:
/// "no match," not an error.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Similarity between two faces; a face without an embedding never
/// matches anything.
pub fn face_similarity(a: &Face, b: &Face) -> f32 {
    match (&a.embedding, &b.embedding) {
        (Some(ea), Some(eb)) => cosine_similarity(ea, eb),
        _ => 0.0,
    }
}
