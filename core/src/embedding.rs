use sha2::{Digest, Sha256};

/// Deterministic, dependency-free stand-in for a real embedding model: maps
/// text to a fixed-dimension vector derived from a SHA-256 digest. Used as
/// the reference `Embedder` implementation so tests are reproducible
/// without a network call or GPU.
pub fn deterministic_embedding(text: &str, model_id: &str, dims: usize) -> Vec<f32> {
    let dims = dims.max(1);

    let mut hasher = Sha256::new();
    hasher.update(model_id.as_bytes());
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();

    let mut out = Vec::with_capacity(dims);
    for i in 0..dims {
        let byte = digest[i % digest.len()];
        let value = (byte as f32 / 127.5) - 1.0;
        out.push(value);
    }

    normalize_l2(&mut out);
    out
}

/// Normalizes `vector` to unit L2 norm in place. A zero vector is left
/// untouched (there is no meaningful direction to normalize to).
pub fn normalize_l2(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
}

pub fn l2_norm(vector: &[f32]) -> f32 {
    vector.iter().map(|v| v * v).sum::<f32>().sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_embedding_is_reproducible_for_same_inputs() {
        let a = deterministic_embedding("hello", "embedding-default-v1", 8);
        let b = deterministic_embedding("hello", "embedding-default-v1", 8);
        assert_eq!(a, b);
    }

    #[test]
    fn deterministic_embedding_changes_when_model_changes() {
        let a = deterministic_embedding("hello", "embedding-default-v1", 8);
        let b = deterministic_embedding("hello", "embedding-alt-v1", 8);
        assert_ne!(a, b);
    }

    #[test]
    fn deterministic_embedding_is_unit_norm() {
        let v = deterministic_embedding("some prompt text", "embedding-default-v1", 32);
        let norm = l2_norm(&v);
        assert!((norm - 1.0).abs() < 1e-5, "norm was {norm}");
    }

    #[test]
    fn normalize_l2_leaves_zero_vector_untouched() {
        let mut v = vec![0.0f32; 4];
        normalize_l2(&mut v);
        assert_eq!(v, vec![0.0, 0.0, 0.0, 0.0]);
    }
}
