use rand::Rng;

use crate::error::{AppError, AppResult};

/// Attempt budget for optimistic unique-code allocation. The keyspace is
/// 26^4 * 10^4 (~4.57 billion); colliding five times in a row indicates a
/// systemic problem and is surfaced instead of retried forever.
pub const MAX_CODE_ATTEMPTS: usize = 5;

/// Generate one candidate code: 4 uppercase ASCII letters followed by
/// 4 digits, e.g. `QWER1234`. Order codes and bank numbers share this shape.
pub fn generate_code() -> String {
    let mut rng = rand::thread_rng();
    let mut code = String::with_capacity(8);
    for _ in 0..4 {
        code.push(rng.gen_range(b'A'..=b'Z') as char);
    }
    for _ in 0..4 {
        code.push(rng.gen_range(b'0'..=b'9') as char);
    }
    code
}

/// Allocate a code that `taken` reports as unused, regenerating on collision
/// up to [`MAX_CODE_ATTEMPTS`] times.
///
/// The caller owns uniqueness: `taken` must probe the collection the code
/// will be inserted into.
pub async fn allocate_unique<F, Fut>(mut taken: F) -> AppResult<String>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = AppResult<bool>>,
{
    for _ in 0..MAX_CODE_ATTEMPTS {
        let candidate = generate_code();
        if !taken(candidate.clone()).await? {
            return Ok(candidate);
        }
    }
    Err(AppError::CodeGenerationExhausted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_shape_is_four_letters_four_digits() {
        for _ in 0..200 {
            let code = generate_code();
            assert_eq!(code.len(), 8);
            let bytes = code.as_bytes();
            assert!(bytes[..4].iter().all(|b| b.is_ascii_uppercase()));
            assert!(bytes[4..].iter().all(|b| b.is_ascii_digit()));
        }
    }

    #[tokio::test]
    async fn allocation_retries_past_collisions() {
        let mut probes = 0;
        let code = allocate_unique(|_| {
            probes += 1;
            let collide = probes < 3;
            async move { Ok(collide) }
        })
        .await
        .unwrap();
        assert_eq!(probes, 3);
        assert_eq!(code.len(), 8);
    }

    #[tokio::test]
    async fn allocation_fails_fast_when_exhausted() {
        let mut probes = 0;
        let err = allocate_unique(|_| {
            probes += 1;
            async { Ok(true) }
        })
        .await
        .unwrap_err();
        assert_eq!(probes, MAX_CODE_ATTEMPTS);
        assert!(matches!(err, AppError::CodeGenerationExhausted));
    }

    #[tokio::test]
    async fn probe_errors_are_propagated() {
        let err = allocate_unique(|_| async {
            Err::<bool, _>(AppError::BadRequest("probe failed".into()))
        })
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
