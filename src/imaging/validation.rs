pub const ACCEPTED_TYPES: [&str; 4] = ["image/jpeg", "image/jpg", "image/png", "image/webp"];

const MIN_IMAGE_BYTES: u64 = 1024;

/// Every problem found with an upload; empty when it is acceptable.
pub fn validate_image_file(mime_type: &str, size: u64, max_mb: u64) -> Vec<String> {
    let mut errors = Vec::new();

    if !ACCEPTED_TYPES.contains(&mime_type) {
        errors.push(format!(
            "Invalid file type. Please use: {}",
            ACCEPTED_TYPES.join(", ")
        ));
    }

    if size > max_mb.saturating_mul(1024 * 1024) {
        errors.push(format!("File too large. Maximum size is {max_mb}MB"));
    }

    if size < MIN_IMAGE_BYTES {
        errors.push("File seems too small to be a valid image".to_string());
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_a_normal_photo() {
        assert!(validate_image_file("image/jpeg", 2 * 1024 * 1024, 10).is_empty());
    }

    #[test]
    fn reports_every_problem() {
        let errors = validate_image_file("image/gif", 100, 10);
        assert_eq!(errors.len(), 2);
        assert!(errors[0].starts_with("Invalid file type"));
        assert!(errors[1].contains("too small"));
    }

    #[test]
    fn rejects_oversized_files() {
        let errors = validate_image_file("image/png", 11 * 1024 * 1024, 10);
        assert_eq!(errors, vec!["File too large. Maximum size is 10MB".to_string()]);
    }
}
